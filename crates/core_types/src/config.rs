//! Layered configuration: built-in defaults, an optional TOML file, then
//! environment variables.

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default read API the proxy forwards to.
pub const DEFAULT_UPSTREAM_URL: &str = "https://aaf8ece1-3077-4a52-ab05-183a424f6d93-dev.e1-us-east-azure.choreoapis.dev/data-platform/read-api/v1.0/v1/entities";

/// Default location of the analysis service.
pub const DEFAULT_ANALYSIS_URL: &str = "http://localhost:8000";

/// Explorer configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub analysis: AnalysisConfig,
    pub acts: ActsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Directory of a prebuilt front end, served for unmatched paths.
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Upper bound on retained call-log entries.
    pub call_log_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActsConfig {
    pub data_file: PathBuf,
    pub pdf_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            static_dir: None,
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_UPSTREAM_URL.to_string(),
            timeout_secs: 30,
            call_log_capacity: 200,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ANALYSIS_URL.to_string(),
            // Analysis runs a model over a whole PDF.
            timeout_secs: 300,
        }
    }
}

impl Default for ActsConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("public/data/acts.json"),
            pdf_dir: PathBuf::from("public/pdfs"),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("OPENGIN_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("opengin-x")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load the config file (if any), apply environment overrides and
    /// validate the result.
    pub fn load() -> anyhow::Result<Self> {
        let config = Self::load_unvalidated()?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`Config::load`] but leaves validation to the caller, so later
    /// overrides (command-line flags) can still fix a bad value.
    pub fn load_unvalidated() -> anyhow::Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Config::default()
        };

        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML config file without applying environment overrides.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Apply `OPENGIN_*` overrides using the given variable lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("OPENGIN_UPSTREAM_URL") {
            self.upstream.base_url = url;
        }
        if let Some(url) = lookup("OPENGIN_ANALYSIS_URL") {
            self.analysis.base_url = url;
        }
        if let Some(bind) = lookup("OPENGIN_BIND") {
            self.server.bind = bind;
        }
        if let Some(file) = lookup("OPENGIN_ACTS_FILE") {
            self.acts.data_file = PathBuf::from(file);
        }
        if let Some(dir) = lookup("OPENGIN_PDF_DIR") {
            self.acts.pdf_dir = PathBuf::from(dir);
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> anyhow::Result<()> {
        validate_url("upstream.base_url", &self.upstream.base_url)?;
        validate_url("analysis.base_url", &self.analysis.base_url)?;

        if self.upstream.timeout_secs == 0 {
            return Err(anyhow!("upstream.timeout_secs must be greater than zero"));
        }
        if self.analysis.timeout_secs == 0 {
            return Err(anyhow!("analysis.timeout_secs must be greater than zero"));
        }
        if self.upstream.call_log_capacity == 0 {
            return Err(anyhow!("upstream.call_log_capacity must be greater than zero"));
        }
        if self.server.bind.trim().is_empty() {
            return Err(anyhow!("server.bind must not be empty"));
        }

        Ok(())
    }
}

fn validate_url(field: &str, value: &str) -> anyhow::Result<()> {
    let parsed =
        url::Url::parse(value).with_context(|| format!("{field} is not a valid URL: {value:?}"))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(anyhow!("{field} must use http or https, got {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.upstream.base_url, DEFAULT_UPSTREAM_URL);
        assert_eq!(config.analysis.base_url, DEFAULT_ANALYSIS_URL);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[upstream]\nbase_url = \"http://localhost:9000/v1/entities\"\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();

        assert_eq!(config.upstream.base_url, "http://localhost:9000/v1/entities");
        assert_eq!(config.upstream.timeout_secs, 30);
        assert_eq!(config.analysis, AnalysisConfig::default());
    }

    #[test]
    fn test_malformed_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[upstream\n").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("OPENGIN_UPSTREAM_URL", "http://upstream.local"),
            ("OPENGIN_BIND", "127.0.0.1:8080"),
            ("OPENGIN_PDF_DIR", "/srv/pdfs"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.upstream.base_url, "http://upstream.local");
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.acts.pdf_dir, PathBuf::from("/srv/pdfs"));
        assert_eq!(config.analysis.base_url, DEFAULT_ANALYSIS_URL);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.analysis.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.upstream.base_url = String::new();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.upstream.timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
