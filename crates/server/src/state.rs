//! Application state for the web server.

use acts::{ActStore, PdfLibrary};
use anyhow::Context;
use api_client::{AnalysisClient, ReadApiClient};
use core_types::Config;
use std::sync::Arc;
use tracing::warn;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Read API client; clones share its call log.
    pub read_api: ReadApiClient,
    pub analysis: AnalysisClient,
    /// All act records.
    pub acts: Arc<ActStore>,
    pub pdfs: PdfLibrary,
}

impl AppState {
    /// Create the state from a config and an already loaded act store.
    pub fn new(config: Config, acts: ActStore) -> anyhow::Result<Self> {
        let read_api =
            ReadApiClient::new(&config.upstream).context("Failed to create read API client")?;
        let analysis =
            AnalysisClient::new(&config.analysis).context("Failed to create analysis client")?;
        let pdfs = PdfLibrary::new(&config.acts.pdf_dir);

        Ok(Self {
            config: Arc::new(config),
            read_api,
            analysis,
            acts: Arc::new(acts),
            pdfs,
        })
    }

    /// Create the state, loading acts from the configured data file. A
    /// missing or unreadable file leaves the acts viewer empty.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let acts = ActStore::load(&config.acts.data_file).unwrap_or_else(|e| {
            warn!(error = %e, "Acts dataset unavailable");
            ActStore::default()
        });
        Self::new(config, acts)
    }
}
