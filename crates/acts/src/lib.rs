//! Legislative acts dataset.
//!
//! The dataset is a static JSON array of [`Act`] records produced elsewhere;
//! this crate loads it, answers list/filter/stats queries and locates the
//! per-document PDFs served under `/pdfs/<doc_id>.pdf`.

use core_types::Act;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use web_types::{ActFilter, ActsStats, CountEntry};

/// Errors from the acts crate.
#[derive(Error, Debug)]
pub enum ActsError {
    #[error("Failed to read acts file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid acts file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for acts operations.
pub type Result<T> = std::result::Result<T, ActsError>;

/// Public URL of the PDF for an act.
pub fn pdf_url(doc_id: &str) -> String {
    format!("/pdfs/{doc_id}.pdf")
}

/// In-memory act records with an id index.
#[derive(Debug, Clone, Default)]
pub struct ActStore {
    acts: Vec<Act>,
    by_id: HashMap<String, usize>,
}

impl ActStore {
    /// Build a store from records already in memory.
    pub fn new(acts: Vec<Act>) -> Self {
        let by_id = acts
            .iter()
            .enumerate()
            .map(|(idx, act)| (act.doc_id.clone(), idx))
            .collect();
        Self { acts, by_id }
    }

    /// Load the JSON array at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ActsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let acts: Vec<Act> = serde_json::from_str(&text).map_err(|source| ActsError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        info!(path = %path.display(), count = acts.len(), "Loaded acts");
        Ok(Self::new(acts))
    }

    pub fn len(&self) -> usize {
        self.acts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.acts.is_empty()
    }

    pub fn all(&self) -> &[Act] {
        &self.acts
    }

    /// Get an act by document id.
    pub fn get(&self, doc_id: &str) -> Option<&Act> {
        self.by_id.get(doc_id).map(|&idx| &self.acts[idx])
    }

    /// Acts matching every populated field of the filter, in dataset order.
    pub fn list(&self, filter: &ActFilter) -> Vec<&Act> {
        let needle = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        self.acts
            .iter()
            .filter(|act| {
                let text_ok = needle.as_deref().is_none_or(|needle| {
                    [&act.doc_id, &act.num, &act.description]
                        .iter()
                        .any(|field| field.to_lowercase().contains(needle))
                });

                text_ok
                    && matches_exact(filter.year.as_deref(), act.year())
                    && matches_exact(filter.domain.as_deref(), Some(act.domain.as_str()))
                    && matches_exact(filter.doc_type.as_deref(), Some(act.doc_type.as_str()))
            })
            .collect()
    }

    /// Totals by year (newest first), domain and document type (most
    /// frequent first).
    pub fn stats(&self) -> ActsStats {
        let mut by_year = count_by(&self.acts, |act| act.year().map(str::to_string));
        by_year.sort_by(|a, b| b.key.cmp(&a.key));

        let mut by_domain = count_by(&self.acts, |act| non_empty(&act.domain));
        sort_by_frequency(&mut by_domain);

        let mut by_doc_type = count_by(&self.acts, |act| non_empty(&act.doc_type));
        sort_by_frequency(&mut by_doc_type);

        ActsStats {
            total: self.acts.len() as u32,
            by_year,
            by_domain,
            by_doc_type,
        }
    }
}

fn matches_exact(wanted: Option<&str>, actual: Option<&str>) -> bool {
    match wanted.filter(|w| !w.is_empty()) {
        Some(wanted) => actual == Some(wanted),
        None => true,
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn count_by(acts: &[Act], key: impl Fn(&Act) -> Option<String>) -> Vec<CountEntry> {
    let mut counts: BTreeMap<String, u32> = BTreeMap::new();
    for act in acts {
        if let Some(k) = key(act) {
            *counts.entry(k).or_default() += 1;
        }
    }

    counts
        .into_iter()
        .map(|(key, count)| CountEntry { key, count })
        .collect()
}

fn sort_by_frequency(entries: &mut [CountEntry]) {
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
}

/// Local directory holding `<doc_id>.pdf` files.
#[derive(Debug, Clone)]
pub struct PdfLibrary {
    dir: PathBuf,
}

impl PdfLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the PDF for `doc_id`. Ids that could escape the directory
    /// resolve to nothing.
    pub fn path_for(&self, doc_id: &str) -> Option<PathBuf> {
        if doc_id.is_empty() || doc_id.contains(['/', '\\']) || doc_id.contains("..") {
            return None;
        }
        Some(self.dir.join(format!("{doc_id}.pdf")))
    }

    /// Whether the PDF for `doc_id` is present.
    pub fn exists(&self, doc_id: &str) -> bool {
        self.path_for(doc_id).is_some_and(|path| path.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn act(doc_id: &str, date_str: &str, domain: &str, doc_type: &str, description: &str) -> Act {
        Act {
            doc_id: doc_id.to_string(),
            num: doc_id.replace('-', "/"),
            date_str: date_str.to_string(),
            domain: domain.to_string(),
            doc_type: doc_type.to_string(),
            description: description.to_string(),
            ..Default::default()
        }
    }

    fn sample_store() -> ActStore {
        ActStore::new(vec![
            act("2020-01", "2020-02-14", "Finance", "act", "Appropriation Act"),
            act("2020-02", "2020-06-01", "Health", "act", "Quarantine Amendment"),
            act("2021-07", "2021-03-30", "Finance", "bill", "Inland Revenue (Amendment)"),
            act("1999-15", "", "", "act", "Old record"),
        ])
    }

    #[test]
    fn test_get_by_id() {
        let store = sample_store();
        assert_eq!(store.get("2020-02").unwrap().domain, "Health");
        assert!(store.get("missing").is_none());
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_list_search_is_case_insensitive() {
        let store = sample_store();

        let filter = ActFilter {
            search: Some("AMENDMENT".to_string()),
            ..Default::default()
        };
        let ids: Vec<_> = store.list(&filter).iter().map(|a| a.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["2020-02", "2021-07"]);

        // num is searched too
        let filter = ActFilter {
            search: Some("2021/07".to_string()),
            ..Default::default()
        };
        assert_eq!(store.list(&filter).len(), 1);
    }

    #[test]
    fn test_list_exact_filters() {
        let store = sample_store();

        let filter = ActFilter {
            year: Some("2020".to_string()),
            domain: Some("Finance".to_string()),
            ..Default::default()
        };
        let ids: Vec<_> = store.list(&filter).iter().map(|a| a.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["2020-01"]);

        let filter = ActFilter {
            doc_type: Some("bill".to_string()),
            search: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(store.list(&filter).len(), 1);

        assert_eq!(store.list(&ActFilter::default()).len(), 4);
    }

    #[test]
    fn test_stats() {
        let stats = sample_store().stats();

        assert_eq!(stats.total, 4);
        assert_eq!(
            stats.by_year,
            vec![
                CountEntry { key: "2021".to_string(), count: 1 },
                CountEntry { key: "2020".to_string(), count: 2 },
            ]
        );
        assert_eq!(stats.by_domain[0], CountEntry { key: "Finance".to_string(), count: 2 });
        assert_eq!(stats.by_domain.len(), 2);
        assert_eq!(stats.by_doc_type[0].key, "act");
        assert_eq!(stats.by_doc_type[0].count, 3);
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("acts.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"[{{"doc_id": "2024-07", "num": "7/2024", "date_str": "2024-05-02", "domain": "Finance", "extra": true}}]"#
        )
        .unwrap();

        let store = ActStore::load(&path).unwrap();
        let act = store.get("2024-07").unwrap();
        assert_eq!(act.year(), Some("2024"));
        assert_eq!(act.description, "");
    }

    #[test]
    fn test_load_record_with_null_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("acts.json");
        std::fs::write(
            &path,
            r#"[
                {"doc_type": "act", "doc_id": "2024-07", "num": "7/2024", "date_str": "2024-05-02",
                 "description": "Finance", "url_metadata": null, "lang": "en", "url_pdf": null,
                 "doc_number": null, "domain": null, "year": "2024"},
                {"doc_id": "2024-08", "domain": "Health"}
            ]"#,
        )
        .unwrap();

        let store = ActStore::load(&path).unwrap();

        assert_eq!(store.len(), 2);
        let act = store.get("2024-07").unwrap();
        assert_eq!(act.domain, "");
        assert_eq!(act.url_pdf, "");
        // empty domains are left out of the breakdown
        let stats = store.stats();
        assert_eq!(stats.by_domain.len(), 1);
        assert_eq!(stats.by_domain[0].key, "Health");
    }

    #[test]
    fn test_load_errors() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(ActStore::load(&missing), Err(ActsError::Io { .. })));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{not json").unwrap();
        assert!(matches!(ActStore::load(&bad), Err(ActsError::Json { .. })));
    }

    #[test]
    fn test_pdf_library() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("2024-07.pdf"), b"%PDF-1.4").unwrap();
        let pdfs = PdfLibrary::new(dir.path());

        assert!(pdfs.exists("2024-07"));
        assert!(!pdfs.exists("2024-08"));
        assert!(!pdfs.exists("../2024-07"));
        assert!(!pdfs.exists("a/b"));
        assert!(pdfs.path_for("").is_none());
        assert_eq!(pdf_url("2024-07"), "/pdfs/2024-07.pdf");
    }
}
