//! In-memory log of outbound calls.

use core_types::ApiCall;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Default number of retained entries.
pub const DEFAULT_CALL_LOG_CAPACITY: usize = 200;

/// Shared, bounded log of outbound calls. Cloning shares the log.
#[derive(Debug, Clone)]
pub struct CallLog {
    entries: Arc<RwLock<VecDeque<ApiCall>>>,
    capacity: usize,
}

impl Default for CallLog {
    fn default() -> Self {
        Self::new(DEFAULT_CALL_LOG_CAPACITY)
    }
}

impl CallLog {
    /// Create a log that keeps at most `capacity` entries (minimum one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Append a call, dropping the oldest entry when full.
    pub async fn add(&self, call: ApiCall) {
        let mut entries = self.entries.write().await;
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(call);
    }

    /// Record the response status of a logged call.
    pub async fn record_response(&self, id: &str, status: u16, duration_ms: u64) {
        if let Some(call) = self.entries.write().await.iter_mut().find(|c| c.id == id) {
            call.status = Some(status);
            call.duration_ms = Some(duration_ms);
        }
    }

    /// Record the failure of a logged call.
    pub async fn record_error(&self, id: &str, error: String, duration_ms: u64) {
        if let Some(call) = self.entries.write().await.iter_mut().find(|c| c.id == id) {
            call.error = Some(error);
            call.duration_ms = Some(duration_ms);
        }
    }

    /// All retained calls, newest first.
    pub async fn list(&self) -> Vec<ApiCall> {
        self.entries.read().await.iter().rev().cloned().collect()
    }

    /// Look up one call by id.
    pub async fn get(&self, id: &str) -> Option<ApiCall> {
        self.entries.read().await.iter().find(|c| c.id == id).cloned()
    }

    /// Number of retained calls.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the log is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Remove all calls.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}
