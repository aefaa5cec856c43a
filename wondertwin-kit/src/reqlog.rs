//! Bounded ring of recent requests, exposed via `GET /admin/requests`.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default ring capacity.
pub const DEFAULT_CAPACITY: usize = 1000;

/// One logged request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEntry {
    /// When the request completed.
    pub timestamp: DateTime<Utc>,
    /// HTTP method.
    pub method: String,
    /// Full request path.
    pub path: String,
    /// Response status code.
    pub status: u16,
    /// Handler duration in milliseconds.
    pub duration_ms: u64,
    /// `X-Request-Id`, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Request headers; captured only in verbose mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
}

/// Bounded request ring; appending past capacity evicts the oldest entry.
#[derive(Debug)]
pub struct RequestLog {
    entries: RwLock<VecDeque<RequestEntry>>,
    capacity: usize,
}

impl RequestLog {
    /// Creates a ring with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Appends an entry, evicting the oldest at capacity.
    pub fn append(&self, entry: RequestEntry) {
        let mut entries = self.entries.write().expect("request log lock poisoned");
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Copies out all entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<RequestEntry> {
        let entries = self.entries.read().expect("request log lock poisoned");
        entries.iter().cloned().collect()
    }

    /// Clears the ring.
    pub fn clear(&self) {
        let mut entries = self.entries.write().expect("request log lock poisoned");
        entries.clear();
    }
}

impl Default for RequestLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
