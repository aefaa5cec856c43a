//! Generic keyed store with insertion order, pagination, and deterministic IDs.
//!
//! The same data structure backs every collection a twin keeps in memory
//! (customers, charges, reward ledgers, ...). Keys enumerate in the order
//! they were *first* inserted; updates never move a key. A per-store
//! monotonic counter yields deterministic IDs of the form `{prefix}_000001`
//! so seeded test runs produce identical identifiers.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::Serialize;

/// One page of a cursor-paginated enumeration.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    /// Values in insertion order.
    pub data: Vec<T>,
    /// True iff at least one entry remains past this page.
    pub has_more: bool,
    /// Total number of live entries in the store.
    pub total: usize,
    /// Key of the last entry returned; pass back as the next cursor.
    pub next_cursor: Option<String>,
}

struct Inner<T> {
    entries: HashMap<String, T>,
    order: Vec<String>,
    counter: u64,
}

/// Concurrency-safe keyed collection of `T`.
///
/// All operations acquire an internal reader or writer lock; enumeration
/// methods copy out before releasing, so callers always see a stable
/// snapshot.
pub struct Store<T> {
    prefix: String,
    inner: RwLock<Inner<T>>,
}

impl<T: Clone> Store<T> {
    /// Creates an empty store whose IDs carry the given prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                order: Vec::new(),
                counter: 0,
            }),
        }
    }

    /// Inserts or updates the value at `key`.
    ///
    /// First insertion appends the key to the order list; updates leave
    /// the key's position untouched.
    pub fn set(&self, key: impl Into<String>, value: T) {
        let key = key.into();
        let mut inner = self.inner.write().expect("store lock poisoned");
        if !inner.entries.contains_key(&key) {
            inner.order.push(key.clone());
        }
        inner.entries.insert(key, value);
    }

    /// Point lookup by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<T> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner.entries.get(key).cloned()
    }

    /// Removes `key` from both the map and the order list.
    ///
    /// Returns whether the key existed.
    pub fn delete(&self, key: &str) -> bool {
        let mut inner = self.inner.write().expect("store lock poisoned");
        if inner.entries.remove(key).is_some() {
            inner.order.retain(|k| k != key);
            true
        } else {
            false
        }
    }

    /// Returns all values in insertion order.
    #[must_use]
    pub fn list(&self) -> Vec<T> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner
            .order
            .iter()
            .filter_map(|k| inner.entries.get(k).cloned())
            .collect()
    }

    /// Returns all keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner.order.clone()
    }

    /// Returns values matching `pred`, in insertion order.
    #[must_use]
    pub fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner
            .order
            .iter()
            .filter_map(|k| inner.entries.get(k))
            .filter(|v| pred(v))
            .cloned()
            .collect()
    }

    /// Like [`Store::filter`] but returns matching keys and values in
    /// parallel vectors.
    #[must_use]
    pub fn filter_with_ids(&self, pred: impl Fn(&T) -> bool) -> (Vec<String>, Vec<T>) {
        let inner = self.inner.read().expect("store lock poisoned");
        let mut keys = Vec::new();
        let mut values = Vec::new();
        for k in &inner.order {
            if let Some(v) = inner.entries.get(k) {
                if pred(v) {
                    keys.push(k.clone());
                    values.push(v.clone());
                }
            }
        }
        (keys, values)
    }

    /// Cursor pagination over the insertion order.
    ///
    /// The scan starts at the position *after* `cursor`; an empty cursor
    /// starts from the beginning, an unknown cursor is treated as empty.
    /// `limit == 0` returns everything.
    #[must_use]
    pub fn paginate(&self, cursor: &str, limit: usize) -> Page<T> {
        let inner = self.inner.read().expect("store lock poisoned");
        let start = if cursor.is_empty() {
            0
        } else {
            inner
                .order
                .iter()
                .position(|k| k == cursor)
                .map_or(0, |p| p + 1)
        };
        let take = if limit == 0 {
            inner.order.len().saturating_sub(start)
        } else {
            limit
        };
        let slice: Vec<String> = inner.order.iter().skip(start).take(take).cloned().collect();
        let has_more = start + slice.len() < inner.order.len();
        let next_cursor = slice.last().cloned();
        let data = slice
            .iter()
            .filter_map(|k| inner.entries.get(k).cloned())
            .collect();
        Page {
            data,
            has_more,
            total: inner.order.len(),
            next_cursor,
        }
    }

    /// Number of live entries.
    #[must_use]
    pub fn count(&self) -> usize {
        let inner = self.inner.read().expect("store lock poisoned");
        inner.order.len()
    }

    /// Yields the next deterministic ID: `{prefix}_000001`, `_000002`, ...
    #[must_use]
    pub fn next_id(&self) -> String {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.counter += 1;
        format!("{}_{:06}", self.prefix, inner.counter)
    }

    /// Returns an independent copy of the key-to-value map.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, T> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner.entries.clone()
    }

    /// Replaces all contents with `entries`.
    ///
    /// Keys are sorted lexicographically before installation so a restored
    /// snapshot enumerates deterministically regardless of map iteration
    /// order.
    pub fn load_snapshot(&self, entries: HashMap<String, T>) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let mut order: Vec<String> = entries.keys().cloned().collect();
        order.sort();
        inner.order = order;
        inner.entries = entries;
    }

    /// Clears all entries and zeroes the ID counter.
    pub fn reset(&self) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.entries.clear();
        inner.order.clear();
        inner.counter = 0;
    }
}

impl<T: Clone + Serialize> Store<T> {
    /// Serializes the snapshot map as a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if `T` fails to serialize.
    pub fn snapshot_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self.snapshot())
    }
}
