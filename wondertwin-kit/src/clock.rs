//! Simulated clock scoped to a single twin.
//!
//! Holds an accumulated offset that admin `/admin/time/advance` calls grow.
//! Simulated time drifts from wall-clock time intentionally; twins that
//! model expiry (points, sessions, holds) read `now()` instead of the
//! system clock.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Clonable handle to a twin's simulated clock.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    offset: Arc<RwLock<Duration>>,
}

impl SimClock {
    /// Creates a clock with zero offset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wall-clock time plus the accumulated offset.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        let offset = *self.offset.read().expect("clock lock poisoned");
        Utc::now() + chrono::Duration::from_std(offset).unwrap_or_default()
    }

    /// Adds `d` to the offset.
    pub fn advance(&self, d: Duration) {
        let mut offset = self.offset.write().expect("clock lock poisoned");
        *offset += d;
    }

    /// Current accumulated offset.
    #[must_use]
    pub fn offset(&self) -> Duration {
        *self.offset.read().expect("clock lock poisoned")
    }

    /// Zeroes the offset.
    pub fn reset(&self) {
        let mut offset = self.offset.write().expect("clock lock poisoned");
        *offset = Duration::ZERO;
    }
}
