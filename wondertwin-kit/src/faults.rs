//! Fault injection registry.
//!
//! Faults are keyed by exact endpoint path (the full request path, e.g.
//! `/v2/customers/cust-003/claimed_rewards`). When a business request hits
//! a registered path the fault layer short-circuits the handler with the
//! configured status, body, and delay. A `rate` below 1.0 makes the fault
//! probabilistic: each request rolls a uniform number against it.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Generic body written when a fault has no configured body.
pub const GENERIC_FAULT_BODY: &str =
    r#"{"error":{"message":"injected fault","type":"injected_fault"}}"#;

/// A configured synthetic response for one path.
///
/// Deserialization accepts `status` as an alias for `status_code` and
/// ignores unknown fields, so callers posting vendor-shaped bodies still
/// register cleanly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fault {
    /// Status code returned to the caller.
    #[serde(alias = "status")]
    pub status_code: u16,
    /// Response body; the generic injected-fault JSON when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Sleep before responding, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
    /// Probability in [0.0, 1.0] that a request trips the fault.
    /// A wire value of 0.0 coerces to 1.0 at insertion.
    #[serde(default)]
    pub rate: f64,
}

impl Fault {
    /// Configured delay as a [`Duration`], if any.
    #[must_use]
    pub fn delay(&self) -> Option<Duration> {
        self.delay_ms.map(Duration::from_millis)
    }

    /// Body to write, falling back to the generic injected-fault JSON.
    #[must_use]
    pub fn body_or_default(&self) -> String {
        self.body
            .clone()
            .unwrap_or_else(|| GENERIC_FAULT_BODY.to_string())
    }
}

/// Registry of path-keyed faults.
#[derive(Debug, Default)]
pub struct FaultRegistry {
    faults: RwLock<HashMap<String, Fault>>,
}

impl FaultRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fault at `path`. A rate of 0.0 coerces to 1.0.
    pub fn set(&self, path: impl Into<String>, mut fault: Fault) {
        if fault.rate == 0.0 {
            fault.rate = 1.0;
        }
        let mut faults = self.faults.write().expect("fault registry lock poisoned");
        faults.insert(path.into(), fault);
    }

    /// Removes the fault at `path`, returning whether it existed.
    pub fn remove(&self, path: &str) -> bool {
        let mut faults = self.faults.write().expect("fault registry lock poisoned");
        faults.remove(path).is_some()
    }

    /// Returns the applicable fault for `path`, rolling against the rate
    /// when it is below 1.0.
    #[must_use]
    pub fn check(&self, path: &str) -> Option<Fault> {
        let faults = self.faults.read().expect("fault registry lock poisoned");
        let fault = faults.get(path)?;
        if fault.rate < 1.0 && rand::random::<f64>() >= fault.rate {
            return None;
        }
        Some(fault.clone())
    }

    /// Copy of all registered faults.
    #[must_use]
    pub fn list(&self) -> HashMap<String, Fault> {
        let faults = self.faults.read().expect("fault registry lock poisoned");
        faults.clone()
    }

    /// Removes all faults.
    pub fn reset(&self) {
        let mut faults = self.faults.write().expect("fault registry lock poisoned");
        faults.clear();
    }
}
