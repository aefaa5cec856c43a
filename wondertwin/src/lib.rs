//! `WonderTwin` fleet controller library.
//!
//! Everything the `wt` binary does lives here: manifest and CLI config
//! parsing, the process supervisor, the registry resolver and installer,
//! the scenario engine, the conformance harness, the agent bridge, and
//! the catalog CI tools.

pub mod admin_client;
pub mod bridge;
pub mod catalog_tools;
pub mod cli;
pub mod config;
pub mod conformance;
pub mod error;
pub mod fleet;
pub mod observability;
pub mod registry;
pub mod scenario;
pub mod supervisor;
