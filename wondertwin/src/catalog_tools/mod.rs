//! CI tooling for registry catalogs: release upsert and verification.

pub mod update;
pub mod verify;

pub use update::{update_catalog, UpdateArgs};
pub use verify::{verify_catalog, VerifyOutcome};
