//! Twin registry: catalog schema, version resolution, binary
//! installation, license validation, and the lock file.

pub mod catalog;
pub mod installer;
pub mod license;
pub mod lockfile;
pub mod resolver;

pub use catalog::{Catalog, CatalogEntry, Tier, VersionRecord, REQUIRED_PLATFORMS};
pub use installer::{host_platform, install, InstallOutcome};
pub use license::License;
pub use lockfile::{LockEntry, LockFile};
pub use resolver::{fetch_catalog, resolve};
