//! Scenario engine: declarative HTTP test flows against a running
//! fleet.

pub mod assert;
pub mod jsonpath;
pub mod loader;
pub mod runner;
pub mod schema;
pub mod template;

pub use loader::{load_file, load_path};
pub use runner::{run_scenario, RunReport, StepOutcome, StepStatus};
pub use schema::{AssertSpec, RequestSpec, Scenario, SetupSpec, Step};
pub use template::TemplateContext;
