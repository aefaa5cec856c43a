//! `WonderTwin` twin runtime kit.
//!
//! Shared library embedded by every behavioral twin. Provides the uniform
//! request pipeline (CORS, request log ring, latency jitter, random failure,
//! fault injection, idempotency cache), a generic in-memory keyed store with
//! cursor pagination and deterministic IDs, a simulated clock, and the
//! standard `/admin/*` control plane every twin mounts.

pub mod admin;
pub mod clock;
pub mod error;
pub mod faults;
pub mod idempotency;
pub mod pipeline;
pub mod reqlog;
pub mod response;
pub mod server;
pub mod store;

pub use admin::{AdminContext, TwinState, WebhookFlusher, admin_router};
pub use clock::SimClock;
pub use error::StateError;
pub use faults::{Fault, FaultRegistry};
pub use idempotency::IdempotencyCache;
pub use pipeline::PipelineConfig;
pub use reqlog::{RequestEntry, RequestLog};
pub use server::TwinServer;
pub use store::{Page, Store};
