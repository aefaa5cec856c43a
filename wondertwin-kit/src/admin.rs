//! Standard `/admin/*` control plane mounted on every twin.
//!
//! Binds the keyed stores (through the twin's [`TwinState`] contract), the
//! request log, the fault registry, the idempotency cache, and the
//! simulated clock to a uniform out-of-band surface that tests and the
//! fleet controller drive.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::json;

use crate::clock::SimClock;
use crate::error::StateError;
use crate::faults::{Fault, FaultRegistry};
use crate::idempotency::IdempotencyCache;
use crate::reqlog::RequestLog;
use crate::response;

/// State contract every twin provides to the admin plane.
pub trait TwinState: Send + Sync {
    /// JSON-serializable snapshot of all twin state.
    fn snapshot(&self) -> serde_json::Value;

    /// Replaces twin state from a snapshot body.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Parse`] when the body is ill-formed and
    /// [`StateError::Load`] when it parses but cannot be applied.
    fn load_state(&self, bytes: &[u8]) -> Result<(), StateError>;

    /// Clears all twin state, including store ID counters.
    fn reset(&self);
}

/// Optional collaborator contract for twins that queue webhooks.
pub trait WebhookFlusher: Send + Sync {
    /// Delivers all pending webhooks; returns how many were sent.
    fn flush_webhooks(&self) -> usize;
}

/// Everything the admin plane needs from the embedding twin.
pub struct AdminContext {
    /// The twin's state contract.
    pub state: Arc<dyn TwinState>,
    /// Request log ring shared with the pipeline.
    pub log: Arc<RequestLog>,
    /// Fault registry shared with the pipeline.
    pub faults: Arc<FaultRegistry>,
    /// Idempotency cache shared with the pipeline.
    pub idempotency: Arc<IdempotencyCache>,
    /// Simulated clock, when the twin models time.
    pub clock: Option<SimClock>,
    /// Webhook flusher, when the twin queues webhooks.
    pub flusher: Option<Arc<dyn WebhookFlusher>>,
}

/// Builds the admin router. Callers nest it under `/admin`.
pub fn admin_router(ctx: Arc<AdminContext>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/reset", post(reset))
        .route("/state", get(get_state).post(post_state))
        .route("/fault/{*endpoint}", post(set_fault).delete(delete_fault))
        .route("/faults", get(list_faults))
        .route("/requests", get(list_requests))
        .route("/webhooks/flush", post(flush_webhooks))
        .route("/time/advance", post(advance_time))
        .route("/time", get(get_time))
        .with_state(ctx)
}

async fn health() -> Response {
    response::json(StatusCode::OK, Some(&json!({"status": "ok"})))
}

async fn reset(State(ctx): State<Arc<AdminContext>>) -> Response {
    ctx.state.reset();
    ctx.log.clear();
    ctx.faults.reset();
    ctx.idempotency.reset();
    if let Some(clock) = &ctx.clock {
        clock.reset();
    }
    response::json(StatusCode::OK, Some(&json!({"status": "reset"})))
}

async fn get_state(State(ctx): State<Arc<AdminContext>>) -> Response {
    response::json(StatusCode::OK, Some(&ctx.state.snapshot()))
}

async fn post_state(State(ctx): State<Arc<AdminContext>>, body: Bytes) -> Response {
    match ctx.state.load_state(&body) {
        Ok(()) => response::json(StatusCode::OK, Some(&json!({"status": "loaded"}))),
        Err(e @ (StateError::Parse(_) | StateError::Load(_))) => {
            response::error(StatusCode::BAD_REQUEST, &e.to_string())
        }
    }
}

async fn set_fault(
    State(ctx): State<Arc<AdminContext>>,
    Path(endpoint): Path<String>,
    body: Bytes,
) -> Response {
    let fault: Fault = match serde_json::from_slice(&body) {
        Ok(f) => f,
        Err(e) => {
            return response::error(StatusCode::BAD_REQUEST, &format!("invalid fault body: {e}"));
        }
    };
    let path = format!("/{endpoint}");
    ctx.faults.set(&path, fault);
    response::json(
        StatusCode::OK,
        Some(&json!({"status": "fault set", "endpoint": path})),
    )
}

async fn delete_fault(
    State(ctx): State<Arc<AdminContext>>,
    Path(endpoint): Path<String>,
) -> Response {
    let path = format!("/{endpoint}");
    if ctx.faults.remove(&path) {
        response::json(
            StatusCode::OK,
            Some(&json!({"status": "removed", "endpoint": path})),
        )
    } else {
        response::error(StatusCode::NOT_FOUND, &format!("no fault at {path}"))
    }
}

async fn list_faults(State(ctx): State<Arc<AdminContext>>) -> Response {
    response::json(StatusCode::OK, Some(&ctx.faults.list()))
}

async fn list_requests(State(ctx): State<Arc<AdminContext>>) -> Response {
    response::json(StatusCode::OK, Some(&ctx.log.entries()))
}

async fn flush_webhooks(State(ctx): State<Arc<AdminContext>>) -> Response {
    match &ctx.flusher {
        Some(flusher) => {
            let delivered = flusher.flush_webhooks();
            response::json(
                StatusCode::OK,
                Some(&json!({"status": "flushed", "delivered": delivered})),
            )
        }
        None => response::json(
            StatusCode::OK,
            Some(&json!({"status": "noop", "detail": "twin has no webhook queue"})),
        ),
    }
}

/// Body for `POST /admin/time/advance`. Accepts either a Go-style duration
/// string (`"744h"`, `"90s"`) or a plain seconds count.
#[derive(Debug, Deserialize)]
struct AdvanceBody {
    duration: Option<String>,
    seconds: Option<u64>,
}

async fn advance_time(State(ctx): State<Arc<AdminContext>>, body: Bytes) -> Response {
    let Some(clock) = &ctx.clock else {
        return response::error(StatusCode::BAD_REQUEST, "twin has no simulated clock");
    };
    let parsed: AdvanceBody = match serde_json::from_slice(&body) {
        Ok(b) => b,
        Err(e) => {
            return response::error(StatusCode::BAD_REQUEST, &format!("invalid body: {e}"));
        }
    };
    let duration = match (&parsed.duration, parsed.seconds) {
        (Some(s), _) => match humantime::parse_duration(s) {
            Ok(d) => d,
            Err(e) => {
                return response::error(
                    StatusCode::BAD_REQUEST,
                    &format!("unparseable duration {s:?}: {e}"),
                );
            }
        },
        (None, Some(secs)) => Duration::from_secs(secs),
        (None, None) => {
            return response::error(StatusCode::BAD_REQUEST, "missing duration");
        }
    };
    clock.advance(duration);
    response::json(
        StatusCode::OK,
        Some(&json!({
            "status": "advanced",
            "duration": humantime::format_duration(duration).to_string(),
            "offset": humantime::format_duration(clock.offset()).to_string(),
            "simulated": clock.now().to_rfc3339(),
        })),
    )
}

async fn get_time(State(ctx): State<Arc<AdminContext>>) -> Response {
    let mut body = json!({"real": chrono::Utc::now().to_rfc3339()});
    if let Some(clock) = &ctx.clock {
        body["simulated"] = json!(clock.now().to_rfc3339());
        body["offset"] = json!(humantime::format_duration(clock.offset()).to_string());
    }
    response::json(StatusCode::OK, Some(&body))
}
