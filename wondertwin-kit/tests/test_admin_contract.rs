//! End-to-end admin-contract coverage against a composed twin server.
//!
//! Drives the same battery the conformance harness runs, but in-process
//! through the router, so regressions in the kit surface here first.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use axum::routing::get;
use serde_json::{Value, json};
use tower::util::ServiceExt;

use wondertwin_kit::error::StateError;
use wondertwin_kit::{SimClock, Store, TwinServer, TwinState};

struct FixtureState {
    rewards: Store<Value>,
}

impl TwinState for FixtureState {
    fn snapshot(&self) -> Value {
        json!({"rewards": self.rewards.snapshot()})
    }

    fn load_state(&self, bytes: &[u8]) -> Result<(), StateError> {
        let doc: Value = serde_json::from_slice(bytes)?;
        if let Some(map) = doc.get("rewards").and_then(Value::as_object) {
            let entries: HashMap<String, Value> =
                map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            self.rewards.load_snapshot(entries);
        }
        Ok(())
    }

    fn reset(&self) {
        self.rewards.reset();
    }
}

fn fixture() -> (TwinServer, Arc<FixtureState>) {
    let state = Arc::new(FixtureState {
        rewards: Store::new("rwd"),
    });
    let server = TwinServer::builder("fixture")
        .routes(Router::new().route(
            "/v2/customers/cust-003/claimed_rewards",
            get(|| async { r#"{"rewards":[]}"# }).post(|| async { r#"{"claimed":true}"# }),
        ))
        .state(Arc::clone(&state) as Arc<dyn TwinState>)
        .clock(SimClock::new())
        .build();
    (server, state)
}

async fn send(app: Router, method: &str, path: &str, body: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn health_then_reset_then_state() {
    let (server, _) = fixture();
    let app = server.router();

    let (status, body) = send(app.clone(), "GET", "/admin/health", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, _) = send(app.clone(), "POST", "/admin/reset", "").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(app, "GET", "/admin/state", "").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("rewards").is_some());
}

#[tokio::test]
async fn seeded_state_is_visible_and_deterministic() {
    let (server, state) = fixture();
    let app = server.router();

    let seed = json!({"rewards": {
        "rwd_000002": {"points": 20},
        "rwd_000001": {"points": 10}
    }});
    let (status, _) = send(app.clone(), "POST", "/admin/state", &seed.to_string()).await;
    assert_eq!(status, StatusCode::OK);

    // Restore imposes lexicographic key order.
    assert_eq!(state.rewards.keys(), vec!["rwd_000001", "rwd_000002"]);

    let (_, snapshot) = send(app, "GET", "/admin/state", "").await;
    assert_eq!(snapshot["rewards"]["rwd_000001"]["points"], 10);
}

#[tokio::test]
async fn injected_fault_round_trip_on_exact_path() {
    let (server, _) = fixture();
    let app = server.router();

    let (status, _) = send(
        app.clone(),
        "POST",
        "/admin/fault/v2/customers/cust-003/claimed_rewards",
        r#"{"status_code":503,"rate":1.0}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // POST to the exact path trips the fault.
    let (status, _) = send(
        app.clone(),
        "POST",
        "/v2/customers/cust-003/claimed_rewards",
        "{}",
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    // A different path is unaffected (404 from routing, not 503).
    let (status, _) = send(app.clone(), "GET", "/v2/customers/cust-999", "").await;
    assert_ne!(status, StatusCode::SERVICE_UNAVAILABLE);

    // Removing the fault restores the handler.
    let (status, _) = send(
        app.clone(),
        "DELETE",
        "/admin/fault/v2/customers/cust-003/claimed_rewards",
        "",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(
        app,
        "POST",
        "/v2/customers/cust-003/claimed_rewards",
        "{}",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["claimed"], true);
}

#[tokio::test]
async fn clock_advance_then_reset_zeroes_offset() {
    let (server, _) = fixture();
    let ctx = server.context();
    let app = server.router();

    let (status, body) = send(
        app.clone(),
        "POST",
        "/admin/time/advance",
        r#"{"duration":"744h"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "advanced");

    let (_, time) = send(app.clone(), "GET", "/admin/time", "").await;
    assert!(time.get("simulated").is_some());

    let (status, _) = send(app, "POST", "/admin/reset", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        ctx.clock.as_ref().unwrap().offset(),
        std::time::Duration::ZERO
    );
}

#[tokio::test]
async fn request_log_captures_business_traffic() {
    let (server, _) = fixture();
    let app = server.router();

    send(app.clone(), "GET", "/v2/customers/cust-003/claimed_rewards", "").await;
    let (status, body) = send(app, "GET", "/admin/requests", "").await;
    assert_eq!(status, StatusCode::OK);
    let paths: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["path"].as_str())
        .collect();
    assert!(paths.contains(&"/v2/customers/cust-003/claimed_rewards"));
}
