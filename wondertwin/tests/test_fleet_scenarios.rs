//! End-to-end tests driving the admin client and scenario engine
//! against a real twin built on `wondertwin-kit`.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use wondertwin::admin_client::AdminClient;
use wondertwin::config::manifest::Settings;
use wondertwin::config::{Manifest, TwinConfig};
use wondertwin::scenario::{load_file, run_scenario, StepStatus};
use wondertwin_kit::{StateError, Store, TwinServer, TwinState};

struct LedgerState {
    accounts: Store<Value>,
}

impl TwinState for LedgerState {
    fn snapshot(&self) -> Value {
        self.accounts.snapshot_value().unwrap_or(Value::Null)
    }

    fn load_state(&self, bytes: &[u8]) -> Result<(), StateError> {
        let entries: HashMap<String, Value> = serde_json::from_slice(bytes)?;
        self.accounts.load_snapshot(entries);
        Ok(())
    }

    fn reset(&self) {
        self.accounts.reset();
    }
}

/// Starts a ledger twin on an ephemeral port and returns its port.
async fn start_twin() -> (u16, tokio::task::JoinHandle<()>) {
    let state = Arc::new(LedgerState {
        accounts: Store::new("acct"),
    });

    let create_state = Arc::clone(&state);
    let list_state = Arc::clone(&state);
    let routes = Router::new().route(
        "/v1/accounts",
        post(move || {
            let state = Arc::clone(&create_state);
            async move {
                let id = state.accounts.next_id();
                let account = json!({"id": id, "balance": 100});
                state.accounts.set(id.clone(), account.clone());
                Json(account)
            }
        })
        .get(move || {
            let state = Arc::clone(&list_state);
            async move { Json(json!({"data": state.accounts.list()})) }
        }),
    );

    let server = TwinServer::builder("ledger").routes(routes).state(state).build();
    let app = server.router();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (port, handle)
}

fn manifest_for(port: u16, dir: PathBuf) -> Manifest {
    let mut twins = BTreeMap::new();
    twins.insert(
        "ledger".to_string(),
        TwinConfig {
            binary: Some("unused".to_string()),
            port,
            ..TwinConfig::default()
        },
    );
    Manifest {
        twins,
        settings: Settings::default(),
        dir,
    }
}

#[tokio::test]
async fn admin_client_round_trips_state() {
    let (port, handle) = start_twin().await;
    let admin = AdminClient::new(port);

    assert!(admin.health().await);

    admin
        .seed(br#"{"acct_000001": {"id": "acct_000001", "balance": 7}}"#.to_vec())
        .await
        .unwrap();
    let body = admin.get("state").await.unwrap();
    assert!(body.contains("acct_000001"));

    admin.reset().await.unwrap();
    let body = admin.get("state").await.unwrap();
    assert!(!body.contains("acct_000001"));

    handle.abort();
}

#[tokio::test]
async fn scenario_runs_against_live_twin() {
    let (port, handle) = start_twin().await;
    let dir = tempfile::tempdir().unwrap();
    let manifest = manifest_for(port, dir.path().to_path_buf());

    let scenario_path = dir.path().join("ledger.json");
    std::fs::write(
        &scenario_path,
        serde_json::to_string(&json!({
            "name": "ledger-smoke",
            "setup": { "reset": ["ledger"] },
            "steps": [
                {
                    "name": "create account",
                    "request": {
                        "method": "POST",
                        "url": "http://127.0.0.1:{{twins.ledger.port}}/v1/accounts"
                    },
                    "capture": { "account_id": "$.id" },
                    "assert": {
                        "status": 200,
                        "body": {
                            "$.id": { "regex": "^acct_\\d{6}$" },
                            "$.balance": { "gte": 100, "lte": 100 }
                        }
                    }
                },
                {
                    "name": "account appears in listing",
                    "request": {
                        "method": "GET",
                        "url": "http://127.0.0.1:{{twins.ledger.port}}/v1/accounts"
                    },
                    "assert": {
                        "status": 200,
                        "body_contains": "{{account_id}}",
                        "body": { "$.data[0].id": "acct_000001" }
                    }
                }
            ]
        }))
        .unwrap(),
    )
    .unwrap();

    let scenario = load_file(&scenario_path).unwrap();
    let report = run_scenario(&manifest, &scenario).await.unwrap();
    assert!(report.passed(), "{:?}", report.steps);

    handle.abort();
}

#[tokio::test]
async fn scenario_seed_setup_flows_into_assertions() {
    let (port, handle) = start_twin().await;
    let dir = tempfile::tempdir().unwrap();
    let manifest = manifest_for(port, dir.path().to_path_buf());

    std::fs::write(
        dir.path().join("seed.json"),
        r#"{"acct_000009": {"id": "acct_000009", "balance": 250}}"#,
    )
    .unwrap();

    let scenario_path = dir.path().join("seeded.json");
    std::fs::write(
        &scenario_path,
        serde_json::to_string(&json!({
            "name": "seeded-listing",
            "setup": {
                "reset": ["ledger"],
                "seed": { "ledger": "seed.json" }
            },
            "steps": [
                {
                    "name": "seeded account is listed",
                    "request": {
                        "method": "GET",
                        "url": "http://127.0.0.1:{{twins.ledger.port}}/v1/accounts"
                    },
                    "assert": {
                        "status": 200,
                        "body": { "$.data[0].balance": 250 }
                    }
                }
            ]
        }))
        .unwrap(),
    )
    .unwrap();

    let scenario = load_file(&scenario_path).unwrap();
    let report = run_scenario(&manifest, &scenario).await.unwrap();
    assert!(report.passed(), "{:?}", report.steps);

    handle.abort();
}

#[tokio::test]
async fn injected_fault_fails_a_scenario_step() {
    let (port, handle) = start_twin().await;
    let dir = tempfile::tempdir().unwrap();
    let manifest = manifest_for(port, dir.path().to_path_buf());

    // Register a fault through the admin plane, exactly as an operator
    // would, then watch the scenario observe it.
    let admin = AdminClient::new(port);
    admin
        .post("fault/v1/accounts", &json!({"status_code": 503, "rate": 1.0}))
        .await
        .unwrap();

    let scenario_path = dir.path().join("faulted.json");
    std::fs::write(
        &scenario_path,
        serde_json::to_string(&json!({
            "name": "fault-visible",
            "steps": [
                {
                    "name": "listing is faulted",
                    "request": {
                        "method": "GET",
                        "url": "http://127.0.0.1:{{twins.ledger.port}}/v1/accounts"
                    },
                    "assert": { "status": 200 }
                }
            ]
        }))
        .unwrap(),
    )
    .unwrap();

    let scenario = load_file(&scenario_path).unwrap();
    let report = run_scenario(&manifest, &scenario).await.unwrap();
    assert!(!report.passed());
    let StepStatus::Failed(reasons) = &report.steps[0].status else {
        panic!("expected failure, got {:?}", report.steps[0].status);
    };
    assert!(reasons[0].contains("503"), "{reasons:?}");

    handle.abort();
}
