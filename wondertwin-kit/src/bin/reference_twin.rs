//! Reference twin.
//!
//! A minimal behavioral twin built on the runtime kit. It exposes a
//! `customers` collection behind the standard pipeline and admin plane,
//! which makes it the target binary for the conformance harness and the
//! template new twins start from.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::get;
use clap::Parser;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use wondertwin_kit::error::StateError;
use wondertwin_kit::pipeline::PipelineConfig;
use wondertwin_kit::{SimClock, Store, TwinServer, TwinState, response};

/// Reference behavioral twin for the WonderTwin fleet.
#[derive(Parser, Debug)]
#[command(name = "reference-twin", version)]
struct Args {
    /// Service port (admin is served on the same listener).
    #[arg(long)]
    port: u16,

    /// Capture request headers in the admin request log.
    #[arg(long)]
    verbose: bool,

    /// Snapshot file loaded into the state contract at startup.
    #[arg(long)]
    seed_file: Option<PathBuf>,
}

/// All in-memory state the reference twin keeps.
struct ReferenceState {
    customers: Store<Value>,
}

impl TwinState for ReferenceState {
    fn snapshot(&self) -> Value {
        json!({"customers": self.customers.snapshot()})
    }

    fn load_state(&self, bytes: &[u8]) -> Result<(), StateError> {
        let doc: Value = serde_json::from_slice(bytes)?;
        let map = doc
            .get("customers")
            .and_then(Value::as_object)
            .ok_or_else(|| StateError::Load("snapshot missing customers map".to_string()))?;
        let entries: HashMap<String, Value> =
            map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        self.customers.load_snapshot(entries);
        Ok(())
    }

    fn reset(&self) {
        self.customers.reset();
    }
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    cursor: String,
    #[serde(default)]
    limit: usize,
}

async fn create_customer(
    State(state): State<Arc<ReferenceState>>,
    body: axum::body::Bytes,
) -> Response {
    let mut customer: Value = match serde_json::from_slice(&body) {
        Ok(Value::Object(obj)) => Value::Object(obj),
        Ok(_) => {
            return response::vendor_error(
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "parameter_invalid",
                "customer body must be a JSON object",
            );
        }
        Err(e) => {
            return response::vendor_error(
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "parameter_invalid",
                &format!("invalid JSON: {e}"),
            );
        }
    };

    let id = customer
        .get("id")
        .and_then(Value::as_str)
        .map_or_else(|| state.customers.next_id(), str::to_string);
    customer["id"] = json!(id);
    state.customers.set(&id, customer.clone());
    response::json(StatusCode::CREATED, Some(&customer))
}

async fn list_customers(
    State(state): State<Arc<ReferenceState>>,
    Query(query): Query<ListQuery>,
) -> Response {
    let page = state.customers.paginate(&query.cursor, query.limit);
    response::json(
        StatusCode::OK,
        Some(&json!({
            "object": "list",
            "data": page.data,
            "has_more": page.has_more,
            "total_count": page.total,
            "next_cursor": page.next_cursor,
        })),
    )
}

async fn get_customer(
    State(state): State<Arc<ReferenceState>>,
    Path(id): Path<String>,
) -> Response {
    match state.customers.get(&id) {
        Some(customer) => response::json(StatusCode::OK, Some(&customer)),
        None => response::vendor_error(
            StatusCode::NOT_FOUND,
            "invalid_request_error",
            "resource_missing",
            &format!("no such customer: {id}"),
        ),
    }
}

fn business_routes(state: Arc<ReferenceState>) -> Router {
    Router::new()
        .route(
            "/v1/customers",
            get(list_customers).post(create_customer),
        )
        .route("/v1/customers/{id}", get(get_customer))
        .with_state(state)
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let filter = EnvFilter::try_from_env("WONDERTWIN_LOG_LEVEL")
        .unwrap_or_else(|_| EnvFilter::new(if args.verbose { "debug" } else { "info" }));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let state = Arc::new(ReferenceState {
        customers: Store::new("cus"),
    });

    if let Some(path) = &args.seed_file {
        match std::fs::read(path) {
            Ok(bytes) => {
                if let Err(e) = state.load_state(&bytes) {
                    error!(seed = %path.display(), "seed load failed: {e}");
                    std::process::exit(1);
                }
                info!(seed = %path.display(), "seed loaded");
            }
            Err(e) => {
                error!(seed = %path.display(), "seed read failed: {e}");
                std::process::exit(1);
            }
        }
    }

    let server = TwinServer::builder("reference-twin")
        .routes(business_routes(Arc::clone(&state)))
        .state(state)
        .clock(SimClock::new())
        .config(PipelineConfig {
            latency: None,
            fail_rate: 0.0,
            verbose: args.verbose,
        })
        .build();

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
        shutdown.cancel();
    });

    if let Err(e) = server.serve(args.port, cancel).await {
        error!("twin failed: {e}");
        std::process::exit(1);
    }
}
