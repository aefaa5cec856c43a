//! Twin server composition.
//!
//! Wires a twin's business router into the standard pipeline and admin
//! plane and serves it on a loopback listener. Twins bind to loopback
//! only; multi-tenant hosting is out of scope.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::admin::{AdminContext, TwinState, WebhookFlusher, admin_router};
use crate::clock::SimClock;
use crate::faults::FaultRegistry;
use crate::idempotency::IdempotencyCache;
use crate::pipeline::{self, ChaosLayer, LogLayer, PipelineConfig};
use crate::reqlog::RequestLog;

/// Server-level failures.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The loopback listener could not bind.
    #[error("bind failed on port {port}: {source}")]
    Bind {
        /// Requested port.
        port: u16,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The accept loop failed.
    #[error("serve failed: {0}")]
    Serve(#[from] std::io::Error),
}

/// Builder for a composed twin server.
pub struct TwinServerBuilder {
    name: String,
    routes: Router,
    state: Option<Arc<dyn TwinState>>,
    clock: Option<SimClock>,
    flusher: Option<Arc<dyn WebhookFlusher>>,
    config: PipelineConfig,
}

impl TwinServerBuilder {
    /// Sets the twin's business routes (everything outside `/admin`).
    #[must_use]
    pub fn routes(mut self, routes: Router) -> Self {
        self.routes = routes;
        self
    }

    /// Sets the state contract.
    #[must_use]
    pub fn state(mut self, state: Arc<dyn TwinState>) -> Self {
        self.state = Some(state);
        self
    }

    /// Attaches a simulated clock.
    #[must_use]
    pub fn clock(mut self, clock: SimClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Attaches a webhook flusher.
    #[must_use]
    pub fn flusher(mut self, flusher: Arc<dyn WebhookFlusher>) -> Self {
        self.flusher = Some(flusher);
        self
    }

    /// Overrides the pipeline configuration.
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Composes the server. Panics only if no state contract was supplied,
    /// which is a programming error in the embedding twin.
    #[must_use]
    pub fn build(self) -> TwinServer {
        let state = self
            .state
            .expect("twin server requires a state contract");
        let log = Arc::new(RequestLog::default());
        let faults = Arc::new(FaultRegistry::new());
        let idempotency = Arc::new(IdempotencyCache::new());

        let ctx = Arc::new(AdminContext {
            state,
            log: Arc::clone(&log),
            faults: Arc::clone(&faults),
            idempotency: Arc::clone(&idempotency),
            clock: self.clock,
            flusher: self.flusher,
        });

        // Fault injection and idempotency wrap business routes only, so
        // the admin plane stays reachable while faults are armed.
        let business = self
            .routes
            .layer(from_fn_with_state(Arc::clone(&faults), pipeline::fault_layer))
            .layer(from_fn_with_state(
                Arc::clone(&idempotency),
                pipeline::idempotency,
            ));

        let log_layer = Arc::new(LogLayer {
            log,
            verbose: self.config.verbose,
        });
        let chaos_layer = Arc::new(ChaosLayer {
            latency: self.config.latency,
            fail_rate: self.config.fail_rate,
        });

        // Outermost-first: request id, real ip, CORS, log, latency/failure.
        let app = Router::new()
            .nest("/admin", admin_router(Arc::clone(&ctx)))
            .merge(business)
            .layer(from_fn_with_state(chaos_layer, pipeline::chaos))
            .layer(from_fn_with_state(log_layer, pipeline::request_log))
            .layer(from_fn(pipeline::cors))
            .layer(from_fn(pipeline::real_ip))
            .layer(from_fn(pipeline::attach_request_id));

        TwinServer {
            name: self.name,
            app,
            ctx,
        }
    }
}

/// A composed twin ready to serve.
pub struct TwinServer {
    name: String,
    app: Router,
    ctx: Arc<AdminContext>,
}

impl TwinServer {
    /// Starts a builder for the named twin.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> TwinServerBuilder {
        TwinServerBuilder {
            name: name.into(),
            routes: Router::new(),
            state: None,
            clock: None,
            flusher: None,
            config: PipelineConfig::default(),
        }
    }

    /// Shared admin context (used by tests and embedding binaries).
    #[must_use]
    pub fn context(&self) -> Arc<AdminContext> {
        Arc::clone(&self.ctx)
    }

    /// The composed router, for in-memory testing without a listener.
    #[must_use]
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    /// Binds loopback on `port` and serves until `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns [`ServeError::Bind`] when the listener cannot bind and
    /// [`ServeError::Serve`] when the accept loop fails.
    pub async fn serve(self, port: u16, cancel: CancellationToken) -> Result<(), ServeError> {
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServeError::Bind { port, source })?;
        let bound = listener.local_addr().map_err(ServeError::Serve)?;
        info!(twin = %self.name, %bound, "twin listening");

        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use serde_json::{Value, json};
    use tower::util::ServiceExt;

    use crate::error::StateError;
    use crate::store::Store;

    struct NullState;

    impl TwinState for NullState {
        fn snapshot(&self) -> Value {
            json!({})
        }
        fn load_state(&self, bytes: &[u8]) -> Result<(), StateError> {
            serde_json::from_slice::<Value>(bytes)?;
            Ok(())
        }
        fn reset(&self) {}
    }

    fn server() -> TwinServer {
        TwinServer::builder("test-twin")
            .routes(Router::new().route("/v1/ping", get(|| async { "pong" })))
            .state(Arc::new(NullState))
            .clock(SimClock::new())
            .build()
    }

    #[tokio::test]
    async fn admin_and_business_routes_coexist() {
        let app = server().router();

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/admin/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/v1/ping")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn faults_hit_business_but_not_admin() {
        let server = server();
        let ctx = server.context();
        let app = server.router();

        ctx.faults.set(
            "/v1/ping",
            crate::faults::Fault {
                status_code: 503,
                body: None,
                delay_ms: None,
                rate: 1.0,
            },
        );

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/v1/ping")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        // Admin stays reachable even with a fault armed on its path.
        ctx.faults.set(
            "/admin/health",
            crate::faults::Fault {
                status_code: 503,
                body: None,
                delay_ms: None,
                rate: 1.0,
            },
        );
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/admin/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn every_request_is_logged() {
        let server = server();
        let ctx = server.context();
        let app = server.router();

        app.oneshot(
            Request::builder()
                .uri("/v1/ping")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

        let entries = ctx.log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "/v1/ping");
        assert!(entries[0].request_id.is_some());
    }

    #[tokio::test]
    async fn serve_binds_and_shuts_down() {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(server().serve(0, cancel.clone()));
        // Give the listener a moment, then cancel.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        cancel.cancel();
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("server did not shut down")
            .expect("server task panicked");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn store_backed_state_resets_through_admin() {
        let items: Arc<Store<Value>> = Arc::new(Store::new("item"));

        struct S(Arc<Store<Value>>);
        impl TwinState for S {
            fn snapshot(&self) -> Value {
                json!({"items": self.0.snapshot()})
            }
            fn load_state(&self, bytes: &[u8]) -> Result<(), StateError> {
                serde_json::from_slice::<Value>(bytes)?;
                Ok(())
            }
            fn reset(&self) {
                self.0.reset();
            }
        }

        let server = TwinServer::builder("t")
            .state(Arc::new(S(Arc::clone(&items))))
            .build();
        items.set("a", json!(1));

        let resp = server
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin/reset")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(std::str::from_utf8(&body).unwrap().contains("reset"));
        assert_eq!(items.count(), 0);
    }
}
