//! Uniform request pipeline.
//!
//! Every twin composes the same middleware chain: request-id attachment,
//! real-IP rewrite, permissive CORS, request logging, optional global
//! latency jitter, optional global random failure, and (on business routes
//! only) fault injection and the idempotency cache. Admin routes skip the
//! last two so the control plane stays reachable while faults are armed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use rand::Rng as _;
use tokio::time::Instant;

use crate::faults::FaultRegistry;
use crate::idempotency::IdempotencyCache;
use crate::reqlog::{RequestEntry, RequestLog};
use crate::response;

/// Header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Header marking an idempotent replay.
pub const IDEMPOTENT_REPLAY_HEADER: &str = "idempotent-replayed";

/// Largest business response body the idempotency cache will buffer.
const MAX_CACHED_BODY: usize = 10 * 1024 * 1024;

/// Tunables for the global pipeline layers.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Base injected latency; each request sleeps this times uniform(0.8, 1.2).
    pub latency: Option<Duration>,
    /// Probability in [0.0, 1.0] that a request fails with a synthetic 500.
    pub fail_rate: f64,
    /// Capture request headers into the log ring.
    pub verbose: bool,
}

/// State for the request-log middleware.
#[derive(Debug)]
pub struct LogLayer {
    /// Destination ring.
    pub log: Arc<RequestLog>,
    /// Capture headers when set.
    pub verbose: bool,
}

/// State for the latency/random-failure middleware.
#[derive(Debug)]
pub struct ChaosLayer {
    /// Base injected latency.
    pub latency: Option<Duration>,
    /// Synthetic failure probability.
    pub fail_rate: f64,
}

/// Attaches an `X-Request-Id` header (uuid v4) when the client sent none,
/// and mirrors it onto the response.
pub async fn attach_request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), str::to_string);
    if let Ok(value) = HeaderValue::from_str(&id) {
        req.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
        let mut resp = next.run(req).await;
        resp.headers_mut().insert(REQUEST_ID_HEADER, value);
        resp
    } else {
        next.run(req).await
    }
}

/// Rewrites the observed peer address from `X-Forwarded-For` / `X-Real-IP`
/// into request extensions for handlers that care.
pub async fn real_ip(mut req: Request, next: Next) -> Response {
    let ip = req
        .headers()
        .get("x-forwarded-for")
        .or_else(|| req.headers().get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string());
    if let Some(ip) = ip {
        req.extensions_mut().insert(RealIp(ip));
    }
    next.run(req).await
}

/// Client address as rewritten by the real-IP middleware.
#[derive(Debug, Clone)]
pub struct RealIp(pub String);

/// Permissive CORS. `OPTIONS` short-circuits to 204 without invoking the
/// inner handler.
pub async fn cors(req: Request, next: Next) -> Response {
    if req.method() == Method::OPTIONS {
        let mut resp = StatusCode::NO_CONTENT.into_response();
        apply_cors_headers(&mut resp);
        return resp;
    }
    let mut resp = next.run(req).await;
    apply_cors_headers(&mut resp);
    resp
}

fn apply_cors_headers(resp: &mut Response) {
    let headers = resp.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, PATCH, DELETE, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("*"),
    );
}

/// Appends a log entry for every request. Handlers that never set a
/// status still log 200 because axum responses always carry one.
pub async fn request_log(
    State(layer): State<Arc<LogLayer>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let headers = if layer.verbose {
        let mut map = HashMap::new();
        for (name, value) in req.headers() {
            if let Ok(v) = value.to_str() {
                map.insert(name.to_string(), v.to_string());
            }
        }
        Some(map)
    } else {
        None
    };

    let start = Instant::now();
    let resp = next.run(req).await;

    layer.log.append(RequestEntry {
        timestamp: Utc::now(),
        method,
        path,
        status: resp.status().as_u16(),
        duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        request_id,
        headers,
    });
    resp
}

/// Global latency jitter and random-failure layer.
///
/// Sleeps for `latency * uniform(0.8, 1.2)` when latency is configured,
/// then rolls uniform(0, 1); strictly below `fail_rate` returns a synthetic
/// 500 without invoking the inner handler.
pub async fn chaos(State(layer): State<Arc<ChaosLayer>>, req: Request, next: Next) -> Response {
    if let Some(latency) = layer.latency {
        let factor: f64 = rand::rng().random_range(0.8..1.2);
        tokio::time::sleep(latency.mul_f64(factor)).await;
    }
    if layer.fail_rate > 0.0 && rand::random::<f64>() < layer.fail_rate {
        return response::error(StatusCode::INTERNAL_SERVER_ERROR, "injected random failure");
    }
    next.run(req).await
}

/// Per-route fault injection, mounted on business route groups only.
pub async fn fault_layer(
    State(faults): State<Arc<FaultRegistry>>,
    req: Request,
    next: Next,
) -> Response {
    if let Some(fault) = faults.check(req.uri().path()) {
        if let Some(delay) = fault.delay() {
            tokio::time::sleep(delay).await;
        }
        let status =
            StatusCode::from_u16(fault.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            fault.body_or_default(),
        )
            .into_response();
    }
    next.run(req).await
}

/// Idempotency cache layer for business POSTs.
///
/// Replays a cached response when the `Idempotency-Key` header matches a
/// stored entry; otherwise buffers the handler's response and stores it.
pub async fn idempotency(
    State(cache): State<Arc<IdempotencyCache>>,
    req: Request,
    next: Next,
) -> Response {
    let key = req
        .headers()
        .get("idempotency-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let Some(key) = key.filter(|_| req.method() == Method::POST) else {
        return next.run(req).await;
    };

    if let Some(cached) = cache.get(&key) {
        let status = StatusCode::from_u16(cached.status).unwrap_or(StatusCode::OK);
        return (
            status,
            [
                (header::CONTENT_TYPE, "application/json"),
                (
                    header::HeaderName::from_static(IDEMPOTENT_REPLAY_HEADER),
                    "true",
                ),
            ],
            cached.body,
        )
            .into_response();
    }

    let resp = next.run(req).await;
    let (parts, body) = resp.into_parts();
    match axum::body::to_bytes(body, MAX_CACHED_BODY).await {
        Ok(bytes) => {
            cache.put(&key, parts.status.as_u16(), bytes.to_vec());
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(_) => response::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "response too large to cache",
        ),
    }
}
