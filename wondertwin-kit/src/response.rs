//! JSON response helpers shared by admin and business handlers.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Writes `value` as a JSON body with the given status.
///
/// A `None` value produces a bodiless response.
pub fn json<T: Serialize>(status: StatusCode, value: Option<&T>) -> Response {
    match value {
        None => status.into_response(),
        Some(v) => match serde_json::to_vec(v) {
            Ok(bytes) => (
                status,
                [(header::CONTENT_TYPE, "application/json")],
                bytes,
            )
                .into_response(),
            Err(e) => error(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("response encoding failed: {e}"),
            ),
        },
    }
}

/// Generic error body: `{"error":{"message","type","code"}}`.
///
/// `type` is the textual form of the status; `code` the numeric one.
pub fn error(status: StatusCode, message: &str) -> Response {
    let body = serde_json::json!({
        "error": {
            "message": message,
            "type": status.canonical_reason().unwrap_or("error"),
            "code": status.as_u16(),
        }
    });
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
        .into_response()
}

/// Vendor-flavored error body for twins whose target API shapes errors as
/// `{"error":{"type","code","message"}}` with string codes.
pub fn vendor_error(status: StatusCode, kind: &str, code: &str, message: &str) -> Response {
    let body = serde_json::json!({
        "error": {
            "type": kind,
            "code": code,
            "message": message,
        }
    });
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(resp: Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn json_sets_content_type_and_status() {
        let resp = json(StatusCode::CREATED, Some(&serde_json::json!({"id": "x"})));
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn json_none_has_no_body() {
        let resp = json::<Value>(StatusCode::NO_CONTENT, None);
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn error_shape() {
        let resp = error(StatusCode::NOT_FOUND, "no such customer");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = body_json(resp).await;
        assert_eq!(body["error"]["message"], "no such customer");
        assert_eq!(body["error"]["type"], "Not Found");
        assert_eq!(body["error"]["code"], 404);
    }

    #[tokio::test]
    async fn vendor_error_shape() {
        let resp = vendor_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_request_error",
            "balance_insufficient",
            "insufficient balance",
        );
        let body = body_json(resp).await;
        assert_eq!(body["error"]["type"], "invalid_request_error");
        assert_eq!(body["error"]["code"], "balance_insufficient");
    }
}
