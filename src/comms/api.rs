//! Axum handlers for the invocation API.
//!
//! Each handler receives [`AxumState`] via [`axum::extract::State`]. The
//! invocation handler never rejects a request: a body that is not a JSON
//! object is treated as an empty request and the agents answer with defaults.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::AxumState;
use crate::agents::{InvocationContext, Request};

/// Transport-level session id header.
pub const SESSION_HEADER: &str = "x-session-id";

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Build a JSON error response body.
fn json_error(code: &str, msg: impl std::fmt::Display) -> Json<Value> {
    Json(json!({ "error": code, "message": format!("{msg}") }))
}

/// Lenient body decoding: anything but a JSON object becomes `{}`.
fn parse_request(channel_id: &str, body: &[u8]) -> Request {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Request::new();
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            warn!(%channel_id, kind = json_kind(&other), "invocation body is not an object; using defaults");
            Request::new()
        }
        Err(e) => {
            warn!(%channel_id, "invocation body is not valid JSON; using defaults: {e}");
            Request::new()
        }
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// POST /invocations
pub(super) async fn invocations(
    State(state): State<AxumState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let session_id = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let ctx = InvocationContext::new(session_id);
    let request = parse_request(&state.channel_id, &body);

    debug!(
        channel_id = %state.channel_id,
        request_id = %ctx.request_id,
        fields = ?request.keys().collect::<Vec<_>>(),
        "invocation received"
    );

    let response = state.agents.invoke(request, ctx).await;
    (StatusCode::OK, Json(response.into_value())).into_response()
}

/// GET /ping
pub(super) async fn ping() -> Json<Value> {
    Json(json!({ "status": "Healthy" }))
}

/// Anything else.
pub(super) async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, json_error("not_found", "no such route")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_body_is_kept() {
        let r = parse_request("t", br#"{"prompt": "hi"}"#);
        assert_eq!(r.get("prompt"), Some(&json!("hi")));
    }

    #[test]
    fn other_bodies_become_empty() {
        assert!(parse_request("t", b"").is_empty());
        assert!(parse_request("t", b"  \n").is_empty());
        assert!(parse_request("t", b"[1, 2]").is_empty());
        assert!(parse_request("t", b"\"text\"").is_empty());
        assert!(parse_request("t", b"{not json").is_empty());
    }
}
