//! Trigger-token middleware.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use invoice_types::{RateCacheStore, RateProvider, SequenceStore};

use super::handlers::AppState;

pub const TRIGGER_TOKEN_HEADER: &str = "x-trigger-token";

/// Constant-time comparison; an unset expected token never matches.
fn token_matches(expected: Option<&str>, presented: Option<&str>) -> bool {
    match (expected, presented) {
        (Some(expected), Some(presented)) if !expected.is_empty() => {
            expected.as_bytes().ct_eq(presented.as_bytes()).into()
        }
        _ => false,
    }
}

/// Rejects every request except `/health` unless it carries the trigger token.
pub async fn token_middleware<C: RateCacheStore, P: RateProvider, S: SequenceStore>(
    State(state): State<Arc<AppState<C, P, S>>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let presented = request
        .headers()
        .get(TRIGGER_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());

    if state.trigger_token.is_none() {
        tracing::warn!("TRIGGER_TOKEN is not configured, rejecting protected request");
        return unauthorized_response("Trigger token not configured");
    }

    if token_matches(state.trigger_token.as_deref(), presented) {
        next.run(request).await
    } else {
        unauthorized_response("Missing or invalid x-trigger-token header")
    }
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": message,
            "code": 401
        })),
    )
        .into_response()
}
