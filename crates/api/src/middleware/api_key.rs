//! Shared API key check.
//!
//! Every `/api/tanam` route except image serving requires the client to send
//! the configured key in `X-API-Key`.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use secrecy::ExposeSecret;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Reject requests whose `X-API-Key` header does not match the configured key.
pub async fn api_key_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .map(|value| value.as_bytes())
        .unwrap_or_default();

    if !keys_match(provided, state.config().api_key.expose_secret().as_bytes()) {
        tracing::warn!(path = %request.uri().path(), "Rejected request with invalid API key");
        return AppError::Forbidden("Invalid API Key".to_string()).into_response();
    }

    next.run(request).await
}

/// Compare without returning early on the first differing byte.
fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    provided.len() == expected.len()
        && provided
            .iter()
            .zip(expected)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}
