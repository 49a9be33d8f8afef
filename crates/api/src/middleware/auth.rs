//! Cookie-based JWT authentication extractor.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::CookieJar;

use crate::error::{AppError, set_sentry_user};
use crate::services::tokens::{Claims, TokenKind};
use crate::state::AppState;

/// Cookie holding the short-lived access token.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Cookie holding the refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Extractor that requires a valid access token cookie.
///
/// Missing, malformed, or expired tokens are rejected with 401.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(claims): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", claims.email)
/// }
/// ```
pub struct RequireAuth(pub Claims);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(ACCESS_TOKEN_COOKIE)
            .ok_or_else(|| AppError::Unauthorized("missing access token".to_string()))?;

        let claims = state.tokens().verify(token.value(), TokenKind::Access)?;
        set_sentry_user(&claims.email, Some(&claims.email));

        Ok(Self(claims))
    }
}
