//! Authentication route handlers.
//!
//! Registration and login take url-encoded forms, the rest take JSON. A
//! successful login sets two cookies: `access_token` for protected routes and
//! an HTTP-only `refresh_token` that can mint new access tokens.

use axum::{
    Form, Json,
    extract::{
        State,
        rejection::{FormRejection, JsonRejection},
    },
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::error::{AppError, Result, set_sentry_user};
use crate::middleware::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use crate::models::User;
use crate::response::Envelope;
use crate::services::auth::AuthService;
use crate::services::tokens::{IssuedToken, TokenKind};
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub user_password: String,
}

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub user_password: String,
}

/// Email verification request.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub otp: String,
}

/// Forgot password request.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub user_email: String,
}

fn require_filled(fields: &[&str]) -> Result<()> {
    if fields.iter().any(|field| field.trim().is_empty()) {
        return Err(AppError::BadRequest("required field is empty".to_string()));
    }
    Ok(())
}

// =============================================================================
// Cookies
// =============================================================================

fn token_cookie(name: &'static str, issued: IssuedToken, http_only: bool) -> Cookie<'static> {
    let max_age = (issued.expires_at - chrono::Utc::now()).num_seconds().max(0);
    Cookie::build((name, issued.token))
        .path("/")
        .http_only(http_only)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age))
        .build()
}

// =============================================================================
// Handlers
// =============================================================================

/// Register a new account and send its verification code.
///
/// A failed code delivery is logged; the account still exists and the code
/// stays valid, so the client can retry verification.
#[instrument(skip(state, form))]
pub async fn register(
    State(state): State<AppState>,
    form: std::result::Result<Form<RegisterForm>, FormRejection>,
) -> Result<Envelope<()>> {
    let Form(form) = form.map_err(|e| AppError::BadRequest(e.body_text()))?;
    require_filled(&[&form.user_name, &form.user_email, &form.user_password])?;

    let auth = AuthService::new(state.pool(), state.throttle(), state.codes());
    let registration = auth
        .register(
            form.user_name.trim(),
            form.user_email.trim(),
            &form.user_password,
        )
        .await?;

    if let Err(e) = state
        .notifier()
        .send_verification_code(registration.user.email.as_str(), &registration.code)
        .await
    {
        warn!(error = %e, user_id = %registration.user.id, "Failed to deliver verification code");
    }

    Ok(Envelope::success(()))
}

/// Confirm an email address with its verification code.
#[instrument(skip(state, body))]
pub async fn verify(
    State(state): State<AppState>,
    body: std::result::Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Envelope<&'static str>> {
    let Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    require_filled(&[&body.user_email, &body.otp])?;

    let auth = AuthService::new(state.pool(), state.throttle(), state.codes());
    auth.verify_email(body.user_email.trim(), &body.otp).await?;

    Ok(Envelope::success("Email verified"))
}

/// Log in with email and password.
#[instrument(skip(state, jar, form))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    form: std::result::Result<Form<LoginForm>, FormRejection>,
) -> Result<(CookieJar, Envelope<User>)> {
    let Form(form) = form.map_err(|e| AppError::BadRequest(e.body_text()))?;
    require_filled(&[&form.user_email, &form.user_password])?;

    let auth = AuthService::new(state.pool(), state.throttle(), state.codes());
    let user = auth.login(form.user_email.trim(), &form.user_password).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    let access = state.tokens().issue_access(user.email.as_str())?;
    let refresh = state.tokens().issue_refresh(user.email.as_str())?;

    let jar = jar
        .add(token_cookie(ACCESS_TOKEN_COOKIE, access, false))
        .add(token_cookie(REFRESH_TOKEN_COOKIE, refresh, true));

    Ok((jar, Envelope::success(user)))
}

/// Exchange the refresh cookie for a new access token cookie.
#[instrument(skip(state, jar))]
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Envelope<&'static str>)> {
    let token = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_owned())
        .ok_or_else(|| AppError::Unauthorized("missing refresh token".to_string()))?;

    let claims = state.tokens().verify(&token, TokenKind::Refresh)?;

    let access = state.tokens().issue_access(&claims.email)?;
    let jar = jar.add(token_cookie(ACCESS_TOKEN_COOKIE, access, false));

    Ok((jar, Envelope::success("Token refreshed")))
}

/// Send a password reset link.
#[instrument(skip(state, body))]
pub async fn forgot_password(
    State(state): State<AppState>,
    body: std::result::Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> Result<Envelope<()>> {
    let Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    require_filled(&[&body.user_email])?;

    state
        .notifier()
        .send_password_reset(body.user_email.trim())
        .await?;

    Ok(Envelope::success(()))
}
