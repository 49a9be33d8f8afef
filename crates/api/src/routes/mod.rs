//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                           - Liveness check
//! GET  /health/ready                     - Readiness check (database + store)
//!
//! # Auth (API key required)
//! POST /api/tanam/register               - Create account, send verification code
//! POST /api/tanam/verify                 - Confirm email with code
//! POST /api/tanam/login                  - Log in (throttled), set token cookies
//! POST /api/tanam/refresh                - New access token from refresh cookie
//! POST /api/tanam/forgotpassword         - Send password reset link
//!
//! # Products (API key required)
//! POST /api/tanam/insertproduct          - Create listing with image (auth)
//! POST /api/tanam/getproduct             - Paginated listing (cached)
//!
//! # Cart (API key + auth required)
//! POST /api/tanam/cart                   - Add or update a cart line
//!
//! # Images (public)
//! GET  /api/tanam/loadimage/uploads/{file}
//! ```

pub mod auth;
pub mod cart;
pub mod products;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::middleware::api_key_middleware;
use crate::services::uploads::IMAGE_ROUTE;
use crate::state::AppState;

/// Prefix shared by every API route.
pub const API_PREFIX: &str = "/api/tanam";

/// Key read by the readiness check.
const READINESS_KEY: &str = "health:ready";

/// Create the API key protected routes.
pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // Auth
        .route("/register", post(auth::register))
        .route("/verify", post(auth::verify))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/forgotpassword", post(auth::forgot_password))
        // Products
        .route("/insertproduct", post(products::insert_product))
        .route("/getproduct", post(products::get_product))
        // Cart
        .route("/cart", post(cart::upsert))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ))
}

/// Create all routes for the API.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest(API_PREFIX, api_routes(state))
        .nest_service(IMAGE_ROUTE, ServeDir::new(&state.config().upload_dir))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database and key-value store connectivity.
/// Returns 503 Service Unavailable if either is not reachable.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if let Err(e) = sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        tracing::warn!(error = %e, "Readiness: database unreachable");
        return StatusCode::SERVICE_UNAVAILABLE;
    }

    if let Err(e) = state.store().get(READINESS_KEY).await {
        tracing::warn!(error = %e, "Readiness: key-value store unreachable");
        return StatusCode::SERVICE_UNAVAILABLE;
    }

    StatusCode::OK
}
