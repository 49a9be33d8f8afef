//! HTTP middleware stack for the API.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Compression (gzip when the client accepts it)
//! 5. API key check (per route group)
//!
//! Route handlers that need a logged-in user take the [`RequireAuth`]
//! extractor, which validates the `access_token` cookie.

pub mod api_key;
pub mod auth;
pub mod request_id;

pub use api_key::{API_KEY_HEADER, api_key_middleware};
pub use auth::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, RequireAuth};
pub use request_id::{RequestId, request_id_middleware};
