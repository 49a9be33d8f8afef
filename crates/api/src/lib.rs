//! Tanam marketplace API library.
//!
//! This crate provides the API as a library, allowing the router to be
//! exercised in tests and the throttle to be driven from the CLI.
//!
//! # Overview
//!
//! - Account registration with emailed verification codes
//! - Login guarded by a per-email attempt throttle in the key-value store
//! - JWT access/refresh tokens carried in cookies
//! - Product listing served cache-aside from the key-value store
//! - Product creation with image upload, and cart upserts

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod kv;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, extract::DefaultBodyLimit};
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::state::AppState;

/// Largest accepted request body (product images included).
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Build the application router with its request middleware.
///
/// Sentry layers are added by the binary, outermost.
pub fn app(state: AppState) -> Router {
    routes::routes(&state)
        .layer(axum::middleware::from_fn(
            middleware::request_id_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}
