//! JSON response envelope.
//!
//! Every JSON body, success or failure, has the shape
//! `{"status": "success" | "failed", "data": ..., "totalPage": n}` with
//! `totalPage` present only on paginated listings.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Outcome marker in the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failed,
}

/// Response envelope.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: Status,
    pub data: T,
    #[serde(rename = "totalPage", skip_serializing_if = "Option::is_none")]
    pub total_page: Option<i64>,
}

impl<T: Serialize> Envelope<T> {
    /// Successful response carrying `data`.
    pub const fn success(data: T) -> Self {
        Self {
            status: Status::Success,
            data,
            total_page: None,
        }
    }

    /// Successful page of a listing.
    pub const fn paged(data: T, total_page: i64) -> Self {
        Self {
            status: Status::Success,
            data,
            total_page: Some(total_page),
        }
    }

    /// Failed response carrying `data`.
    pub const fn failed(data: T) -> Self {
        Self {
            status: Status::Failed,
            data,
            total_page: None,
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
