//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tanam_core::{Email, UserId};

/// A marketplace account. Buyers and sellers share the same table.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    #[serde(rename = "user_id")]
    pub id: UserId,
    #[serde(rename = "user_name")]
    pub name: String,
    #[serde(rename = "user_email")]
    pub email: Email,
    pub email_verified: bool,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
}
