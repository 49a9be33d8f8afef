//! Account management commands.
//!
//! # Environment Variables
//!
//! - `TANAM_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

use secrecy::ExposeSecret;
use sqlx::PgPool;
use tanam_api::db::{RepositoryError, UserRepository};
use tanam_core::Email;
use thiserror::Error;

use super::{CommandError, database_url};

/// Errors from account commands.
#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// No account has this email.
    #[error("No user with email: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Repository(RepositoryError),
}

/// Mark the account for `email` as verified, skipping the emailed code.
///
/// # Errors
///
/// Returns `UserError` if the email is invalid, no such account exists, or
/// the database cannot be reached.
pub async fn verify(email: &str) -> Result<(), UserError> {
    let email_addr = Email::parse(email).map_err(|_| UserError::InvalidEmail(email.to_owned()))?;

    let database_url = database_url()?;
    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(database_url.expose_secret())
        .await
        .map_err(CommandError::from)?;

    match UserRepository::new(&pool).mark_email_verified(&email_addr).await {
        Ok(()) => {
            tracing::info!("Verified {}", email_addr);
            Ok(())
        }
        Err(RepositoryError::NotFound) => Err(UserError::NotFound(email.to_owned())),
        Err(e) => Err(UserError::Repository(e)),
    }
}
