//! CLI subcommands.

pub mod migrate;
pub mod throttle;
pub mod user;

use secrecy::SecretString;
use thiserror::Error;

/// Errors shared by the CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection or query error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Key-value store error.
    #[error("Store error: {0}")]
    Store(#[from] tanam_api::kv::KvError),
}

/// Database URL from `TANAM_DATABASE_URL`, falling back to `DATABASE_URL`.
fn database_url() -> Result<SecretString, CommandError> {
    dotenvy::dotenv().ok();

    std::env::var("TANAM_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("TANAM_DATABASE_URL"))
}

/// Key-value store URL from `TANAM_REDIS_URL`.
///
/// Unlike the server, the CLI has no use for the in-process store: it would
/// only ever see its own empty map.
fn redis_url() -> Result<String, CommandError> {
    dotenvy::dotenv().ok();

    std::env::var("TANAM_REDIS_URL").map_err(|_| CommandError::MissingEnvVar("TANAM_REDIS_URL"))
}
