//! Login throttle commands.
//!
//! Attempt counters live in the key-value store under
//! `login_attempts:{email}`, keyed by the email as sent with surrounding
//! whitespace trimmed.
//!
//! # Environment Variables
//!
//! - `TANAM_REDIS_URL` - Redis connection string

use std::sync::Arc;

use tanam_api::kv::{self, KeyValueStore};
use tanam_api::services::throttle::{LoginThrottle, ThrottleError};

use super::{CommandError, redis_url};

async fn connect() -> Result<Arc<dyn KeyValueStore>, CommandError> {
    Ok(kv::connect(&redis_url()?).await?)
}

/// Log the attempt record for `email`.
///
/// # Errors
///
/// Returns `CommandError` if the store cannot be reached.
pub async fn show(email: &str) -> Result<(), CommandError> {
    let throttle = LoginThrottle::new(connect().await?);

    match throttle.attempts(email).await {
        Ok(Some(record)) => {
            let locked = record.count >= throttle.max_attempts();
            tracing::info!(
                "{}: {} attempt(s), last at {}{}",
                email,
                record.count,
                record.last_attempt.to_rfc3339(),
                if locked { " (locked)" } else { "" }
            );
        }
        Ok(None) => tracing::info!("{}: no recorded attempts", email),
        Err(ThrottleError::Store(e)) => return Err(e.into()),
        Err(e) => tracing::warn!("{}: {}", email, e),
    }

    Ok(())
}

/// Clear the attempt record for `email`.
///
/// # Errors
///
/// Returns `CommandError` if the store cannot be reached or the delete fails.
pub async fn reset(email: &str) -> Result<(), CommandError> {
    let store = connect().await?;
    let key = LoginThrottle::new(store.clone()).key(email);

    store.delete(&key).await?;
    tracing::info!("Cleared login attempts for {}", email);

    Ok(())
}
