//! One-time email verification codes.
//!
//! A six-digit code is stored under `email_verification:<email>` for ten
//! minutes. Issuing a new code replaces the old one.
//!
//! Guesses are counted per email under `verify_attempts:<email>` with the
//! same attempt-first accounting as logins. Once [`MAX_CODE_GUESSES`] have
//! been made inside one code lifetime, further guesses are refused until the
//! record expires or the code is used.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::kv::{KeyValueStore, KvError};
use crate::services::throttle::{LoginThrottle, ThrottleError};

/// Lifetime of an unused verification code.
pub const CODE_TTL: Duration = Duration::from_secs(10 * 60);

/// Guesses allowed per email before verification is refused.
pub const MAX_CODE_GUESSES: u32 = 5;

const KEY_PREFIX: &str = "email_verification";

const GUESS_KEY_PREFIX: &str = "verify_attempts";

/// Verification code storage.
#[derive(Clone)]
pub struct VerificationCodes {
    store: Arc<dyn KeyValueStore>,
    guesses: LoginThrottle,
}

impl VerificationCodes {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let guesses = LoginThrottle::with_limits(store.clone(), MAX_CODE_GUESSES, CODE_TTL)
            .with_prefix(GUESS_KEY_PREFIX);
        Self { store, guesses }
    }

    fn key(email: &str) -> String {
        format!("{KEY_PREFIX}:{email}")
    }

    /// Generate and store a fresh code for `email`.
    ///
    /// # Errors
    ///
    /// Returns `KvError` if the code cannot be stored.
    pub async fn issue(&self, email: &str) -> Result<String, KvError> {
        let code = rand::rng().random_range(100_000..1_000_000).to_string();
        self.store.set(&Self::key(email), &code, CODE_TTL).await?;
        Ok(code)
    }

    /// Count one guess for `email`, refusing it once the limit is reached.
    ///
    /// # Errors
    ///
    /// Returns `ThrottleError::LimitExceeded` when out of guesses, or
    /// `ThrottleError::Store` if the counter cannot be read or written.
    pub async fn record_guess(&self, email: &str) -> Result<(), ThrottleError> {
        self.guesses.record_attempt(email).await?;
        self.guesses.check_limit(email).await
    }

    /// Whether `code` is the live code for `email`.
    ///
    /// # Errors
    ///
    /// Returns `KvError` if the store cannot be read.
    pub async fn matches(&self, email: &str, code: &str) -> Result<bool, KvError> {
        let stored = self.store.get(&Self::key(email)).await?;
        Ok(stored.is_some_and(|stored| stored == code.trim()))
    }

    /// Drop the code for `email` once used, along with its guess count.
    pub async fn consume(&self, email: &str) {
        if let Err(e) = self.store.delete(&Self::key(email)).await {
            warn!(error = %e, "Failed to delete used verification code");
        }
        self.guesses.reset(email).await;
    }
}
