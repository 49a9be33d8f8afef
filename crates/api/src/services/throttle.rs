//! Login attempt throttling.
//!
//! Every login attempt is counted per email in the key-value store under
//! `login_attempts:<email>`. The record lives for a rolling ten-minute window
//! (each write refreshes the TTL) and is deleted on a successful login.
//!
//! The same limiter guards email verification codes under its own key prefix
//! (see [`LoginThrottle::with_prefix`]).
//!
//! Accounting is attempt-first: the login handler calls
//! [`LoginThrottle::record_attempt`] before [`LoginThrottle::check_limit`], so
//! a request that is about to be rejected as over the limit still counts.
//!
//! The read-modify-write on the record is not atomic. Two concurrent attempts
//! for the same email can both read `n` and both write `n + 1`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::kv::{KeyValueStore, KvError};

/// Attempts allowed inside one window before logins are refused.
pub const MAX_LOGIN_ATTEMPTS: u32 = 5;

/// Lifetime of an untouched attempt record.
pub const ATTEMPT_WINDOW: Duration = Duration::from_secs(10 * 60);

const KEY_PREFIX: &str = "login_attempts";

/// Stored attempt counter for one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginAttemptRecord {
    /// Attempts since the last reset.
    pub count: u32,
    /// Time of the most recent attempt.
    pub last_attempt: DateTime<Utc>,
}

/// Errors from the login throttle.
#[derive(Debug, Error)]
pub enum ThrottleError {
    /// The identity has used up its attempts for this window.
    #[error("maximum login attempts exceeded")]
    LimitExceeded,

    /// The key-value store failed. Logins must not proceed unthrottled.
    #[error("throttle store error: {0}")]
    Store(#[from] KvError),

    /// The record could not be serialized.
    #[error("failed to encode attempt record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Per-identity login attempt limiter.
#[derive(Clone)]
pub struct LoginThrottle {
    store: Arc<dyn KeyValueStore>,
    prefix: &'static str,
    max_attempts: u32,
    window: Duration,
}

impl LoginThrottle {
    /// Create a throttle with the default limit and window.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_limits(store, MAX_LOGIN_ATTEMPTS, ATTEMPT_WINDOW)
    }

    /// Create a throttle with a custom limit and window.
    #[must_use]
    pub fn with_limits(store: Arc<dyn KeyValueStore>, max_attempts: u32, window: Duration) -> Self {
        Self {
            store,
            prefix: KEY_PREFIX,
            max_attempts,
            window,
        }
    }

    /// Keep records under `prefix` instead of `login_attempts`.
    #[must_use]
    pub fn with_prefix(mut self, prefix: &'static str) -> Self {
        self.prefix = prefix;
        self
    }

    /// Attempts allowed within one window.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Key holding the attempt record for `identity`.
    #[must_use]
    pub fn key(&self, identity: &str) -> String {
        format!("{}:{identity}", self.prefix)
    }

    /// Count one attempt for `identity` and refresh the window.
    ///
    /// A missing or unreadable record counts as zero prior attempts.
    ///
    /// # Errors
    ///
    /// Returns `ThrottleError::Store` if the store cannot be read or written.
    #[instrument(skip(self))]
    pub async fn record_attempt(&self, identity: &str) -> Result<LoginAttemptRecord, ThrottleError> {
        let key = self.key(identity);
        let previous = self.load(&key).await?.map_or(0, |record| record.count);

        let record = LoginAttemptRecord {
            count: previous.saturating_add(1),
            last_attempt: Utc::now(),
        };

        let payload = serde_json::to_string(&record)?;
        self.store.set(&key, &payload, self.window).await?;

        debug!(prefix = self.prefix, count = record.count, "Recorded attempt");
        Ok(record)
    }

    /// Refuse `identity` if it has reached the attempt limit.
    ///
    /// A missing or unreadable record means no attempts.
    ///
    /// # Errors
    ///
    /// Returns `ThrottleError::LimitExceeded` once the limit is reached, or
    /// `ThrottleError::Store` if the store cannot be read.
    #[instrument(skip(self))]
    pub async fn check_limit(&self, identity: &str) -> Result<(), ThrottleError> {
        let count = self
            .load(&self.key(identity))
            .await?
            .map_or(0, |record| record.count);

        if count >= self.max_attempts {
            warn!(prefix = self.prefix, count, "Attempt limit exceeded");
            return Err(ThrottleError::LimitExceeded);
        }

        Ok(())
    }

    /// Clear the attempt record for `identity` after a successful login.
    ///
    /// A failed delete is logged and otherwise ignored; the stale record
    /// expires on its own.
    #[instrument(skip(self))]
    pub async fn reset(&self, identity: &str) {
        if let Err(e) = self.store.delete(&self.key(identity)).await {
            warn!(prefix = self.prefix, error = %e, "Failed to clear attempts");
        }
    }

    /// Current attempt record for `identity`, if any.
    ///
    /// # Errors
    ///
    /// Returns `ThrottleError::Store` if the store cannot be read.
    pub async fn attempts(&self, identity: &str) -> Result<Option<LoginAttemptRecord>, ThrottleError> {
        self.load(&self.key(identity)).await
    }

    async fn load(&self, key: &str) -> Result<Option<LoginAttemptRecord>, ThrottleError> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                debug!(error = %e, "Ignoring malformed attempt record");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;

    const EMAIL: &str = "buyer@tanam.software";

    fn throttle() -> (Arc<MemoryStore>, LoginThrottle) {
        let store = Arc::new(MemoryStore::new());
        let throttle = LoginThrottle::new(store.clone());
        (store, throttle)
    }

    #[tokio::test]
    async fn test_four_attempts_are_allowed() {
        let (_, throttle) = throttle();
        for _ in 0..4 {
            throttle.record_attempt(EMAIL).await.unwrap();
        }
        assert!(throttle.check_limit(EMAIL).await.is_ok());
    }

    #[tokio::test]
    async fn test_fifth_attempt_hits_limit() {
        let (_, throttle) = throttle();
        for _ in 0..5 {
            throttle.record_attempt(EMAIL).await.unwrap();
        }
        assert!(matches!(
            throttle.check_limit(EMAIL).await,
            Err(ThrottleError::LimitExceeded)
        ));
    }

    #[tokio::test]
    async fn test_rejected_attempts_still_count() {
        let (_, throttle) = throttle();
        for _ in 0..7 {
            throttle.record_attempt(EMAIL).await.unwrap();
        }
        let record = throttle.attempts(EMAIL).await.unwrap().unwrap();
        assert_eq!(record.count, 7);
    }

    #[tokio::test]
    async fn test_reset_clears_limit() {
        let (_, throttle) = throttle();
        for _ in 0..5 {
            throttle.record_attempt(EMAIL).await.unwrap();
        }
        throttle.reset(EMAIL).await;
        assert!(throttle.check_limit(EMAIL).await.is_ok());
        assert!(throttle.attempts(EMAIL).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_identities_are_independent() {
        let (_, throttle) = throttle();
        for _ in 0..5 {
            throttle.record_attempt(EMAIL).await.unwrap();
        }
        assert!(throttle.check_limit("seller@tanam.software").await.is_ok());
    }

    #[tokio::test]
    async fn test_malformed_record_counts_as_fresh() {
        let (store, throttle) = throttle();
        store
            .set(&throttle.key(EMAIL), "{not json", ATTEMPT_WINDOW)
            .await
            .unwrap();

        assert!(throttle.check_limit(EMAIL).await.is_ok());
        let record = throttle.record_attempt(EMAIL).await.unwrap();
        assert_eq!(record.count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_expires_after_window() {
        let (_, throttle) = throttle();
        for _ in 0..5 {
            throttle.record_attempt(EMAIL).await.unwrap();
        }

        tokio::time::advance(ATTEMPT_WINDOW + Duration::from_secs(1)).await;

        assert!(throttle.check_limit(EMAIL).await.is_ok());
        let record = throttle.record_attempt(EMAIL).await.unwrap();
        assert_eq!(record.count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_attempt_extends_window() {
        let (_, throttle) = throttle();
        for _ in 0..5 {
            throttle.record_attempt(EMAIL).await.unwrap();
            tokio::time::advance(Duration::from_secs(4 * 60)).await;
        }
        assert!(throttle.check_limit(EMAIL).await.is_err());
    }

    #[test]
    fn test_key_format() {
        let (_, throttle) = throttle();
        assert_eq!(throttle.key("a@b.c"), "login_attempts:a@b.c");
        assert_eq!(
            throttle.with_prefix("verify_attempts").key("a@b.c"),
            "verify_attempts:a@b.c"
        );
    }

    #[tokio::test]
    async fn test_prefixes_count_separately() {
        let (store, login) = throttle();
        let verify = LoginThrottle::new(store).with_prefix("verify_attempts");
        for _ in 0..5 {
            verify.record_attempt(EMAIL).await.unwrap();
        }

        assert!(verify.check_limit(EMAIL).await.is_err());
        assert!(login.check_limit(EMAIL).await.is_ok());
    }
}
