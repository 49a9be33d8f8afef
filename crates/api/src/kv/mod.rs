//! Key-value store used for login throttling, verification codes, and the
//! product listing cache.
//!
//! The store is shared, externally owned, and mutable. Components receive it
//! as an `Arc<dyn KeyValueStore>` at construction time; nothing in the crate
//! reaches for a global client.
//!
//! # Backends
//!
//! - [`RedisStore`] - Redis via a reconnecting `ConnectionManager`
//! - [`MemoryStore`] - in-process map with per-key TTL (tests, local dev)
//!
//! Select a backend with [`connect`]: a `memory://` URL yields the in-process
//! store, anything else is handed to the Redis client.

mod memory;
mod redis_store;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

/// URL scheme that selects the in-process store.
pub const MEMORY_URL: &str = "memory://";

/// Errors talking to the key-value store.
///
/// A missing key is never an error: `get` returns `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum KvError {
    /// Redis command or connection failure.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Backend-neutral failure, for stores that are not Redis (including
    /// test doubles that simulate an outage).
    #[error("key-value store unavailable: {0}")]
    Unavailable(String),
}

/// Minimal string key-value store with per-key expiry.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch a value. `Ok(None)` means the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Store a value, replacing any previous value and its TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError>;

    /// Remove a key. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), KvError>;
}

/// Open the store named by `url`.
///
/// # Errors
///
/// Returns `KvError::Redis` if the Redis URL is invalid or the initial
/// connection fails.
pub async fn connect(url: &str) -> Result<Arc<dyn KeyValueStore>, KvError> {
    if url == MEMORY_URL {
        tracing::warn!("Using in-process key-value store; state is lost on restart");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let store = RedisStore::connect(url).await?;
    tracing::info!("Connected to Redis");
    Ok(Arc::new(store))
}
