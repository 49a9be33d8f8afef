//! In-process backend.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{KeyValueStore, KvError};

/// How often a write also drops every expired entry.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct Entry {
    value: String,
    expires_at: Instant,
}

struct Entries {
    map: HashMap<String, Entry>,
    last_sweep: Instant,
}

impl Entries {
    fn sweep_if_due(&mut self, now: Instant) {
        if now.duration_since(self.last_sweep) < SWEEP_INTERVAL {
            return;
        }
        self.map.retain(|_, entry| entry.expires_at > now);
        self.last_sweep = now;
    }
}

/// In-process store with per-key TTL.
///
/// Expiry is measured on the tokio clock, so tests running with a paused
/// runtime can step past a TTL with `tokio::time::advance`. An expired entry
/// is dropped when it is read, and writes sweep out all expired entries at
/// most once per [`SWEEP_INTERVAL`], so keys that are never read again do not
/// accumulate.
pub struct MemoryStore {
    entries: Mutex<Entries>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Entries {
                map: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    /// Number of live (unexpired) keys.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .map
            .values()
            .filter(|entry| entry.expires_at > now)
            .count()
    }

    /// Whether the store holds no live keys.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let mut entries = self.entries.lock().await;
        match entries.map.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.map.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError> {
        let now = Instant::now();
        let entry = Entry {
            value: value.to_owned(),
            expires_at: now + ttl,
        };

        let mut entries = self.entries.lock().await;
        entries.sweep_if_due(now);
        entries.map.insert(key.to_owned(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        self.entries.lock().await.map.remove(key);
        Ok(())
    }
}
