//! Process-local [`KeyValueCache`] for runs without Redis.
//!
//! Entries carry an absolute expiry taken from the injected clock and are
//! dropped lazily on access. The map lives behind a std mutex that is never
//! held across an await point.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;

use crate::domain::ports::KeyValueCache;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// In-memory cache with per-entry expiry.
pub struct InMemoryKeyValueCache {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryKeyValueCache {
    /// Empty cache reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Number of stored entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry.
    pub fn purge_expired(&self) {
        let now = self.clock.utc();
        self.lock().retain(|_, entry| entry.expires_at > now);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn live_value(&self, key: &str) -> Option<String> {
        let now = self.clock.utc();
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }
}

#[async_trait]
impl KeyValueCache for InMemoryKeyValueCache {
    async fn get(&self, key: &str) -> Option<String> {
        self.live_value(key)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) {
        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        let expires_at = self
            .clock
            .utc()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.lock().insert(
            key.to_owned(),
            Entry {
                value: value.to_owned(),
                expires_at,
            },
        );
    }

    async fn delete(&self, key: &str) {
        self.lock().remove(key);
    }

    async fn delete_prefix(&self, prefix: &str) {
        self.lock().retain(|key, _| !key.starts_with(prefix));
    }

    async fn exists(&self, key: &str) -> bool {
        self.live_value(key).is_some()
    }

    fn is_ready(&self) -> bool {
        true
    }
}
