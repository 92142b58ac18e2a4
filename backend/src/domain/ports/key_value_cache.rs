//! Driven port for the shared key-value response cache.
//!
//! The cache is an optimisation, never a source of truth: adapters absorb
//! backend errors (logging them) and report a miss or a no-op instead, so
//! callers keep serving from upstream when the cache is unreachable.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

/// String-keyed cache with per-entry TTL and prefix invalidation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    /// Return the stored value, or `None` on miss, expiry, or backend trouble.
    async fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key` for roughly `ttl`. Adapters may extend the
    /// TTL with jitter but never shorten it.
    async fn set(&self, key: &str, value: &str, ttl: Duration);

    /// Remove one key.
    async fn delete(&self, key: &str);

    /// Remove every key starting with `prefix`.
    async fn delete_prefix(&self, prefix: &str);

    /// Whether a live entry exists for `key`.
    async fn exists(&self, key: &str) -> bool;

    /// Whether the backend is currently accepting operations.
    fn is_ready(&self) -> bool;
}

/// Fixture cache that never stores anything.
///
/// Every read misses, so callers behave as if caching were disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpKeyValueCache;

#[async_trait]
impl KeyValueCache for NoOpKeyValueCache {
    async fn get(&self, _key: &str) -> Option<String> {
        None
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) {}

    async fn delete(&self, _key: &str) {}

    async fn delete_prefix(&self, _prefix: &str) {}

    async fn exists(&self, _key: &str) -> bool {
        false
    }

    fn is_ready(&self) -> bool {
        false
    }
}

/// Fixture cache that records writes without expiring them.
///
/// Useful in tests that assert on the exact keys and TTLs written.
#[derive(Debug, Default)]
pub struct RecordingKeyValueCache {
    entries: Mutex<HashMap<String, (String, Duration)>>,
}

impl RecordingKeyValueCache {
    /// TTL recorded for `key`, if it was written.
    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        self.lock().get(key).map(|(_, ttl)| *ttl)
    }

    /// Stored keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, (String, Duration)>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl KeyValueCache for RecordingKeyValueCache {
    async fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).map(|(value, _)| value.clone())
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) {
        self.lock()
            .insert(key.to_owned(), (value.to_owned(), ttl));
    }

    async fn delete(&self, key: &str) {
        self.lock().remove(key);
    }

    async fn delete_prefix(&self, prefix: &str) {
        self.lock().retain(|key, _| !key.starts_with(prefix));
    }

    async fn exists(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    fn is_ready(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    //! Fixture behaviour.
    use super::*;

    #[tokio::test]
    async fn no_op_cache_always_misses() {
        let cache = NoOpKeyValueCache;
        cache.set("k", "v", Duration::from_secs(1)).await;
        assert_eq!(cache.get("k").await, None);
        assert!(!cache.exists("k").await);
        assert!(!cache.is_ready());
    }

    #[tokio::test]
    async fn recording_cache_tracks_ttls_and_prefix_deletes() {
        let cache = RecordingKeyValueCache::default();
        cache.set("ns:1:laps", "[]", Duration::from_secs(300)).await;
        cache.set("ns:1:pit", "[]", Duration::from_secs(60)).await;
        cache.set("ns:2:laps", "[]", Duration::from_secs(300)).await;

        assert_eq!(cache.ttl_of("ns:1:pit"), Some(Duration::from_secs(60)));
        cache.delete_prefix("ns:1:").await;
        assert_eq!(cache.keys(), vec!["ns:2:laps".to_owned()]);
        assert!(cache.exists("ns:2:laps").await);
    }
}
