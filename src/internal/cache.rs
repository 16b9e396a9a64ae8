use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use super::clock::Clock;

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// In-memory cache with a fixed TTL, shared across clones.
///
/// Used by sources to avoid re-requesting items that were fetched recently.
/// Expiry is measured against the injected [`Clock`].
pub struct Cache<K, V> {
    entries: Arc<RwLock<HashMap<K, CacheEntry<V>>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            clock,
        }
    }

    /// Returns the value if present and not yet expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().ok()?;
        let now = self.clock.now();
        match entries.get(key) {
            Some(entry) if now < entry.expires_at => Some(entry.value.clone()),
            _ => None,
        }
    }

    pub fn set(&self, key: K, value: V) {
        let expires_at = self.clock.now() + self.ttl;
        match self.entries.write() {
            Ok(mut entries) => {
                entries.insert(key, CacheEntry { value, expires_at });
            }
            Err(_) => tracing::debug!("cache.set skipped (lock poisoned)"),
        }
    }

    /// Drops every expired entry. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let Ok(mut entries) = self.entries.write() else {
            return 0;
        };
        let before = entries.len();
        let now = self.clock.now();
        entries.retain(|_, entry| now < entry.expires_at);
        let removed = before.saturating_sub(entries.len());
        tracing::debug!(removed, remaining = entries.len(), "cache.cleanup_expired");
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Clone for Cache<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            ttl: self.ttl,
            clock: Arc::clone(&self.clock),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::clock::ManualClock;

    fn cache_with_clock(ttl: Duration) -> (Cache<u64, String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        (Cache::new(ttl, clock.clone()), clock)
    }

    #[test]
    fn test_cache_set_and_get() {
        let (cache, _) = cache_with_clock(Duration::from_secs(60));
        cache.set(1, "hello".to_string());

        assert_eq!(cache.get(&1), Some("hello".to_string()));
        assert_eq!(cache.get(&2), None);
    }

    #[test]
    fn test_cache_expiration() {
        let (cache, clock) = cache_with_clock(Duration::from_millis(100));
        cache.set(1, "hello".to_string());
        assert_eq!(cache.get(&1), Some("hello".to_string()));

        clock.advance(Duration::from_millis(150));
        assert_eq!(cache.get(&1), None);
    }

    #[test]
    fn test_cleanup_expired_keeps_fresh_entries() {
        let (cache, clock) = cache_with_clock(Duration::from_millis(100));
        cache.set(1, "old".to_string());

        clock.advance(Duration::from_millis(60));
        cache.set(2, "new".to_string());
        clock.advance(Duration::from_millis(60));

        assert_eq!(cache.cleanup_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&2), Some("new".to_string()));
    }

    #[test]
    fn test_clones_share_entries() {
        let (cache, _) = cache_with_clock(Duration::from_secs(60));
        let other = cache.clone();
        other.set(7, "shared".to_string());
        assert_eq!(cache.get(&7), Some("shared".to_string()));
    }
}
