//! Cache decision logic shared by a [`CacheLayer`](crate::CacheLayer) and
//! the services it produces.
//!
//! Eviction is lazy: expired and disabled entries are removed only when a
//! lookup touches them. There is no background sweep, so [`ResponseCache::exists`]
//! keeps reporting an expired entry until the next lookup for its key.

use tokio::time::Instant;

#[cfg(feature = "metrics")]
use metrics::counter;

use crate::backend::{CacheBackend, CacheEntry, StoredEntry};
use crate::logging::{CacheEvent, CacheEventType, CacheLoggingConfig};
use crate::options::CacheOptions;

/// Handle to one cache store.
///
/// Cloning is cheap; clones share the same backend.
#[derive(Clone)]
pub struct ResponseCache<B> {
    backend: B,
    logging: CacheLoggingConfig,
}

impl<B> ResponseCache<B>
where
    B: CacheBackend,
{
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            logging: CacheLoggingConfig::default(),
        }
    }

    pub fn with_logging(mut self, logging: CacheLoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn logging(&self) -> &CacheLoggingConfig {
        &self.logging
    }

    /// Returns the entry stored under `key` if `options` allow it and it
    /// has not expired.
    ///
    /// A disabled lookup deletes any entry under `key`; a lookup that finds
    /// an expired entry deletes it as well.
    pub fn lookup(&self, key: &str, options: &CacheOptions) -> Option<CacheEntry> {
        if !options.is_enabled() {
            self.purge_disabled(key);
            return None;
        }

        let stored = self.backend.get(key)?;
        let now = Instant::now();
        if stored.is_expired_at(now) {
            if self.backend.remove_expired(key, now) {
                #[cfg(feature = "metrics")]
                counter!("tower_request_cache.purge_expired").increment(1);

                self.log_purge(key, "expired");
            }
            return None;
        }

        Some(stored.entry)
    }

    /// Stores `entry` under `key` when `options` enable caching.
    ///
    /// Any previous entry and expiry for `key` are replaced.
    pub fn store(&self, key: impl Into<String>, entry: CacheEntry, options: &CacheOptions) {
        if !options.is_enabled() {
            return;
        }

        let key = key.into();
        // A ttl too large for the clock behaves like no ttl.
        let expires_at = options.ttl().and_then(|ttl| Instant::now().checked_add(ttl));

        #[cfg(feature = "tracing")]
        tracing::debug!(key = %key, ttl = ?options.ttl(), "cache_store");

        #[cfg(feature = "metrics")]
        counter!("tower_request_cache.store").increment(1);

        if self.logging.enabled {
            CacheEvent::new(CacheEventType::Store, key.as_str())
                .with_status(entry.status)
                .with_size(entry.body.len())
                .with_ttl(options.ttl())
                .log(&self.logging);
        }

        self.backend.set(key, StoredEntry::new(entry, expires_at));
    }

    /// Reports whether an entry is stored under `key`, ignoring expiry and
    /// enablement.
    pub fn exists(&self, key: &str) -> bool {
        self.backend.contains(key)
    }

    /// Removes the entry under `key`. Missing keys are ignored.
    pub fn delete(&self, key: &str) {
        if self.backend.remove(key) {
            #[cfg(feature = "tracing")]
            tracing::debug!(key = %key, "cache_delete");

            if self.logging.enabled {
                CacheEvent::new(CacheEventType::Delete, key).log(&self.logging);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.backend.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backend.is_empty()
    }

    fn purge_disabled(&self, key: &str) {
        if self.backend.remove(key) {
            #[cfg(feature = "metrics")]
            counter!("tower_request_cache.purge_disabled").increment(1);

            self.log_purge(key, "disabled");
        }
    }

    fn log_purge(&self, key: &str, reason: &'static str) {
        #[cfg(feature = "tracing")]
        tracing::debug!(key = %key, reason, "cache_purge");

        if self.logging.enabled {
            CacheEvent::new(CacheEventType::Purge, key)
                .with_reason(reason)
                .log(&self.logging);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::InMemoryBackend;
    use bytes::Bytes;
    use http::{HeaderMap, StatusCode, Version};
    use std::time::Duration;

    fn cache() -> ResponseCache<InMemoryBackend> {
        ResponseCache::new(InMemoryBackend::new())
    }

    fn entry(body: &'static str) -> CacheEntry {
        CacheEntry::new(
            StatusCode::OK,
            Version::HTTP_11,
            HeaderMap::new(),
            Bytes::from_static(body.as_bytes()),
        )
    }

    fn ttl_options(millis: u64) -> CacheOptions {
        CacheOptions::enabled()
            .with_ttl(Duration::from_millis(millis))
            .expect("positive ttl")
    }

    #[test]
    fn store_then_lookup_returns_entry() {
        let cache = cache();
        cache.store("/fake", entry("ok"), &CacheOptions::enabled());

        let hit = cache
            .lookup("/fake", &CacheOptions::enabled())
            .expect("entry cached");
        assert_eq!(hit.body, Bytes::from_static(b"ok"));
        assert!(cache.exists("/fake"));
    }

    #[test]
    fn disabled_store_is_noop() {
        let cache = cache();
        cache.store("/fake", entry("ok"), &CacheOptions::disabled());
        assert!(!cache.exists("/fake"));
        assert!(cache.is_empty());
    }

    #[test]
    fn disabled_lookup_purges_existing_entry() {
        let cache = cache();
        cache.store("/fake", entry("ok"), &CacheOptions::enabled());

        assert!(cache.lookup("/fake", &CacheOptions::disabled()).is_none());
        assert!(!cache.exists("/fake"));
        assert!(cache.lookup("/fake", &CacheOptions::enabled()).is_none());
    }

    #[test]
    fn store_overwrites_value() {
        let cache = cache();
        cache.store("k", entry("first"), &CacheOptions::enabled());
        cache.store("k", entry("second"), &CacheOptions::enabled());

        let hit = cache.lookup("k", &CacheOptions::enabled()).expect("hit");
        assert_eq!(hit.body, Bytes::from_static(b"second"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn delete_is_idempotent() {
        let cache = cache();
        cache.delete("missing");
        assert!(!cache.exists("missing"));

        cache.store("k", entry("ok"), &CacheOptions::enabled());
        cache.delete("k");
        cache.delete("k");
        assert!(!cache.exists("k"));
    }

    #[test]
    fn lookup_of_missing_key_is_a_miss() {
        let cache = cache();
        assert!(cache.lookup("nothing", &CacheOptions::enabled()).is_none());
        assert!(cache.lookup("nothing", &CacheOptions::disabled()).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn entry_expires_strictly_after_ttl() {
        let cache = cache();
        let options = ttl_options(100);
        cache.store("k", entry("ok"), &options);

        tokio::time::advance(Duration::from_millis(100)).await;
        assert!(cache.lookup("k", &options).is_some(), "valid at deadline");

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(cache.exists("k"), "expiry is only enforced on lookup");
        assert!(cache.lookup("k", &options).is_none());
        assert!(!cache.exists("k"), "expired entry purged on lookup");
    }

    #[tokio::test(start_paused = true)]
    async fn restore_without_ttl_clears_previous_expiry() {
        let cache = cache();
        cache.store("k", entry("short"), &ttl_options(10));
        cache.store("k", entry("forever"), &CacheOptions::enabled());

        tokio::time::advance(Duration::from_secs(60)).await;
        let hit = cache.lookup("k", &CacheOptions::enabled()).expect("hit");
        assert_eq!(hit.body, Bytes::from_static(b"forever"));
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_measured_from_latest_store() {
        let cache = cache();
        let options = ttl_options(50);
        cache.store("k", entry("v1"), &options);

        tokio::time::advance(Duration::from_millis(40)).await;
        cache.store("k", entry("v2"), &options);

        tokio::time::advance(Duration::from_millis(40)).await;
        let hit = cache.lookup("k", &options).expect("refreshed entry");
        assert_eq!(hit.body, Bytes::from_static(b"v2"));
    }

    #[tokio::test(start_paused = true)]
    async fn unrepresentable_ttl_never_expires() {
        let cache = cache();
        let options = CacheOptions::enabled()
            .with_ttl(Duration::MAX)
            .expect("non-zero ttl");
        cache.store("k", entry("ok"), &options);

        let stored = cache.backend().get("k").expect("entry stored");
        assert!(stored.expires_at.is_none());

        tokio::time::advance(Duration::from_secs(86_400)).await;
        assert!(cache.lookup("k", &options).is_some());
    }

    #[test]
    fn clones_share_store() {
        let cache = cache();
        let clone = cache.clone();
        clone.store("k", entry("ok"), &CacheOptions::enabled());
        assert!(cache.exists("k"));
    }
}
