use dashmap::DashMap;
use std::sync::Arc;
use tokio::time::Instant;

use super::{CacheBackend, StoredEntry};

/// An in-memory [`CacheBackend`] implementation backed by [`DashMap`].
///
/// The backend is cheap to clone and shares a single underlying map. It is
/// unbounded: entries leave only when the cache deletes them.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    entries: Arc<DashMap<String, StoredEntry>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheBackend for InMemoryBackend {
    fn get(&self, key: &str) -> Option<StoredEntry> {
        self.entries.get(key).map(|stored| stored.value().clone())
    }

    fn set(&self, key: String, stored: StoredEntry) {
        self.entries.insert(key, stored);
    }

    fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    fn remove_expired(&self, key: &str, now: Instant) -> bool {
        self.entries
            .remove_if(key, |_, stored| stored.is_expired_at(now))
            .is_some()
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
