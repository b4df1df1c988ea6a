//! Storage backends for the response cache.
//!
//! The cache requires a [`CacheBackend`] implementation to hold captured
//! responses. This module ships with [`memory::InMemoryBackend`], a
//! process-local store backed by [`dashmap`]. Nothing survives a restart.
//!
//! Backends store and return entries verbatim. Expiry and enablement are
//! decided by [`ResponseCache`](crate::cache::ResponseCache) at lookup time.

pub mod memory;

use bytes::Bytes;
use http::{HeaderMap, Response, StatusCode, Version};
use http_body_util::Full;
use tokio::time::Instant;

/// Response captured by the cache.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub status: StatusCode,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CacheEntry {
    pub fn new(status: StatusCode, version: Version, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            version,
            headers,
            body,
        }
    }

    /// Captures the parts of a response whose body has already been read.
    pub fn from_parts(parts: &http::response::Parts, body: Bytes) -> Self {
        Self::new(parts.status, parts.version, parts.headers.clone(), body)
    }

    /// Converts the entry back into an `http::Response`.
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::from(self.body));
        *response.status_mut() = self.status;
        *response.version_mut() = self.version;
        *response.headers_mut() = self.headers;
        response
    }
}

/// An entry together with its optional expiry instant.
///
/// Keeping the expiry inside the entry means removing a key always removes
/// its expiry as well.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    pub entry: CacheEntry,
    pub expires_at: Option<Instant>,
}

impl StoredEntry {
    pub fn new(entry: CacheEntry, expires_at: Option<Instant>) -> Self {
        Self { entry, expires_at }
    }

    /// True when the expiry instant lies strictly before `now`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at < now)
    }
}

pub trait CacheBackend: Send + Sync + Clone + 'static {
    /// Fetches the stored entry for `key` without any validity checks.
    fn get(&self, key: &str) -> Option<StoredEntry>;

    /// Stores `stored` under `key`, replacing any previous entry.
    fn set(&self, key: String, stored: StoredEntry);

    /// Removes the entry for `key`. Returns whether an entry was present.
    fn remove(&self, key: &str) -> bool;

    /// Removes the entry for `key` only if it expired before `now`.
    ///
    /// Check and removal must be atomic so an entry refreshed by a
    /// concurrent store is left in place.
    fn remove_expired(&self, key: &str, now: Instant) -> bool;

    fn contains(&self, key: &str) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
