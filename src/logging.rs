//! Structured logging for cache decisions.
//!
//! When enabled, every cache decision emits one JSON-formatted event so the
//! cache's behavior can be audited or fed into log pipelines. Events go
//! through `tracing` at `info` level on the `tower_request_cache::events`
//! target.

use http::{Method, StatusCode, Uri};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::time::{Duration, SystemTime};

/// Configuration for structured cache event logging.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheLoggingConfig {
    /// Emit structured events
    pub enabled: bool,

    /// Hash cache keys before logging them
    pub hash_keys: bool,
}

impl Default for CacheLoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            hash_keys: true,
        }
    }
}

impl CacheLoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_hash_keys(mut self, hash: bool) -> Self {
        self.hash_keys = hash;
        self
    }
}

/// Kinds of cache decisions that can be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheEventType {
    /// Response served from the cache
    Hit,
    /// No usable entry, request forwarded
    Miss,
    /// Response captured into the cache
    Store,
    /// Request not eligible for caching
    Bypass,
    /// Entry evicted on lookup (expired or disabled)
    Purge,
    /// Entry removed explicitly
    Delete,
}

impl CacheEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheEventType::Hit => "hit",
            CacheEventType::Miss => "miss",
            CacheEventType::Store => "store",
            CacheEventType::Bypass => "bypass",
            CacheEventType::Purge => "purge",
            CacheEventType::Delete => "delete",
        }
    }
}

/// A single structured cache event.
#[derive(Debug, Clone)]
pub struct CacheEvent {
    pub timestamp: SystemTime,
    pub event_type: CacheEventType,
    pub key: String,
    pub method: Option<Method>,
    pub uri: Option<Uri>,
    pub status: Option<StatusCode>,
    pub latency_us: Option<u64>,
    pub size_bytes: Option<usize>,
    pub ttl_ms: Option<u64>,
    pub reason: Option<&'static str>,
}

impl CacheEvent {
    pub fn new(event_type: CacheEventType, key: impl Into<String>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            event_type,
            key: key.into(),
            method: None,
            uri: None,
            status: None,
            latency_us: None,
            size_bytes: None,
            ttl_ms: None,
            reason: None,
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_uri(mut self, uri: Uri) -> Self {
        self.uri = Some(uri);
        self
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency_us = Some(latency.as_micros() as u64);
        self
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size_bytes = Some(size);
        self
    }

    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl_ms = ttl.map(|ttl| ttl.as_millis() as u64);
        self
    }

    /// Short machine-readable reason, e.g. `"expired"` for a purge.
    pub fn with_reason(mut self, reason: &'static str) -> Self {
        self.reason = Some(reason);
        self
    }

    /// Renders the event as the JSON payload that [`CacheEvent::log`] emits.
    pub fn to_json(&self, config: &CacheLoggingConfig) -> serde_json::Value {
        let key = if config.hash_keys {
            hash_key(&self.key)
        } else {
            self.key.clone()
        };

        let timestamp = chrono::DateTime::<chrono::Utc>::from(self.timestamp)
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        json!({
            "timestamp": timestamp,
            "event": self.event_type.as_str(),
            "key": key,
            "method": self.method.as_ref().map(|m| m.as_str()),
            "uri": self.uri.as_ref().map(|u| u.to_string()),
            "status": self.status.as_ref().map(|s| s.as_u16()),
            "latency_us": self.latency_us,
            "size_bytes": self.size_bytes,
            "ttl_ms": self.ttl_ms,
            "reason": self.reason,
        })
    }

    /// Logs this event if `config` enables structured logging.
    pub fn log(&self, config: &CacheLoggingConfig) {
        if !config.enabled {
            return;
        }

        let payload = self.to_json(config);

        #[cfg(feature = "tracing")]
        tracing::info!(target: "tower_request_cache::events", event = %payload);

        #[cfg(not(feature = "tracing"))]
        drop(payload);
    }
}

/// Hashes a cache key using SHA-256 so it can be logged without exposing it.
pub fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_config_default() {
        let config = CacheLoggingConfig::default();
        assert!(!config.enabled);
        assert!(config.hash_keys);
    }

    #[test]
    fn logging_config_deserializes_partial_objects() {
        let config: CacheLoggingConfig =
            serde_json::from_str(r#"{"enabled": true}"#).expect("valid config");
        assert!(config.enabled);
        assert!(config.hash_keys);
    }

    #[test]
    fn hash_key_consistent() {
        let key = "/api/users/123";
        let hash1 = hash_key(key);
        let hash2 = hash_key(key);
        assert_eq!(hash1, hash2);
        assert_ne!(hash1, key);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn payload_hashes_key_when_configured() {
        let event = CacheEvent::new(CacheEventType::Store, "/secret")
            .with_method(Method::GET)
            .with_status(StatusCode::OK)
            .with_ttl(Some(Duration::from_millis(1500)))
            .with_size(2);

        let hashed = event.to_json(&CacheLoggingConfig::new().with_enabled(true));
        assert_eq!(hashed["key"], hash_key("/secret"));
        assert_eq!(hashed["event"], "store");
        assert_eq!(hashed["method"], "GET");
        assert_eq!(hashed["status"], 200);
        assert_eq!(hashed["ttl_ms"], 1500);
        assert_eq!(hashed["size_bytes"], 2);

        let plain = event.to_json(&CacheLoggingConfig::new().with_hash_keys(false));
        assert_eq!(plain["key"], "/secret");
    }

    #[test]
    fn purge_reason_is_reported() {
        let payload = CacheEvent::new(CacheEventType::Purge, "k")
            .with_reason("expired")
            .to_json(&CacheLoggingConfig::default());
        assert_eq!(payload["event"], "purge");
        assert_eq!(payload["reason"], "expired");
        assert!(payload["status"].is_null());
    }

    #[test]
    fn log_is_silent_when_disabled() {
        let event = CacheEvent::new(CacheEventType::Hit, "/test");
        event.log(&CacheLoggingConfig::default());
        event.log(&CacheLoggingConfig::new().with_enabled(true));
    }
}
