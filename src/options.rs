//! Per-request cache options.
//!
//! Callers opt a request into caching by attaching a [`CacheOptions`] value
//! to the request extensions. Requests without one are handled with the
//! layer's default options, which leave caching disabled.
//!
//! ```
//! use std::time::Duration;
//! use tower_request_cache::options::{CacheOptions, RequestBuilderCacheExt};
//!
//! let options = CacheOptions::enabled()
//!     .with_key("users")
//!     .with_ttl(Duration::from_secs(30))
//!     .expect("positive ttl");
//!
//! let request = http::Request::get("/api/users")
//!     .cache(options)
//!     .body(())
//!     .unwrap();
//! # drop(request);
//! ```

use std::time::Duration;

use http::request::Builder;
use http::Request;
use serde::Deserialize;

use crate::error::CacheError;

/// Caching instructions carried by a single request.
///
/// `enabled` governs both halves of the cache: a disabled request never
/// receives a cached response and never populates the cache. A disabled
/// lookup also purges whatever entry currently lives under its key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawCacheOptions")]
pub struct CacheOptions {
    enabled: bool,
    key: Option<String>,
    ttl: Option<Duration>,
}

impl CacheOptions {
    /// Options that disable caching. Same as [`CacheOptions::default`].
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Options that enable caching with no key override and no expiry.
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Overrides the cache key. Without an override the request's target
    /// identifier (its URI by default) is used.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Sets the entry lifetime, measured from the moment it is stored.
    ///
    /// A zero ttl is rejected; omit the ttl for entries that never expire.
    /// A ttl too large to add to the current instant also never expires.
    pub fn with_ttl(mut self, ttl: Duration) -> Result<Self, CacheError> {
        if ttl.is_zero() {
            return Err(CacheError::InvalidTtl { millis: 0 });
        }
        self.ttl = Some(ttl);
        Ok(self)
    }

    /// Sets the ttl from a signed millisecond count, rejecting values `<= 0`.
    pub fn with_ttl_millis(self, millis: i64) -> Result<Self, CacheError> {
        if millis <= 0 {
            return Err(CacheError::InvalidTtl { millis });
        }
        self.with_ttl(Duration::from_millis(millis.unsigned_abs()))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }
}

/// Wire shape accepted by the `Deserialize` impl.
#[derive(Deserialize)]
struct RawCacheOptions {
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    ttl_ms: Option<i64>,
}

impl TryFrom<RawCacheOptions> for CacheOptions {
    type Error = CacheError;

    fn try_from(raw: RawCacheOptions) -> Result<Self, Self::Error> {
        let mut options = CacheOptions {
            enabled: raw.enabled,
            key: raw.key,
            ttl: None,
        };
        if let Some(millis) = raw.ttl_ms {
            options = options.with_ttl_millis(millis)?;
        }
        Ok(options)
    }
}

/// Attaches and reads [`CacheOptions`] on an [`http::Request`].
pub trait RequestCacheExt {
    /// Returns the request with `options` stored in its extensions,
    /// replacing any options attached earlier.
    fn with_cache(self, options: CacheOptions) -> Self;

    /// Options attached to the request, if any.
    fn cache_options(&self) -> Option<&CacheOptions>;
}

impl<B> RequestCacheExt for Request<B> {
    fn with_cache(mut self, options: CacheOptions) -> Self {
        self.extensions_mut().insert(options);
        self
    }

    fn cache_options(&self) -> Option<&CacheOptions> {
        self.extensions().get::<CacheOptions>()
    }
}

/// Attaches [`CacheOptions`] while building a request.
pub trait RequestBuilderCacheExt {
    fn cache(self, options: CacheOptions) -> Self;
}

impl RequestBuilderCacheExt for Builder {
    fn cache(self, options: CacheOptions) -> Self {
        self.extension(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_disabled() {
        let options = CacheOptions::default();
        assert!(!options.is_enabled());
        assert_eq!(options.key(), None);
        assert_eq!(options.ttl(), None);
        assert_eq!(options, CacheOptions::disabled());
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let err = CacheOptions::enabled()
            .with_ttl(Duration::ZERO)
            .expect_err("zero ttl rejected");
        assert_eq!(err, CacheError::InvalidTtl { millis: 0 });
    }

    #[test]
    fn negative_ttl_millis_is_rejected() {
        let err = CacheOptions::enabled()
            .with_ttl_millis(-5)
            .expect_err("negative ttl rejected");
        assert_eq!(err, CacheError::InvalidTtl { millis: -5 });
    }

    #[test]
    fn ttl_millis_converts_to_duration() {
        let options = CacheOptions::enabled()
            .with_ttl_millis(1_500)
            .expect("positive ttl");
        assert_eq!(options.ttl(), Some(Duration::from_millis(1_500)));
    }

    #[test]
    fn deserializes_from_config_shape() {
        let options: CacheOptions =
            serde_json::from_str(r#"{"enabled": true, "key": "users", "ttl_ms": 250}"#)
                .expect("valid options");
        assert!(options.is_enabled());
        assert_eq!(options.key(), Some("users"));
        assert_eq!(options.ttl(), Some(Duration::from_millis(250)));

        let empty: CacheOptions = serde_json::from_str("{}").expect("empty object");
        assert_eq!(empty, CacheOptions::disabled());
    }

    #[test]
    fn deserialization_rejects_non_positive_ttl() {
        let result = serde_json::from_str::<CacheOptions>(r#"{"enabled": true, "ttl_ms": 0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn request_extension_round_trip() {
        let request = Request::new(()).with_cache(CacheOptions::enabled().with_key("k"));
        assert_eq!(
            request.cache_options().and_then(CacheOptions::key),
            Some("k")
        );

        let built = Request::get("/fake")
            .cache(CacheOptions::enabled())
            .body(())
            .expect("valid request");
        assert!(built.cache_options().is_some_and(CacheOptions::is_enabled));
    }

    #[test]
    fn later_options_replace_earlier_ones() {
        let request = Request::new(())
            .with_cache(CacheOptions::enabled())
            .with_cache(CacheOptions::disabled());
        assert_eq!(request.cache_options(), Some(&CacheOptions::disabled()));
    }
}
