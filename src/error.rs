use thiserror::Error;

/// Errors raised while building cache configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache ttl must be positive, got {millis}ms")]
    InvalidTtl { millis: i64 },
}
