//! Re-exports for consumers who prefer a single import.
//!
//! ```no_run
//! use tower_request_cache::prelude::*;
//! let layer = CacheLayer::builder(InMemoryBackend::new())
//!     .key_extractor(KeyExtractor::path_and_query())
//!     .build();
//! # drop(layer);
//! ```

pub use crate::backend::memory::InMemoryBackend;
pub use crate::backend::{CacheBackend, CacheEntry, StoredEntry};
pub use crate::cache::ResponseCache;
pub use crate::error::CacheError;
pub use crate::layer::{CacheBody, CacheLayer, CacheLayerBuilder, CacheService, KeyExtractor};
pub use crate::logging::{CacheEvent, CacheEventType, CacheLoggingConfig};
pub use crate::options::{CacheOptions, RequestBuilderCacheExt, RequestCacheExt};
