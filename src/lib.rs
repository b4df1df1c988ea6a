//! Tower Request Cache
//! ===================
//!
//! `tower-request-cache` puts a per-request, opt-in response cache in front
//! of a Tower HTTP service, typically an outbound client.
//!
//! Requests opt in by carrying [`CacheOptions`] in their extensions. Only
//! `GET` requests are cached; every other method passes straight through.
//! An entry is keyed by the options' explicit key or, failing that, by the
//! request URI, and it lives until it is deleted, until a disabled request
//! for the same key purges it, or until its ttl has passed and a lookup
//! notices.
//!
//! ```no_run
//! use std::time::Duration;
//! use tower::{Layer, ServiceExt};
//! use tower_request_cache::prelude::*;
//!
//! # async fn run() -> Result<(), tower_request_cache::layer::BoxError> {
//! let layer = CacheLayer::new_in_memory();
//!
//! let client = layer.layer(tower::service_fn(|_req: http::Request<()>| async {
//!     Ok::<_, std::convert::Infallible>(http::Response::new(http_body_util::Full::from("ok")))
//! }));
//!
//! let options = CacheOptions::enabled().with_ttl(Duration::from_secs(30))?;
//! let request = http::Request::get("/api/users").cache(options).body(())?;
//!
//! let response = client.oneshot(request).await?;
//! # drop(response);
//! assert!(layer.cache().exists("/api/users"));
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod cache;
pub mod error;
pub mod layer;
pub mod logging;
pub mod options;
pub mod prelude;

pub use cache::ResponseCache;
pub use error::CacheError;
pub use layer::{CacheBody, CacheLayer, CacheLayerBuilder, CacheService, KeyExtractor};
pub use logging::{CacheEvent, CacheEventType, CacheLoggingConfig};
pub use options::{CacheOptions, RequestBuilderCacheExt, RequestCacheExt};
