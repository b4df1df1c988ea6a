use std::error::Error as StdError;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::future::BoxFuture;
use http::{Method, Request, Response, Uri};
use http_body::Body;
use http_body_util::{BodyExt, Either, Full};
use tower::{Layer, Service};

#[cfg(feature = "metrics")]
use metrics::{counter, histogram};

use crate::backend::memory::InMemoryBackend;
use crate::backend::{CacheBackend, CacheEntry};
use crate::cache::ResponseCache;
use crate::logging::{CacheEvent, CacheEventType, CacheLoggingConfig};
use crate::options::CacheOptions;

pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Body of responses returned by [`CacheService`].
///
/// `Left` carries a buffered body (served from the cache or just stored);
/// `Right` carries the inner service's body untouched.
pub type CacheBody<B> = Either<Full<Bytes>, B>;

/// Type alias for the key extractor function
type KeyExtractorFn = Arc<dyn Fn(&Uri) -> String + Send + Sync>;

/// Strategy used to derive a request's target identifier, the cache key
/// used when the request's [`CacheOptions`] carry no explicit key.
///
/// The default, [`KeyExtractor::uri`], uses the full request URI.
#[derive(Clone)]
pub struct KeyExtractor {
    inner: KeyExtractorFn,
}

impl KeyExtractor {
    /// Uses the request URI exactly as the caller wrote it.
    pub fn uri() -> Self {
        Self {
            inner: Arc::new(|uri: &Uri| uri.to_string()),
        }
    }

    /// Uses `path + query`, ignoring scheme and authority.
    pub fn path_and_query() -> Self {
        Self {
            inner: Arc::new(|uri: &Uri| {
                let mut key = uri.path().to_owned();
                if let Some(query) = uri.query() {
                    key.push('?');
                    key.push_str(query);
                }
                key
            }),
        }
    }

    /// Uses only the path component.
    pub fn path() -> Self {
        Self {
            inner: Arc::new(|uri: &Uri| uri.path().to_owned()),
        }
    }

    /// Uses a caller-provided function.
    pub fn custom<F>(func: F) -> Self
    where
        F: Fn(&Uri) -> String + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(func),
        }
    }

    pub fn extract(&self, uri: &Uri) -> String {
        (self.inner)(uri)
    }
}

impl Default for KeyExtractor {
    fn default() -> Self {
        Self::uri()
    }
}

/// Builder for configuring [`CacheLayer`] instances.
pub struct CacheLayerBuilder<B> {
    backend: B,
    key_extractor: KeyExtractor,
    default_options: CacheOptions,
    logging: CacheLoggingConfig,
}

impl<B> CacheLayerBuilder<B>
where
    B: CacheBackend,
{
    /// Starts a builder with caching disabled by default and URI-based keys.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            key_extractor: KeyExtractor::default(),
            default_options: CacheOptions::default(),
            logging: CacheLoggingConfig::default(),
        }
    }

    /// Sets how the default cache key is derived from the request URI.
    pub fn key_extractor(mut self, extractor: KeyExtractor) -> Self {
        self.key_extractor = extractor;
        self
    }

    /// Options applied to requests that carry no [`CacheOptions`] extension.
    ///
    /// Caching stays disabled for such requests unless this is changed.
    pub fn default_options(mut self, options: CacheOptions) -> Self {
        self.default_options = options;
        self
    }

    /// Enables structured event logging for this layer's cache.
    pub fn logging(mut self, config: CacheLoggingConfig) -> Self {
        self.logging = config;
        self
    }

    /// Builds the layer together with its own empty store.
    pub fn build(self) -> CacheLayer<B> {
        CacheLayer {
            cache: ResponseCache::new(self.backend).with_logging(self.logging),
            key_extractor: self.key_extractor,
            default_options: self.default_options,
        }
    }
}

/// Tower layer that puts an opt-in response cache in front of a service.
///
/// Only `GET` requests are considered. Whether a request may be served from
/// or stored into the cache is decided by the [`CacheOptions`] found in its
/// extensions.
///
/// Each layer owns one store. Cloning the layer, or the services it
/// produces, shares that store; building a second layer creates a new one.
#[derive(Clone)]
pub struct CacheLayer<B> {
    cache: ResponseCache<B>,
    key_extractor: KeyExtractor,
    default_options: CacheOptions,
}

impl CacheLayer<InMemoryBackend> {
    /// Creates a cache layer backed by an [`InMemoryBackend`].
    pub fn new_in_memory() -> Self {
        CacheLayerBuilder::new(InMemoryBackend::new()).build()
    }
}

impl<B> CacheLayer<B>
where
    B: CacheBackend,
{
    /// Builds a cache layer over `backend` with default settings.
    pub fn new(backend: B) -> Self {
        CacheLayerBuilder::new(backend).build()
    }

    /// Returns a builder for configuring the layer.
    pub fn builder(backend: B) -> CacheLayerBuilder<B> {
        CacheLayerBuilder::new(backend)
    }

    /// Handle to the store shared by this layer and its services.
    pub fn cache(&self) -> &ResponseCache<B> {
        &self.cache
    }

    /// Replaces the strategy used to derive default cache keys.
    pub fn with_key_extractor(mut self, extractor: KeyExtractor) -> Self {
        self.key_extractor = extractor;
        self
    }

    /// Replaces the options applied to requests without a [`CacheOptions`]
    /// extension.
    pub fn with_default_options(mut self, options: CacheOptions) -> Self {
        self.default_options = options;
        self
    }
}

impl<S, B> Layer<S> for CacheLayer<B>
where
    B: CacheBackend,
{
    type Service = CacheService<S, B>;

    fn layer(&self, inner: S) -> Self::Service {
        CacheService {
            inner,
            cache: self.cache.clone(),
            key_extractor: self.key_extractor.clone(),
            default_options: self.default_options.clone(),
        }
    }
}

#[derive(Clone)]
pub struct CacheService<S, B> {
    inner: S,
    cache: ResponseCache<B>,
    key_extractor: KeyExtractor,
    default_options: CacheOptions,
}

impl<S, B> CacheService<S, B>
where
    B: CacheBackend,
{
    pub fn cache(&self) -> &ResponseCache<B> {
        &self.cache
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Resolves the options and cache key for `req`.
    fn decide<ReqBody>(&self, req: &Request<ReqBody>) -> (CacheOptions, String) {
        let options = req
            .extensions()
            .get::<CacheOptions>()
            .cloned()
            .unwrap_or_else(|| self.default_options.clone());
        let key = match options.key() {
            Some(key) => key.to_owned(),
            None => self.key_extractor.extract(req.uri()),
        };
        (options, key)
    }
}

impl<S, B, ReqBody, ResBody> Service<Request<ReqBody>> for CacheService<S, B>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError> + Send,
    ReqBody: Send + 'static,
    ResBody: Body<Data = Bytes> + Send + 'static,
    ResBody::Error: Into<BoxError> + Send,
    B: CacheBackend,
{
    type Response = Response<CacheBody<ResBody>>;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        // The clone takes over readiness tracking; the service polled ready
        // by `poll_ready` handles this request.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let cache = self.cache.clone();

        if req.method() != Method::GET {
            #[cfg(feature = "tracing")]
            tracing::debug!(method = %req.method(), uri = %req.uri(), "cache_bypass");

            #[cfg(feature = "metrics")]
            counter!("tower_request_cache.bypass").increment(1);

            if cache.logging().enabled {
                CacheEvent::new(CacheEventType::Bypass, req.uri().to_string())
                    .with_method(req.method().clone())
                    .with_uri(req.uri().clone())
                    .log(cache.logging());
            }

            return Box::pin(async move {
                let response = inner.call(req).await.map_err(Into::<BoxError>::into)?;
                Ok(response.map(CacheBody::Right))
            });
        }

        let (options, key) = self.decide(&req);
        let uri = req.uri().clone();

        Box::pin(async move {
            #[cfg(feature = "tracing")]
            tracing::debug!(uri = %uri, key = %key, enabled = options.is_enabled(), "cache_call");

            if let Some(entry) = cache.lookup(&key, &options) {
                #[cfg(feature = "metrics")]
                counter!("tower_request_cache.hit").increment(1);

                if cache.logging().enabled {
                    CacheEvent::new(CacheEventType::Hit, key.as_str())
                        .with_method(Method::GET)
                        .with_uri(uri)
                        .with_status(entry.status)
                        .with_size(entry.body.len())
                        .log(cache.logging());
                }

                return Ok(entry.into_response().map(CacheBody::Left));
            }

            #[cfg(feature = "metrics")]
            counter!("tower_request_cache.miss").increment(1);

            let start = std::time::Instant::now();
            let response = inner.call(req).await.map_err(Into::<BoxError>::into)?;
            let latency = start.elapsed();

            #[cfg(feature = "metrics")]
            histogram!("tower_request_cache.inner_latency").record(latency.as_secs_f64());

            if cache.logging().enabled {
                CacheEvent::new(CacheEventType::Miss, key.as_str())
                    .with_method(Method::GET)
                    .with_uri(uri)
                    .with_status(response.status())
                    .with_latency(latency)
                    .log(cache.logging());
            }

            // Informational and non-2xx responses are never stored.
            if !options.is_enabled() || !response.status().is_success() {
                return Ok(response.map(CacheBody::Right));
            }

            let (parts, body) = response.into_parts();
            let bytes = body.collect().await.map_err(Into::<BoxError>::into)?.to_bytes();

            cache.store(key, CacheEntry::from_parts(&parts, bytes.clone()), &options);

            Ok(Response::from_parts(parts, CacheBody::Left(Full::from(bytes))))
        })
    }
}
