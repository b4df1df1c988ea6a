//! Run with:
//! RUST_LOG=tower_request_cache=debug cargo run --example opt_in_client

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use http::{Request, Response};
use http_body_util::{BodyExt, Full};
use tower::{Layer, Service, ServiceExt};
use tower_request_cache::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let layer = CacheLayer::builder(InMemoryBackend::new())
        .logging(CacheLoggingConfig::new().with_enabled(true).with_hash_keys(false))
        .build();

    let calls = Arc::new(AtomicUsize::new(0));
    let mut client = layer.layer(tower::service_fn({
        let calls = calls.clone();
        move |req: Request<()>| {
            let calls = calls.clone();
            async move {
                let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                let body = format!("{} {} (transport call #{call})", req.method(), req.uri());
                Ok::<_, Infallible>(Response::new(Full::from(body)))
            }
        }
    }));

    let short_lived = CacheOptions::enabled().with_ttl(Duration::from_millis(200))?;

    let requests = vec![
        ("plain GET, caching off", Request::get("/users").body(())?),
        (
            "opt-in GET",
            Request::get("/users").cache(CacheOptions::enabled()).body(())?,
        ),
        (
            "opt-in GET again (cache hit)",
            Request::get("/users").cache(CacheOptions::enabled()).body(())?,
        ),
        (
            "explicit key",
            Request::get("/users?page=1")
                .cache(CacheOptions::enabled().with_key("users"))
                .body(())?,
        ),
        (
            "POST always bypasses",
            Request::post("/users").cache(CacheOptions::enabled()).body(())?,
        ),
        (
            "ttl entry",
            Request::get("/session").cache(short_lived.clone()).body(())?,
        ),
    ];

    for (label, request) in requests {
        let response = client.ready().await?.call(request).await?;
        let body = response.into_body().collect().await?.to_bytes();
        println!("{label:32} -> {}", String::from_utf8_lossy(&body));
    }

    tokio::time::sleep(Duration::from_millis(250)).await;
    let response = client
        .ready()
        .await?
        .call(Request::get("/session").cache(short_lived).body(())?)
        .await?;
    let body = response.into_body().collect().await?.to_bytes();
    println!("{:32} -> {}", "ttl entry after expiry", String::from_utf8_lossy(&body));

    println!(
        "transport calls: {}, cached keys: {}",
        calls.load(Ordering::SeqCst),
        layer.cache().len()
    );
    Ok(())
}
