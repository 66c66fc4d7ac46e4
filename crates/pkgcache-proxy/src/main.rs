//! Caching forward proxy for package downloads
//!
//! Relays GET requests to their origin and keeps package-like payloads on
//! disk, so repeated downloads of the same URL are served locally.

mod error;
mod origin;
mod relay;
mod server;
mod types;

use crate::error::{ProxyError, Result};
use crate::origin::OriginFetcher;
use crate::server::{start_server, ServerState, SharedState};
use crate::types::{default_cacheable_types, ProxyConfig};
use blob_store::BlobStore;
use cache_index::CacheIndex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env().add_directive("pkgcache_proxy=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting package cache proxy...");

    // Load configuration from environment
    let config = load_config();
    info!("Port: {}", config.port);
    info!("Cache root: {:?}", config.cache_root);
    info!("Cacheable types: {:?}", config.cacheable_types);

    tokio::fs::create_dir_all(&config.cache_root).await?;

    // Bootstrap storage and the durable index
    let blobs = BlobStore::new(config.blob_dir());
    blobs.init().await?;

    let index = CacheIndex::new(config.index_path());
    index.load().await?;

    let origin = OriginFetcher::new()?;

    // Create shared state
    let port = config.port;
    let state: SharedState = Arc::new(ServerState::new(config, index, blobs, origin));

    // Start HTTP server (blocking)
    start_server(state, port)
        .await
        .map_err(|e| ProxyError::Config(format!("Server error: {}", e)))?;

    Ok(())
}

fn load_config() -> ProxyConfig {
    let port = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3143);

    let cache_root = std::env::var("CACHE_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./cache/packages"));

    let cacheable_types = std::env::var("CACHEABLE_TYPES")
        .map(|s| {
            s.split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_else(|_| default_cacheable_types());

    ProxyConfig {
        port,
        cache_root,
        cacheable_types,
    }
}
