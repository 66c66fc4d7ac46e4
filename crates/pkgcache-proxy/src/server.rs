//! HTTP server for the forward proxy
//!
//! Every inbound request lands in a single fallback handler: a forward
//! proxy's request target is a full URL, not a routable path. The proxy's
//! own /health endpoint is answered in-handler so an absolute-form target
//! whose path happens to be /health still relays.

use crate::origin::OriginFetcher;
use crate::relay;
use crate::types::{CacheStats, HealthResponse, ProxyConfig};
use axum::{
    extract::{Request, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    Router,
};
use blob_store::BlobStore;
use cache_index::CacheIndex;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Relay traffic counters
#[derive(Default)]
pub struct RelayStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub admissions: AtomicU64,
}

/// Shared state for the HTTP server
pub struct ServerState {
    pub config: ProxyConfig,
    pub index: CacheIndex,
    pub blobs: BlobStore,
    pub origin: OriginFetcher,
    pub stats: RelayStats,
    pub started_at: DateTime<Utc>,
}

impl ServerState {
    pub fn new(
        config: ProxyConfig,
        index: CacheIndex,
        blobs: BlobStore,
        origin: OriginFetcher,
    ) -> Self {
        Self {
            config,
            index,
            blobs,
            origin,
            stats: RelayStats::default(),
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<ServerState>;

/// Create the HTTP router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .fallback(handle)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(state: SharedState, port: u16) -> std::io::Result<()> {
    let router = create_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await
}

/// Dispatch an inbound request: the health endpoint for a plain /health
/// target, the relay flow for everything else.
async fn handle(State(state): State<SharedState>, request: Request) -> Response {
    let uri = request.uri();

    if uri.scheme().is_none() && uri.path() == "/health" && request.method() == Method::GET {
        return health(&state).await;
    }

    if request.method() != Method::GET {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let raw_target = if uri.scheme().is_some() {
        uri.to_string()
    } else {
        uri.path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string())
    };
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    relay::relay(&state, &raw_target, user_agent.as_deref()).await
}

/// Health check endpoint
async fn health(state: &ServerState) -> Response {
    let uptime_secs = (Utc::now() - state.started_at).num_seconds() as u64;
    let cache = CacheStats {
        entries: state.index.len().await,
        hits: state.stats.hits.load(Ordering::Relaxed),
        misses: state.stats.misses.load(Ordering::Relaxed),
        admissions: state.stats.admissions.load(Ordering::Relaxed),
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs,
        cache,
    })
    .into_response()
}
