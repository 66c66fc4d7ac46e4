//! Per-request relay flow
//!
//! Consults the index, streams cached blobs on a hit, and on a miss fetches
//! from the origin, tees cachable payloads into the blob store, and streams
//! everything else straight through.

use crate::error::ProxyError;
use crate::server::ServerState;
use axum::body::{Body, Bytes};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use blob_store::BlobStoreError;
use serde::Serialize;
use std::sync::atomic::Ordering;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};
use url::Url;

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Normalize an inbound proxy target into the outbound origin URL.
///
/// Absolute-form targets are used verbatim; origin-form targets carry the
/// URL in the path behind a single leading slash, which is stripped. Only
/// http and https targets are relayed.
pub fn normalize_target(raw: &str) -> Option<String> {
    let candidate = raw.strip_prefix('/').unwrap_or(raw);
    let parsed = Url::parse(candidate).ok()?;
    match parsed.scheme() {
        "http" | "https" => Some(candidate.to_string()),
        _ => None,
    }
}

/// Content types are admitted by exact, case-sensitive substring match.
pub fn is_cacheable(content_type: &str, admitted: &[String]) -> bool {
    admitted.iter().any(|t| content_type.contains(t.as_str()))
}

/// Relay one request: serve from cache when possible, otherwise fetch from
/// the origin and conditionally admit the response.
pub async fn relay(state: &ServerState, raw_target: &str, user_agent: Option<&str>) -> Response {
    let url = match normalize_target(raw_target) {
        Some(url) => url,
        None => {
            warn!(target = %raw_target, "Rejecting unparseable proxy target");
            return error_response(StatusCode::BAD_REQUEST, "Invalid proxy target");
        }
    };
    info!(url = %url, "Received request");

    if let Some(blob_id) = state.index.lookup(&url).await {
        match state.blobs.open_for_read(&blob_id).await {
            Ok(file) => {
                state.stats.hits.fetch_add(1, Ordering::Relaxed);
                debug!(url = %url, blob_id = %blob_id, "Serving from cache");
                return blob_response(file);
            }
            Err(BlobStoreError::NotFound(_)) => {
                // Index and blob store diverged; drop the stale entry and
                // fall through to an origin fetch.
                warn!(url = %url, blob_id = %blob_id, "Indexed blob missing, refetching");
                if let Err(e) = state.index.remove(&url).await {
                    warn!(url = %url, error = %e, "Failed to drop stale index entry");
                }
            }
            Err(e) => {
                warn!(url = %url, blob_id = %blob_id, error = %e, "Cache read failed");
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Cache read failed");
            }
        }
    }

    state.stats.misses.fetch_add(1, Ordering::Relaxed);
    fetch_and_relay(state, &url, user_agent).await
}

/// Miss path: fetch from the origin, admit cachable payloads, stream the
/// rest.
async fn fetch_and_relay(state: &ServerState, url: &str, user_agent: Option<&str>) -> Response {
    let origin = match state.origin.fetch(url, user_agent).await {
        Ok(response) => response,
        Err(ProxyError::OriginStatus(status)) => {
            return error_response(status, "Origin returned an error");
        }
        Err(e) => {
            warn!(url = %url, error = %e, "Origin fetch failed");
            return error_response(StatusCode::BAD_GATEWAY, "Origin unreachable");
        }
    };

    let status = origin.status();
    let content_type = origin.content_type().to_string();

    if !is_cacheable(&content_type, &state.config.cacheable_types) {
        debug!(url = %url, content_type = %content_type, "Streaming without caching");
        return relay_response(status, &content_type, Body::from_stream(origin.into_inner().bytes_stream()));
    }

    // Cachable payloads are buffered in full: the blob must be durably
    // written before the admission is committed.
    let bytes = match origin.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(url = %url, error = %e, "Origin body read failed");
            return error_response(StatusCode::BAD_GATEWAY, "Origin read failed");
        }
    };

    // Caching is best-effort: the client gets the response either way.
    match admit(state, url, &bytes).await {
        Ok(true) => {
            state.stats.admissions.fetch_add(1, Ordering::Relaxed);
        }
        Ok(false) => debug!(url = %url, "Lost admission race, keeping first writer"),
        Err(e) => warn!(url = %url, error = %e, "Failed to cache response"),
    }

    relay_response(status, &content_type, Body::from(bytes))
}

/// Write the payload as a new blob, then register it in the index.
async fn admit(state: &ServerState, url: &str, bytes: &Bytes) -> crate::error::Result<bool> {
    let blob_id = state.blobs.allocate_id().await?;
    state.blobs.write(&blob_id, bytes).await?;
    let committed = state.index.commit(url, &blob_id).await?;
    if committed {
        info!(url = %url, blob_id = %blob_id, size = bytes.len(), "Admitted to cache");
    }
    Ok(committed)
}

fn blob_response(file: tokio::fs::File) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header("X-Cache", "HIT")
        .body(Body::from_stream(ReaderStream::new(file)))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn relay_response(status: StatusCode, content_type: &str, body: Body) -> Response {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type)
        .header("X-Cache", "MISS")
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}
