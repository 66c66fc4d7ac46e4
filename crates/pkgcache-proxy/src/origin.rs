//! Outbound origin fetching

use crate::error::{ProxyError, Result};
use reqwest::header::{CONNECTION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

/// HTTP client for fetching a missed URL from its origin server.
pub struct OriginFetcher {
    client: Client,
}

impl OriginFetcher {
    /// Build a fetcher with connection reuse disabled: one socket per
    /// origin request, no pooling, no system proxy for the outbound hop.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(0)
            .no_proxy()
            .build()
            .map_err(|e| ProxyError::Config(format!("HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Fetch `url` from its origin, forwarding the client's user agent.
    ///
    /// Transport failures become [`ProxyError::OriginUnreachable`] and
    /// non-success statuses [`ProxyError::OriginStatus`]; neither is
    /// retried.
    pub async fn fetch(&self, url: &str, user_agent: Option<&str>) -> Result<OriginResponse> {
        debug!(url = %url, "Fetching from origin");

        let mut request = self.client.get(url).header(CONNECTION, "close");
        if let Some(ua) = user_agent {
            request = request.header(USER_AGENT, ua);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, url = %url, "Origin returned error status");
            return Err(ProxyError::OriginStatus(status));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        Ok(OriginResponse {
            status,
            content_type,
            response,
        })
    }
}

/// A successful origin response, ready to buffer or stream onward.
pub struct OriginResponse {
    status: StatusCode,
    content_type: String,
    response: reqwest::Response,
}

impl OriginResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Buffer the complete body.
    pub async fn bytes(self) -> Result<axum::body::Bytes> {
        Ok(self.response.bytes().await?)
    }

    /// Hand back the underlying response for pass-through streaming.
    pub fn into_inner(self) -> reqwest::Response {
        self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};

    async fn spawn_origin(router: Router) -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn test_fetch_success_reports_content_type() {
        let router = Router::new().route(
            "/pkg.deb",
            get(|| async {
                (
                    [(CONTENT_TYPE, "application/x-debian-package")],
                    "PKGDATA",
                )
            }),
        );
        let addr = spawn_origin(router).await;

        let fetcher = OriginFetcher::new().unwrap();
        let response = fetcher
            .fetch(&format!("http://{}/pkg.deb", addr), Some("apt/2.0"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.content_type(), "application/x-debian-package");
        assert_eq!(&response.bytes().await.unwrap()[..], b"PKGDATA");
    }

    #[tokio::test]
    async fn test_fetch_non_success_is_origin_status() {
        let router = Router::new();
        let addr = spawn_origin(router).await;

        let fetcher = OriginFetcher::new().unwrap();
        let result = fetcher
            .fetch(&format!("http://{}/missing", addr), None)
            .await;

        assert!(matches!(
            result,
            Err(ProxyError::OriginStatus(StatusCode::NOT_FOUND))
        ));
    }

    #[tokio::test]
    async fn test_fetch_refused_connection_is_unreachable() {
        let fetcher = OriginFetcher::new().unwrap();

        // Bind then drop a listener so the port is known to refuse.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = fetcher.fetch(&format!("http://{}/x", addr), None).await;
        assert!(matches!(result, Err(ProxyError::OriginUnreachable(_))));
    }
}
