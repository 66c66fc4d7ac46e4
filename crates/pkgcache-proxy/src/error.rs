//! Error types for the package cache proxy

use axum::http::StatusCode;
use std::fmt;

#[derive(Debug)]
pub enum ProxyError {
    Config(String),
    Storage(blob_store::BlobStoreError),
    Index(cache_index::IndexError),
    OriginUnreachable(Box<reqwest::Error>),
    OriginStatus(StatusCode),
    Io(Box<std::io::Error>),
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ProxyError::Storage(err) => write!(f, "Blob store error: {}", err),
            ProxyError::Index(err) => write!(f, "Index error: {}", err),
            ProxyError::OriginUnreachable(err) => write!(f, "Origin unreachable: {}", err),
            ProxyError::OriginStatus(status) => write!(f, "Origin returned status {}", status),
            ProxyError::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for ProxyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProxyError::Storage(err) => Some(err),
            ProxyError::Index(err) => Some(err),
            ProxyError::OriginUnreachable(err) => Some(err.as_ref()),
            ProxyError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<blob_store::BlobStoreError> for ProxyError {
    fn from(err: blob_store::BlobStoreError) -> Self {
        ProxyError::Storage(err)
    }
}

impl From<cache_index::IndexError> for ProxyError {
    fn from(err: cache_index::IndexError) -> Self {
        ProxyError::Index(err)
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        ProxyError::OriginUnreachable(Box::new(err))
    }
}

impl From<std::io::Error> for ProxyError {
    fn from(err: std::io::Error) -> Self {
        ProxyError::Io(Box::new(err))
    }
}

impl From<tracing_subscriber::filter::ParseError> for ProxyError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        ProxyError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ProxyError::Config("missing CACHE_ROOT".to_string());
        assert_eq!(format!("{}", err), "Configuration error: missing CACHE_ROOT");
    }

    #[test]
    fn test_origin_status_display() {
        let err = ProxyError::OriginStatus(StatusCode::NOT_FOUND);
        assert!(format!("{}", err).contains("404"));
    }

    #[test]
    fn test_storage_error_display() {
        let err = ProxyError::Storage(blob_store::BlobStoreError::NotFound("1a2b".to_string()));
        assert!(format!("{}", err).contains("1a2b"));
    }

    #[test]
    fn test_error_is_debug() {
        let err = ProxyError::Config("test".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("Config"));
    }
}
