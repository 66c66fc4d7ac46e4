//! Core types for the package cache proxy

use serde::Serialize;
use std::path::PathBuf;

/// Content types admitted to the cache when no override is configured.
pub fn default_cacheable_types() -> Vec<String> {
    [
        "application/x-debian-package",
        "application/x-msdos-program",
        "application/zip",
        "application/x-sh",
        "application/x-tar",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Configuration for the proxy
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub port: u16,
    pub cache_root: PathBuf,
    pub cacheable_types: Vec<String>,
}

impl ProxyConfig {
    /// Directory holding blob files.
    pub fn blob_dir(&self) -> PathBuf {
        self.cache_root.join("blobs")
    }

    /// Path of the durable index file.
    pub fn index_path(&self) -> PathBuf {
        self.cache_root.join("index")
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: 3143,
            cache_root: PathBuf::from("./cache/packages"),
            cacheable_types: default_cacheable_types(),
        }
    }
}

/// Statistics about cache traffic
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub admissions: u64,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub cache: CacheStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProxyConfig::default();
        assert_eq!(config.port, 3143);
        assert_eq!(config.cache_root, PathBuf::from("./cache/packages"));
        assert_eq!(config.cacheable_types.len(), 5);
        assert!(config
            .cacheable_types
            .contains(&"application/x-debian-package".to_string()));
    }

    #[test]
    fn test_config_paths() {
        let config = ProxyConfig::default();
        assert_eq!(config.blob_dir(), PathBuf::from("./cache/packages/blobs"));
        assert_eq!(config.index_path(), PathBuf::from("./cache/packages/index"));
    }

    #[test]
    fn test_cache_stats_default() {
        let stats = CacheStats::default();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.admissions, 0);
    }

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "ok".to_string(),
            uptime_secs: 3600,
            cache: CacheStats {
                entries: 12,
                hits: 500,
                misses: 50,
                admissions: 12,
            },
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("ok"));
        assert!(json.contains("3600"));
        assert!(json.contains("500"));
    }
}
