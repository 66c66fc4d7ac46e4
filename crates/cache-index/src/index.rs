//! In-memory URL mapping with whole-file persistence

use crate::error::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// URL to blob-id mapping backed by a single text file.
///
/// The file holds one `<blobId> <url>` line per entry and is rewritten in
/// full on every change. All mutation happens under the write lock, so the
/// in-memory map and the file reflect a total order of commits.
pub struct CacheIndex {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl CacheIndex {
    /// Create an index persisted at `path`. Call [`load`](Self::load) before
    /// use.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Read the index file, creating an empty one if absent.
    ///
    /// Malformed lines are logged and skipped; they never abort startup.
    pub async fn load(&self) -> Result<()> {
        if !fs::try_exists(&self.path).await? {
            fs::write(&self.path, b"").await?;
        }

        let text = fs::read_to_string(&self.path).await?;
        let mut entries = self.entries.write().await;
        entries.clear();
        for line in text.lines() {
            if line.is_empty() {
                continue;
            }
            match line.split_once(' ') {
                Some((id, url)) if !id.is_empty() && !url.is_empty() => {
                    entries
                        .entry(url.to_string())
                        .or_insert_with(|| id.to_string());
                }
                _ => warn!(line = %line, "Skipping malformed index line"),
            }
        }

        debug!(entries = entries.len(), path = ?self.path, "Index loaded");
        Ok(())
    }

    /// Look up the blob id cached for `url`.
    pub async fn lookup(&self, url: &str) -> Option<String> {
        self.entries.read().await.get(url).cloned()
    }

    /// Number of entries currently indexed.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Insert a mapping and rewrite the index file.
    ///
    /// First writer wins: a URL already present is left untouched and
    /// `Ok(false)` is returned. Insert and rewrite happen under one write
    /// lock; a failed rewrite rolls the insert back.
    pub async fn commit(&self, url: &str, blob_id: &str) -> Result<bool> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(url) {
            return Ok(false);
        }
        entries.insert(url.to_string(), blob_id.to_string());
        if let Err(e) = self.persist(&entries).await {
            entries.remove(url);
            return Err(e);
        }
        debug!(url = %url, blob_id = %blob_id, "Committed index entry");
        Ok(true)
    }

    /// Drop the mapping for `url`, if any, and rewrite the index file.
    ///
    /// Used when an indexed blob turns out to be missing on disk.
    pub async fn remove(&self, url: &str) -> Result<bool> {
        let mut entries = self.entries.write().await;
        let removed = match entries.remove(url) {
            Some(id) => id,
            None => return Ok(false),
        };
        if let Err(e) = self.persist(&entries).await {
            entries.insert(url.to_string(), removed);
            return Err(e);
        }
        debug!(url = %url, "Removed index entry");
        Ok(true)
    }

    /// Replace the index file with the current mapping, atomically.
    async fn persist(&self, entries: &HashMap<String, String>) -> Result<()> {
        let mut out = String::new();
        for (url, id) in entries {
            out.push_str(id);
            out.push(' ');
            out.push_str(url);
            out.push('\n');
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, out.as_bytes()).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
