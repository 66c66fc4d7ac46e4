//! On-disk blob storage

use crate::error::{BlobStoreError, Result};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs::{self, OpenOptions};
use tracing::{debug, warn};

/// Identifier of a stored blob: a compact lowercase-hex token, unique
/// within the store directory.
pub type BlobId = String;

/// Stores each blob as a single file named by its id under a fixed
/// directory.
pub struct BlobStore {
    dir: PathBuf,
}

impl BlobStore {
    /// Create a store rooted at `dir`. Call [`init`](Self::init) before use.
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Ensure the blob directory exists.
    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        debug!(dir = ?self.dir, "Blob store initialized");
        Ok(())
    }

    /// Path of the file backing `id`.
    pub fn blob_path(&self, id: &str) -> PathBuf {
        self.dir.join(id)
    }

    /// Allocate a fresh id and reserve its backing file.
    ///
    /// The file is created exclusively, so two concurrent allocations never
    /// return the same id. Retries on collision with an existing blob.
    pub async fn allocate_id(&self) -> Result<BlobId> {
        loop {
            let id = format!("{:x}", rand::random::<u32>());
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.blob_path(&id))
                .await
            {
                Ok(_) => {
                    debug!(id = %id, "Allocated blob id");
                    return Ok(id);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Write the full payload for an allocated id.
    ///
    /// On failure the reservation is removed so no half-written blob stays
    /// behind.
    pub async fn write(&self, id: &str, bytes: &[u8]) -> Result<()> {
        let path = self.blob_path(id);
        if let Err(e) = fs::write(&path, bytes).await {
            warn!(id = %id, error = %e, "Failed to write blob");
            let _ = fs::remove_file(&path).await;
            return Err(e.into());
        }
        debug!(id = %id, size = bytes.len(), "Wrote blob");
        Ok(())
    }

    /// Open a blob for streaming read.
    ///
    /// A missing backing file is reported as [`BlobStoreError::NotFound`];
    /// callers treat that as a cache miss, not a failure.
    pub async fn open_for_read(&self, id: &str) -> Result<fs::File> {
        match fs::File::open(self.blob_path(id)).await {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(BlobStoreError::NotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
