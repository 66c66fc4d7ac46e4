//! File-per-blob storage with collision-free id allocation
//!
//! Stores immutable byte payloads as individual files named by a generated
//! id under a fixed directory.

mod error;
mod store;

pub use error::{BlobStoreError, Result};
pub use store::{BlobId, BlobStore};
