//! URL to blob-id index backed by a flat durable file
//!
//! Keeps the mapping in memory behind a lock and rewrites a single text
//! file on every change, so the mapping survives restarts.

mod error;
mod index;

pub use error::{IndexError, Result};
pub use index::CacheIndex;
