//! Error types for cache operations.
//!
//! These never escape to a build result: callers fold every failure into
//! "cache miss" or "cache disabled". The enum exists for internal
//! propagation and for logging at the call sites that swallow it.

use std::path::PathBuf;

/// Errors that can occur while initializing or sweeping the cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while touching cache files.
    #[error("cache I/O error at {}: {source}", path.display())]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The configured cache location exists but is not a directory.
    #[error("cache path {} is not a directory", path.display())]
    NotADirectory {
        /// The offending path.
        path: PathBuf,
    },
}
