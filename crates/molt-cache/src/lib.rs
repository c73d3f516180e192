//! # Molt Cache
//!
//! Content-addressed on-disk cache for deterministic text transforms.
//! One file per content hash; modification time doubles as the recency
//! signal for eviction. Every operation is fail-safe: errors degrade to
//! cache misses or a disabled handle, never to a build failure.

mod cache;
mod error;
mod evict;
mod hash;

pub use cache::TransformCache;
pub use error::CacheError;
pub use hash::ContentHash;
