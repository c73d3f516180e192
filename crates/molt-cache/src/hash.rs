//! Content hashing for cache keys.

use std::fmt;

/// Cryptographic digest of a source text, used as the cache key.
///
/// Two texts share a hash only if they are byte-for-byte identical;
/// collisions are treated as impossible. The hex form is the on-disk
/// file name of the corresponding cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    /// Computes the hash of a source text.
    pub fn of(text: &str) -> Self {
        Self(blake3::hash(text.as_bytes()).to_hex().to_string())
    }

    /// The hex digest, suitable as a file name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
