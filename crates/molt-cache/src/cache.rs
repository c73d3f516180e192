//! The on-disk transform cache.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::CacheError;
use crate::evict::{plan_eviction, EntryMeta};
use crate::hash::ContentHash;

/// Content-addressed store for transform output.
///
/// A handle is either enabled (backed by a directory, one file per content
/// hash, file content = transformed text verbatim) or disabled (every `get`
/// misses, every `put` is a no-op). Initialization failures produce a
/// disabled handle rather than an error: caching is a pure optimization and
/// must never fail a build.
pub struct TransformCache {
    dir: Option<PathBuf>,
}

impl TransformCache {
    /// Opens the cache at `dir`, creating it if needed, and runs one
    /// eviction sweep.
    ///
    /// Any failure during initialization degrades to a disabled handle for
    /// the rest of the process. Concurrent sweeps from other processes are
    /// tolerated; a lost race just costs a re-transform.
    pub fn open(dir: &Path) -> Self {
        match Self::init(dir) {
            Ok(()) => Self {
                dir: Some(dir.to_path_buf()),
            },
            Err(_) => Self::disabled(),
        }
    }

    /// Constructs a handle on which every `get` misses and `put` is a no-op.
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    /// Whether this handle is backed by a directory.
    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// Looks up previously computed transform output.
    ///
    /// On a hit the entry's mtime is refreshed so the eviction sweep sees
    /// it as recently used; a failed refresh is swallowed, staleness is a
    /// performance concern, not a correctness one.
    pub fn get(&self, hash: &ContentHash) -> Option<String> {
        let path = self.entry_path(hash)?;
        let text = fs::read_to_string(&path).ok()?;
        let _ = touch(&path);
        Some(text)
    }

    /// Stores transform output, best-effort.
    ///
    /// Write failures are swallowed: a missing entry just costs one
    /// re-transform on the next lookup.
    pub fn put(&self, hash: &ContentHash, text: &str) {
        if let Some(path) = self.entry_path(hash) {
            let _ = fs::write(path, text);
        }
    }

    fn entry_path(&self, hash: &ContentHash) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.join(hash.as_str()))
    }

    fn init(dir: &Path) -> Result<(), CacheError> {
        fs::create_dir_all(dir).map_err(|e| CacheError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;
        if !dir.is_dir() {
            return Err(CacheError::NotADirectory {
                path: dir.to_path_buf(),
            });
        }
        Self::sweep(dir)
    }

    /// Runs the startup eviction sweep.
    ///
    /// Lists all entries, stats them, and deletes what the planner selects.
    /// Individual deletion failures are ignored.
    fn sweep(dir: &Path) -> Result<(), CacheError> {
        let read_dir = fs::read_dir(dir).map_err(|e| CacheError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let mut entries = Vec::new();
        for dir_entry in read_dir {
            let dir_entry = dir_entry.map_err(|e| CacheError::Io {
                path: dir.to_path_buf(),
                source: e,
            })?;
            let Ok(meta) = dir_entry.metadata() else {
                continue;
            };
            if !meta.is_file() {
                // Someone put something other than a file in here; not our
                // problem.
                continue;
            }
            let Ok(mtime) = meta.modified() else {
                continue;
            };
            entries.push(EntryMeta {
                path: dir_entry.path(),
                mtime,
                size: meta.len(),
            });
        }

        for path in plan_eviction(entries, SystemTime::now()) {
            let _ = fs::remove_file(path);
        }

        Ok(())
    }
}

/// Refreshes a file's mtime without changing its contents.
fn touch(path: &Path) -> std::io::Result<()> {
    let file = fs::OpenOptions::new().append(true).open(path)?;
    file.set_modified(SystemTime::now())
}
