//! Eviction planning.
//!
//! The policy: if the cache holds less than [`MAX_TOTAL_BYTES`], nothing is
//! evicted. Otherwise every entry beyond the [`KEEP_RECENT`]
//! most-recently-touched is a candidate, but entries touched within the
//! [`GRACE`] window are protected regardless of rank. The decision is a
//! pure function over stat metadata; the sweep in `cache` carries out the
//! deletions.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

/// Total cache size below which no eviction happens.
pub(crate) const MAX_TOTAL_BYTES: u64 = 10 * 1024 * 1024;

/// Number of most-recently-touched entries that are never evicted.
pub(crate) const KEEP_RECENT: usize = 200;

/// Entries touched within this window are protected from eviction.
pub(crate) const GRACE: Duration = Duration::from_secs(60 * 10);

/// Stat metadata of one cache entry, as gathered by the sweep.
#[derive(Debug, Clone)]
pub(crate) struct EntryMeta {
    pub path: PathBuf,
    pub mtime: SystemTime,
    pub size: u64,
}

/// Decides which entries to evict.
///
/// Sorts by mtime, newest first, so rank order matches recency order.
/// Returns the paths to delete; the caller removes them best-effort.
pub(crate) fn plan_eviction(mut entries: Vec<EntryMeta>, now: SystemTime) -> Vec<PathBuf> {
    entries.sort_by(|a, b| b.mtime.cmp(&a.mtime));

    let total_size: u64 = entries.iter().map(|e| e.size).sum();
    if total_size < MAX_TOTAL_BYTES {
        return Vec::new();
    }

    let cutoff = now - GRACE;

    entries
        .into_iter()
        .skip(KEEP_RECENT)
        .filter(|e| e.mtime < cutoff)
        .map(|e| e.path)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, age: Duration, size: u64, now: SystemTime) -> EntryMeta {
        EntryMeta {
            path: PathBuf::from(name),
            mtime: now - age,
            size,
        }
    }

    #[test]
    fn below_threshold_evicts_nothing() {
        let now = SystemTime::now();
        let entries: Vec<_> = (0..300)
            .map(|i| entry(&format!("e{i}"), Duration::from_secs(3600), 1024, now))
            .collect();
        // 300 KiB total, well under the 10 MiB threshold
        assert!(plan_eviction(entries, now).is_empty());
    }

    #[test]
    fn recent_entries_survive_regardless_of_rank() {
        // 50 entries touched within the last minute, 200 touched 20 minutes
        // ago, total size over threshold: the 50 recent plus the 200
        // most-recent of the rest are retained. With exactly 250 entries,
        // nothing beyond rank 200 is young enough to be protected by rank
        // alone, but everything inside the grace window survives.
        let now = SystemTime::now();
        let mut entries = Vec::new();
        for i in 0..50 {
            entries.push(entry(&format!("recent{i}"), Duration::from_secs(30), 64 * 1024, now));
        }
        for i in 0..200 {
            entries.push(entry(
                &format!("old{i}"),
                Duration::from_secs(60 * 20 + i),
                64 * 1024,
                now,
            ));
        }
        // 250 * 64 KiB = 15.6 MiB > 10 MiB
        let evicted = plan_eviction(entries, now);

        // Ranks 1..=200 are kept: all 50 recent plus the 150 newest old
        // ones. The remaining 50 old entries are all outside the grace
        // window, so they go.
        assert_eq!(evicted.len(), 50);
        assert!(evicted.iter().all(|p| p.to_string_lossy().starts_with("old")));
    }

    #[test]
    fn grace_window_protects_low_rank_entries() {
        // Over threshold with 250 entries all touched seconds ago: every
        // entry beyond rank 200 is inside the grace window, so none are
        // evicted.
        let now = SystemTime::now();
        let entries: Vec<_> = (0..250)
            .map(|i| entry(&format!("e{i}"), Duration::from_secs(i), 64 * 1024, now))
            .collect();
        assert!(plan_eviction(entries, now).is_empty());
    }

    #[test]
    fn old_overflow_is_evicted() {
        let now = SystemTime::now();
        let entries: Vec<_> = (0..210)
            .map(|i| entry(&format!("e{i}"), Duration::from_secs(60 * 60 + i), 128 * 1024, now))
            .collect();
        // 210 * 128 KiB = 26 MiB, all an hour old: the 10 oldest go.
        let evicted = plan_eviction(entries, now);
        assert_eq!(evicted.len(), 10);
    }
}
