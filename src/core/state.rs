//! State management and caching data structures.
//!
//! This module defines the data the dashboard reads from the repository and the
//! short-lived cache that keeps a render cycle from querying git repeatedly.
//!
//! # Public API
//! - [`FileEntry`]: One changed file with its status code and line counts
//! - [`StatusSnapshot`]: Staged, modified and untracked files from one fetch
//! - [`BranchStatus`]: Current branch and its ahead/behind comparison
//! - [`ConflictReport`]: Active and potential merge conflicts
//! - [`CommitEntry`]: One row of recent history
//! - [`StateCache`]: Time-boxed memo of the latest [`StatusSnapshot`] and
//!   [`ConflictReport`]
//!
//! # Cache Strategy
//! - **Time box**: a snapshot younger than the TTL is served from memory
//! - **Explicit invalidation**: every mutating operation clears the entry,
//!   because the TTL alone cannot guarantee freshness after a user write
//! - **Replacement, not mutation**: a fetch produces a new snapshot

use crate::core::git_status::GitStatus;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Default lifetime of a cached snapshot
pub const DEFAULT_SNAPSHOT_TTL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub status: GitStatus,
    pub path: PathBuf,
    pub added: Option<u32>,
    pub removed: Option<u32>,
}

impl FileEntry {
    pub fn new(status: GitStatus, path: impl Into<PathBuf>) -> Self {
        Self {
            status,
            path: path.into(),
            added: None,
            removed: None,
        }
    }

    pub fn with_stats(mut self, added: Option<u32>, removed: Option<u32>) -> Self {
        self.added = added;
        self.removed = removed;
        self
    }

    /// Line counts as `+A -D`, or `None` when git could not count them
    pub fn stat_text(&self) -> Option<String> {
        match (self.added, self.removed) {
            (Some(added), Some(removed)) => Some(format!("+{added} -{removed}")),
            (Some(added), None) => Some(format!("+{added} -0")),
            _ => None,
        }
    }
}

/// Which of the three staging sections a file belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StagingArea {
    Staged,
    Modified,
    Untracked,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub staged: Vec<FileEntry>,
    pub modified: Vec<FileEntry>,
    pub untracked: Vec<FileEntry>,
}

impl StatusSnapshot {
    pub fn files(&self, area: StagingArea) -> &[FileEntry] {
        match area {
            StagingArea::Staged => &self.staged,
            StagingArea::Modified => &self.modified,
            StagingArea::Untracked => &self.untracked,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.staged.is_empty() && self.modified.is_empty() && self.untracked.is_empty()
    }

    /// Paths currently in an unresolved merge state
    pub fn conflicted(&self) -> Vec<&Path> {
        self.modified
            .iter()
            .filter(|entry| entry.status == GitStatus::Unmerged)
            .map(|entry| entry.path.as_path())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchStatus {
    pub branch: String,
    pub ahead: usize,
    pub behind: usize,
    pub tracking: Option<String>,
    pub detached: bool,
    pub unborn: bool,
}

impl BranchStatus {
    /// Whether the current branch is the tracking branch itself
    pub fn is_tracking_branch(&self) -> bool {
        self.tracking.as_deref() == Some(self.branch.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub active: Vec<PathBuf>,
    pub potential: Vec<PathBuf>,
}

impl ConflictReport {
    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.potential.is_empty()
    }

    pub fn total(&self) -> usize {
        self.active.len() + self.potential.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitEntry {
    pub hash: String,
    pub parents: Vec<String>,
    pub author: String,
    pub timestamp: i64,
    pub subject: String,
    pub added: u32,
    pub removed: u32,
}

impl CommitEntry {
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }
}

/// Files changed on the current branch relative to the tracking branch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchDetail {
    pub branch: String,
    pub tracking: Option<String>,
    pub merge_base: Option<String>,
    pub files: Vec<(String, PathBuf)>,
    pub conflicts: ConflictReport,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    snapshot: Rc<StatusSnapshot>,
    fetched_at: Instant,
}

#[derive(Debug, Clone)]
struct ConflictEntry {
    tracking: String,
    report: Rc<ConflictReport>,
    fetched_at: Instant,
}

/// Time-boxed memo of the latest working-tree snapshot.
///
/// The conflict report against the tracking branch shares the TTL and the
/// invalidation. It is read while a view is built, so it sits behind a
/// `RefCell` and is reachable through a shared reference.
#[derive(Debug)]
pub struct StateCache {
    entry: Option<CacheEntry>,
    conflicts: RefCell<Option<ConflictEntry>>,
    ttl: Duration,
    fetches: usize,
    conflict_fetches: Cell<usize>,
}

impl Default for StateCache {
    fn default() -> Self {
        Self::new(DEFAULT_SNAPSHOT_TTL)
    }
}

impl StateCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entry: None,
            conflicts: RefCell::new(None),
            ttl,
            fetches: 0,
            conflict_fetches: Cell::new(0),
        }
    }

    /// Serve the cached snapshot if fresh, otherwise run `fetch` exactly once
    pub fn get_or_fetch<F>(&mut self, fetch: F) -> Rc<StatusSnapshot>
    where
        F: FnOnce() -> StatusSnapshot,
    {
        if let Some(entry) = &self.entry {
            if entry.fetched_at.elapsed() < self.ttl {
                log::debug!("Serving status snapshot from cache");
                return Rc::clone(&entry.snapshot);
            }
        }

        let snapshot = Rc::new(fetch());
        self.fetches += 1;
        log::debug!(
            "Fetched status snapshot: {} staged, {} modified, {} untracked",
            snapshot.staged.len(),
            snapshot.modified.len(),
            snapshot.untracked.len()
        );
        self.entry = Some(CacheEntry {
            snapshot: Rc::clone(&snapshot),
            fetched_at: Instant::now(),
        });
        snapshot
    }

    /// Serve the conflict report against `tracking` if fresh, otherwise run
    /// `fetch` and keep its result
    pub fn conflicts_or_fetch<F>(&self, tracking: &str, fetch: F) -> Rc<ConflictReport>
    where
        F: FnOnce() -> ConflictReport,
    {
        if let Some(entry) = self.conflicts.borrow().as_ref() {
            if entry.tracking == tracking && entry.fetched_at.elapsed() < self.ttl {
                return Rc::clone(&entry.report);
            }
        }

        let report = Rc::new(fetch());
        self.conflict_fetches.set(self.conflict_fetches.get() + 1);
        log::debug!(
            "Fetched conflict report against {tracking}: {} file(s)",
            report.total()
        );
        *self.conflicts.borrow_mut() = Some(ConflictEntry {
            tracking: tracking.to_string(),
            report: Rc::clone(&report),
            fetched_at: Instant::now(),
        });
        report
    }

    /// Drop the cached snapshot and conflict report so the next read fetches
    pub fn invalidate(&mut self) {
        self.conflicts.get_mut().take();
        if self.entry.take().is_some() {
            log::debug!("Status snapshot invalidated");
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.entry
            .as_ref()
            .is_some_and(|entry| entry.fetched_at.elapsed() < self.ttl)
    }

    /// Number of fetches performed over the cache's lifetime
    pub fn fetch_count(&self) -> usize {
        self.fetches
    }

    pub fn conflict_fetch_count(&self) -> usize {
        self.conflict_fetches.get()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> StatusSnapshot {
        StatusSnapshot {
            staged: vec![FileEntry::new(GitStatus::Added, "new.rs").with_stats(Some(4), Some(0))],
            modified: vec![
                FileEntry::new(GitStatus::Modified, "a.txt").with_stats(Some(3), Some(1)),
                FileEntry::new(GitStatus::Unmerged, "conflict.txt"),
            ],
            untracked: Vec::new(),
        }
    }

    #[test]
    fn test_second_read_within_ttl_is_cached() {
        let mut cache = StateCache::new(Duration::from_secs(60));
        let mut calls = 0;
        let first = cache.get_or_fetch(|| {
            calls += 1;
            sample_snapshot()
        });
        let second = cache.get_or_fetch(|| {
            calls += 1;
            sample_snapshot()
        });
        assert_eq!(calls, 1);
        assert_eq!(cache.fetch_count(), 1);
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_invalidate_forces_fetch() {
        let mut cache = StateCache::new(Duration::from_secs(60));
        cache.get_or_fetch(sample_snapshot);
        cache.invalidate();
        assert!(!cache.is_fresh());
        cache.get_or_fetch(StatusSnapshot::default);
        assert_eq!(cache.fetch_count(), 2);
    }

    #[test]
    fn test_expired_entry_refetches() {
        let mut cache = StateCache::new(Duration::ZERO);
        cache.get_or_fetch(sample_snapshot);
        cache.get_or_fetch(sample_snapshot);
        assert_eq!(cache.fetch_count(), 2);
    }

    #[test]
    fn test_conflict_report_follows_ttl_and_invalidation() {
        let mut cache = StateCache::new(Duration::from_secs(60));
        let calls = Cell::new(0);
        let fetch = || {
            calls.set(calls.get() + 1);
            ConflictReport {
                active: Vec::new(),
                potential: vec![PathBuf::from("shared.txt")],
            }
        };

        let first = cache.conflicts_or_fetch("main", fetch);
        let second = cache.conflicts_or_fetch("main", fetch);
        assert_eq!(calls.get(), 1);
        assert!(Rc::ptr_eq(&first, &second));

        cache.conflicts_or_fetch("develop", fetch);
        assert_eq!(calls.get(), 2);

        cache.invalidate();
        cache.conflicts_or_fetch("develop", fetch);
        assert_eq!(calls.get(), 3);
        assert_eq!(cache.conflict_fetch_count(), 3);
    }

    #[test]
    fn test_default_ttl_is_100ms() {
        assert_eq!(StateCache::default().ttl(), Duration::from_millis(100));
    }

    #[test]
    fn test_stat_text() {
        let entry = FileEntry::new(GitStatus::Modified, "a.txt").with_stats(Some(3), Some(1));
        assert_eq!(entry.stat_text().as_deref(), Some("+3 -1"));
        assert_eq!(FileEntry::new(GitStatus::Modified, "bin").stat_text(), None);
    }

    #[test]
    fn test_conflicted_paths() {
        let snapshot = sample_snapshot();
        assert_eq!(snapshot.conflicted(), vec![Path::new("conflict.txt")]);
        assert!(!snapshot.is_clean());
        assert!(StatusSnapshot::default().is_clean());
    }

    #[test]
    fn test_tracking_branch_comparison() {
        let status = BranchStatus {
            branch: "main".into(),
            tracking: Some("main".into()),
            ..Default::default()
        };
        assert!(status.is_tracking_branch());
        let feature = BranchStatus {
            branch: "feature".into(),
            tracking: Some("main".into()),
            ..Default::default()
        };
        assert!(!feature.is_tracking_branch());
    }
}
