//! Section providers and the static section layout.
//!
//! A [`SectionProvider`] turns repository state into a [`ViewModel`]. The
//! composer walks an ordered list of [`SectionDescriptor`]s, handing every
//! provider the same [`BuildContext`] so the working-tree snapshot and branch
//! status are fetched at most once per refresh.

use crate::core::colors::Palette;
use crate::core::config::DashboardConfig;
use crate::core::git::GitRepo;
use crate::core::state::{BranchStatus, ConflictReport, StateCache, StatusSnapshot};
use crate::dashboard::view_model::{Style, ViewModel};
use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionKey {
    Branch,
    Tracking,
    Commits,
    Staged,
    Modified,
    Untracked,
}

impl SectionKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKey::Branch => "branch",
            SectionKey::Tracking => "tracking",
            SectionKey::Commits => "commits",
            SectionKey::Staged => "staged",
            SectionKey::Modified => "modified",
            SectionKey::Untracked => "untracked",
        }
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared inputs for one refresh cycle
pub struct BuildContext<'a> {
    pub repo: &'a GitRepo,
    pub config: &'a DashboardConfig,
    pub snapshot: Rc<StatusSnapshot>,
    /// Unix seconds used for relative times
    pub now: i64,
    branch: OnceCell<BranchStatus>,
    cache: Option<&'a StateCache>,
}

impl<'a> BuildContext<'a> {
    pub fn new(
        repo: &'a GitRepo,
        config: &'a DashboardConfig,
        snapshot: Rc<StatusSnapshot>,
        now: i64,
    ) -> Self {
        Self {
            repo,
            config,
            snapshot,
            now,
            branch: OnceCell::new(),
            cache: None,
        }
    }

    /// Serve conflict reports from `cache` across builds
    pub fn with_cache(mut self, cache: &'a StateCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Branch status, queried on first use
    pub fn branch_status(&self) -> &BranchStatus {
        self.branch.get_or_init(|| self.repo.branch_status())
    }

    /// Active and potential conflicts of a merge with `tracking`
    pub fn conflict_report(&self, tracking: &str) -> Rc<ConflictReport> {
        let fetch = || self.repo.conflict_report(Some(tracking));
        match self.cache {
            Some(cache) => cache.conflicts_or_fetch(tracking, fetch),
            None => Rc::new(fetch()),
        }
    }
}

pub trait SectionProvider {
    fn build(&self, ctx: &BuildContext<'_>) -> ViewModel;

    /// Register or override the colours this provider's styles use
    fn setup_highlights(&self, _palette: &mut Palette) {}

    /// Style for end-of-line annotations, if the provider emits any
    fn annotation_style(&self) -> Option<Style> {
        None
    }
}

/// One entry of the fixed section order
#[derive(Clone)]
pub struct SectionDescriptor {
    pub key: SectionKey,
    pub provider: Rc<dyn SectionProvider>,
    pub header: Option<&'static str>,
    pub spacing_after: bool,
}

impl SectionDescriptor {
    pub fn new(key: SectionKey, provider: Rc<dyn SectionProvider>) -> Self {
        Self {
            key,
            provider,
            header: None,
            spacing_after: true,
        }
    }

    pub fn with_header(mut self, header: &'static str) -> Self {
        self.header = Some(header);
        self
    }

    pub fn without_spacing(mut self) -> Self {
        self.spacing_after = false;
        self
    }
}

impl fmt::Debug for SectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionDescriptor")
            .field("key", &self.key)
            .field("header", &self.header)
            .field("spacing_after", &self.spacing_after)
            .finish()
    }
}
