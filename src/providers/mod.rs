//! The dashboard's sections.
//!
//! Each provider turns repository state into one section's view model:
//! - [`branch`]: `Head:` line with ahead/behind/conflict indicators
//! - [`tracking`]: the tracking-branch preference
//! - [`commits`]: recent history
//! - [`staging`]: staged, modified and untracked files (one builder, three sections)

pub mod branch;
pub mod commits;
pub mod staging;
pub mod tracking;

use crate::core::state::StagingArea;
use crate::dashboard::provider::{SectionDescriptor, SectionKey};
use std::rc::Rc;

pub use branch::BranchProvider;
pub use commits::CommitsProvider;
pub use staging::StagingProvider;
pub use tracking::TrackingProvider;

/// The fixed section order of the dashboard
pub fn default_sections() -> Vec<SectionDescriptor> {
    vec![
        // Tracking reads as a continuation of the head line
        SectionDescriptor::new(SectionKey::Branch, Rc::new(BranchProvider)).without_spacing(),
        SectionDescriptor::new(SectionKey::Tracking, Rc::new(TrackingProvider)),
        SectionDescriptor::new(SectionKey::Commits, Rc::new(CommitsProvider))
            .with_header("Recent commits"),
        SectionDescriptor::new(
            SectionKey::Staged,
            Rc::new(StagingProvider::new(StagingArea::Staged)),
        ),
        SectionDescriptor::new(
            SectionKey::Modified,
            Rc::new(StagingProvider::new(StagingArea::Modified)),
        ),
        SectionDescriptor::new(
            SectionKey::Untracked,
            Rc::new(StagingProvider::new(StagingArea::Untracked)),
        ),
    ]
}
