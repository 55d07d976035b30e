//! Core functionality for git-dashboard.
//!
//! Everything below the view layer lives here: the wrapped git executable and
//! its runners, repository queries and mutations, snapshots and their cache,
//! asynchronous jobs, progress, pipelines, configuration and user output.

pub mod colors;
pub mod config;
pub mod dirs;
pub mod error;
pub mod git;
pub mod git_status;
pub mod index_parser;
pub mod jobs;
pub mod output;
pub mod pager;
pub mod parse;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod state;

// === Error handling ===
pub use error::{DashboardError, Result};

// === Git operations ===
pub use git::{GitRepo, ResetKind};
pub use git_status::GitStatus;

// === External commands ===
// Every git invocation goes through a runner so it can be logged or replaced
pub use process::{
    CommandOutput, CommandRunner, ExternalCommand, InvocationLog, InvocationRecord, ProcessRunner,
    RecordingRunner,
};
pub use jobs::{AsyncOptions, JobEvent, JobHandle, JobOutcome, JobRegistry};
pub use pipeline::{Pipeline, PipelineOutcome, Step};
pub use progress::{Level, Notifications, Notifier, Progress};

// === State ===
pub use state::{
    BranchDetail, BranchStatus, CommitEntry, ConflictReport, FileEntry, StagingArea, StateCache,
    StatusSnapshot,
};

// === Line lists ===
// "1 3-5,8" -> [1, 3, 4, 5, 8]
pub use index_parser::IndexParser;

pub use config::DashboardConfig;
pub use pager::{DiffPager, PagedCommand};

// === Output formatting ===
pub use colors::{Paint, Palette};
pub use output::{
    print_error, print_info, print_notification, print_section_header, print_success,
    print_warning,
};
