//! Git Dashboard - an interactive, line-addressable dashboard over a git working tree.
//!
//! The dashboard is a vertical stack of sections (head, tracking branch, recent
//! commits, staged, modified and untracked files). Every line is addressed by
//! its 1-based number and may carry actions: activate, cycle, bulk-cycle,
//! destroy and open-externally.
//!
//! # Public API
//! - [`core`]: git access through a command runner, snapshots and their cache,
//!   asynchronous jobs with progress, pipelines, configuration and output
//! - [`dashboard`]: view models, composition, dispatch, hosts and the control loop
//! - [`providers`]: the built-in sections
//! - [`commands`]: entry points behind the command-line interface

pub mod commands;
pub mod core;
pub mod dashboard;
pub mod providers;

pub use core::{
    // Error handling
    DashboardError,
    Result,

    // Git operations
    GitRepo,
    GitStatus,
    IndexParser,

    // State management
    StateCache,
    StatusSnapshot,
};

pub use dashboard::{ActionKind, ComposedView, Session, ViewHost};
