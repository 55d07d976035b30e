//! Domain-specific error types and error handling utilities.
//!
//! This module defines [`DashboardError`] which covers every failure mode of the
//! dashboard engine. It uses `thiserror` for ergonomic error definitions and
//! includes constructors for the common failure scenarios.
//!
//! # Public API
//! - [`DashboardError`]: Main error enum covering all failure modes
//! - [`Result<T>`]: Type alias for `std::result::Result<T, DashboardError>`
//!
//! # Error Categories
//! - **External commands**: non-zero exit of the wrapped git executable
//! - **Preconditions**: operations refused before any external call (warnings)
//! - **Guards**: destructive operations declined at the confirmation prompt
//! - **Line addressing**: cursor lines outside the view or without an action
//! - **Index parsing**: invalid line lists such as `3-1` or `abc`

use std::path::PathBuf;
use thiserror::Error;

/// Domain-specific error types for the dashboard
#[derive(Error, Debug)]
pub enum DashboardError {
    // Repository errors
    #[error("Not in a git repository")]
    NotInGitRepo,

    #[error("Git repository error: {0}")]
    GitRepo(#[from] git2::Error),

    #[error("Repository has no working directory")]
    NoWorkdir,

    // File operation errors
    #[error("File does not exist: {path}")]
    FileNotFound { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // External command errors
    #[error("`{command}` failed (exit {exit_status}): {stderr}")]
    CommandFailed {
        command: String,
        stderr: String,
        exit_status: i32,
    },

    #[error("{message}")]
    Precondition { message: String },

    #[error("Cancelled: {action}")]
    Declined { action: String },

    // Line addressing errors
    #[error("Line {line} is out of range (1-{max} available)")]
    LineOutOfRange { line: usize, max: usize },

    #[error("No {action} action on line {line}")]
    NoAction { action: String, line: usize },

    // Index parsing errors
    #[error("No line numbers provided")]
    NoIndicesProvided,

    #[error("Invalid range format: '{range}'. Use format like '3-6'")]
    InvalidRangeFormat { range: String },

    #[error("Invalid number in range: '{number}'")]
    InvalidRangeNumber { number: String },

    #[error("Invalid range: start ({start}) must be <= end ({end})")]
    InvalidRangeOrder { start: usize, end: usize },

    #[error("Invalid number: '{number}'")]
    InvalidNumber { number: String },

    #[error("Line number must be positive (got 0)")]
    ZeroIndex,

    #[error("Unknown input: '{input}'")]
    UnknownInput { input: String },
}

/// Convenience type alias for Results using DashboardError
pub type Result<T> = std::result::Result<T, DashboardError>;

impl DashboardError {
    /// Create an external command failure from captured stderr
    pub fn command_failed(command: impl Into<String>, stderr: &str, exit_status: i32) -> Self {
        let stderr = stderr.trim();
        Self::CommandFailed {
            command: command.into(),
            stderr: if stderr.is_empty() {
                "no error output".to_string()
            } else {
                stderr.to_string()
            },
            exit_status,
        }
    }

    /// Create a precondition failure, reported to the user as a warning
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    /// Create a declined-confirmation error
    pub fn declined(action: impl Into<String>) -> Self {
        Self::Declined {
            action: action.into(),
        }
    }

    /// Create a file not found error
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a line out of range error
    pub fn line_out_of_range(line: usize, max: usize) -> Self {
        Self::LineOutOfRange { line, max }
    }

    /// Create a missing-action error
    pub fn no_action(action: impl Into<String>, line: usize) -> Self {
        Self::NoAction {
            action: action.into(),
            line,
        }
    }

    /// Create an invalid range format error
    pub fn invalid_range_format(range: impl Into<String>) -> Self {
        Self::InvalidRangeFormat {
            range: range.into(),
        }
    }

    /// Create an invalid range number error
    pub fn invalid_range_number(number: impl Into<String>) -> Self {
        Self::InvalidRangeNumber {
            number: number.into(),
        }
    }

    /// Create an invalid range order error
    pub fn invalid_range_order(start: usize, end: usize) -> Self {
        Self::InvalidRangeOrder { start, end }
    }

    /// Create an invalid number error
    pub fn invalid_number(number: impl Into<String>) -> Self {
        Self::InvalidNumber {
            number: number.into(),
        }
    }

    /// Warnings are refused or declined operations; nothing was attempted.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::Precondition { .. } | Self::Declined { .. } | Self::NoAction { .. }
        )
    }
}
