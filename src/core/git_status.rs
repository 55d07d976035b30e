//! Type-safe git file status enumeration.
//!
//! This module defines [`GitStatus`] which replaces the raw one- and two-letter
//! porcelain codes with a proper enumeration.
//!
//! # Public API
//! - [`GitStatus`]: Main enumeration for all git file status types
//!
//! # Key Features
//! - **Porcelain parsing**: Direct conversion from the `X`/`Y` columns of
//!   `git status --porcelain`
//! - **Display formatting**: The same one- or two-letter code git prints

use serde::{Deserialize, Serialize};
use std::fmt;

/// Git file status as reported in one column of a porcelain status line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GitStatus {
    /// Modified file (M)
    Modified,
    /// Added/new file in index (A)
    Added,
    /// Deleted file (D)
    Deleted,
    /// Renamed file (R)
    Renamed,
    /// Copied file (C)
    Copied,
    /// Type changed (T)
    TypeChanged,
    /// Untracked file (??)
    Untracked,
    /// Unmerged/conflicted file (UU)
    Unmerged,
}

impl GitStatus {
    /// Convert one porcelain column into a status.
    ///
    /// Blank columns and unknown letters yield `None`.
    pub fn from_porcelain(column: char) -> Option<GitStatus> {
        match column {
            'M' => Some(GitStatus::Modified),
            'A' => Some(GitStatus::Added),
            'D' => Some(GitStatus::Deleted),
            'R' => Some(GitStatus::Renamed),
            'C' => Some(GitStatus::Copied),
            'T' => Some(GitStatus::TypeChanged),
            '?' => Some(GitStatus::Untracked),
            'U' => Some(GitStatus::Unmerged),
            _ => None,
        }
    }

    /// Whether an `XY` pair denotes an unresolved merge conflict
    pub fn is_unmerged_pair(x: char, y: char) -> bool {
        matches!(
            (x, y),
            ('D', 'D') | ('A', 'U') | ('U', 'D') | ('U', 'A') | ('D', 'U') | ('A', 'A') | ('U', 'U')
        )
    }

    /// Get the string representation for display
    pub fn as_str(&self) -> &'static str {
        match self {
            GitStatus::Modified => "M",
            GitStatus::Added => "A",
            GitStatus::Deleted => "D",
            GitStatus::Renamed => "R",
            GitStatus::Copied => "C",
            GitStatus::TypeChanged => "T",
            GitStatus::Untracked => "??",
            GitStatus::Unmerged => "UU",
        }
    }

    /// Get human-readable description for status
    pub fn description(&self) -> &'static str {
        match self {
            GitStatus::Modified => "modified",
            GitStatus::Added => "new",
            GitStatus::Deleted => "deleted",
            GitStatus::Renamed => "renamed",
            GitStatus::Copied => "copied",
            GitStatus::TypeChanged => "type changed",
            GitStatus::Untracked => "untracked",
            GitStatus::Unmerged => "both modified",
        }
    }
}

impl fmt::Display for GitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
