//! Diff presentation through an external pretty-printer.
//!
//! Diffs are handed off as a shell pipeline `<git diff ...> | <pager> <flags>`.
//! When the pager is not installed the plain git command is used instead and a
//! warning is returned for the user; the dashboard keeps working.

use crate::core::config::DashboardConfig;
use crate::core::process::ExternalCommand;
use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffPager {
    program: String,
    flags: Vec<String>,
    available: bool,
}

/// A ready-to-run display command plus an optional degradation warning
#[derive(Debug, Clone)]
pub struct PagedCommand {
    pub command: ExternalCommand,
    pub warning: Option<String>,
}

impl DiffPager {
    pub fn new(program: impl Into<String>, flags: Vec<String>, available: bool) -> Self {
        Self {
            program: program.into(),
            flags,
            available,
        }
    }

    /// Build from configuration, probing `PATH` for the pager program
    pub fn from_config(config: &DashboardConfig) -> Self {
        let available =
            !config.diff_pager.is_empty() && which::which(&config.diff_pager).is_ok();
        if !available {
            log::debug!("Diff pager '{}' not found on PATH", config.diff_pager);
        }
        Self::new(
            config.diff_pager.clone(),
            config.diff_pager_flags.clone(),
            available,
        )
    }

    /// Pipe `git <args>` through the pager when it is installed
    #[track_caller]
    pub fn pipeline(&self, git_args: &[&str]) -> PagedCommand {
        let git = std::iter::once("git")
            .chain(git_args.iter().copied())
            .map(quote)
            .collect::<Vec<_>>()
            .join(" ");

        if !self.available {
            return PagedCommand {
                command: ExternalCommand::shell(git),
                warning: Some(format!(
                    "'{}' is not installed; showing plain git output",
                    self.program
                )),
            };
        }

        let pager = std::iter::once(self.program.as_str())
            .chain(self.flags.iter().map(String::as_str))
            .map(quote)
            .collect::<Vec<_>>()
            .join(" ");
        PagedCommand {
            command: ExternalCommand::shell(format!("{git} | {pager}")),
            warning: None,
        }
    }
}

fn quote(word: &str) -> String {
    shell_escape::escape(Cow::Borrowed(word)).into_owned()
}
