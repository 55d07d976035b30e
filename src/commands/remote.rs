//! Pipeline commands run outside the interactive loop.
//!
//! They still go through the asynchronous runner with a spinner; a local
//! loop drains job events until the pipeline finishes.

use crate::commands::init::{print_invocation_log, CommandInit, GlobalOptions, HostMode};
use crate::core::error::{DashboardError, Result};
use crate::dashboard::host::TerminalHost;
use crate::dashboard::session::Session;

fn run_pipeline(
    options: &GlobalOptions,
    assume_yes: bool,
    start: impl FnOnce(&mut Session<TerminalHost>) -> Result<()>,
) -> Result<()> {
    let init = CommandInit::new(options)?;
    let (mut session, source) = init.into_session(HostMode::Batch { assume_yes });

    start(&mut session)?;
    session.wait_until_idle(&source);
    session.flush_notifications();

    if let Some(log) = session.invocation_log() {
        print_invocation_log(log);
    }
    match session.failed_pipelines().first() {
        Some(label) => Err(DashboardError::precondition(format!(
            "{label} did not complete"
        ))),
        None => Ok(()),
    }
}

pub fn execute_pull(options: &GlobalOptions) -> Result<()> {
    run_pipeline(options, false, |session| {
        session.start_pull();
        Ok(())
    })
}

pub fn execute_push(options: &GlobalOptions) -> Result<()> {
    run_pipeline(options, false, |session| {
        session.start_push();
        Ok(())
    })
}

/// Squash the current branch into the tracking branch; declined unless `assume_yes`
pub fn execute_squash_merge(options: &GlobalOptions, assume_yes: bool) -> Result<()> {
    run_pipeline(options, assume_yes, |session| session.start_squash_merge())
}
