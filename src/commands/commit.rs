use crate::commands::init::{CommandInit, GlobalOptions, HostMode};
use crate::core::error::Result;

/// Commit what is staged with `message`
pub fn execute_commit(options: &GlobalOptions, message: &str) -> Result<()> {
    let init = CommandInit::new(options)?;
    let (mut session, _source) = init.into_session(HostMode::Batch { assume_yes: false });

    session.commit(message)?;
    session.flush_notifications();
    Ok(())
}
