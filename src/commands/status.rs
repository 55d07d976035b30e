use crate::commands::init::{print_invocation_log, CommandInit, GlobalOptions, HostMode};
use crate::core::error::Result;

/// Compose the dashboard once and print it
pub fn execute_status(options: &GlobalOptions) -> Result<()> {
    let init = CommandInit::new(options)?;
    let (mut session, _source) = init.into_session(HostMode::Batch { assume_yes: false });

    session.recompose();
    session.render();

    if let Some(log) = session.invocation_log() {
        print_invocation_log(log);
    }
    Ok(())
}
