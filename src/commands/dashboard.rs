use crate::commands::init::{print_invocation_log, CommandInit, GlobalOptions, HostMode};
use crate::core::error::Result;
use crate::core::output::print_info;

/// Run the interactive dashboard until the user quits or stdin closes
pub fn execute_dashboard(options: &GlobalOptions) -> Result<()> {
    let init = CommandInit::new(options)?;
    let (mut session, source) = init.into_session(HostMode::Interactive);

    print_info("Lines: <n> activate, s cycle, S stage/unstage all, x discard, o open");
    print_info("Keys: r refresh, p pull, P push, c commit, m squash-merge, C cancel, q quit");
    session.run(&source);

    if let Some(log) = session.invocation_log() {
        print_invocation_log(log);
    }
    Ok(())
}
