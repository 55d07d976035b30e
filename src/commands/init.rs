//! Shared setup for every command.
//!
//! [`CommandInit`] loads the configuration, opens the repository discovered
//! from the current directory and, when asked, attaches an invocation log.
//! [`CommandInit::into_session`] then wires a [`Session`] to a terminal host.

use crate::core::config::DashboardConfig;
use crate::core::error::Result;
use crate::core::git::GitRepo;
use crate::core::output::print_section_header;
use crate::core::process::InvocationLog;
use crate::dashboard::events::{spawn_stdin_reader, EventSource};
use crate::dashboard::host::{PromptSource, TerminalHost};
use crate::dashboard::session::Session;
use colored::*;
use std::cell::RefCell;
use std::env;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc;

/// Flags accepted by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub trace_commands: bool,
}

/// How the terminal host gets its answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostMode {
    /// Typed answers on stdin, through the control loop
    Interactive,
    /// No prompts; confirmations answer `assume_yes`
    Batch { assume_yes: bool },
}

pub struct CommandInit {
    pub config: DashboardConfig,
    pub log: Option<Rc<InvocationLog>>,
    pub repo: GitRepo,
}

impl CommandInit {
    pub fn new(options: &GlobalOptions) -> Result<Self> {
        let config = DashboardConfig::load(options.config.as_deref());
        let log = (options.trace_commands || config.trace_commands).then(InvocationLog::new);

        let current_dir = env::current_dir()?;
        let repo = GitRepo::open_with_log(&current_dir, log.clone())?;
        log::debug!("Opened repository at {}", repo.workdir().display());

        Ok(Self { config, log, repo })
    }

    /// Build a session whose host answers according to `mode`
    pub fn into_session(
        self,
        mode: HostMode,
    ) -> (Session<TerminalHost>, Rc<RefCell<EventSource>>) {
        let (sender, receiver) = mpsc::channel();
        let mut source = EventSource::new(receiver);
        if mode == HostMode::Interactive {
            source = source.with_input_gate(spawn_stdin_reader(sender.clone()));
        }
        let source = Rc::new(RefCell::new(source));

        let prompts = match mode {
            HostMode::Interactive => PromptSource::Interactive(Rc::clone(&source)),
            HostMode::Batch { assume_yes } => PromptSource::Batch { assume_yes },
        };
        let host = TerminalHost::new(self.repo.workdir(), prompts);
        let session = Session::new(self.repo, self.config, host, sender).with_log(self.log);
        (session, source)
    }
}

/// Print every recorded external invocation as a table
pub fn print_invocation_log(log: &InvocationLog) {
    print_section_header(&format!("External commands ({})", log.len()));
    for record in log.records() {
        let status = if record.exit_status == 0 {
            record.exit_status.to_string().green()
        } else {
            record.exit_status.to_string().red()
        };
        let mode = if record.asynchronous { "async" } else { "sync" };
        println!(
            "{:>8} {:>4} {:<5} {} {}",
            format!("{}ms", record.duration.as_millis()).dimmed(),
            status,
            mode,
            record.command,
            record.origin.dimmed()
        );
    }
}
