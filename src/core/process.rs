//! External process execution.
//!
//! Every interaction with git goes through an [`ExternalCommand`] handed to a
//! [`CommandRunner`]. The blocking [`ProcessRunner`] is the production runner;
//! asynchronous execution lives in [`crate::core::jobs`].
//!
//! Failure is reported through [`CommandOutput::exit_status`], never by
//! returning an error: callers check [`CommandOutput::success`] explicitly.
//! A command that cannot even be spawned reports exit status 127 with the
//! spawn error as its stderr.
//!
//! # Invocation recording
//! When an [`InvocationLog`] is attached, every finished command is recorded
//! with its duration, the source location that built it and a truncated copy
//! of its command text. Without a log nothing is recorded.

use std::cell::RefCell;
use std::fmt;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Exit status reported when the process could not be started at all
pub const SPAWN_FAILURE_STATUS: i32 = 127;

/// Exit status reported when the process was killed by a signal
pub const SIGNALLED_STATUS: i32 = -1;

const RECORDED_COMMAND_WIDTH: usize = 80;

/// A program invocation: program, arguments and optional working directory.
///
/// The source location that constructed the command is captured so recorded
/// invocations can point back at their originating call site.
#[derive(Debug, Clone)]
pub struct ExternalCommand {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    origin: &'static Location<'static>,
}

impl ExternalCommand {
    #[track_caller]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            origin: Location::caller(),
        }
    }

    /// A `git` invocation with the given arguments
    #[track_caller]
    pub fn git<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut command = Self::new("git");
        command.args.extend(args.into_iter().map(Into::into));
        command
    }

    /// A shell pipeline run through `sh -c`
    #[track_caller]
    pub fn shell(pipeline: impl Into<String>) -> Self {
        let mut command = Self::new("sh");
        command.args.push("-c".to_string());
        command.args.push(pipeline.into());
        command
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn origin(&self) -> &'static Location<'static> {
        self.origin
    }

    /// Build the std command, running in `default_dir` unless a directory was set
    pub(crate) fn to_std(&self, default_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.current_dir(self.current_dir.as_deref().unwrap_or(default_dir));
        cmd
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.program == "sh" && self.args.len() == 2 && self.args[0] == "-c" {
            return write!(f, "{}", self.args[1]);
        }
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_status: i32,
    pub duration: Duration,
}

impl CommandOutput {
    /// A successful output with the given stdout, mostly useful for tests
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            ..Default::default()
        }
    }

    /// A failed output with the given status and stderr
    pub fn failed(exit_status: i32, stderr: impl Into<String>) -> Self {
        Self {
            stderr: stderr.into(),
            exit_status,
            ..Default::default()
        }
    }

    pub fn success(&self) -> bool {
        self.exit_status == 0
    }

    /// Non-empty stdout lines
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines().filter(|line| !line.trim().is_empty())
    }

    /// Convert a non-zero exit into a [`DashboardError::CommandFailed`]
    ///
    /// [`DashboardError::CommandFailed`]: crate::core::error::DashboardError::CommandFailed
    pub fn into_result(self, command: &ExternalCommand) -> crate::core::Result<CommandOutput> {
        if self.success() {
            Ok(self)
        } else {
            Err(crate::core::DashboardError::command_failed(
                command.to_string(),
                &self.stderr,
                self.exit_status,
            ))
        }
    }
}

/// The seam between the dashboard and the processes it launches
pub trait CommandRunner {
    /// Run to completion, blocking the caller
    fn run(&self, command: &ExternalCommand) -> CommandOutput;

    /// Directory commands run in unless they set their own
    fn workdir(&self) -> &Path;
}

impl<R: CommandRunner + ?Sized> CommandRunner for Rc<R> {
    fn run(&self, command: &ExternalCommand) -> CommandOutput {
        (**self).run(command)
    }

    fn workdir(&self) -> &Path {
        (**self).workdir()
    }
}

/// One recorded invocation
#[derive(Debug, Clone)]
pub struct InvocationRecord {
    pub command: String,
    pub origin: String,
    pub duration: Duration,
    pub exit_status: i32,
    pub asynchronous: bool,
}

/// Opt-in record of every external invocation
#[derive(Debug, Default)]
pub struct InvocationLog {
    records: RefCell<Vec<InvocationRecord>>,
}

impl InvocationLog {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn record(&self, command: &ExternalCommand, output: &CommandOutput, asynchronous: bool) {
        let origin = command.origin();
        self.records.borrow_mut().push(InvocationRecord {
            command: truncate_command(&command.to_string()),
            origin: format!("{}:{}", origin.file(), origin.line()),
            duration: output.duration,
            exit_status: output.exit_status,
            asynchronous,
        });
    }

    pub fn records(&self) -> Vec<InvocationRecord> {
        self.records.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }
}

fn truncate_command(text: &str) -> String {
    if text.chars().count() <= RECORDED_COMMAND_WIDTH {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(RECORDED_COMMAND_WIDTH - 1).collect();
    truncated.push('…');
    truncated
}

/// Blocking process runner rooted at a repository working directory
pub struct ProcessRunner {
    workdir: PathBuf,
    log: Option<Rc<InvocationLog>>,
}

impl ProcessRunner {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            log: None,
        }
    }

    /// Record every invocation into `log`
    pub fn with_log(mut self, log: Rc<InvocationLog>) -> Self {
        self.log = Some(log);
        self
    }

    pub fn log(&self) -> Option<&Rc<InvocationLog>> {
        self.log.as_ref()
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, command: &ExternalCommand) -> CommandOutput {
        log::debug!("$ {command}");
        let started = Instant::now();

        let output = match command.to_std(&self.workdir).output() {
            Ok(output) => CommandOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_status: output.status.code().unwrap_or(SIGNALLED_STATUS),
                duration: started.elapsed(),
            },
            Err(e) => {
                log::warn!("Failed to start `{command}`: {e}");
                CommandOutput {
                    stderr: e.to_string(),
                    exit_status: SPAWN_FAILURE_STATUS,
                    duration: started.elapsed(),
                    ..Default::default()
                }
            }
        };

        log::debug!(
            "`{}` finished in {:?} with exit status {}",
            command,
            output.duration,
            output.exit_status
        );
        if let Some(log) = &self.log {
            log.record(command, &output, false);
        }
        output
    }

    fn workdir(&self) -> &Path {
        &self.workdir
    }
}

/// Runner that answers from canned responses and remembers every command.
///
/// Responses are matched by command-text prefix, first registered first; an
/// unmatched command succeeds with empty output.
pub struct RecordingRunner {
    workdir: PathBuf,
    responses: Vec<(String, CommandOutput)>,
    calls: RefCell<Vec<String>>,
}

impl RecordingRunner {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            responses: Vec::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn respond(mut self, prefix: impl Into<String>, output: CommandOutput) -> Self {
        self.responses.push((prefix.into(), output));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, command: &ExternalCommand) -> CommandOutput {
        let text = command.to_string();
        let output = self
            .responses
            .iter()
            .find(|(prefix, _)| text.starts_with(prefix.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_default();
        self.calls.borrow_mut().push(text);
        output
    }

    fn workdir(&self) -> &Path {
        &self.workdir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_display_quotes_arguments_with_spaces() {
        let command = ExternalCommand::git(["commit", "-m", "two words"]);
        assert_eq!(command.to_string(), "git commit -m 'two words'");
    }

    #[test]
    fn test_shell_display_is_the_pipeline() {
        let command = ExternalCommand::shell("git diff | delta");
        assert_eq!(command.to_string(), "git diff | delta");
    }

    #[test]
    fn test_origin_points_at_construction_site() {
        let command = ExternalCommand::git(["status"]);
        assert!(command.origin().file().ends_with("process.rs"));
    }

    #[test]
    fn test_run_captures_stdout_and_status() {
        let dir = TempDir::new().unwrap();
        let runner = ProcessRunner::new(dir.path());
        let output = runner.run(&ExternalCommand::shell("echo hello; exit 3"));
        assert_eq!(output.stdout.trim(), "hello");
        assert_eq!(output.exit_status, 3);
        assert!(!output.success());
    }

    #[test]
    fn test_spawn_failure_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let runner = ProcessRunner::new(dir.path());
        let output = runner.run(&ExternalCommand::new("definitely-not-a-real-binary-xyz"));
        assert_eq!(output.exit_status, SPAWN_FAILURE_STATUS);
        assert!(!output.stderr.is_empty());
    }

    #[test]
    fn test_recording_is_opt_in() {
        let dir = TempDir::new().unwrap();
        let unrecorded = ProcessRunner::new(dir.path());
        assert!(unrecorded.log().is_none());
        unrecorded.run(&ExternalCommand::shell("true"));

        let log = InvocationLog::new();
        let recorded = ProcessRunner::new(dir.path()).with_log(log.clone());
        recorded.run(&ExternalCommand::shell("true"));
        recorded.run(&ExternalCommand::shell("false"));

        let records = log.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].exit_status, 0);
        assert_eq!(records[1].exit_status, 1);
        assert!(records[0].origin.contains("process.rs"));
    }

    #[test]
    fn test_recorded_command_is_truncated() {
        let long = "x".repeat(200);
        let truncated = truncate_command(&long);
        assert_eq!(truncated.chars().count(), RECORDED_COMMAND_WIDTH);
        assert!(truncated.ends_with('…'));
    }

    #[test]
    fn test_recording_runner_matches_prefixes() {
        let runner = RecordingRunner::new("/tmp")
            .respond("git rev-parse", CommandOutput::failed(128, "no upstream"))
            .respond("git status", CommandOutput::ok(" M a.txt\n"));
        assert_eq!(runner.run(&ExternalCommand::git(["status"])).stdout, " M a.txt\n");
        assert_eq!(runner.run(&ExternalCommand::git(["rev-parse", "HEAD"])).exit_status, 128);
        assert!(runner.run(&ExternalCommand::git(["push"])).success());
        assert_eq!(runner.calls(), vec!["git status", "git rev-parse HEAD", "git push"]);
    }

    #[test]
    fn test_into_result() {
        let command = ExternalCommand::git(["push"]);
        assert!(CommandOutput::ok("").into_result(&command).is_ok());
        let err = CommandOutput::failed(1, "rejected")
            .into_result(&command)
            .unwrap_err();
        assert!(err.to_string().contains("rejected"));
    }
}
