//! Asynchronous external commands.
//!
//! [`JobRegistry::spawn`] starts a process and returns immediately. Helper
//! threads stream its output and report its exit as [`JobEvent`]s over the
//! control loop's channel; the loop turns each event back into the caller's
//! callback with [`JobRegistry::resolve`]. Callbacks therefore run only on the
//! loop, one at a time.
//!
//! A job stays in the registry until its exit event is resolved, whether it
//! succeeded, failed or was killed by [`JobRegistry::cancel_all`].

use crate::core::process::{
    CommandOutput, ExternalCommand, InvocationLog, SIGNALLED_STATUS, SPAWN_FAILURE_STATUS,
};
use crate::core::progress::ProgressHandle;
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Stdio};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub type JobId = u64;

/// Raw notifications from a job's helper threads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Stdout { job: JobId, line: String },
    Stderr { job: JobId, line: String },
    Exit { job: JobId, output: CommandOutput },
}

/// What `on_exit` receives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub output: CommandOutput,
    pub cancelled: bool,
}

impl JobOutcome {
    pub fn success(&self) -> bool {
        !self.cancelled && self.output.success()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub id: JobId,
    pub command: String,
    pub started: Instant,
}

pub type LineCallback<C> = Rc<dyn Fn(&mut C, &str)>;
pub type ExitCallback<C> = Box<dyn FnOnce(&mut C, JobOutcome)>;

/// Callbacks and presentation options for one asynchronous command
pub struct AsyncOptions<C> {
    pub on_stdout_line: Option<LineCallback<C>>,
    pub on_stderr_line: Option<LineCallback<C>>,
    pub on_exit: Option<ExitCallback<C>>,
    pub show_progress: bool,
}

impl<C> Default for AsyncOptions<C> {
    fn default() -> Self {
        Self {
            on_stdout_line: None,
            on_stderr_line: None,
            on_exit: None,
            show_progress: false,
        }
    }
}

impl<C> AsyncOptions<C> {
    pub fn on_exit(mut self, callback: impl FnOnce(&mut C, JobOutcome) + 'static) -> Self {
        self.on_exit = Some(Box::new(callback));
        self
    }

    pub fn on_stdout_line(mut self, callback: impl Fn(&mut C, &str) + 'static) -> Self {
        self.on_stdout_line = Some(Rc::new(callback));
        self
    }

    pub fn on_stderr_line(mut self, callback: impl Fn(&mut C, &str) + 'static) -> Self {
        self.on_stderr_line = Some(Rc::new(callback));
        self
    }

    pub fn with_progress(mut self) -> Self {
        self.show_progress = true;
        self
    }
}

/// Work for the control loop produced by [`JobRegistry::resolve`]
pub enum JobDispatch<C> {
    Line {
        callback: LineCallback<C>,
        line: String,
    },
    Exit {
        handle: JobHandle,
        outcome: JobOutcome,
        callback: Option<ExitCallback<C>>,
        progress: Option<ProgressHandle>,
    },
}

struct LiveJob<C> {
    handle: JobHandle,
    command: ExternalCommand,
    child: Option<Arc<Mutex<Child>>>,
    cancelled: Arc<AtomicBool>,
    on_stdout_line: Option<LineCallback<C>>,
    on_stderr_line: Option<LineCallback<C>>,
    on_exit: Option<ExitCallback<C>>,
    progress: Option<ProgressHandle>,
}

/// Live asynchronous jobs keyed by id
pub struct JobRegistry<C> {
    workdir: PathBuf,
    next_id: JobId,
    live: BTreeMap<JobId, LiveJob<C>>,
    log: Option<Rc<InvocationLog>>,
}

impl<C> JobRegistry<C> {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            next_id: 0,
            live: BTreeMap::new(),
            log: None,
        }
    }

    pub fn with_log(mut self, log: Option<Rc<InvocationLog>>) -> Self {
        self.log = log;
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Launch `command` without waiting for it.
    ///
    /// A command that cannot be started still completes through `on_exit`,
    /// with exit status 127.
    pub fn spawn<E>(
        &mut self,
        command: ExternalCommand,
        options: AsyncOptions<C>,
        progress: Option<ProgressHandle>,
        events: &Sender<E>,
    ) -> JobHandle
    where
        E: From<JobEvent> + Send + 'static,
    {
        self.next_id += 1;
        let id = self.next_id;
        let handle = JobHandle {
            id,
            command: command.to_string(),
            started: Instant::now(),
        };
        log::debug!("$ {command} (job {id})");

        let cancelled = Arc::new(AtomicBool::new(false));
        let mut cmd = command.to_std(&self.workdir);
        // Own process group, so cancelling also reaches anything the job forks
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        let child = match cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(mut child) => {
                let stdout = child.stdout.take();
                let stderr = child.stderr.take();
                let child = Arc::new(Mutex::new(child));
                watch_child(id, Arc::clone(&child), stdout, stderr, handle.started, events);
                Some(child)
            }
            Err(e) => {
                log::warn!("Failed to start `{command}`: {e}");
                let output = CommandOutput::failed(SPAWN_FAILURE_STATUS, e.to_string());
                // The receiver lives as long as the loop; a closed channel means shutdown
                let _ = events.send(E::from(JobEvent::Exit { job: id, output }));
                None
            }
        };

        self.live.insert(
            id,
            LiveJob {
                handle: handle.clone(),
                command,
                child,
                cancelled,
                on_stdout_line: options.on_stdout_line,
                on_stderr_line: options.on_stderr_line,
                on_exit: options.on_exit,
                progress,
            },
        );
        handle
    }

    /// Map a raw event to the callback it should trigger.
    ///
    /// Exit events remove the job from the registry. Events for unknown jobs
    /// resolve to nothing.
    pub fn resolve(&mut self, event: JobEvent) -> Option<JobDispatch<C>> {
        match event {
            JobEvent::Stdout { job, line } => {
                let callback = self.live.get(&job)?.on_stdout_line.clone()?;
                Some(JobDispatch::Line { callback, line })
            }
            JobEvent::Stderr { job, line } => {
                let callback = self.live.get(&job)?.on_stderr_line.clone()?;
                Some(JobDispatch::Line { callback, line })
            }
            JobEvent::Exit { job, output } => {
                let live = self.live.remove(&job)?;
                let cancelled = live.cancelled.load(Ordering::Relaxed);
                log::debug!(
                    "Job {} `{}` exited with {} after {:?}{}",
                    job,
                    live.handle.command,
                    output.exit_status,
                    output.duration,
                    if cancelled { " (cancelled)" } else { "" }
                );
                if let Some(log) = &self.log {
                    log.record(&live.command, &output, true);
                }
                Some(JobDispatch::Exit {
                    handle: live.handle,
                    outcome: JobOutcome { output, cancelled },
                    callback: live.on_exit,
                    progress: live.progress,
                })
            }
        }
    }

    /// Kill every live job's process; their exits still arrive as events
    pub fn cancel_all(&mut self) -> usize {
        let mut killed = 0;
        for job in self.live.values() {
            job.cancelled.store(true, Ordering::Relaxed);
            let Some(child) = &job.child else {
                continue;
            };
            match child.lock() {
                Ok(mut child) => match kill_tree(&mut child) {
                    Ok(()) => killed += 1,
                    Err(e) => log::debug!("Job {} already finished: {e}", job.handle.id),
                },
                Err(_) => log::warn!("Job {} process lock poisoned", job.handle.id),
            }
        }
        if killed > 0 {
            log::debug!("Cancelled {killed} running job(s)");
        }
        killed
    }

    pub fn live_jobs(&self) -> Vec<JobHandle> {
        self.live.values().map(|job| job.handle.clone()).collect()
    }

    pub fn is_idle(&self) -> bool {
        self.live.is_empty()
    }
}

fn stream_lines<R, E, F>(source: Option<R>, events: Sender<E>, wrap: F) -> JoinHandle<String>
where
    R: Read + Send + 'static,
    E: From<JobEvent> + Send + 'static,
    F: Fn(String) -> JobEvent + Send + 'static,
{
    std::thread::spawn(move || {
        let mut collected = String::new();
        let Some(source) = source else {
            return collected;
        };
        for line in BufReader::new(source).lines() {
            let Ok(line) = line else {
                break;
            };
            collected.push_str(&line);
            collected.push('\n');
            if events.send(E::from(wrap(line))).is_err() {
                break;
            }
        }
        collected
    })
}

fn watch_child<E>(
    id: JobId,
    child: Arc<Mutex<Child>>,
    stdout: Option<std::process::ChildStdout>,
    stderr: Option<std::process::ChildStderr>,
    started: Instant,
    events: &Sender<E>,
) where
    E: From<JobEvent> + Send + 'static,
{
    let stdout_reader = stream_lines(stdout, events.clone(), move |line| JobEvent::Stdout {
        job: id,
        line,
    });
    let stderr_reader = stream_lines(stderr, events.clone(), move |line| JobEvent::Stderr {
        job: id,
        line,
    });

    let sender = events.clone();
    std::thread::spawn(move || {
        let exit_status = loop {
            let polled = match child.lock() {
                Ok(mut child) => child.try_wait(),
                Err(_) => break SIGNALLED_STATUS,
            };
            match polled {
                Ok(Some(status)) => break status.code().unwrap_or(SIGNALLED_STATUS),
                Ok(None) => std::thread::sleep(EXIT_POLL_INTERVAL),
                Err(e) => {
                    log::warn!("Waiting on job {id} failed: {e}");
                    break SIGNALLED_STATUS;
                }
            }
        };

        // Line events must all precede the exit event
        let stdout = stdout_reader.join().unwrap_or_default();
        let stderr = stderr_reader.join().unwrap_or_default();
        let output = CommandOutput {
            stdout,
            stderr,
            exit_status,
            duration: started.elapsed(),
        };
        let _ = sender.send(E::from(JobEvent::Exit { job: id, output }));
    });
}

/// Kill the job's whole process group.
///
/// Forked descendants hold the output pipes open; killing only the direct
/// child would leave the readers, and so the exit event, waiting on them.
#[cfg(unix)]
fn kill_tree(child: &mut Child) -> std::io::Result<()> {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let pgid = Pid::from_raw(child.id() as i32);
    killpg(pgid, Signal::SIGKILL).map_err(std::io::Error::from)
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) -> std::io::Result<()> {
    child.kill()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::{self, Receiver};
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        stdout: Vec<String>,
        stderr: Vec<String>,
        exits: Vec<JobOutcome>,
    }

    fn drain(registry: &mut JobRegistry<Recorder>, rx: &Receiver<JobEvent>, ctx: &mut Recorder) {
        while !registry.is_idle() {
            let event = rx.recv_timeout(Duration::from_secs(10)).unwrap();
            match registry.resolve(event) {
                Some(JobDispatch::Line { callback, line }) => callback(ctx, &line),
                Some(JobDispatch::Exit { outcome, callback, .. }) => {
                    if let Some(callback) = callback {
                        callback(ctx, outcome);
                    }
                }
                None => {}
            }
        }
    }

    fn recording_options() -> AsyncOptions<Recorder> {
        AsyncOptions::default()
            .on_stdout_line(|ctx: &mut Recorder, line| ctx.stdout.push(line.to_string()))
            .on_stderr_line(|ctx: &mut Recorder, line| ctx.stderr.push(line.to_string()))
            .on_exit(|ctx: &mut Recorder, outcome| ctx.exits.push(outcome))
    }

    #[test]
    fn test_spawn_streams_lines_then_exits() {
        let dir = TempDir::new().unwrap();
        let (tx, rx) = mpsc::channel();
        let mut registry = JobRegistry::new(dir.path());
        let mut ctx = Recorder::default();

        let handle = registry.spawn(
            ExternalCommand::shell("echo one; echo two; echo oops >&2; exit 2"),
            recording_options(),
            None,
            &tx,
        );
        assert_eq!(registry.live_jobs(), vec![handle]);

        drain(&mut registry, &rx, &mut ctx);
        assert_eq!(ctx.stdout, vec!["one", "two"]);
        assert_eq!(ctx.stderr, vec!["oops"]);
        assert_eq!(ctx.exits.len(), 1);
        assert_eq!(ctx.exits[0].output.exit_status, 2);
        assert_eq!(ctx.exits[0].output.stdout, "one\ntwo\n");
        assert!(!ctx.exits[0].cancelled);
        assert!(registry.is_idle());
    }

    #[test]
    fn test_spawn_failure_reports_through_on_exit() {
        let dir = TempDir::new().unwrap();
        let (tx, rx) = mpsc::channel();
        let mut registry = JobRegistry::new(dir.path());
        let mut ctx = Recorder::default();

        registry.spawn(
            ExternalCommand::new("definitely-not-a-real-binary-xyz"),
            recording_options(),
            None,
            &tx,
        );
        drain(&mut registry, &rx, &mut ctx);
        assert_eq!(ctx.exits[0].output.exit_status, SPAWN_FAILURE_STATUS);
    }

    #[test]
    fn test_cancel_all_kills_every_job() {
        let dir = TempDir::new().unwrap();
        let (tx, rx) = mpsc::channel();
        let mut registry = JobRegistry::new(dir.path());
        let mut ctx = Recorder::default();

        registry.spawn(ExternalCommand::new("sleep").arg("30"), recording_options(), None, &tx);
        registry.spawn(ExternalCommand::new("sleep").arg("30"), recording_options(), None, &tx);
        assert_eq!(registry.live_jobs().len(), 2);

        assert_eq!(registry.cancel_all(), 2);
        drain(&mut registry, &rx, &mut ctx);
        assert_eq!(ctx.exits.len(), 2);
        assert!(ctx.exits.iter().all(|outcome| outcome.cancelled && !outcome.success()));
    }

    #[test]
    fn test_cancel_reaches_forked_descendants() {
        let dir = TempDir::new().unwrap();
        let (tx, rx) = mpsc::channel();
        let mut registry = JobRegistry::new(dir.path());
        let mut ctx = Recorder::default();

        // The backgrounded sleep inherits the output pipes
        registry.spawn(ExternalCommand::shell("sleep 6 & wait"), recording_options(), None, &tx);
        std::thread::sleep(Duration::from_millis(200));

        let started = Instant::now();
        assert_eq!(registry.cancel_all(), 1);
        drain(&mut registry, &rx, &mut ctx);
        assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());
        assert_eq!(ctx.exits.len(), 1);
        assert!(ctx.exits[0].cancelled);
    }

    #[test]
    fn test_asynchronous_runs_are_recorded() {
        let dir = TempDir::new().unwrap();
        let (tx, rx) = mpsc::channel();
        let log = InvocationLog::new();
        let mut registry = JobRegistry::new(dir.path()).with_log(Some(log.clone()));
        let mut ctx = Recorder::default();

        registry.spawn(ExternalCommand::shell("true"), recording_options(), None, &tx);
        drain(&mut registry, &rx, &mut ctx);
        let records = log.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].asynchronous);
    }
}
