//! The control loop and everything it owns.
//!
//! A [`Session`] holds the repository handle, the state cache, the current
//! [`ComposedView`], the live-job registry and the notification area. Exactly
//! one loop drives it: typed input, job output and progress ticks are handled
//! one [`LoopEvent`] at a time, so nothing here needs a lock. Actions never
//! recompose on their own; they report [`Refresh`] and the session recomposes
//! once per handled input.

use crate::core::colors::Palette;
use crate::core::config::DashboardConfig;
use crate::core::error::{DashboardError, Result};
use crate::core::git::GitRepo;
use crate::core::index_parser::IndexParser;
use crate::core::jobs::{AsyncOptions, JobDispatch, JobHandle, JobOutcome, JobRegistry};
use crate::core::pager::DiffPager;
use crate::core::pipeline::{Advance, Pipeline, PipelineOutcome};
use crate::core::process::{ExternalCommand, InvocationLog};
use crate::core::progress::{Level, Notifications, Notifier, Progress, ProgressHandle};
use crate::core::state::{StateCache, StatusSnapshot};
use crate::dashboard::composer::{compose, ComposedView};
use crate::dashboard::dispatcher::{dispatch_lines, DispatchReport};
use crate::dashboard::events::{EventSource, LoopEvent};
use crate::dashboard::host::ViewHost;
use crate::dashboard::provider::{BuildContext, SectionDescriptor};
use crate::dashboard::view_model::{ActionContext, ActionKind};
use crate::providers;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::mpsc::Sender;

/// One line of typed input, decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    Nothing,
    Quit,
    Refresh,
    Pull,
    Push,
    Commit,
    SquashMerge,
    CancelAll,
    Dispatch { kind: ActionKind, lines: Vec<usize> },
}

impl InputCommand {
    /// Decode `input` against a view of `max_line` lines.
    ///
    /// Bare line lists activate; `s`, `S`, `x` and `o` prefix a line list
    /// with cycle, bulk-cycle, destroy and open-externally.
    pub fn parse(input: &str, max_line: usize) -> Result<Self> {
        let input = input.trim();
        let command = match input {
            "" => InputCommand::Nothing,
            "q" => InputCommand::Quit,
            "r" => InputCommand::Refresh,
            "p" => InputCommand::Pull,
            "P" => InputCommand::Push,
            "c" => InputCommand::Commit,
            "m" => InputCommand::SquashMerge,
            "C" => InputCommand::CancelAll,
            _ => {
                let (kind, lines) = match input.split_once(char::is_whitespace) {
                    Some(("s", rest)) => (ActionKind::Cycle, rest),
                    Some(("S", rest)) => (ActionKind::BulkCycle, rest),
                    Some(("x", rest)) => (ActionKind::Destroy, rest),
                    Some(("o", rest)) => (ActionKind::OpenExternal, rest),
                    _ if input.starts_with(|c: char| c.is_ascii_digit()) => {
                        (ActionKind::Activate, input)
                    }
                    _ => {
                        return Err(DashboardError::UnknownInput {
                            input: input.to_string(),
                        })
                    }
                };
                InputCommand::Dispatch {
                    kind,
                    lines: IndexParser::parse_lines(lines, max_line)?,
                }
            }
        };
        Ok(command)
    }
}

/// Whether the loop keeps going after an input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

struct RunningPipeline {
    pipeline: Pipeline,
    progress: ProgressHandle,
}

pub struct Session<H: ViewHost + 'static> {
    repo: GitRepo,
    config: DashboardConfig,
    cache: StateCache,
    pager: DiffPager,
    sections: Vec<SectionDescriptor>,
    view: ComposedView,
    host: H,
    jobs: JobRegistry<Session<H>>,
    progress: Progress,
    notifications: Notifications,
    pipelines: BTreeMap<u64, RunningPipeline>,
    next_pipeline: u64,
    events: Sender<LoopEvent>,
    compose_count: usize,
    failed_pipelines: Vec<String>,
    log: Option<Rc<InvocationLog>>,
}

impl<H: ViewHost + 'static> Session<H> {
    pub fn new(repo: GitRepo, config: DashboardConfig, host: H, events: Sender<LoopEvent>) -> Self {
        let sections = providers::default_sections();
        Self::with_sections(repo, config, host, events, sections)
    }

    pub fn with_sections(
        repo: GitRepo,
        config: DashboardConfig,
        mut host: H,
        events: Sender<LoopEvent>,
        sections: Vec<SectionDescriptor>,
    ) -> Self {
        let mut palette = Palette::default();
        for section in &sections {
            section.provider.setup_highlights(&mut palette);
        }
        host.set_palette(palette);

        Self {
            jobs: JobRegistry::new(repo.workdir()),
            cache: StateCache::new(config.cache_ttl()),
            pager: DiffPager::from_config(&config),
            progress: Progress::new(config.progress_interval()),
            repo,
            config,
            sections,
            view: ComposedView::default(),
            host,
            notifications: Notifications::default(),
            pipelines: BTreeMap::new(),
            next_pipeline: 0,
            events,
            compose_count: 0,
            failed_pipelines: Vec::new(),
            log: None,
        }
    }

    /// Record asynchronous invocations into `log` as well
    pub fn with_log(mut self, log: Option<Rc<InvocationLog>>) -> Self {
        self.jobs = JobRegistry::new(self.repo.workdir()).with_log(log.clone());
        self.log = log;
        self
    }

    pub fn with_pager(mut self, pager: DiffPager) -> Self {
        self.pager = pager;
        self
    }

    pub fn repo(&self) -> &GitRepo {
        &self.repo
    }

    pub fn view(&self) -> &ComposedView {
        &self.view
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn cache(&self) -> &StateCache {
        &self.cache
    }

    pub fn invocation_log(&self) -> Option<&Rc<InvocationLog>> {
        self.log.as_ref()
    }

    /// Number of times the view has been rebuilt
    pub fn compose_count(&self) -> usize {
        self.compose_count
    }

    /// Labels of pipelines that did not complete
    pub fn failed_pipelines(&self) -> &[String] {
        &self.failed_pipelines
    }

    pub fn live_jobs(&self) -> Vec<JobHandle> {
        self.jobs.live_jobs()
    }

    /// No job running and no pipeline waiting on one
    pub fn is_idle(&self) -> bool {
        self.jobs.is_idle() && self.pipelines.is_empty()
    }

    fn snapshot(&mut self) -> Rc<StatusSnapshot> {
        let repo = &self.repo;
        self.cache.get_or_fetch(|| repo.fetch_snapshot())
    }

    /// Rebuild the whole view from current repository state
    pub fn recompose(&mut self) {
        let snapshot = self.snapshot();
        let ctx = BuildContext::new(
            &self.repo,
            &self.config,
            snapshot,
            chrono::Utc::now().timestamp(),
        )
        .with_cache(&self.cache);
        self.view = compose(&self.sections, &ctx);
        self.compose_count += 1;
        log::debug!("Recomposed view: {} lines", self.view.len());
    }

    pub fn render(&mut self) {
        self.host.render(&self.view, &mut self.notifications);
    }

    pub fn flush_notifications(&mut self) {
        self.host.flush_notifications(&mut self.notifications);
    }

    fn notify_error(&mut self, error: &DashboardError) {
        let level = if error.is_warning() {
            Level::Warning
        } else {
            Level::Error
        };
        self.notifications.notify(level, &error.to_string());
    }

    /// Run `kind` on every line, then recompose once if anything changed.
    ///
    /// Errors are returned in the report and not yet shown to the user.
    pub fn dispatch(&mut self, kind: ActionKind, lines: &[usize]) -> DispatchReport {
        let mut ctx = ActionContext {
            repo: &self.repo,
            cache: &mut self.cache,
            pager: &self.pager,
            host: &mut self.host,
            notifier: &mut self.notifications,
        };
        let report = dispatch_lines(&self.view, kind, lines, &mut ctx);
        if report.changed() {
            self.recompose();
        }
        report
    }

    /// Handle one typed line; failures become notifications
    pub fn handle_input(&mut self, input: &str) -> Flow {
        match self.execute_input(input) {
            Ok(flow) => flow,
            Err(e) => {
                self.notify_error(&e);
                Flow::Continue
            }
        }
    }

    fn execute_input(&mut self, input: &str) -> Result<Flow> {
        match InputCommand::parse(input, self.view.len())? {
            InputCommand::Nothing => {}
            InputCommand::Quit => return Ok(Flow::Quit),
            InputCommand::Refresh => {
                self.cache.invalidate();
                self.recompose();
            }
            InputCommand::Pull => self.start_pull(),
            InputCommand::Push => self.start_push(),
            InputCommand::Commit => self.commit_interactive()?,
            InputCommand::SquashMerge => self.start_squash_merge()?,
            InputCommand::CancelAll => {
                let cancelled = self.cancel_all();
                self.notifications
                    .notify(Level::Info, &format!("Cancelled {cancelled} running job(s)"));
            }
            InputCommand::Dispatch { kind, lines } => {
                let report = self.dispatch(kind, &lines);
                for error in &report.errors {
                    self.notify_error(error);
                }
            }
        }
        Ok(Flow::Continue)
    }

    /// Ask for a message and commit what is staged
    fn commit_interactive(&mut self) -> Result<()> {
        let snapshot = self.snapshot();
        if snapshot.staged.is_empty() {
            return Err(DashboardError::precondition("Nothing staged to commit"));
        }
        let Some(message) = self.host.input("Commit message") else {
            return Err(DashboardError::declined("commit"));
        };
        self.commit(&message)
    }

    pub fn commit(&mut self, message: &str) -> Result<()> {
        let snapshot = self.snapshot();
        self.repo.commit(message, &snapshot)?;
        self.cache.invalidate();
        self.notifications.notify(Level::Success, "Committed");
        self.recompose();
        Ok(())
    }

    pub fn start_pull(&mut self) {
        let pipeline = self.repo.pull_pipeline();
        self.start_pipeline(pipeline);
    }

    pub fn start_push(&mut self) {
        let pipeline = self.repo.push_pipeline();
        self.start_pipeline(pipeline);
    }

    /// Confirm, then squash the current branch into the tracking branch
    pub fn start_squash_merge(&mut self) -> Result<()> {
        let snapshot = self.snapshot();
        let pipeline = self.repo.squash_merge_pipeline(&snapshot)?;
        let prompt = format!("{}? This adds one commit to the tracking branch", pipeline.label());
        if !self.host.confirm(&prompt) {
            return Err(DashboardError::declined(pipeline.label()));
        }
        self.start_pipeline(pipeline);
        Ok(())
    }

    /// Launch a command without blocking the loop
    pub fn run_async(
        &mut self,
        command: ExternalCommand,
        options: AsyncOptions<Self>,
    ) -> JobHandle {
        let progress = options.show_progress.then(|| {
            let label = command.to_string();
            self.progress
                .start(&label, &self.events, &mut self.notifications)
        });
        self.jobs.spawn(command, options, progress, &self.events)
    }

    /// Drive `pipeline` step by step on the asynchronous path
    pub fn start_pipeline(&mut self, mut pipeline: Pipeline) {
        self.next_pipeline += 1;
        let id = self.next_pipeline;
        let progress = self
            .progress
            .start(pipeline.label(), &self.events, &mut self.notifications);
        let advance = pipeline.start();
        self.pipelines.insert(id, RunningPipeline { pipeline, progress });
        self.advance_pipeline(id, advance);
        self.flush_notifications();
    }

    fn advance_pipeline(&mut self, id: u64, advance: Advance) {
        match advance {
            Advance::Run(command) => {
                let options = AsyncOptions::default()
                    .on_stderr_line(|_: &mut Self, line| log::debug!("{line}"))
                    .on_exit(move |session: &mut Self, outcome| {
                        session.on_pipeline_step_exit(id, outcome)
                    });
                self.run_async(command, options);
            }
            Advance::Finished(outcome) => self.finish_pipeline(id, outcome),
        }
    }

    fn on_pipeline_step_exit(&mut self, id: u64, outcome: JobOutcome) {
        let Some(running) = self.pipelines.get_mut(&id) else {
            log::warn!("Exit for unknown pipeline {id}");
            return;
        };
        let advance =
            running
                .pipeline
                .on_step_exit(outcome.output, outcome.cancelled, self.repo.runner());
        self.advance_pipeline(id, advance);
    }

    fn finish_pipeline(&mut self, id: u64, outcome: PipelineOutcome) {
        if let Some(running) = self.pipelines.remove(&id) {
            self.progress.stop(running.progress, &mut self.notifications);
        }

        match &outcome {
            PipelineOutcome::Completed { label, .. } => {
                self.notifications.notify(Level::Success, &format!("{label} done"))
            }
            PipelineOutcome::Failed { rolled_back: Some(false), label, .. } => {
                self.notifications.notify(
                    Level::Error,
                    &format!("{label}: rollback failed, check the repository state"),
                );
            }
            PipelineOutcome::Failed { rolled_back: Some(true), label, .. }
            | PipelineOutcome::Cancelled { rolled_back: Some(true), label, .. } => {
                self.notifications
                    .notify(Level::Info, &format!("{label}: changes rolled back"));
            }
            _ => {}
        }
        let label = outcome.label().to_string();
        if let Err(e) = outcome.into_result() {
            self.notify_error(&e);
            self.failed_pipelines.push(label);
        }

        self.cache.invalidate();
        self.recompose();
        self.render();
    }

    /// Kill every running job; pipelines finish through their exit events
    pub fn cancel_all(&mut self) -> usize {
        self.jobs.cancel_all()
    }

    /// Handle an event that did not come from typing
    pub fn handle_background(&mut self, event: LoopEvent) {
        match event {
            LoopEvent::Job(event) => match self.jobs.resolve(event) {
                Some(JobDispatch::Line { callback, line }) => callback(self, &line),
                Some(JobDispatch::Exit {
                    outcome,
                    callback,
                    progress,
                    ..
                }) => {
                    if let Some(progress) = progress {
                        self.progress.stop(progress, &mut self.notifications);
                    }
                    if let Some(callback) = callback {
                        callback(self, outcome);
                    }
                }
                None => {}
            },
            LoopEvent::Tick(tick) => self.progress.tick(tick, &mut self.notifications),
            LoopEvent::Input(line) => log::debug!("Ignoring input while shutting down: {line}"),
            LoopEvent::InputClosed => {}
        }
        self.flush_notifications();
    }

    /// Process job and tick events until no job or pipeline is left
    pub fn wait_until_idle(&mut self, source: &RefCell<EventSource>) {
        while !self.is_idle() {
            let event = source.borrow_mut().next_event();
            match event {
                Some(event) => self.handle_background(event),
                None => {
                    log::warn!("Event channel closed with jobs still running");
                    break;
                }
            }
        }
    }

    /// The interactive loop: render, then react to events until quit
    pub fn run(&mut self, source: &RefCell<EventSource>) {
        self.recompose();
        self.render();

        loop {
            let event = {
                let mut source = source.borrow_mut();
                source.request_input();
                source.next_event()
            };
            match event {
                Some(LoopEvent::Input(line)) => {
                    if self.handle_input(&line) == Flow::Quit {
                        break;
                    }
                    self.render();
                }
                Some(LoopEvent::InputClosed) | None => break,
                Some(event) => self.handle_background(event),
            }
        }

        if !self.is_idle() {
            self.cancel_all();
            self.wait_until_idle(source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input_commands() {
        assert_eq!(InputCommand::parse("", 10).unwrap(), InputCommand::Nothing);
        assert_eq!(InputCommand::parse(" q ", 10).unwrap(), InputCommand::Quit);
        assert_eq!(InputCommand::parse("P", 10).unwrap(), InputCommand::Push);
        assert_eq!(
            InputCommand::parse("1 3-4", 10).unwrap(),
            InputCommand::Dispatch {
                kind: ActionKind::Activate,
                lines: vec![1, 3, 4]
            }
        );
        assert_eq!(
            InputCommand::parse("S 7", 10).unwrap(),
            InputCommand::Dispatch {
                kind: ActionKind::BulkCycle,
                lines: vec![7]
            }
        );
        assert_eq!(
            InputCommand::parse("x 2,5", 10).unwrap(),
            InputCommand::Dispatch {
                kind: ActionKind::Destroy,
                lines: vec![2, 5]
            }
        );
    }

    #[test]
    fn test_parse_input_errors() {
        assert!(matches!(
            InputCommand::parse("hello", 10),
            Err(DashboardError::UnknownInput { .. })
        ));
        assert!(matches!(
            InputCommand::parse("s 11", 10),
            Err(DashboardError::LineOutOfRange { line: 11, max: 10 })
        ));
        assert!(matches!(
            InputCommand::parse("0", 10),
            Err(DashboardError::ZeroIndex)
        ));
        assert!(matches!(
            InputCommand::parse("s ", 10),
            Err(DashboardError::UnknownInput { .. })
        ));
    }
}
