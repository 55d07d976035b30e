//! Sequential task pipelines for multi-step git operations.
//!
//! A [`Pipeline`] is an ordered list of [`Step`]s. Each step decides what to run
//! from the previous step's output, so conditional flows such as "check the
//! upstream, then push with or without `--set-upstream`" stay flat instead of
//! nesting exit callbacks.
//!
//! A failing step short-circuits the remaining steps. Once a step marked with
//! [`Step::arms_rollback`] has succeeded, any later failure or cancellation runs
//! the pipeline's rollback commands to restore the prior state.
//!
//! The same pipeline can be driven step by step from the control loop with
//! [`Pipeline::start`] / [`Pipeline::on_step_exit`], or to completion on the
//! current thread with [`Pipeline::run_blocking`].

use crate::core::error::{DashboardError, Result};
use crate::core::process::{CommandOutput, CommandRunner, ExternalCommand};
use std::collections::VecDeque;

/// What a step wants to do, given the previous step's output
pub enum StepPlan {
    Run(ExternalCommand),
    Skip,
    Abort(String),
}

type PlanFn = Box<dyn FnOnce(Option<&CommandOutput>) -> StepPlan>;

pub struct Step {
    name: String,
    plan: PlanFn,
    allow_failure: bool,
    arms_rollback: bool,
}

impl Step {
    pub fn new(
        name: impl Into<String>,
        plan: impl FnOnce(Option<&CommandOutput>) -> StepPlan + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            plan: Box::new(plan),
            allow_failure: false,
            arms_rollback: false,
        }
    }

    /// A step that always runs `command`
    pub fn command(name: impl Into<String>, command: ExternalCommand) -> Self {
        Self::new(name, move |_| StepPlan::Run(command))
    }

    /// A non-zero exit is handed to the next step instead of failing the pipeline
    pub fn allow_failure(mut self) -> Self {
        self.allow_failure = true;
        self
    }

    /// Failures after this step succeeds trigger the rollback commands
    pub fn arms_rollback(mut self) -> Self {
        self.arms_rollback = true;
        self
    }
}

/// Next thing the driver must do
pub enum Advance {
    Run(ExternalCommand),
    Finished(PipelineOutcome),
}

#[derive(Debug)]
pub enum PipelineOutcome {
    Completed {
        label: String,
        ran: usize,
        last: Option<CommandOutput>,
    },
    Aborted {
        label: String,
        reason: String,
    },
    Failed {
        label: String,
        step: String,
        error: DashboardError,
        rolled_back: Option<bool>,
    },
    Cancelled {
        label: String,
        step: String,
        rolled_back: Option<bool>,
    },
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutcome::Completed { .. })
    }

    pub fn label(&self) -> &str {
        match self {
            PipelineOutcome::Completed { label, .. }
            | PipelineOutcome::Aborted { label, .. }
            | PipelineOutcome::Failed { label, .. }
            | PipelineOutcome::Cancelled { label, .. } => label,
        }
    }

    /// `Some(true)` when rollback ran cleanly, `None` when it was not needed
    pub fn rolled_back(&self) -> Option<bool> {
        match self {
            PipelineOutcome::Failed { rolled_back, .. }
            | PipelineOutcome::Cancelled { rolled_back, .. } => *rolled_back,
            _ => None,
        }
    }

    pub fn into_result(self) -> Result<()> {
        match self {
            PipelineOutcome::Completed { .. } => Ok(()),
            PipelineOutcome::Aborted { reason, .. } => Err(DashboardError::precondition(reason)),
            PipelineOutcome::Failed { error, .. } => Err(error),
            PipelineOutcome::Cancelled { label, .. } => Err(DashboardError::declined(label)),
        }
    }
}

struct RunningStep {
    name: String,
    command: ExternalCommand,
    allow_failure: bool,
    arms_rollback: bool,
}

pub struct Pipeline {
    label: String,
    steps: VecDeque<Step>,
    rollback: Vec<ExternalCommand>,
    rollback_armed: bool,
    current: Option<RunningStep>,
    last: Option<CommandOutput>,
    ran: usize,
}

impl Pipeline {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            steps: VecDeque::new(),
            rollback: Vec::new(),
            rollback_armed: false,
            current: None,
            last: None,
            ran: 0,
        }
    }

    pub fn then(mut self, step: Step) -> Self {
        self.steps.push_back(step);
        self
    }

    /// Commands run in order to undo a partially applied pipeline
    pub fn with_rollback(mut self, commands: Vec<ExternalCommand>) -> Self {
        self.rollback = commands;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn remaining(&self) -> usize {
        self.steps.len()
    }

    pub fn start(&mut self) -> Advance {
        log::debug!("Pipeline '{}' starting with {} step(s)", self.label, self.steps.len());
        self.next_step()
    }

    /// Feed the exit of the step started by the last [`Advance::Run`]
    pub fn on_step_exit(
        &mut self,
        output: CommandOutput,
        cancelled: bool,
        runner: &dyn CommandRunner,
    ) -> Advance {
        let Some(step) = self.current.take() else {
            log::warn!("Pipeline '{}' received an exit with no running step", self.label);
            return self.next_step();
        };
        self.ran += 1;

        if cancelled {
            log::info!("Pipeline '{}' cancelled during '{}'", self.label, step.name);
            let rolled_back = self.roll_back(runner);
            return Advance::Finished(PipelineOutcome::Cancelled {
                label: self.label.clone(),
                step: step.name,
                rolled_back,
            });
        }

        if !output.success() && !step.allow_failure {
            let error = DashboardError::command_failed(
                step.command.to_string(),
                &output.stderr,
                output.exit_status,
            );
            log::warn!("Pipeline '{}' failed at '{}': {}", self.label, step.name, error);
            let rolled_back = self.roll_back(runner);
            return Advance::Finished(PipelineOutcome::Failed {
                label: self.label.clone(),
                step: step.name,
                error,
                rolled_back,
            });
        }

        if output.success() && step.arms_rollback {
            self.rollback_armed = true;
        }
        self.last = Some(output);
        self.next_step()
    }

    fn next_step(&mut self) -> Advance {
        while let Some(step) = self.steps.pop_front() {
            let Step {
                name,
                plan,
                allow_failure,
                arms_rollback,
            } = step;
            match plan(self.last.as_ref()) {
                StepPlan::Run(command) => {
                    log::debug!("Pipeline '{}' step '{}': {}", self.label, name, command);
                    self.current = Some(RunningStep {
                        name,
                        command: command.clone(),
                        allow_failure,
                        arms_rollback,
                    });
                    return Advance::Run(command);
                }
                StepPlan::Skip => log::debug!("Pipeline '{}' skipping '{}'", self.label, name),
                StepPlan::Abort(reason) => {
                    self.steps.clear();
                    return Advance::Finished(PipelineOutcome::Aborted {
                        label: self.label.clone(),
                        reason,
                    });
                }
            }
        }

        Advance::Finished(PipelineOutcome::Completed {
            label: self.label.clone(),
            ran: self.ran,
            last: self.last.take(),
        })
    }

    fn roll_back(&mut self, runner: &dyn CommandRunner) -> Option<bool> {
        self.steps.clear();
        if !self.rollback_armed || self.rollback.is_empty() {
            return None;
        }
        self.rollback_armed = false;

        let mut clean = true;
        for command in std::mem::take(&mut self.rollback) {
            let output = runner.run(&command);
            if output.success() {
                log::info!("Rollback of '{}': {} succeeded", self.label, command);
            } else {
                clean = false;
                log::error!(
                    "Rollback of '{}': {} failed: {}",
                    self.label,
                    command,
                    output.stderr.trim()
                );
            }
        }
        Some(clean)
    }

    /// Run every step on the current thread
    pub fn run_blocking(mut self, runner: &dyn CommandRunner) -> PipelineOutcome {
        let mut advance = self.start();
        loop {
            match advance {
                Advance::Run(command) => {
                    let output = runner.run(&command);
                    advance = self.on_step_exit(output, false, runner);
                }
                Advance::Finished(outcome) => return outcome,
            }
        }
    }
}
