//! Preparation context.
//!
//! Every recipe step receives a [`PrepareContext`] instead of relying on
//! ambient process state: the external directory everything is addressed
//! from, the host platform, the install prefixes, and the executor that runs
//! external commands. The context also applies the [`FailurePolicy`] to every
//! command result.

use anyhow::Result;
use std::path::PathBuf;

use super::{default_jobs, InstallPrefixes, Platform};
use crate::process::{Cmd, Executor};
use crate::report;

/// What to do when an external command exits nonzero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Abort the run with the command's error.
    #[default]
    Halt,
    /// Warn, record the failure, and carry on with the next step.
    Continue,
}

/// Result of one step under [`FailurePolicy::Continue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Succeeded,
    Failed,
}

impl StepStatus {
    pub fn failed(self) -> bool {
        self == StepStatus::Failed
    }
}

/// A command that exited nonzero while the policy was `Continue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub command: String,
    pub code: Option<i32>,
}

pub struct PrepareContext<'a> {
    /// External directory: archives, extracted trees and install roots live here.
    pub root: PathBuf,
    pub platform: Platform,
    pub prefixes: InstallPrefixes,
    /// `make -j` value.
    pub jobs: usize,
    pub policy: FailurePolicy,
    executor: &'a mut dyn Executor,
    failures: Vec<StepFailure>,
}

impl<'a> PrepareContext<'a> {
    /// Context for the host platform with install prefixes under `root/build`.
    pub fn new(root: PathBuf, executor: &'a mut dyn Executor) -> Self {
        let prefixes = InstallPrefixes::under(&root);
        Self {
            root,
            platform: Platform::host(),
            prefixes,
            jobs: default_jobs(),
            policy: FailurePolicy::default(),
            executor,
            failures: Vec::new(),
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Run one external command and apply the failure policy.
    ///
    /// `Err` when the command could not be started, or when it failed under
    /// [`FailurePolicy::Halt`].
    pub fn run(&mut self, cmd: Cmd) -> Result<StepStatus> {
        report::command(&cmd);
        let result = self.executor.execute(&cmd)?;
        if result.success() {
            return Ok(StepStatus::Succeeded);
        }

        match self.policy {
            FailurePolicy::Halt => {
                result.check(&cmd)?;
                Ok(StepStatus::Failed)
            }
            FailurePolicy::Continue => {
                report::warn(&format!(
                    "{} (exit code {}), continuing",
                    cmd.failure_message(),
                    result
                        .code
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "signal".to_string())
                ));
                self.failures.push(StepFailure {
                    command: cmd.to_string(),
                    code: result.code,
                });
                Ok(StepStatus::Failed)
            }
        }
    }

    /// Number of failures recorded so far.
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn failures(&self) -> &[StepFailure] {
        &self.failures
    }
}
