//! Executor double for unit tests.

use anyhow::Result;

use crate::process::{Cmd, CmdResult, Executor};

type Hook = Box<dyn FnMut(&Cmd) -> CmdResult>;

/// Records every command instead of running it.
///
/// The hook decides the result and may simulate side effects (creating the
/// directories a generator or `git clone` would produce).
pub(crate) struct RecordingExecutor {
    commands: Vec<Cmd>,
    hook: Hook,
}

impl RecordingExecutor {
    pub(crate) fn new() -> Self {
        Self::with_hook(|_| CmdResult::ok())
    }

    pub(crate) fn with_hook(hook: impl FnMut(&Cmd) -> CmdResult + 'static) -> Self {
        Self {
            commands: Vec::new(),
            hook: Box::new(hook),
        }
    }

    pub(crate) fn failing_when(pred: impl Fn(&Cmd) -> bool + 'static) -> Self {
        Self::with_hook(move |cmd| {
            if pred(cmd) {
                CmdResult::failed(1)
            } else {
                CmdResult::ok()
            }
        })
    }

    pub(crate) fn commands(&self) -> &[Cmd] {
        &self.commands
    }

    /// Command lines as displayed, in execution order.
    pub(crate) fn lines(&self) -> Vec<String> {
        self.commands.iter().map(|c| c.to_string()).collect()
    }
}

impl Executor for RecordingExecutor {
    fn execute(&mut self, cmd: &Cmd) -> Result<CmdResult> {
        self.commands.push(cmd.clone());
        Ok((self.hook)(cmd))
    }
}
