//! External command invocation.
//!
//! [`Cmd`] is a plain description of a command line (program, arguments,
//! working directory). It is handed to an [`Executor`], which returns a
//! [`CmdResult`] for every invocation that could be spawned. Whether a nonzero
//! exit is fatal is decided by the caller, never by the executor.
//!
//! Commands always carry an explicit working directory; nothing here reads or
//! changes the process-wide current directory.

use anyhow::{bail, Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// A command line to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmd {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    error_msg: Option<String>,
    capture: bool,
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            error_msg: None,
            capture: false,
        }
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

    /// Directory the child process starts in.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Message used as the first line of the error when the command fails.
    pub fn error_msg(mut self, msg: impl Into<String>) -> Self {
        self.error_msg = Some(msg.into());
        self
    }

    /// Capture stdout/stderr instead of streaming them to the console.
    pub fn capture_output(mut self) -> Self {
        self.capture = true;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn captures_output(&self) -> bool {
        self.capture
    }

    /// Error message for a failed run of this command.
    pub fn failure_message(&self) -> String {
        self.error_msg
            .clone()
            .unwrap_or_else(|| format!("'{}' failed", self.program))
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Outcome of one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdResult {
    /// Exit code, `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub success: bool,
    /// Captured output; empty when the command streamed to the console.
    pub stdout: String,
    pub stderr: String,
}

impl CmdResult {
    pub fn ok() -> Self {
        Self {
            code: Some(0),
            success: true,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32) -> Self {
        Self {
            code: Some(code),
            success: false,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    /// Turn a failed result into an error that names the command.
    pub fn check(&self, cmd: &Cmd) -> Result<()> {
        if self.success {
            return Ok(());
        }

        let code = self
            .code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        let stderr = stderr_tail(&self.stderr, 20);
        if stderr.is_empty() {
            bail!("{}\n  Command: {}\n  Exit code: {}", cmd.failure_message(), cmd, code);
        }
        bail!(
            "{}\n  Command: {}\n  Exit code: {}\n  stderr:\n{}",
            cmd.failure_message(),
            cmd,
            code,
            stderr
        )
    }
}

fn stderr_tail(stderr: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = stderr.trim_end().lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..]
        .iter()
        .map(|l| format!("    {}", l))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Runs commands.
///
/// `Err` means the command could not be started at all (missing binary,
/// missing working directory). A command that ran and exited nonzero is an
/// `Ok` with `success == false`.
pub trait Executor {
    fn execute(&mut self, cmd: &Cmd) -> Result<CmdResult>;
}

/// Executor that spawns real processes.
#[derive(Debug, Default)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn execute(&mut self, cmd: &Cmd) -> Result<CmdResult> {
        let mut command = Command::new(&cmd.program);
        command.args(&cmd.args);
        if let Some(dir) = &cmd.cwd {
            command.current_dir(dir);
        }

        if cmd.capture {
            let output = command
                .stdin(Stdio::null())
                .output()
                .with_context(|| format!("Failed to execute: {}", cmd))?;
            return Ok(CmdResult {
                code: output.status.code(),
                success: output.status.success(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let status = command
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .with_context(|| format!("Failed to execute: {}", cmd))?;
        Ok(CmdResult {
            code: status.code(),
            success: status.success(),
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

/// Fail with a readable message when a required path is missing.
pub fn ensure_exists(path: &Path, what: &str) -> Result<()> {
    if !path.exists() {
        bail!("{} not found at: {}", what, path.display());
    }
    Ok(())
}
