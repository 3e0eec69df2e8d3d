//! Local and remote command execution.
//!
//! This module provides the seam between the installer and the operating
//! system:
//!
//! - [`CommandLine`]: a program plus its arguments, printable verbatim
//! - [`CommandResult`]: exit code and captured output of a finished command
//! - [`CommandExecutor`]: runs commands to completion or launches them in
//!   the background
//! - [`RemoteShell`]: expresses device operations as adb invocations
//!
//! A non-zero exit code is the only failure signal; [`run_checked`] turns it
//! into [`InstallerError::CommandFailed`].

mod remote;
mod system;

pub use remote::{remote_join, transport_path, Elevation, RemoteShell};
pub use system::{ChildProcess, SystemExecutor};

use crate::InstallerError;
use futures::future::BoxFuture;
use std::fmt;

/// A program and its arguments.
///
/// # Example
///
/// ```rust
/// use avd_lib_installer::CommandLine;
///
/// let command = CommandLine::new("adb").arg("shell").arg("ls /system");
/// assert_eq!(command.to_string(), "adb shell \"ls /system\"");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
}

impl CommandLine {
    /// Start a command line for the given program.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// The program to run.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The arguments, in order.
    pub fn arguments(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == '"') {
                let escaped = arg.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, " \"{escaped}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Outcome of a finished command. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    exit_code: i32,
    captured_output: String,
}

impl CommandResult {
    /// Record a finished command.
    pub fn new(exit_code: i32, captured_output: impl Into<String>) -> Self {
        Self {
            exit_code,
            captured_output: captured_output.into(),
        }
    }

    /// The exit code. Processes killed by a signal report `-1`.
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Combined stdout and stderr.
    pub fn captured_output(&self) -> &str {
        &self.captured_output
    }

    /// Whether the command exited with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs commands on behalf of the catalogs and the pipeline.
///
/// Implementations must not interpret exit codes; [`run_checked`] does that
/// uniformly for every caller.
pub trait CommandExecutor: Send + Sync {
    /// Run a command to completion and capture its output.
    ///
    /// Returns `Err` only when the command could not be started.
    fn run<'a>(
        &'a self,
        command: &'a CommandLine,
    ) -> BoxFuture<'a, Result<CommandResult, InstallerError>>;

    /// Launch a command in the background and return immediately.
    fn spawn(&self, command: &CommandLine) -> Result<Box<dyn DeviceProcess>, InstallerError>;
}

/// A background process launched by [`CommandExecutor::spawn`].
///
/// Dropping the handle leaves the process running.
pub trait DeviceProcess: Send {
    /// Stop the process.
    fn terminate(&mut self) -> BoxFuture<'_, Result<(), InstallerError>>;
}

/// Run a command and fail on a non-zero exit code.
///
/// The error carries the exact command line and exit code.
pub async fn run_checked<E>(
    executor: &E,
    command: &CommandLine,
) -> Result<CommandResult, InstallerError>
where
    E: CommandExecutor + ?Sized,
{
    tracing::debug!(command = %command, "running");
    let result = executor.run(command).await?;
    tracing::debug!(command = %command, exit_code = result.exit_code(), "finished");

    if !result.success() {
        return Err(InstallerError::CommandFailed {
            command: command.to_string(),
            exit_code: result.exit_code(),
            output: result.captured_output().to_string(),
        });
    }
    Ok(result)
}
