//! Host process execution via tokio.

use super::{CommandExecutor, CommandLine, CommandResult, DeviceProcess};
use crate::InstallerError;
use futures::future::BoxFuture;
use std::process::Stdio;
use tokio::process::{Child, Command};

/// Runs commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

impl SystemExecutor {
    fn command(command: &CommandLine) -> Command {
        let mut cmd = Command::new(command.program());
        cmd.args(command.arguments()).stdin(Stdio::null());
        cmd
    }
}

impl CommandExecutor for SystemExecutor {
    fn run<'a>(
        &'a self,
        command: &'a CommandLine,
    ) -> BoxFuture<'a, Result<CommandResult, InstallerError>> {
        Box::pin(async move {
            let output = Self::command(command)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output()
                .await
                .map_err(|source| InstallerError::Spawn {
                    command: command.to_string(),
                    source,
                })?;

            let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
            captured.push_str(&String::from_utf8_lossy(&output.stderr));

            Ok(CommandResult::new(
                output.status.code().unwrap_or(-1),
                captured,
            ))
        })
    }

    fn spawn(&self, command: &CommandLine) -> Result<Box<dyn DeviceProcess>, InstallerError> {
        let child = Self::command(command)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false)
            .spawn()
            .map_err(|source| InstallerError::Spawn {
                command: command.to_string(),
                source,
            })?;

        tracing::debug!(command = %command, pid = ?child.id(), "launched in background");
        Ok(Box::new(ChildProcess {
            child,
            command: command.to_string(),
        }))
    }
}

/// A background process launched by [`SystemExecutor`].
#[derive(Debug)]
pub struct ChildProcess {
    child: Child,
    command: String,
}

impl DeviceProcess for ChildProcess {
    fn terminate(&mut self) -> BoxFuture<'_, Result<(), InstallerError>> {
        Box::pin(async move {
            self.child
                .kill()
                .await
                .map_err(|e| InstallerError::io(format!("terminating `{}`", self.command), e))
        })
    }
}
