//! Test doubles for the command execution seam.
//!
//! [`RecordingExecutor`] records every command line it is asked to run and
//! answers from a small rule table, so catalog and pipeline logic can be
//! exercised without adb or an emulator.

use crate::executor::{CommandExecutor, CommandLine, CommandResult, DeviceProcess};
use crate::InstallerError;
use futures::future::BoxFuture;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
enum Reply {
    Exit { code: i32, output: String },
    Hang,
}

#[derive(Debug, Clone)]
struct Rule {
    needle: String,
    reply: Reply,
}

#[derive(Debug, Default)]
struct Log {
    commands: Vec<String>,
    spawned: Vec<String>,
    terminated: usize,
}

/// A [`CommandExecutor`] that records invocations and replies from rules.
///
/// Rules match when their needle is a substring of the rendered command
/// line; the first matching rule wins. Unmatched commands succeed with no
/// output.
#[derive(Debug, Clone, Default)]
pub struct RecordingExecutor {
    rules: Vec<Rule>,
    materialize_pulls: bool,
    log: Arc<Mutex<Log>>,
}

impl RecordingExecutor {
    /// An executor where every command succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit with `code` for commands containing `needle`.
    pub fn fail_on(mut self, needle: &str, code: i32) -> Self {
        self.rules.push(Rule {
            needle: needle.to_string(),
            reply: Reply::Exit {
                code,
                output: format!("stub failure for {needle}"),
            },
        });
        self
    }

    /// Succeed with `output` for commands containing `needle`.
    pub fn respond(mut self, needle: &str, output: &str) -> Self {
        self.rules.push(Rule {
            needle: needle.to_string(),
            reply: Reply::Exit {
                code: 0,
                output: output.to_string(),
            },
        });
        self
    }

    /// Never complete commands containing `needle`.
    pub fn hang_on(mut self, needle: &str) -> Self {
        self.rules.push(Rule {
            needle: needle.to_string(),
            reply: Reply::Hang,
        });
        self
    }

    /// Write a placeholder file at the destination of every `adb pull`.
    pub fn materialize_pulls(mut self) -> Self {
        self.materialize_pulls = true;
        self
    }

    /// Every command run to completion or started, in order.
    pub fn commands(&self) -> Vec<String> {
        self.lock().commands.clone()
    }

    /// Commands launched in the background.
    pub fn spawned(&self) -> Vec<String> {
        self.lock().spawned.clone()
    }

    /// How many background processes were terminated.
    pub fn terminated(&self) -> usize {
        self.lock().terminated
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Log> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn reply_for(&self, rendered: &str) -> Reply {
        self.rules
            .iter()
            .find(|rule| rendered.contains(&rule.needle))
            .map(|rule| rule.reply.clone())
            .unwrap_or(Reply::Exit {
                code: 0,
                output: String::new(),
            })
    }
}

impl CommandExecutor for RecordingExecutor {
    fn run<'a>(
        &'a self,
        command: &'a CommandLine,
    ) -> BoxFuture<'a, Result<CommandResult, InstallerError>> {
        Box::pin(async move {
            let rendered = command.to_string();
            self.lock().commands.push(rendered.clone());

            match self.reply_for(&rendered) {
                Reply::Hang => futures::future::pending().await,
                Reply::Exit { code, output } => {
                    if code == 0 && self.materialize_pulls {
                        materialize_pull(command)?;
                    }
                    Ok(CommandResult::new(code, output))
                }
            }
        })
    }

    fn spawn(&self, command: &CommandLine) -> Result<Box<dyn DeviceProcess>, InstallerError> {
        let rendered = command.to_string();
        let mut log = self.lock();
        log.commands.push(rendered.clone());
        log.spawned.push(rendered);
        Ok(Box::new(StubProcess {
            log: Arc::clone(&self.log),
        }))
    }
}

fn materialize_pull(command: &CommandLine) -> Result<(), InstallerError> {
    let args = command.arguments();
    if !args.iter().any(|arg| arg == "pull") {
        return Ok(());
    }
    if let Some(dest) = args.last() {
        let dest = PathBuf::from(dest);
        std::fs::write(&dest, b"pulled image")
            .map_err(|e| InstallerError::io(format!("writing {}", dest.display()), e))?;
    }
    Ok(())
}

#[derive(Debug)]
struct StubProcess {
    log: Arc<Mutex<Log>>,
}

impl DeviceProcess for StubProcess {
    fn terminate(&mut self) -> BoxFuture<'_, Result<(), InstallerError>> {
        Box::pin(async move {
            self.log
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .terminated += 1;
            Ok(())
        })
    }
}
