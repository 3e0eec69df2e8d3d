//! Device operations expressed as adb invocations.

use super::{run_checked, CommandExecutor, CommandLine, CommandResult};
use crate::InstallerError;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// How a remote shell command gains write access to system partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elevation {
    /// Run as the adb shell user; an emulator image already allows writes.
    Ambient,
    /// Run through `su -c` on a rooted device.
    Superuser,
}

impl Elevation {
    /// Wrap a shell command for this elevation level.
    ///
    /// ```rust
    /// use avd_lib_installer::Elevation;
    ///
    /// assert_eq!(Elevation::Ambient.wrap("ls /"), "ls /");
    /// assert_eq!(Elevation::Superuser.wrap("ls /"), "su -c \"ls /\"");
    /// ```
    pub fn wrap(&self, command: &str) -> String {
        match self {
            Self::Ambient => command.to_string(),
            Self::Superuser => format!("su -c \"{command}\""),
        }
    }
}

/// Convert a local filesystem entry into a string that can be handed to adb.
///
/// Non-UTF-8 components are replaced rather than rejected, so the
/// conversion never fails.
pub fn transport_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Join a device directory and a local file name into a device path.
///
/// ```rust
/// use avd_lib_installer::remote_join;
/// use std::ffi::OsStr;
///
/// assert_eq!(
///     remote_join("/system/etc/permissions/", OsStr::new("com.example.xml")),
///     "/system/etc/permissions/com.example.xml"
/// );
/// ```
pub fn remote_join(dir: &str, file_name: &OsStr) -> String {
    format!(
        "{}/{}",
        dir.trim_end_matches('/'),
        file_name.to_string_lossy()
    )
}

/// The remote shell of a single attached device.
#[derive(Debug)]
pub struct RemoteShell<'a, E: ?Sized> {
    executor: &'a E,
    adb: PathBuf,
    serial: Option<String>,
}

impl<'a, E> RemoteShell<'a, E>
where
    E: CommandExecutor + ?Sized,
{
    /// Address the device reachable through `adb`, optionally by serial.
    pub fn new(executor: &'a E, adb: impl Into<PathBuf>, serial: Option<String>) -> Self {
        Self {
            executor,
            adb: adb.into(),
            serial,
        }
    }

    fn adb(&self) -> CommandLine {
        let command = CommandLine::new(transport_path(&self.adb));
        match &self.serial {
            Some(serial) => command.args(["-s", serial.as_str()]),
            None => command,
        }
    }

    /// The adb command line that runs `command` on the device.
    pub fn shell_command(&self, command: &str, elevation: Elevation) -> CommandLine {
        self.adb().arg("shell").arg(elevation.wrap(command))
    }

    /// Run a shell command on the device, failing on a non-zero exit code.
    pub async fn shell(
        &self,
        command: &str,
        elevation: Elevation,
    ) -> Result<CommandResult, InstallerError> {
        run_checked(self.executor, &self.shell_command(command, elevation)).await
    }

    /// Copy a local file onto the device.
    pub async fn push(&self, local: &Path, remote: &str) -> Result<CommandResult, InstallerError> {
        let command = self.adb().arg("push").arg(transport_path(local)).arg(remote);
        run_checked(self.executor, &command).await
    }

    /// Copy a device file to the local machine.
    pub async fn pull(&self, remote: &str, local: &Path) -> Result<CommandResult, InstallerError> {
        let command = self.adb().arg("pull").arg(remote).arg(transport_path(local));
        run_checked(self.executor, &command).await
    }

    /// Block until the device is reachable.
    ///
    /// There is no timeout. Cancelling `cancel` abandons the wait with
    /// [`InstallerError::Cancelled`].
    pub async fn wait_for_device(&self, cancel: &CancellationToken) -> Result<(), InstallerError> {
        let command = self.adb().arg("wait-for-device");
        tokio::select! {
            result = run_checked(self.executor, &command) => result.map(|_| ()),
            () = cancel.cancelled() => Err(InstallerError::Cancelled {
                operation: "waiting for the device",
            }),
        }
    }
}
