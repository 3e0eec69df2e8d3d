//! Device-side steps shared by every strategy.

use crate::executor::{remote_join, CommandExecutor, Elevation, RemoteShell};
use crate::InstallerError;
use std::path::PathBuf;
use std::time::Duration;

/// Mode for remounting the system partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MountMode {
    ReadWrite,
    ReadOnly,
}

impl MountMode {
    fn option(self) -> &'static str {
        match self {
            Self::ReadWrite => "rw",
            Self::ReadOnly => "ro",
        }
    }
}

/// Shell steps run against one device at a fixed elevation.
#[derive(Debug)]
pub(crate) struct DeviceSteps<'a, E: ?Sized> {
    pub(crate) shell: RemoteShell<'a, E>,
    pub(crate) elevation: Elevation,
    /// Pause after each pushed file, if any.
    pub(crate) settle_delay: Option<Duration>,
}

impl<'a, E> DeviceSteps<'a, E>
where
    E: CommandExecutor + ?Sized,
{
    pub(crate) async fn remount_system(&self, mode: MountMode) -> Result<(), InstallerError> {
        let command = format!("mount -o {},remount /system", mode.option());
        self.shell.shell(&command, self.elevation).await?;
        Ok(())
    }

    /// Remove `dir` with everything in it, then create it empty.
    pub(crate) async fn recreate_dir(&self, dir: &str) -> Result<(), InstallerError> {
        self.shell
            .shell(&format!("rm -r {dir}"), self.elevation)
            .await?;
        self.shell
            .shell(&format!("mkdir -p {dir}"), self.elevation)
            .await?;
        Ok(())
    }

    /// Push each file into `remote_dir`, keeping its file name.
    pub(crate) async fn push_files(
        &self,
        files: &[PathBuf],
        remote_dir: &str,
    ) -> Result<(), InstallerError> {
        for file in files {
            let name = file.file_name().unwrap_or_default();
            self.shell.push(file, &remote_join(remote_dir, name)).await?;
            self.settle().await;
        }
        Ok(())
    }

    /// Push permission descriptors.
    ///
    /// On a rooted device the directory is opened up for the push and
    /// restored afterwards.
    pub(crate) async fn push_permissions(
        &self,
        files: &[PathBuf],
        remote_dir: &str,
    ) -> Result<(), InstallerError> {
        if self.elevation == Elevation::Superuser {
            self.shell
                .shell(&format!("chmod 777 {remote_dir}"), self.elevation)
                .await?;
            self.push_files(files, remote_dir).await?;
            self.shell
                .shell(&format!("chmod 755 {remote_dir}"), self.elevation)
                .await?;
            Ok(())
        } else {
            self.push_files(files, remote_dir).await
        }
    }

    // The backing image's size does not reliably change when a write lands,
    // so this waits a fixed time instead of polling.
    async fn settle(&self) {
        if let Some(delay) = self.settle_delay {
            tracing::debug!(?delay, "waiting for the backing image to settle");
            tokio::time::sleep(delay).await;
        }
    }
}
