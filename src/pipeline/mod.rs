//! The installation pipeline.
//!
//! [`InstallPipeline::install`] drives a validated [`InstallationRequest`]
//! through an ordered sequence of device operations. The sequence depends
//! on the [`Strategy`] chosen for the run:
//!
//! - `ImageRebuild`: boot, modify, build a new system image on the device,
//!   pull it and store it in the device home
//! - `ImageReuse`: copy the reference image into the device home once, boot
//!   against it and modify it in place
//! - `RootedDevice`: modify an already running rooted device through `su`
//!
//! Any non-zero exit code aborts the run at that command. Nothing is rolled
//! back, and an emulator launched earlier in the run is left running.

mod image;
mod report;
mod stage;
mod steps;
mod strategy;

pub use image::{
    ensure_local_image, kernel_path_from_config, reference_image_path, reuse_partition_size_mb,
    system_nand_spec, BOOT_CONFIG_FILE, KERNEL_PATH_KEY,
};
pub use report::{completion_guidance, library_id, manifest_fragment, InstallReport};
pub use stage::PipelineStage;
pub use strategy::Strategy;

use crate::catalog::{list_payload_files, Device, Toolchain};
use crate::executor::{
    transport_path, CommandExecutor, CommandLine, DeviceProcess, Elevation, RemoteShell,
};
use crate::validation::InstallationRequest;
use crate::{InstallerConfig, InstallerError, LOCAL_IMAGE_NAME};
use std::path::PathBuf;
use steps::{DeviceSteps, MountMode};
use tokio_util::sync::CancellationToken;

/// Local files of the payload version being installed.
#[derive(Debug)]
struct Payload {
    libraries: Vec<PathBuf>,
    permissions: Vec<PathBuf>,
}

/// Runs installations against a device.
#[derive(Debug)]
pub struct InstallPipeline<'a, E: ?Sized> {
    config: &'a InstallerConfig,
    executor: &'a E,
    toolchain: &'a Toolchain,
    cancel: CancellationToken,
}

impl<'a, E> InstallPipeline<'a, E>
where
    E: CommandExecutor + ?Sized,
{
    /// Create a pipeline. The wait for the device has no timeout.
    pub fn new(config: &'a InstallerConfig, executor: &'a E, toolchain: &'a Toolchain) -> Self {
        Self {
            config,
            executor,
            toolchain,
            cancel: CancellationToken::new(),
        }
    }

    /// Abandon the wait for the device when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Install the requested payload version onto the requested device.
    ///
    /// `on_stage` is called with each stage just before it runs.
    /// [`PipelineStage::Completed`] is reported before an emulator launched
    /// by this run is shut down.
    ///
    /// # Errors
    ///
    /// Returns the first failure unchanged. For a failed command that is
    /// [`InstallerError::CommandFailed`] with the exact command line and
    /// exit code; no later stage runs.
    pub async fn install<F>(
        &self,
        request: &InstallationRequest,
        strategy: Strategy,
        on_stage: F,
    ) -> Result<InstallReport, InstallerError>
    where
        F: Fn(&PipelineStage),
    {
        let device = request.device();
        let payload = Payload {
            libraries: list_payload_files(&request.version().lib_dir(&self.config.payload_root))?,
            permissions: list_payload_files(
                &request.version().permissions_dir(&self.config.payload_root),
            )?,
        };
        tracing::info!(
            device = device.name(),
            version = %request.version(),
            %strategy,
            libraries = payload.libraries.len(),
            permissions = payload.permissions.len(),
            "starting installation"
        );

        let enter = |stage: PipelineStage| {
            tracing::info!(stage = stage.description(), "entering stage");
            on_stage(&stage);
        };

        let libraries: Vec<String> = payload
            .permissions
            .iter()
            .map(|path| library_id(path))
            .collect();

        match strategy {
            Strategy::ImageRebuild => {
                let mut process = self.boot_for_rebuild(device, &enter)?;
                self.modify_system(strategy, &payload, &enter).await?;
                self.rebuild_image(device, &enter).await?;
                enter(PipelineStage::Completed {
                    libraries: libraries.clone(),
                });
                self.shutdown(process.as_mut(), &enter).await;
            }
            Strategy::ImageReuse => {
                let mut process = self.boot_for_reuse(device, &enter).await?;
                self.modify_system(strategy, &payload, &enter).await?;
                enter(PipelineStage::Completed {
                    libraries: libraries.clone(),
                });
                self.shutdown(process.as_mut(), &enter).await;
            }
            Strategy::RootedDevice => {
                self.modify_system(strategy, &payload, &enter).await?;
                enter(PipelineStage::RemountReadOnly);
                self.steps(strategy)
                    .remount_system(MountMode::ReadOnly)
                    .await?;
                enter(PipelineStage::Completed {
                    libraries: libraries.clone(),
                });
            }
        }

        Ok(InstallReport::new(libraries, strategy.boots_device()))
    }

    fn shell(&self) -> RemoteShell<'a, E> {
        RemoteShell::new(
            self.executor,
            self.toolchain.adb.clone(),
            self.config.serial.clone(),
        )
    }

    fn steps(&self, strategy: Strategy) -> DeviceSteps<'a, E> {
        let settle_delay = match strategy {
            Strategy::ImageReuse => Some(self.config.settle_delay),
            Strategy::ImageRebuild | Strategy::RootedDevice => None,
        };
        DeviceSteps {
            shell: self.shell(),
            elevation: strategy.elevation(),
            settle_delay,
        }
    }

    fn emulator(&self, device: &Device) -> CommandLine {
        CommandLine::new(transport_path(&self.toolchain.emulator))
            .args(["-avd", device.name()])
    }

    /// Launch the emulator with an enlarged writable partition.
    fn boot_for_rebuild(
        &self,
        device: &Device,
        enter: &impl Fn(PipelineStage),
    ) -> Result<Box<dyn DeviceProcess>, InstallerError> {
        enter(PipelineStage::BootDevice);
        let command = self
            .emulator(device)
            .arg("-partition-size")
            .arg(self.config.partition_size_mb.to_string());
        self.executor.spawn(&command)
    }

    /// Ensure a local image copy exists and launch the emulator with that
    /// file as the backing store of its system partition.
    async fn boot_for_reuse(
        &self,
        device: &Device,
        enter: &impl Fn(PipelineStage),
    ) -> Result<Box<dyn DeviceProcess>, InstallerError> {
        enter(PipelineStage::PrepareImage);
        let reference =
            reference_image_path(device.home_directory(), self.config.sdk_root.as_deref())?;
        let local = device.home_directory().join(LOCAL_IMAGE_NAME);
        ensure_local_image(&reference, &local).await?;

        let image_len = tokio::fs::metadata(&local)
            .await
            .map_err(|e| InstallerError::io(format!("reading size of {}", local.display()), e))?
            .len();
        let partition_mb = reuse_partition_size_mb(image_len, self.config.image_headroom);
        tracing::debug!(image_len, partition_mb, "sized system partition");

        enter(PipelineStage::BootDevice);
        // Everything after `-qemu` goes to the underlying emulator core.
        let command = self
            .emulator(device)
            .arg("-qemu")
            .arg("-nand")
            .arg(system_nand_spec(&local, partition_mb));
        self.executor.spawn(&command)
    }

    /// Wait for a booted device (if any), then install libraries and
    /// permission descriptors.
    async fn modify_system(
        &self,
        strategy: Strategy,
        payload: &Payload,
        enter: &impl Fn(PipelineStage),
    ) -> Result<(), InstallerError> {
        let steps = self.steps(strategy);

        if strategy.boots_device() {
            enter(PipelineStage::WaitForDevice);
            steps.shell.wait_for_device(&self.cancel).await?;
        }

        enter(PipelineStage::RemountReadWrite);
        steps.remount_system(MountMode::ReadWrite).await?;

        enter(PipelineStage::RecreateLibraryDirectory);
        steps.recreate_dir(&self.config.remote_lib_dir).await?;

        enter(PipelineStage::PushLibraries);
        steps
            .push_files(&payload.libraries, &self.config.remote_lib_dir)
            .await?;

        enter(PipelineStage::PushPermissions);
        steps
            .push_permissions(&payload.permissions, &self.config.remote_permissions_dir)
            .await
    }

    /// Build a system image on the device and store it in the device home.
    async fn rebuild_image(
        &self,
        device: &Device,
        enter: &impl Fn(PipelineStage),
    ) -> Result<(), InstallerError> {
        let shell = self.shell();
        let remote_image = self.config.remote_image_path();

        enter(PipelineStage::BuildImage);
        let tool = format!(
            "{}/{}",
            self.config.remote_staging_dir.trim_end_matches('/'),
            device.platform().image_tool_name()
        );
        shell
            .shell(&format!("{tool} /system {remote_image}"), Elevation::Ambient)
            .await?;

        enter(PipelineStage::PullImage);
        let pulled = self
            .config
            .scratch_dir
            .join(format!("{}-{LOCAL_IMAGE_NAME}", device.name()));
        shell.pull(&remote_image, &pulled).await?;

        enter(PipelineStage::RemoveRemoteImage);
        shell
            .shell(&format!("rm {remote_image}"), Elevation::Ambient)
            .await?;

        enter(PipelineStage::StoreImage);
        let stored = device.home_directory().join(LOCAL_IMAGE_NAME);
        tokio::fs::copy(&pulled, &stored).await.map_err(|e| {
            InstallerError::io(
                format!("copying {} to {}", pulled.display(), stored.display()),
                e,
            )
        })?;
        tokio::fs::remove_file(&pulled)
            .await
            .map_err(|e| InstallerError::io(format!("removing {}", pulled.display()), e))?;
        Ok(())
    }

    /// Stop the emulator. Failure is logged, not returned.
    async fn shutdown(&self, process: &mut dyn DeviceProcess, enter: &impl Fn(PipelineStage)) {
        enter(PipelineStage::ShutdownDevice);
        if let Err(e) = process.terminate().await {
            tracing::warn!(error = %e, "could not stop the emulator; close it manually");
        }
    }
}

#[cfg(test)]
mod tests;
