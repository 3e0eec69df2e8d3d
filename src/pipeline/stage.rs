//! Progress stages reported while the pipeline runs.
//!
//! The [`PipelineStage`] enum names each step of an installation. The
//! pipeline reports a stage to its callback just before running it.

/// A named step of the installation sequence.
///
/// # Example
///
/// ```rust
/// use avd_lib_installer::PipelineStage;
///
/// fn on_stage(stage: &PipelineStage) {
///     if stage.is_long_running() {
///         println!("{} (this takes several minutes)...", stage.description());
///     } else {
///         println!("{}...", stage.description());
///     }
/// }
///
/// on_stage(&PipelineStage::PullImage);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineStage {
    /// Copying the reference system image next to the device configuration.
    PrepareImage,
    /// Launching the emulator in the background.
    BootDevice,
    /// Waiting for the remote shell to become reachable.
    WaitForDevice,
    /// Remounting `/system` read-write.
    RemountReadWrite,
    /// Removing and recreating the device-side library directory.
    RecreateLibraryDirectory,
    /// Pushing library files.
    PushLibraries,
    /// Pushing permission descriptors.
    PushPermissions,
    /// Building a system image on the device.
    BuildImage,
    /// Pulling the built image to the local machine.
    PullImage,
    /// Deleting the temporary image from the device.
    RemoveRemoteImage,
    /// Replacing the device's system image with the pulled copy.
    StoreImage,
    /// Remounting `/system` read-only.
    RemountReadOnly,
    /// Installation finished; carries the libraries to declare.
    Completed {
        /// Library identifiers, in push order.
        libraries: Vec<String>,
    },
    /// Stopping the emulator launched in [`PipelineStage::BootDevice`].
    ShutdownDevice,
}

impl PipelineStage {
    /// Get a human-readable description of the stage.
    pub fn description(&self) -> &'static str {
        match self {
            Self::PrepareImage => "Preparing the reference system image",
            Self::BootDevice => "Booting the device",
            Self::WaitForDevice => "Waiting for the device",
            Self::RemountReadWrite => "Remounting /system read-write",
            Self::RecreateLibraryDirectory => "Recreating the library directory",
            Self::PushLibraries => "Pushing libraries",
            Self::PushPermissions => "Pushing permission descriptors",
            Self::BuildImage => "Building the system image",
            Self::PullImage => "Pulling the system image",
            Self::RemoveRemoteImage => "Removing the temporary image from the device",
            Self::StoreImage => "Storing the system image",
            Self::RemountReadOnly => "Remounting /system read-only",
            Self::Completed { .. } => "Installation complete",
            Self::ShutdownDevice => "Shutting down the device",
        }
    }

    /// Whether the stage is expected to take minutes rather than seconds.
    pub fn is_long_running(&self) -> bool {
        matches!(self, Self::PullImage)
    }

    /// Check if this stage indicates completion.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_pull_is_long_running() {
        assert!(PipelineStage::PullImage.is_long_running());
        assert!(!PipelineStage::BuildImage.is_long_running());
        assert!(!PipelineStage::PushLibraries.is_long_running());
    }

    #[test]
    fn test_is_complete() {
        let stage = PipelineStage::Completed { libraries: vec![] };
        assert!(stage.is_complete());
        assert!(!PipelineStage::ShutdownDevice.is_complete());
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(
            PipelineStage::RemountReadWrite.description(),
            "Remounting /system read-write"
        );
        assert_eq!(
            PipelineStage::Completed { libraries: vec![] }.description(),
            "Installation complete"
        );
    }
}
