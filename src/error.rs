//! Error types for catalog discovery, validation and installation.
//!
//! Every failure in the installer is unrecoverable for the current run. The
//! variants carry enough context to be reported verbatim to the operator,
//! and each has an actionable fix suggestion.

use std::path::PathBuf;
use thiserror::Error;

/// Broad classification of an [`InstallerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The operator supplied a device, version or descriptor that failed
    /// validation or parsing.
    InvalidInput,
    /// An external command returned a non-zero exit code.
    CommandFailure,
    /// The local environment could not support the run (missing tool,
    /// unreadable file, cancelled wait).
    Environment,
}

/// Errors that can occur while provisioning a device.
///
/// # Example
///
/// ```rust
/// use avd_lib_installer::{ErrorKind, InstallerError};
///
/// let error = InstallerError::UnknownVersion {
///     version: "9.9.9".to_string(),
///     available: vec!["2.9.2".to_string(), "2.10.1".to_string()],
/// };
/// assert_eq!(error.kind(), ErrorKind::InvalidInput);
/// assert!(error.to_string().ends_with("2.9.2, 2.10.1"));
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InstallerError {
    /// The requested device is not in the device catalog.
    #[error("unknown device '{name}'; available devices: {}", .available.join(", "))]
    UnknownDevice {
        /// The device name that was requested.
        name: String,
        /// Every device name the catalog reported.
        available: Vec<String>,
    },

    /// The requested payload version has no directory under the payload root.
    #[error("unknown version '{version}'; available versions: {}", .available.join(", "))]
    UnknownVersion {
        /// The version that was requested.
        version: String,
        /// Every version discovered on disk.
        available: Vec<String>,
    },

    /// A device descriptor named an ABI outside the supported platforms.
    #[error("device '{device}' has unrecognized ABI '{abi}'")]
    UnrecognizedAbi {
        /// Name of the device whose descriptor was parsed.
        device: String,
        /// The ABI token that could not be classified.
        abi: String,
    },

    /// A device descriptor block did not contain a `Name:`/`ABI:` pair.
    #[error("malformed device descriptor: {}", .block.trim())]
    MalformedDescriptor {
        /// The raw descriptor block.
        block: String,
    },

    /// The device's boot configuration has no kernel path entry.
    #[error("no kernel path entry in {}", .config.display())]
    MissingKernelPath {
        /// Path to the boot configuration file.
        config: PathBuf,
    },

    /// A required toolchain executable could not be located.
    #[error("could not find '{tool}' on PATH or under the SDK root")]
    ToolNotFound {
        /// Executable name that was searched for.
        tool: &'static str,
    },

    /// An external command exited with a non-zero code.
    #[error("command `{command}` failed with exit code {exit_code}")]
    CommandFailed {
        /// The exact command line that was run.
        command: String,
        /// The exit code it returned.
        exit_code: i32,
        /// Captured stdout and stderr.
        output: String,
    },

    /// An external command could not be started at all.
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        /// The command line that was attempted.
        command: String,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// A local filesystem operation failed.
    #[error("{context}: {source}")]
    Io {
        /// What the installer was doing.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A caller-supplied cancellation fired during a blocking wait.
    #[error("{operation} was cancelled")]
    Cancelled {
        /// The operation that was interrupted.
        operation: &'static str,
    },
}

impl InstallerError {
    /// Wrap an I/O error with a description of the failed operation.
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownDevice { .. }
            | Self::UnknownVersion { .. }
            | Self::UnrecognizedAbi { .. }
            | Self::MalformedDescriptor { .. } => ErrorKind::InvalidInput,
            Self::CommandFailed { .. } => ErrorKind::CommandFailure,
            Self::MissingKernelPath { .. }
            | Self::ToolNotFound { .. }
            | Self::Spawn { .. }
            | Self::Io { .. }
            | Self::Cancelled { .. } => ErrorKind::Environment,
        }
    }

    /// Get an actionable suggestion for fixing this error.
    ///
    /// ```rust
    /// use avd_lib_installer::InstallerError;
    ///
    /// let error = InstallerError::ToolNotFound { tool: "adb" };
    /// assert!(error.fix_suggestion().contains("ANDROID_SDK_ROOT"));
    /// ```
    pub fn fix_suggestion(&self) -> &'static str {
        match self {
            Self::UnknownDevice { .. } => {
                "Pick one of the listed devices, or create it with avdmanager first"
            }
            Self::UnknownVersion { .. } => {
                "Pick one of the listed versions, or add a directory for it under the payload root"
            }
            Self::UnrecognizedAbi { .. } => "Only arm and x86 system images are supported",
            Self::MalformedDescriptor { .. } => {
                "Check that `avdmanager list avd` runs cleanly and lists Name/ABI for every device"
            }
            Self::MissingKernelPath { .. } => {
                "Boot the device once from the emulator so its config.ini is fully populated"
            }
            Self::ToolNotFound { .. } => {
                "Add the Android SDK tools to PATH or set ANDROID_SDK_ROOT / --sdk-root"
            }
            Self::CommandFailed { .. } => {
                "See the command output above; the device may need a manual restart before retrying"
            }
            Self::Spawn { .. } => "Check that the program exists and is executable",
            Self::Io { .. } => "Check the path exists and is readable and writable",
            Self::Cancelled { .. } => "Retry with a longer timeout, or without one",
        }
    }
}
