//! Toolchain executable lookup with SDK-root fallbacks.

use crate::{InstallerConfig, InstallerError};
use std::path::{Path, PathBuf};

/// SDK-relative directories searched when a tool is not on PATH.
const SDK_SUBDIRS: &[&str] = &[
    "platform-tools",
    "emulator",
    "cmdline-tools/latest/bin",
    "tools/bin",
    "tools",
];

/// Find an executable by name.
///
/// Tries the system PATH via the `which` crate first, then the
/// conventional subdirectories of `sdk_root`.
pub(crate) fn find_executable(name: &str, sdk_root: Option<&Path>) -> Option<PathBuf> {
    if let Ok(path) = which::which(name) {
        return Some(path);
    }

    let sdk_root = sdk_root?;
    SDK_SUBDIRS
        .iter()
        .map(|dir| sdk_root.join(dir).join(name))
        .find(|path| path.is_file())
}

/// Resolved paths of the Android SDK tools the installer drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    /// The remote shell and file transfer tool.
    pub adb: PathBuf,
    /// The device launcher.
    pub emulator: PathBuf,
    /// The device-management tool.
    pub avdmanager: PathBuf,
}

impl Toolchain {
    /// Locate every tool, failing on the first one missing.
    pub fn discover(config: &InstallerConfig) -> Result<Self, InstallerError> {
        Ok(Self {
            adb: Self::locate("adb", config)?,
            emulator: Self::locate("emulator", config)?,
            avdmanager: Self::locate("avdmanager", config)?,
        })
    }

    /// Locate a single tool.
    pub fn locate(tool: &'static str, config: &InstallerConfig) -> Result<PathBuf, InstallerError> {
        let path = find_executable(tool, config.sdk_root.as_deref())
            .ok_or(InstallerError::ToolNotFound { tool })?;
        tracing::debug!(tool, path = %path.display(), "located tool");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_find_common_executable() {
        let result = find_executable("sh", None);
        assert!(result.is_some());
        assert!(result.unwrap().exists());
    }

    #[test]
    fn test_find_nonexistent_executable() {
        assert!(find_executable("definitely_not_a_real_sdk_tool_12345", None).is_none());
    }

    #[test]
    fn test_find_in_sdk_root() {
        let sdk = tempfile::tempdir().unwrap();
        let tools = sdk.path().join("cmdline-tools/latest/bin");
        std::fs::create_dir_all(&tools).unwrap();
        std::fs::write(tools.join("fake_sdk_tool_xyz"), "#!/bin/sh\n").unwrap();

        let found = find_executable("fake_sdk_tool_xyz", Some(sdk.path()));
        assert_eq!(found, Some(tools.join("fake_sdk_tool_xyz")));
    }
}
