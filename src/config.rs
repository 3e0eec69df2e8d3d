//! Installer configuration.
//!
//! This module provides the [`InstallerConfig`] struct. It is built once at
//! the process boundary and passed explicitly to the catalogs and the
//! pipeline, so nothing below the CLI reads the process environment.

use crate::InstallerError;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One mebibyte.
pub const MIB: u64 = 1024 * 1024;

/// File name of the system image kept in a device's home directory.
pub const LOCAL_IMAGE_NAME: &str = "system.img";

/// Configuration for catalog discovery and installation.
///
/// # Example
///
/// ```rust
/// use avd_lib_installer::InstallerConfig;
/// use std::path::Path;
/// use std::time::Duration;
///
/// let config = InstallerConfig {
///     settle_delay: Duration::ZERO,
///     ..InstallerConfig::new("/home/dev", "payloads")
/// };
/// assert_eq!(config.avd_root, Path::new("/home/dev/.android/avd"));
/// assert_eq!(
///     config.device_home("Pixel_API30"),
///     Path::new("/home/dev/.android/avd/Pixel_API30.avd")
/// );
/// ```
#[derive(Debug, Clone)]
pub struct InstallerConfig {
    /// Directory holding `<device>.avd` home directories.
    ///
    /// Default: `<user home>/.android/avd`
    pub avd_root: PathBuf,

    /// Root of the local payload bundles, laid out as
    /// `<payload_root>/<version>/{lib,permissions}/`.
    pub payload_root: PathBuf,

    /// Android SDK root used as a fallback when locating tools and to
    /// resolve relative kernel paths in boot configuration files.
    ///
    /// Default: `None`
    pub sdk_root: Option<PathBuf>,

    /// Device-side directory the payload libraries are pushed into.
    ///
    /// Default: `/system/framework/runtime`
    pub remote_lib_dir: String,

    /// Device-side directory for permission descriptors.
    ///
    /// Default: `/system/etc/permissions`
    pub remote_permissions_dir: String,

    /// Device-side scratch directory holding the image tool and the
    /// temporary rebuilt image.
    ///
    /// Default: `/data/local/tmp`
    pub remote_staging_dir: String,

    /// Writable partition size passed to the emulator when booting for an
    /// image rebuild, in MiB.
    ///
    /// Default: 1024
    pub partition_size_mb: u64,

    /// Space reserved on top of the reference image size when booting
    /// against it directly.
    ///
    /// Default: 50 MiB
    pub image_headroom: u64,

    /// Pause after each file transfer when the device is backed directly by
    /// the local image.
    ///
    /// Default: 2 seconds
    pub settle_delay: Duration,

    /// Local directory the rebuilt image is pulled into before it is stored.
    ///
    /// Default: the system temporary directory
    pub scratch_dir: PathBuf,

    /// adb serial of the target device, if more than one is attached.
    ///
    /// Default: `None`
    pub serial: Option<String>,
}

impl InstallerConfig {
    /// Build a configuration rooted at the given user home directory.
    pub fn new(user_home: impl AsRef<Path>, payload_root: impl Into<PathBuf>) -> Self {
        Self {
            avd_root: user_home.as_ref().join(".android").join("avd"),
            payload_root: payload_root.into(),
            sdk_root: None,
            remote_lib_dir: "/system/framework/runtime".to_string(),
            remote_permissions_dir: "/system/etc/permissions".to_string(),
            remote_staging_dir: "/data/local/tmp".to_string(),
            partition_size_mb: 1024,
            image_headroom: 50 * MIB,
            settle_delay: Duration::from_secs(2),
            scratch_dir: std::env::temp_dir(),
            serial: None,
        }
    }

    /// Build a configuration for the current user's home directory.
    pub fn detect(payload_root: impl Into<PathBuf>) -> Result<Self, InstallerError> {
        let home = dirs::home_dir().ok_or_else(|| {
            InstallerError::io(
                "locating the user home directory",
                std::io::Error::new(std::io::ErrorKind::NotFound, "no home directory"),
            )
        })?;
        Ok(Self::new(home, payload_root))
    }

    /// Home directory of the named device.
    pub fn device_home(&self, name: &str) -> PathBuf {
        self.avd_root.join(format!("{name}.avd"))
    }

    /// Device-side path of the temporary rebuilt image.
    pub fn remote_image_path(&self) -> String {
        format!(
            "{}/{}",
            self.remote_staging_dir.trim_end_matches('/'),
            LOCAL_IMAGE_NAME
        )
    }
}
