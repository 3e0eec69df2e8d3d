//! Local system image handling for the image-reuse strategy.

use crate::config::MIB;
use crate::executor::transport_path;
use crate::{InstallerError, LOCAL_IMAGE_NAME};
use std::path::{Path, PathBuf};

/// Boot configuration file inside a device home directory.
pub const BOOT_CONFIG_FILE: &str = "config.ini";

/// Key of the boot configuration line naming the kernel.
pub const KERNEL_PATH_KEY: &str = "kernel.path";

/// Extract the kernel path from boot configuration contents.
///
/// ```rust
/// use avd_lib_installer::kernel_path_from_config;
///
/// let config = "hw.ramSize=512\nkernel.path = system-images/android-16/armeabi-v7a/kernel-qemu\n";
/// assert_eq!(
///     kernel_path_from_config(config),
///     Some("system-images/android-16/armeabi-v7a/kernel-qemu")
/// );
/// ```
pub fn kernel_path_from_config(contents: &str) -> Option<&str> {
    contents.lines().find_map(|line| {
        line.strip_prefix(KERNEL_PATH_KEY)?
            .trim_start()
            .strip_prefix('=')
            .map(str::trim)
            .filter(|value| !value.is_empty())
    })
}

/// Locate the reference system image for a device.
///
/// The image sits next to the kernel named in the device's boot
/// configuration. A relative kernel path is resolved against `sdk_root`
/// when one is configured.
pub fn reference_image_path(
    device_home: &Path,
    sdk_root: Option<&Path>,
) -> Result<PathBuf, InstallerError> {
    let config = device_home.join(BOOT_CONFIG_FILE);
    let contents = std::fs::read_to_string(&config)
        .map_err(|e| InstallerError::io(format!("reading {}", config.display()), e))?;

    let kernel = kernel_path_from_config(&contents)
        .map(PathBuf::from)
        .ok_or_else(|| InstallerError::MissingKernelPath {
            config: config.clone(),
        })?;

    let kernel = match sdk_root {
        Some(root) if kernel.is_relative() => root.join(kernel),
        _ => kernel,
    };
    let dir = kernel.parent().unwrap_or_else(|| Path::new(""));
    Ok(dir.join(LOCAL_IMAGE_NAME))
}

/// Copy `reference` to `target` unless `target` already exists.
///
/// Returns whether a copy was made.
pub async fn ensure_local_image(reference: &Path, target: &Path) -> Result<bool, InstallerError> {
    if tokio::fs::try_exists(target)
        .await
        .map_err(|e| InstallerError::io(format!("checking {}", target.display()), e))?
    {
        tracing::info!(image = %target.display(), "reusing existing system image");
        return Ok(false);
    }

    tracing::info!(
        from = %reference.display(),
        to = %target.display(),
        "copying reference system image"
    );
    tokio::fs::copy(reference, target).await.map_err(|e| {
        InstallerError::io(
            format!("copying {} to {}", reference.display(), target.display()),
            e,
        )
    })?;
    Ok(true)
}

/// Partition size in MiB for booting against an image of `image_len` bytes
/// with `headroom` bytes to spare, rounded up.
///
/// ```rust
/// use avd_lib_installer::reuse_partition_size_mb;
///
/// let mib = 1024 * 1024;
/// assert_eq!(reuse_partition_size_mb(200 * mib, 50 * mib), 250);
/// assert_eq!(reuse_partition_size_mb(200 * mib + 1, 50 * mib), 251);
/// ```
pub fn reuse_partition_size_mb(image_len: u64, headroom: u64) -> u64 {
    image_len.saturating_add(headroom).div_ceil(MIB)
}

/// Emulator `-nand` device spec that backs the system partition with
/// `image` directly, so writes land in that file.
///
/// ```rust
/// use avd_lib_installer::system_nand_spec;
/// use std::path::Path;
///
/// assert_eq!(
///     system_nand_spec(Path::new("/avd/Pixel.avd/system.img"), 51),
///     "system,size=0x3300000,file=/avd/Pixel.avd/system.img"
/// );
/// ```
pub fn system_nand_spec(image: &Path, partition_mb: u64) -> String {
    format!(
        "system,size={:#x},file={}",
        partition_mb.saturating_mul(MIB),
        transport_path(image)
    )
}
