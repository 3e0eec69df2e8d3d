//! Device descriptors and the device catalog.

use crate::catalog::parser::{parse_device_spec, split_descriptor_blocks};
use crate::executor::{run_checked, transport_path, CommandExecutor, CommandLine};
use crate::{InstallerConfig, InstallerError, Platform};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// An Android virtual device known to the device-management tool.
///
/// Devices are only obtained by parsing descriptor text, see
/// [`parse_device_spec`](crate::parse_device_spec).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    name: String,
    platform: Platform,
    home_directory: PathBuf,
}

impl Device {
    pub(crate) fn new(name: String, platform: Platform, home_directory: PathBuf) -> Self {
        Self {
            name,
            platform,
            home_directory,
        }
    }

    /// The identifier the toolchain uses for this device.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The CPU platform of the device's system image.
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// The device's `<name>.avd` configuration directory.
    pub fn home_directory(&self) -> &Path {
        &self.home_directory
    }
}

/// Parse complete device listing output into a name-keyed map.
///
/// Any block that fails to parse fails the whole listing.
pub fn parse_device_list(
    text: &str,
    avd_root: &Path,
) -> Result<BTreeMap<String, Device>, InstallerError> {
    split_descriptor_blocks(text)
        .iter()
        .map(|block| parse_device_spec(block, avd_root).map(|d| (d.name.clone(), d)))
        .collect()
}

/// Lists the virtual devices the device-management tool knows about.
#[derive(Debug)]
pub struct DeviceCatalog<'a, E: ?Sized> {
    config: &'a InstallerConfig,
    executor: &'a E,
    avdmanager: PathBuf,
}

impl<'a, E> DeviceCatalog<'a, E>
where
    E: CommandExecutor + ?Sized,
{
    /// Create a catalog that queries `avdmanager` through `executor`.
    pub fn new(config: &'a InstallerConfig, executor: &'a E, avdmanager: impl Into<PathBuf>) -> Self {
        Self {
            config,
            executor,
            avdmanager: avdmanager.into(),
        }
    }

    /// Query the tool once and parse every device it reports.
    ///
    /// # Errors
    ///
    /// Fails if the listing command fails, or if any descriptor block is
    /// malformed or names an unsupported ABI.
    pub async fn list_devices(&self) -> Result<BTreeMap<String, Device>, InstallerError> {
        let command = CommandLine::new(transport_path(&self.avdmanager)).args(["list", "avd"]);
        let result = run_checked(self.executor, &command).await?;

        let devices = parse_device_list(result.captured_output(), &self.config.avd_root)?;
        tracing::debug!(count = devices.len(), "discovered devices");
        Ok(devices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingExecutor;

    const LISTING: &str = "Available Android Virtual Devices:
    Name: Pixel_API30
    Path: /home/dev/.android/avd/Pixel_API30.avd
  Target: Google APIs (Google Inc.)
          Based on: Android 11.0 (R) Tag/ABI: google_apis/x86
---------
    Name: Tablet
    Path: /home/dev/.android/avd/Tablet.avd
  Target: Android 4.1 (API level 16)
     ABI: armeabi-v7a
";

    #[tokio::test]
    async fn test_list_devices() {
        let config = InstallerConfig::new("/home/dev", "payloads");
        let executor = RecordingExecutor::new().respond("list avd", LISTING);
        let catalog = DeviceCatalog::new(&config, &executor, "avdmanager");

        let devices = catalog.list_devices().await.unwrap();
        assert_eq!(
            devices.keys().collect::<Vec<_>>(),
            vec!["Pixel_API30", "Tablet"]
        );
        assert_eq!(devices["Pixel_API30"].platform(), Platform::X86);
        assert_eq!(devices["Tablet"].platform(), Platform::Arm);
        assert_eq!(
            devices["Tablet"].home_directory(),
            Path::new("/home/dev/.android/avd/Tablet.avd")
        );
        assert_eq!(executor.commands(), vec!["avdmanager list avd"]);
    }

    #[tokio::test]
    async fn test_list_devices_fails_on_bad_abi() {
        let config = InstallerConfig::new("/home/dev", "payloads");
        let executor = RecordingExecutor::new()
            .respond("list avd", "Name: A\nABI: x86\n---------\nName: B\nABI: mips\n");
        let catalog = DeviceCatalog::new(&config, &executor, "avdmanager");

        let err = catalog.list_devices().await.unwrap_err();
        assert!(matches!(err, InstallerError::UnrecognizedAbi { ref device, .. } if device == "B"));
    }

    #[tokio::test]
    async fn test_list_devices_command_failure() {
        let config = InstallerConfig::new("/home/dev", "payloads");
        let executor = RecordingExecutor::new().fail_on("list avd", 1);
        let catalog = DeviceCatalog::new(&config, &executor, "avdmanager");

        let err = catalog.list_devices().await.unwrap_err();
        assert!(matches!(err, InstallerError::CommandFailed { exit_code: 1, .. }));
    }

    #[test]
    fn test_parse_empty_listing() {
        let devices = parse_device_list("", Path::new("/avd")).unwrap();
        assert!(devices.is_empty());
    }

    #[test]
    fn test_device_serializes() {
        let devices = parse_device_list("Name: A\nABI: x86\n", Path::new("/avd")).unwrap();
        let json = serde_json::to_value(&devices["A"]).unwrap();
        assert_eq!(json["name"], "A");
        assert_eq!(json["platform"], "x86");
        assert_eq!(json["home_directory"], "/avd/A.avd");
    }
}
