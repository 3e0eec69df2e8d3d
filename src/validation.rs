//! Validation of a requested device and version against the catalogs.

use crate::catalog::{Device, PayloadVersion};
use crate::InstallerError;
use std::collections::{BTreeMap, BTreeSet};

/// A device and payload version that have both been validated.
///
/// The only way to build one is [`validate_request`], so a request is never
/// partially validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationRequest {
    device: Device,
    version: PayloadVersion,
}

impl InstallationRequest {
    /// The target device.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// The payload version to install.
    pub fn version(&self) -> &PayloadVersion {
        &self.version
    }
}

/// Look up a requested device name and version in the discovered catalogs.
///
/// The device is checked first. On a miss the error names the rejected
/// value and every accepted value, in catalog order.
///
/// # Example
///
/// ```rust
/// use avd_lib_installer::{parse_device_list, validate_request, InstallerError};
/// use std::collections::BTreeSet;
/// use std::path::Path;
///
/// let devices = parse_device_list("Name: Pixel_API30\nABI: x86\n", Path::new("/avd")).unwrap();
/// let versions = BTreeSet::new();
///
/// let err = validate_request("Pixel_API30", "9.9.9", &devices, &versions).unwrap_err();
/// assert!(matches!(err, InstallerError::UnknownVersion { .. }));
/// ```
pub fn validate_request(
    device_name: &str,
    version: &str,
    devices: &BTreeMap<String, Device>,
    versions: &BTreeSet<PayloadVersion>,
) -> Result<InstallationRequest, InstallerError> {
    let device = devices
        .get(device_name)
        .cloned()
        .ok_or_else(|| InstallerError::UnknownDevice {
            name: device_name.to_string(),
            available: devices.keys().cloned().collect(),
        })?;

    let version = versions
        .iter()
        .find(|v| v.as_str() == version)
        .cloned()
        .ok_or_else(|| InstallerError::UnknownVersion {
            version: version.to_string(),
            available: versions.iter().map(ToString::to_string).collect(),
        })?;

    tracing::info!(device = device.name(), %version, "validated installation request");
    Ok(InstallationRequest { device, version })
}
