//! Device acquisition strategies.

use crate::executor::Elevation;

/// How the target device is obtained and how modifications persist.
///
/// Selected once per run; independent of the device's platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum Strategy {
    /// Boot with an enlarged partition, modify, then rebuild and pull a new
    /// system image into the device home.
    ImageRebuild,
    /// Boot directly against a local copy of the reference image so the
    /// modifications land in the backing file.
    ImageReuse,
    /// Use an already running rooted device; every shell command goes
    /// through `su`.
    RootedDevice,
}

impl Strategy {
    /// Elevation applied to remote shell commands.
    pub fn elevation(&self) -> Elevation {
        match self {
            Self::ImageRebuild | Self::ImageReuse => Elevation::Ambient,
            Self::RootedDevice => Elevation::Superuser,
        }
    }

    /// Whether the pipeline launches (and later stops) an emulator.
    pub fn boots_device(&self) -> bool {
        !matches!(self, Self::RootedDevice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_elevation() {
        assert_eq!(Strategy::ImageRebuild.elevation(), Elevation::Ambient);
        assert_eq!(Strategy::ImageReuse.elevation(), Elevation::Ambient);
        assert_eq!(Strategy::RootedDevice.elevation(), Elevation::Superuser);
    }

    #[test]
    fn test_boots_device() {
        assert!(Strategy::ImageRebuild.boots_device());
        assert!(Strategy::ImageReuse.boots_device());
        assert!(!Strategy::RootedDevice.boots_device());
    }

    #[test]
    fn test_string_forms() {
        assert_eq!(Strategy::ImageReuse.to_string(), "image-reuse");
        assert_eq!(
            Strategy::from_str("rooted-device").unwrap(),
            Strategy::RootedDevice
        );
        assert!(Strategy::from_str("bogus").is_err());
    }
}
