//! Device platform enum and ABI classification.

use serde::Serialize;

/// The CPU platform of an Android virtual device.
///
/// This is a closed set. An ABI token that matches neither platform is a
/// hard classification failure, never coerced to a default.
///
/// # Example
///
/// ```rust
/// use avd_lib_installer::Platform;
///
/// assert_eq!(Platform::from_abi("armeabi-v7a"), Some(Platform::Arm));
/// assert_eq!(Platform::from_abi("x86"), Some(Platform::X86));
/// assert_eq!(Platform::from_abi("mips"), None);
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    strum::Display,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Platform {
    /// ARM images (`armeabi`, `armeabi-v7a`, `arm64-v8a`, ...).
    Arm,
    /// 32-bit Intel images.
    X86,
}

impl Platform {
    /// Classify an ABI token reported by the device-management tool.
    ///
    /// Any token beginning with `arm` is [`Platform::Arm`]. A token that is
    /// exactly `x86`, or ends in `x86` (as in `google_apis/x86`), is
    /// [`Platform::X86`]. Everything else returns `None`.
    pub fn from_abi(abi: &str) -> Option<Self> {
        if abi.starts_with("arm") {
            Some(Self::Arm)
        } else if abi.ends_with("x86") {
            Some(Self::X86)
        } else {
            None
        }
    }

    /// Name of the on-device filesystem image builder for this platform.
    ///
    /// ```rust
    /// use avd_lib_installer::Platform;
    ///
    /// assert_eq!(Platform::Arm.image_tool_name(), "mkfs.yaffs2.arm");
    /// ```
    pub fn image_tool_name(&self) -> String {
        format!("mkfs.yaffs2.{}", self.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arm_prefixes() {
        for abi in ["arm", "armeabi", "armeabi-v7a", "arm64-v8a"] {
            assert_eq!(Platform::from_abi(abi), Some(Platform::Arm), "{abi}");
        }
    }

    #[test]
    fn test_x86_exact_and_suffix() {
        assert_eq!(Platform::from_abi("x86"), Some(Platform::X86));
        assert_eq!(Platform::from_abi("google_apis/x86"), Some(Platform::X86));
    }

    #[test]
    fn test_unrecognized_abis() {
        for abi in ["mips", "x86_64", "google_apis/armeabi-v7a", ""] {
            assert_eq!(Platform::from_abi(abi), None, "{abi}");
        }
    }

    #[test]
    fn test_display_and_tool_name() {
        assert_eq!(Platform::X86.to_string(), "x86");
        assert_eq!(Platform::Arm.to_string(), "arm");
        assert_eq!(Platform::X86.image_tool_name(), "mkfs.yaffs2.x86");
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Platform::X86).unwrap();
        assert_eq!(json, "\"x86\"");
    }
}
