//! Device descriptor parsing with regex extraction.

use crate::catalog::Device;
use crate::{InstallerError, Platform};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Line separating per-device blocks in `avdmanager list avd` output.
pub const DESCRIPTOR_SEPARATOR: &str = "---------";

fn descriptor_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // `Name:` then `ABI:`, with anything (newlines included) around and between
    RE.get_or_init(|| {
        Regex::new(r"(?s)Name:[ \t]*(\S+).*?ABI:[ \t]*(\S+)").expect("Invalid regex pattern")
    })
}

/// Parse one device descriptor block.
///
/// The block is free-form text containing `Name: <token>` followed somewhere
/// later by `ABI: <token>`. The ABI token is classified with
/// [`Platform::from_abi`]; the device home directory is derived from
/// `avd_root`.
///
/// # Errors
///
/// - [`InstallerError::MalformedDescriptor`] if no `Name:`/`ABI:` pair is found
/// - [`InstallerError::UnrecognizedAbi`] if the ABI is neither arm nor x86
///
/// # Example
///
/// ```rust
/// use avd_lib_installer::{parse_device_spec, Platform};
/// use std::path::Path;
///
/// let device = parse_device_spec(
///     "---------\nName: Pixel_API30\nABI: x86\n",
///     Path::new("/home/dev/.android/avd"),
/// )
/// .unwrap();
/// assert_eq!(device.name(), "Pixel_API30");
/// assert_eq!(device.platform(), Platform::X86);
/// ```
pub fn parse_device_spec(text: &str, avd_root: &Path) -> Result<Device, InstallerError> {
    let caps = descriptor_regex()
        .captures(text)
        .ok_or_else(|| InstallerError::MalformedDescriptor {
            block: text.to_string(),
        })?;

    let name = caps[1].to_string();
    let abi = &caps[2];
    let platform = Platform::from_abi(abi).ok_or_else(|| InstallerError::UnrecognizedAbi {
        device: name.clone(),
        abi: abi.to_string(),
    })?;

    let home_directory = avd_root.join(format!("{name}.avd"));
    Ok(Device::new(name, platform, home_directory))
}

/// Split raw device listing output into per-device blocks.
///
/// Blocks containing only whitespace are dropped.
pub fn split_descriptor_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if line.trim() == DESCRIPTOR_SEPARATOR {
            blocks.push(std::mem::take(&mut current));
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    blocks.push(current);

    blocks.retain(|block| !block.trim().is_empty());
    blocks
}
