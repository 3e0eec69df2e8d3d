//! Device and payload version discovery.
//!
//! - `DeviceCatalog`: runs `avdmanager list avd` once and parses each
//!   descriptor block into a [`Device`]
//! - `VersionCatalog`: lists version directories under the payload root
//! - `Toolchain`: locates `adb`, `emulator` and `avdmanager`

mod devices;
mod parser;
mod path_finder;
mod versions;

pub use devices::{parse_device_list, Device, DeviceCatalog};
pub use parser::{parse_device_spec, split_descriptor_blocks, DESCRIPTOR_SEPARATOR};
pub use path_finder::Toolchain;
pub use versions::{list_payload_files, PayloadVersion, VersionCatalog, LIB_DIR, PERMISSIONS_DIR};
