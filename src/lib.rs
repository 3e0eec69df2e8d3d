//! # avd-lib-installer
//!
//! Installs a shared library runtime (library jars plus their permission
//! descriptors) onto an Android virtual device or a rooted device, by
//! driving `avdmanager`, `emulator` and `adb`.
//!
//! ## Features
//!
//! - `DeviceCatalog` parses `avdmanager list avd` output into [`Device`]s
//! - `VersionCatalog` lists payload versions on local storage
//! - [`validate_request`] checks a device name and version against both
//! - [`InstallPipeline`] runs the installation for one of three [`Strategy`]s
//!
//! ## Example
//!
//! ```rust,no_run
//! use avd_lib_installer::{
//!     validate_request, DeviceCatalog, InstallPipeline, InstallerConfig, Strategy,
//!     SystemExecutor, Toolchain, VersionCatalog,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), avd_lib_installer::InstallerError> {
//!     let config = InstallerConfig::detect("payloads")?;
//!     let toolchain = Toolchain::discover(&config)?;
//!     let executor = SystemExecutor;
//!
//!     let devices = DeviceCatalog::new(&config, &executor, &toolchain.avdmanager)
//!         .list_devices()
//!         .await?;
//!     let versions = VersionCatalog::new(&config.payload_root).list_versions()?;
//!     let request = validate_request("Pixel_API30", "2.9.2", &devices, &versions)?;
//!
//!     let report = InstallPipeline::new(&config, &executor, &toolchain)
//!         .install(&request, Strategy::ImageRebuild, |stage| {
//!             println!("{}...", stage.description())
//!         })
//!         .await?;
//!     print!("{}", report.manifest_fragment());
//!     Ok(())
//! }
//! ```

mod catalog;
mod config;
mod error;
mod executor;
mod pipeline;
mod platform;
mod validation;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use catalog::{
    list_payload_files, parse_device_list, parse_device_spec, split_descriptor_blocks, Device,
    DeviceCatalog, PayloadVersion, Toolchain, VersionCatalog, DESCRIPTOR_SEPARATOR, LIB_DIR,
    PERMISSIONS_DIR,
};
pub use config::{InstallerConfig, LOCAL_IMAGE_NAME, MIB};
pub use error::{ErrorKind, InstallerError};
pub use executor::{
    remote_join, run_checked, transport_path, ChildProcess, CommandExecutor, CommandLine,
    CommandResult, DeviceProcess, Elevation, RemoteShell, SystemExecutor,
};
pub use pipeline::{
    completion_guidance, ensure_local_image, kernel_path_from_config, library_id, manifest_fragment,
    reference_image_path, reuse_partition_size_mb, InstallPipeline, InstallReport, PipelineStage,
    Strategy, system_nand_spec, BOOT_CONFIG_FILE, KERNEL_PATH_KEY,
};
pub use platform::Platform;
pub use validation::{validate_request, InstallationRequest};
