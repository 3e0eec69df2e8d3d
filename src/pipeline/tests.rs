use super::*;
use crate::catalog::{parse_device_list, VersionCatalog};
use crate::test_support::RecordingExecutor;
use crate::validate_request;
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
    config: InstallerConfig,
    toolchain: Toolchain,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let payload_root = dir.path().join("payloads");
        let lib = payload_root.join("2.9.2").join("lib");
        let permissions = payload_root.join("2.9.2").join("permissions");
        fs::create_dir_all(lib.join("nested")).unwrap();
        fs::create_dir_all(&permissions).unwrap();
        fs::create_dir_all(payload_root.join("2.10.1")).unwrap();
        fs::write(lib.join("maps.jar"), "maps").unwrap();
        fs::write(lib.join("core.jar"), "core").unwrap();
        fs::write(permissions.join("com.example.maps.xml"), "<permissions/>").unwrap();
        fs::write(permissions.join("com.example.core.xml"), "<permissions/>").unwrap();

        let scratch = dir.path().join("scratch");
        fs::create_dir_all(&scratch).unwrap();
        let config = InstallerConfig {
            settle_delay: Duration::ZERO,
            scratch_dir: scratch,
            ..InstallerConfig::new(dir.path().join("home"), payload_root)
        };
        fs::create_dir_all(config.device_home("Pixel")).unwrap();

        Self {
            dir,
            config,
            toolchain: Toolchain {
                adb: "adb".into(),
                emulator: "emulator".into(),
                avdmanager: "avdmanager".into(),
            },
        }
    }

    fn request(&self) -> InstallationRequest {
        let devices = parse_device_list("Name: Pixel\nABI: x86\n", &self.config.avd_root).unwrap();
        let versions = VersionCatalog::new(&self.config.payload_root)
            .list_versions()
            .unwrap();
        validate_request("Pixel", "2.9.2", &devices, &versions).unwrap()
    }

    fn payload(&self, rel: &str) -> String {
        self.config
            .payload_root
            .join("2.9.2")
            .join(rel)
            .display()
            .to_string()
    }

    fn push_commands(&self) -> Vec<String> {
        vec![
            format!(
                "adb push {} /system/framework/runtime/core.jar",
                self.payload("lib/core.jar")
            ),
            format!(
                "adb push {} /system/framework/runtime/maps.jar",
                self.payload("lib/maps.jar")
            ),
            format!(
                "adb push {} /system/etc/permissions/com.example.core.xml",
                self.payload("permissions/com.example.core.xml")
            ),
            format!(
                "adb push {} /system/etc/permissions/com.example.maps.xml",
                self.payload("permissions/com.example.maps.xml")
            ),
        ]
    }

    fn write_boot_config(&self, reference: &Path) {
        let kernel = reference.parent().unwrap().join("kernel-qemu");
        fs::write(
            self.config.device_home("Pixel").join(BOOT_CONFIG_FILE),
            format!("hw.ramSize=512\nkernel.path={}\n", kernel.display()),
        )
        .unwrap();
    }
}

fn stage_names(stages: &RefCell<Vec<PipelineStage>>) -> Vec<&'static str> {
    stages.borrow().iter().map(PipelineStage::description).collect()
}

#[tokio::test]
async fn test_image_rebuild_sequence() {
    let fx = Fixture::new();
    let executor = RecordingExecutor::new().materialize_pulls();
    let pipeline = InstallPipeline::new(&fx.config, &executor, &fx.toolchain);
    let stages = RefCell::new(Vec::new());

    let report = pipeline
        .install(&fx.request(), Strategy::ImageRebuild, |s| {
            stages.borrow_mut().push(s.clone())
        })
        .await
        .unwrap();

    let pulled = fx.config.scratch_dir.join("Pixel-system.img");
    let mut expected = vec![
        "emulator -avd Pixel -partition-size 1024".to_string(),
        "adb wait-for-device".to_string(),
        "adb shell \"mount -o rw,remount /system\"".to_string(),
        "adb shell \"rm -r /system/framework/runtime\"".to_string(),
        "adb shell \"mkdir -p /system/framework/runtime\"".to_string(),
    ];
    expected.extend(fx.push_commands());
    expected.extend([
        "adb shell \"/data/local/tmp/mkfs.yaffs2.x86 /system /data/local/tmp/system.img\""
            .to_string(),
        format!("adb pull /data/local/tmp/system.img {}", pulled.display()),
        "adb shell \"rm /data/local/tmp/system.img\"".to_string(),
    ]);
    assert_eq!(executor.commands(), expected);
    assert_eq!(executor.spawned().len(), 1);
    assert_eq!(executor.terminated(), 1);

    let stored = fx.config.device_home("Pixel").join(LOCAL_IMAGE_NAME);
    assert_eq!(fs::read(stored).unwrap(), b"pulled image");
    assert!(!pulled.exists());

    assert_eq!(
        stage_names(&stages),
        vec![
            "Booting the device",
            "Waiting for the device",
            "Remounting /system read-write",
            "Recreating the library directory",
            "Pushing libraries",
            "Pushing permission descriptors",
            "Building the system image",
            "Pulling the system image",
            "Removing the temporary image from the device",
            "Storing the system image",
            "Installation complete",
            "Shutting down the device",
        ]
    );
    assert_eq!(report.libraries(), ["com.example.core", "com.example.maps"]);
    assert!(report.restart_required());
}

#[tokio::test]
async fn test_aborts_at_first_failing_command() {
    let fx = Fixture::new();
    let executor = RecordingExecutor::new().fail_on("remount", 255);
    let pipeline = InstallPipeline::new(&fx.config, &executor, &fx.toolchain);
    let stages = RefCell::new(Vec::new());

    let err = pipeline
        .install(&fx.request(), Strategy::ImageRebuild, |s| {
            stages.borrow_mut().push(s.clone())
        })
        .await
        .unwrap_err();

    match err {
        InstallerError::CommandFailed {
            command, exit_code, ..
        } => {
            assert_eq!(command, "adb shell \"mount -o rw,remount /system\"");
            assert_eq!(exit_code, 255);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // Nothing after the failing command ran, and the emulator was left up
    assert_eq!(
        executor.commands().last().map(String::as_str),
        Some("adb shell \"mount -o rw,remount /system\"")
    );
    assert_eq!(executor.commands().len(), 3);
    assert_eq!(executor.terminated(), 0);
    assert!(!stages.borrow().iter().any(PipelineStage::is_complete));
}

#[tokio::test]
async fn test_missing_library_dir_is_a_command_failure() {
    let fx = Fixture::new();
    let executor = RecordingExecutor::new().fail_on("rm -r /system/framework/runtime", 1);
    let pipeline = InstallPipeline::new(&fx.config, &executor, &fx.toolchain);

    let err = pipeline
        .install(&fx.request(), Strategy::ImageRebuild, |_| {})
        .await
        .unwrap_err();

    match err {
        InstallerError::CommandFailed {
            command, exit_code, ..
        } => {
            assert_eq!(command, "adb shell \"rm -r /system/framework/runtime\"");
            assert_eq!(exit_code, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!executor.commands().iter().any(|c| c.contains("mkdir")));
}

#[tokio::test]
async fn test_failed_push_stops_remaining_pushes() {
    let fx = Fixture::new();
    let executor = RecordingExecutor::new().fail_on("maps.jar", 1);
    let pipeline = InstallPipeline::new(&fx.config, &executor, &fx.toolchain);

    let err = pipeline
        .install(&fx.request(), Strategy::RootedDevice, |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, InstallerError::CommandFailed { exit_code: 1, .. }));
    let commands = executor.commands();
    assert!(commands.last().unwrap().contains("maps.jar"));
    assert!(!commands.iter().any(|c| c.contains("permissions")));
}

#[tokio::test]
async fn test_image_reuse_boots_against_local_copy() {
    let fx = Fixture::new();
    let images = fx.dir.path().join("sdk/system-images/x86");
    fs::create_dir_all(&images).unwrap();
    let reference = images.join("system.img");
    fs::write(&reference, vec![0u8; 1024 * 1024]).unwrap();
    fx.write_boot_config(&reference);

    let executor = RecordingExecutor::new();
    let pipeline = InstallPipeline::new(&fx.config, &executor, &fx.toolchain);
    let stages = RefCell::new(Vec::new());

    let report = pipeline
        .install(&fx.request(), Strategy::ImageReuse, |s| {
            stages.borrow_mut().push(s.clone())
        })
        .await
        .unwrap();

    let local = fx.config.device_home("Pixel").join(LOCAL_IMAGE_NAME);
    assert_eq!(fs::metadata(&local).unwrap().len(), 1024 * 1024);

    let commands = executor.commands();
    assert_eq!(
        commands[0],
        format!(
            "emulator -avd Pixel -qemu -nand system,size=0x3300000,file={}",
            local.display()
        )
    );
    assert_eq!(&commands[commands.len() - 4..], fx.push_commands().as_slice());
    assert!(!commands.iter().any(|c| c.contains("mkfs") || c.contains("pull")));
    assert_eq!(executor.terminated(), 1);

    let names = stage_names(&stages);
    assert_eq!(names[0], "Preparing the reference system image");
    assert_eq!(names[1], "Booting the device");
    assert_eq!(names[names.len() - 1], "Shutting down the device");
    assert_eq!(report.libraries(), ["com.example.core", "com.example.maps"]);
}

#[tokio::test]
async fn test_image_reuse_keeps_existing_local_copy() {
    let fx = Fixture::new();
    let reference = fx.dir.path().join("reference.img");
    fs::write(&reference, b"reference").unwrap();
    fx.write_boot_config(&reference);
    let local = fx.config.device_home("Pixel").join(LOCAL_IMAGE_NAME);
    fs::write(&local, b"already modified").unwrap();

    let executor = RecordingExecutor::new();
    InstallPipeline::new(&fx.config, &executor, &fx.toolchain)
        .install(&fx.request(), Strategy::ImageReuse, |_| {})
        .await
        .unwrap();

    assert_eq!(fs::read(&local).unwrap(), b"already modified");
}

#[tokio::test]
async fn test_rooted_device_uses_superuser() {
    let fx = Fixture::new();
    let executor = RecordingExecutor::new();
    let pipeline = InstallPipeline::new(&fx.config, &executor, &fx.toolchain);

    let report = pipeline
        .install(&fx.request(), Strategy::RootedDevice, |_| {})
        .await
        .unwrap();

    let pushes = fx.push_commands();
    let expected = vec![
        "adb shell \"su -c \\\"mount -o rw,remount /system\\\"\"".to_string(),
        "adb shell \"su -c \\\"rm -r /system/framework/runtime\\\"\"".to_string(),
        "adb shell \"su -c \\\"mkdir -p /system/framework/runtime\\\"\"".to_string(),
        pushes[0].clone(),
        pushes[1].clone(),
        "adb shell \"su -c \\\"chmod 777 /system/etc/permissions\\\"\"".to_string(),
        pushes[2].clone(),
        pushes[3].clone(),
        "adb shell \"su -c \\\"chmod 755 /system/etc/permissions\\\"\"".to_string(),
        "adb shell \"su -c \\\"mount -o ro,remount /system\\\"\"".to_string(),
    ];
    assert_eq!(executor.commands(), expected);
    assert!(executor.spawned().is_empty());
    assert!(!report.restart_required());
}

#[tokio::test]
async fn test_serial_is_passed_to_adb() {
    let mut fx = Fixture::new();
    fx.config.serial = Some("192.168.56.101:5555".to_string());
    let executor = RecordingExecutor::new();

    InstallPipeline::new(&fx.config, &executor, &fx.toolchain)
        .install(&fx.request(), Strategy::RootedDevice, |_| {})
        .await
        .unwrap();

    assert!(executor
        .commands()
        .iter()
        .all(|c| c.starts_with("adb -s 192.168.56.101:5555 ")));
}

#[tokio::test]
async fn test_wait_for_device_can_be_cancelled() {
    let fx = Fixture::new();
    let executor = RecordingExecutor::new().hang_on("wait-for-device");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = InstallPipeline::new(&fx.config, &executor, &fx.toolchain)
        .with_cancellation(cancel)
        .install(&fx.request(), Strategy::ImageRebuild, |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, InstallerError::Cancelled { .. }));
    assert_eq!(executor.spawned().len(), 1);
    assert_eq!(executor.terminated(), 0);
}

#[tokio::test]
async fn test_missing_payload_directory_fails_before_any_command() {
    let fx = Fixture::new();
    fs::remove_dir_all(fx.config.payload_root.join("2.9.2").join("permissions")).unwrap();
    let executor = RecordingExecutor::new();

    let err = InstallPipeline::new(&fx.config, &executor, &fx.toolchain)
        .install(&fx.request(), Strategy::ImageRebuild, |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, InstallerError::Io { .. }));
    assert!(executor.commands().is_empty());
}
