//! avd-lib-installer CLI entrypoint.
//!
//! Lists devices and payload versions, and installs a payload version onto
//! a device. Progress goes to stderr; listings and manifest guidance go to
//! stdout.

use avd_lib_installer::{
    completion_guidance, validate_request, DeviceCatalog, ErrorKind, InstallPipeline,
    InstallerConfig, InstallerError, PipelineStage, Strategy, SystemExecutor, Toolchain,
    VersionCatalog,
};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "avd-lib-installer", version, about)]
struct Cli {
    /// Android SDK root, searched for adb, emulator and avdmanager.
    #[arg(long, env = "ANDROID_SDK_ROOT", global = true)]
    sdk_root: Option<PathBuf>,

    /// Directory holding one subdirectory per payload version.
    #[arg(
        long,
        env = "AVD_LIB_PAYLOAD_ROOT",
        default_value = "payloads",
        global = true
    )]
    payload_root: PathBuf,

    /// Directory holding `<device>.avd` directories [default: ~/.android/avd]
    #[arg(long, global = true)]
    avd_root: Option<PathBuf>,

    /// adb serial of the target device.
    #[arg(short, long, global = true)]
    serial: Option<String>,

    /// Log every command executed.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the virtual devices known to avdmanager.
    Devices {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List the payload versions available locally.
    Versions,
    /// Install a payload version onto a device.
    Install(InstallArgs),
}

#[derive(Debug, clap::Args)]
struct InstallArgs {
    /// Name of the target device.
    #[arg(short, long)]
    device: String,

    /// Payload version to install.
    #[arg(long = "version", value_name = "VERSION")]
    payload_version: String,

    /// image-rebuild, image-reuse or rooted-device.
    #[arg(long, default_value = "image-rebuild")]
    strategy: Strategy,

    /// Give up waiting for the device after this many seconds.
    #[arg(long, value_name = "SECS")]
    boot_timeout: Option<u64>,

    /// Device-side directory for the payload libraries.
    #[arg(long)]
    lib_dir: Option<String>,

    /// Writable partition size for image-rebuild boots, in MiB.
    #[arg(long, default_value_t = 1024)]
    partition_size: u64,

    /// Pause after each pushed file for image-reuse, in milliseconds.
    #[arg(long, default_value_t = 2000)]
    settle_delay_ms: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report_failure(&e),
    }
}

async fn run(cli: Cli) -> Result<(), InstallerError> {
    let mut config = InstallerConfig::detect(cli.payload_root)?;
    config.sdk_root = cli.sdk_root;
    config.serial = cli.serial;
    if let Some(avd_root) = cli.avd_root {
        config.avd_root = avd_root;
    }

    match cli.command {
        Command::Devices { json } => list_devices(&config, json).await,
        Command::Versions => {
            for version in VersionCatalog::new(&config.payload_root).list_versions()? {
                println!("{version}");
            }
            Ok(())
        }
        Command::Install(args) => install(config, args).await,
    }
}

async fn list_devices(config: &InstallerConfig, json: bool) -> Result<(), InstallerError> {
    let avdmanager = Toolchain::locate("avdmanager", config)?;
    let devices = DeviceCatalog::new(config, &SystemExecutor, avdmanager)
        .list_devices()
        .await?;

    if json {
        let devices: Vec<_> = devices.values().collect();
        let text = serde_json::to_string_pretty(&devices)
            .map_err(|e| InstallerError::Io {
                context: "serializing devices".to_string(),
                source: std::io::Error::other(e),
            })?;
        println!("{text}");
    } else {
        for device in devices.values() {
            println!(
                "{}\t{}\t{}",
                device.name(),
                device.platform(),
                device.home_directory().display()
            );
        }
    }
    Ok(())
}

async fn install(mut config: InstallerConfig, args: InstallArgs) -> Result<(), InstallerError> {
    if let Some(lib_dir) = args.lib_dir {
        config.remote_lib_dir = lib_dir;
    }
    config.partition_size_mb = args.partition_size;
    config.settle_delay = Duration::from_millis(args.settle_delay_ms);

    let toolchain = Toolchain::discover(&config)?;
    let executor = SystemExecutor;

    let devices = DeviceCatalog::new(&config, &executor, &toolchain.avdmanager)
        .list_devices()
        .await?;
    let versions = VersionCatalog::new(&config.payload_root).list_versions()?;
    let request = validate_request(&args.device, &args.payload_version, &devices, &versions)?;

    let cancel = CancellationToken::new();
    if let Some(secs) = args.boot_timeout {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            cancel.cancel();
        });
    }

    let report = InstallPipeline::new(&config, &executor, &toolchain)
        .with_cancellation(cancel)
        .install(&request, args.strategy, print_stage)
        .await?;

    if report.restart_required() {
        println!("Close the emulator if it is still running and start it again to boot from the updated system image.");
    }
    Ok(())
}

fn print_stage(stage: &PipelineStage) {
    match stage {
        PipelineStage::Completed { libraries } => {
            eprintln!("{}.", stage.description());
            print!("{}", completion_guidance(libraries));
        }
        stage if stage.is_long_running() => {
            eprintln!("{}. This takes several minutes...", stage.description());
        }
        stage => eprintln!("{}...", stage.description()),
    }
}

fn report_failure(error: &InstallerError) -> ExitCode {
    eprintln!("error: {error}");
    if let InstallerError::CommandFailed { output, .. } = error {
        if !output.trim().is_empty() {
            eprintln!("{}", output.trim_end());
        }
    }
    eprintln!("hint: {}", error.fix_suggestion());
    eprintln!();
    eprintln!("{}", Cli::command().render_usage());

    match error.kind() {
        ErrorKind::InvalidInput => ExitCode::from(2),
        ErrorKind::CommandFailure | ErrorKind::Environment => ExitCode::from(1),
    }
}
