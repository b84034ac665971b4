// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use snapcam::backends::camera::{CameraBackend, CameraBackendType, get_backend};
use snapcam::constants::{APP_NAME, DEFAULT_LOG_FILTER};
use snapcam::permission::DevicePermissions;
use snapcam::{CameraScreen, Config};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;

mod cli;

/// Log file used while the terminal screen owns stdout/stderr
const LOG_FILE: &str = "snapcam.log";

#[derive(Parser)]
#[command(name = "snapcam")]
#[command(about = "Camera with live preview, snap, torch and volume-key zoom")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    /// Use the synthetic test-pattern camera instead of a real one
    #[arg(long = "virtual", global = true)]
    use_virtual: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    List,

    /// Take a photo
    Photo {
        /// Camera index to use (from 'snapcam list')
        #[arg(short, long, default_value = "0")]
        camera: usize,

        /// Output file or directory (default: ~/Pictures/snapcam)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the average luminosity of the preview stream
    Analyze {
        /// How long to run, in seconds
        #[arg(short, long, default_value = "10")]
        duration: u64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=snapcam=debug, RUST_LOG=luminosity=off
    init_logging(cli.command.is_none());
    info!(version = env!("GIT_VERSION"), "Starting snapcam");

    let config = Config::load();
    let backend = open_backend(&config, cli.use_virtual)?;

    match cli.command {
        Some(Commands::List) => cli::list_cameras(backend.as_ref()),
        Some(Commands::Photo { camera, output }) => {
            cli::take_photo(backend.as_ref(), &config, camera, output)
        }
        Some(Commands::Analyze { duration }) => {
            cli::analyze(backend.as_ref(), &config, duration)
        }
        None => run_screen(backend.as_ref(), &config),
    }
}

fn init_logging(to_file: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));

    // The screen takes over the terminal, so its logs go to a file
    if to_file && let Some(file) = open_log_file() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}

fn open_log_file() -> Option<std::fs::File> {
    let dir = dirs::data_local_dir()?.join(APP_NAME);
    std::fs::create_dir_all(&dir).ok()?;
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE))
        .ok()
}

fn open_backend(
    config: &Config,
    use_virtual: bool,
) -> Result<Box<dyn CameraBackend>, Box<dyn std::error::Error>> {
    let kind = if use_virtual {
        CameraBackendType::Virtual
    } else {
        config.backend
    };
    let backend = get_backend(kind)?;
    info!(backend = %backend.backend_type(), "Camera backend ready");
    Ok(backend)
}

fn run_screen(backend: &dyn CameraBackend, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    // Bound before the terminal is taken over
    let mut screen = CameraScreen::launch(backend, DevicePermissions, config)?;
    snapcam::terminal::run(&mut screen)
}
