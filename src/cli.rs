// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Taking photos
//! - Logging the average luminosity of the stream

use snapcam::analysis::LuminosityAnalyzer;
use snapcam::backends::camera::{CameraBackend, CameraDevice};
use snapcam::constants::{FILENAME_FORMAT, PHOTO_EXTENSION, capture};
use snapcam::permission::{DevicePermissions, PermissionGate};
use snapcam::pipelines::photo::OutputFileOptions;
use snapcam::session::use_cases::{CameraSelector, ImageCaptureConfig, Preview};
use snapcam::session::{CaptureSession, ImageAnalysis, SessionBuilder};
use snapcam::{Config, storage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Camera warm-up before the CLI captures (exposure settling)
const WARMUP: Duration = Duration::from_millis(500);

/// List all available cameras
pub fn list_cameras(backend: &dyn CameraBackend) -> Result<(), Box<dyn std::error::Error>> {
    let cameras = backend.enumerate_cameras();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras ({}):", backend.backend_type());
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        println!("  [{}] {}", index, camera.name);
        println!("      Path: {}", camera.path);
        if !camera.driver.is_empty() {
            println!("      Driver: {}", camera.driver);
        }
        if let Some(facing) = camera.facing {
            println!("      Facing: {:?}", facing);
        }
        println!();
    }

    Ok(())
}

/// Take a photo using the specified camera
pub fn take_photo(
    backend: &dyn CameraBackend,
    config: &Config,
    camera_index: usize,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let camera = pick_camera(backend, camera_index)?;
    println!("Using camera: {}", camera.name);
    PermissionGate::new(DevicePermissions).ensure(&camera)?;

    let session = SessionBuilder::new()
        .preview(Preview {
            target_aspect_ratio: config.aspect_ratio,
        })
        .image_capture(ImageCaptureConfig {
            capture_mode: config.capture_mode,
            flash_mode: config.flash_mode,
        })
        .bind_device(backend, &camera)?;
    println!("Capture format: {}", session.stream());

    let file = output_file(config, output.as_deref())?;

    // Wait for frames to stabilize (camera warm-up)
    println!("Capturing...");
    wait_for_first_frame(&session)?;
    std::thread::sleep(WARMUP);

    let future = session.take_picture(OutputFileOptions::new(file));

    // Flash warm-up plus the frame wait bound the capture
    let limit = capture::FLASH_WARMUP + capture::FRAME_TIMEOUT + Duration::from_secs(5);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let outcome = runtime
        .block_on(async { tokio::time::timeout(limit, future).await })
        .map_err(|_| "Timed out waiting for the capture")?;

    match outcome {
        Ok(path) => {
            println!("Photo capture succeeded: {}", path.display());
            Ok(())
        }
        Err(e) => Err(format!("Photo capture failed: {}", e).into()),
    }
}

/// Log the average luminosity until `duration` ends or Ctrl+C
pub fn analyze(
    backend: &dyn CameraBackend,
    config: &Config,
    duration: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let (luma_tx, luma_rx) = mpsc::channel::<f64>();
    // Readings reach the log through the analyzer; the channel only counts them
    let analyzer = LuminosityAnalyzer::new()
        .with_interval(config.analysis_interval())
        .on_luma(move |luma| {
            // The receiver only goes away on exit
            let _ = luma_tx.send(luma);
        });

    let builder = SessionBuilder::new()
        .selector(CameraSelector {
            lens_facing: config.lens_facing,
        })
        .preview(Preview {
            target_aspect_ratio: config.aspect_ratio,
        })
        .image_analysis(ImageAnalysis::new(analyzer));
    let camera = builder.select_camera(backend)?;
    println!("Using camera: {}", camera.name);
    PermissionGate::new(DevicePermissions).ensure(&camera)?;
    let session = builder.bind_device(backend, &camera)?;

    // Set up Ctrl+C handler
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    println!("Analyzing {} (press Ctrl+C to stop early)", session.stream());
    println!();

    let start = Instant::now();
    let target_duration = Duration::from_secs(duration);
    let mut readings = 0usize;

    while start.elapsed() < target_duration {
        if stop_flag.load(Ordering::SeqCst) {
            println!("Stopping early...");
            break;
        }

        match luma_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(_) => readings += 1,
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    println!();
    println!(
        "{} readings, {} frames still held by the analyzer",
        readings,
        session.dispatcher().images_in_flight()
    );
    Ok(())
}

fn pick_camera(
    backend: &dyn CameraBackend,
    camera_index: usize,
) -> Result<CameraDevice, Box<dyn std::error::Error>> {
    let cameras = backend.enumerate_cameras();
    if cameras.is_empty() {
        return Err("No cameras found".into());
    }

    cameras.get(camera_index).cloned().ok_or_else(|| {
        format!(
            "Camera index {} out of range (0-{})",
            camera_index,
            cameras.len() - 1
        )
        .into()
    })
}

/// File the photo goes to: the given file, a timestamped name inside the
/// given directory, or a timestamped name in the configured directory
fn output_file(config: &Config, output: Option<&Path>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let dir = match output {
        Some(path) if !path.is_dir() => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            return Ok(path.to_path_buf());
        }
        Some(path) => path.to_path_buf(),
        None => storage::output_directory(config.output_directory.as_deref()),
    };

    Ok(storage::create_file(
        &dir,
        FILENAME_FORMAT,
        PHOTO_EXTENSION,
        chrono::Local::now(),
    ))
}

fn wait_for_first_frame(session: &CaptureSession) -> Result<(), Box<dyn std::error::Error>> {
    session
        .dispatcher()
        .wait_for_frame_after(0, Duration::from_secs(5))
        .map(|_| ())
        .ok_or_else(|| "Failed to capture frame from camera".into())
}
