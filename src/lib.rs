// SPDX-License-Identifier: GPL-3.0-only

//! snapcam - a single-screen camera with preview, luminance analysis,
//! volume-key zoom, torch and still capture
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: The camera screen (startup sequence, messages, toasts)
//! - [`session`]: Use cases bound to a camera, frame fan-out, camera worker
//! - [`backends`]: V4L2 (through GStreamer) and virtual camera backends
//! - [`analysis`]: Frame analyzers, including the luminosity sampler
//! - [`pipelines`]: Still capture and JPEG encoding
//! - [`permission`]: The permission gate in front of session binding
//! - [`zoom`]: Stepped linear zoom
//! - [`config`]: User configuration handling
//! - [`storage`]: Output directory and file naming
//! - [`terminal`]: Terminal rendering of the screen
//!
//! # Example
//!
//! ```no_run
//! use snapcam::backends::camera::{CameraBackendType, get_backend};
//! use snapcam::permission::DevicePermissions;
//! use snapcam::{CameraScreen, Config};
//!
//! let config = Config::load();
//! let backend = get_backend(CameraBackendType::Virtual)?;
//! let mut screen = CameraScreen::launch(backend.as_ref(), DevicePermissions, &config)?;
//! snapcam::terminal::run(&mut screen)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod analysis;
pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod media;
pub mod permission;
pub mod pipelines;
pub mod session;
pub mod storage;
pub mod terminal;
pub mod torch;
pub mod zoom;

// Re-export commonly used types
pub use app::{CameraScreen, Message};
pub use config::Config;
pub use errors::{AppError, AppResult, CaptureError, PermissionError};
pub use session::{CaptureSession, SessionBuilder};
