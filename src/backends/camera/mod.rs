// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! ```text
//! ┌─────────────────────┐
//! │   CaptureSession    │  ← use cases, executor, frame fan-out
//! └──────────┬──────────┘
//!            │ bind()
//!            ▼
//! ┌─────────────────────┐
//! │  CameraBackend      │  ← enumeration + binding
//! └──────────┬──────────┘
//!            │
//!      ┌─────┴──────┐
//!      ▼            ▼
//!  ┌────────┐  ┌─────────┐
//!  │ V4L2   │  │ Virtual │
//!  │ (GSt)  │  │ pattern │
//!  └────────┘  └─────────┘
//! ```
//!
//! A bound camera streams frames into a [`FrameSender`] until it is dropped,
//! and exposes [`CameraControl`] (write side) and [`CameraInfo`] (read side).

#[cfg(feature = "gstreamer")]
pub mod gst_v4l2;
pub mod types;
pub mod v4l2_controls;
pub mod v4l2_utils;

pub use types::*;

use crate::session::use_cases::StreamConfig;
use std::sync::Arc;
use tracing::info;

/// Frame callback a bound camera pushes into
pub type FrameSender = Arc<dyn Fn(CameraFrame) + Send + Sync>;

/// Commands sent to a bound camera
pub trait CameraControl {
    /// Set zoom as a linear position in [0, 1] across the zoom range
    fn set_linear_zoom(&self, linear_zoom: f32) -> BackendResult<()>;

    /// Switch the torch LED
    fn enable_torch(&self, on: bool) -> BackendResult<()>;
}

/// State read back from a bound camera
pub trait CameraInfo {
    fn torch_state(&self) -> TorchState;

    /// Whether a controllable torch LED exists
    fn has_flash_unit(&self) -> bool;

    /// Last zoom position accepted by the camera
    fn linear_zoom(&self) -> f32;
}

/// A camera streaming frames for a session. Dropping it stops the stream.
pub trait BoundCamera: Send + Sync {
    fn device(&self) -> &CameraDevice;
    fn control(&self) -> &dyn CameraControl;
    fn info(&self) -> &dyn CameraInfo;
}

/// Source of cameras
pub trait CameraBackend {
    fn backend_type(&self) -> CameraBackendType;

    /// Enumerate available cameras on this backend
    fn enumerate_cameras(&self) -> Vec<CameraDevice>;

    /// Start streaming `device` at `stream` into `sender`
    fn bind(
        &self,
        device: &CameraDevice,
        stream: &StreamConfig,
        sender: FrameSender,
    ) -> BackendResult<Box<dyn BoundCamera>>;
}

/// Get a backend instance for the configured type.
///
/// `Auto` uses V4L2 when it works and lists at least one camera, and the
/// virtual camera otherwise.
pub fn get_backend(kind: CameraBackendType) -> BackendResult<Box<dyn CameraBackend>> {
    match kind {
        CameraBackendType::Virtual => Ok(virtual_backend()),
        CameraBackendType::V4l2 => v4l2_backend(),
        CameraBackendType::Auto => Ok(auto_backend(v4l2_backend())),
    }
}

fn virtual_backend() -> Box<dyn CameraBackend> {
    Box::new(crate::backends::virtual_camera::VirtualCameraBackend::default())
}

/// Keep `real` if it is usable, else fall back to the virtual camera
fn auto_backend(real: BackendResult<Box<dyn CameraBackend>>) -> Box<dyn CameraBackend> {
    match real {
        Ok(backend) if !backend.enumerate_cameras().is_empty() => backend,
        Ok(backend) => {
            info!(backend = %backend.backend_type(), "No camera found, using the virtual camera");
            virtual_backend()
        }
        Err(e) => {
            info!(error = %e, "Camera backend unavailable, using the virtual camera");
            virtual_backend()
        }
    }
}

#[cfg(feature = "gstreamer")]
fn v4l2_backend() -> BackendResult<Box<dyn CameraBackend>> {
    Ok(Box::new(gst_v4l2::GstV4l2Backend::new()?))
}

#[cfg(not(feature = "gstreamer"))]
fn v4l2_backend() -> BackendResult<Box<dyn CameraBackend>> {
    Err(BackendError::NotAvailable(
        "built without the gstreamer feature".to_string(),
    ))
}
