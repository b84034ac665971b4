// SPDX-License-Identifier: GPL-3.0-only

//! GStreamer V4L2 camera backend
//!
//! Streams `/dev/video*` nodes through `v4l2src`. Zoom goes to the
//! device's `V4L2_CID_ZOOM_ABSOLUTE` control when it has one and to the
//! pipeline's crop stage otherwise. The torch is the sysfs flash LED.

mod pipeline;

pub use pipeline::GstCameraPipeline;

use super::types::*;
use super::v4l2_controls::{self, ControlInfo, V4L2_CID_ZOOM_ABSOLUTE};
use super::{BoundCamera, CameraBackend, CameraControl, CameraInfo, FrameSender, v4l2_utils};
use crate::constants::zoom;
use crate::session::use_cases::StreamConfig;
use crate::torch::TorchHardware;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, info, warn};

/// Backend over GStreamer's `v4l2src`
pub struct GstV4l2Backend;

impl GstV4l2Backend {
    pub fn new() -> BackendResult<Self> {
        gstreamer::init().map_err(|e| BackendError::NotAvailable(e.to_string()))?;
        if gstreamer::ElementFactory::find("v4l2src").is_none() {
            return Err(BackendError::NotAvailable(
                "GStreamer v4l2src element not installed".to_string(),
            ));
        }
        Ok(Self)
    }
}

impl CameraBackend for GstV4l2Backend {
    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::V4l2
    }

    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        v4l2_utils::enumerate_video_devices()
    }

    fn bind(
        &self,
        device: &CameraDevice,
        stream: &StreamConfig,
        sender: FrameSender,
    ) -> BackendResult<Box<dyn BoundCamera>> {
        let hardware_zoom = v4l2_controls::zoom_control(&device.path);
        match &hardware_zoom {
            Some(info) => info!(
                min = info.minimum,
                max = info.maximum,
                step = info.step,
                "Using hardware zoom control"
            ),
            None => debug!("No hardware zoom, using digital crop"),
        }

        let torch = TorchHardware::detect();
        if let Some(hint) = &torch.permission_error {
            warn!(hint = %hint, "Torch LED present but not controllable");
        }

        let pipeline = GstCameraPipeline::new(device, stream, sender)?;

        Ok(Box::new(GstV4l2Camera {
            device: device.clone(),
            pipeline,
            hardware_zoom,
            torch,
            linear_zoom: AtomicU32::new(0.0f32.to_bits()),
        }))
    }
}

/// A streaming V4L2 camera
pub struct GstV4l2Camera {
    device: CameraDevice,
    pipeline: GstCameraPipeline,
    hardware_zoom: Option<ControlInfo>,
    torch: TorchHardware,
    linear_zoom: AtomicU32,
}

impl CameraControl for GstV4l2Camera {
    fn set_linear_zoom(&self, linear_zoom: f32) -> BackendResult<()> {
        let linear_zoom = linear_zoom.clamp(0.0, 1.0);

        match &self.hardware_zoom {
            Some(control) => {
                let value = control.linear_to_value(linear_zoom);
                v4l2_controls::set_control(&self.device.path, V4L2_CID_ZOOM_ABSOLUTE, value)
                    .map_err(BackendError::ControlFailed)?;
                debug!(linear_zoom, value, "Hardware zoom set");
            }
            None => {
                let ratio = 1.0 + linear_zoom * (zoom::MAX_DIGITAL_ZOOM - 1.0);
                self.pipeline.set_digital_zoom(ratio)?;
            }
        }

        self.linear_zoom
            .store(linear_zoom.to_bits(), Ordering::Relaxed);
        Ok(())
    }

    fn enable_torch(&self, on: bool) -> BackendResult<()> {
        if !self.torch.has_devices() {
            return Err(BackendError::TorchUnavailable(
                self.torch
                    .permission_error
                    .clone()
                    .unwrap_or_else(|| "no torch LED found".to_string()),
            ));
        }
        self.torch
            .set_on(on)
            .map_err(|e| BackendError::ControlFailed(format!("torch: {}", e)))?;
        info!(on, "Torch switched");
        Ok(())
    }
}

impl CameraInfo for GstV4l2Camera {
    fn torch_state(&self) -> TorchState {
        TorchState::from(self.torch.is_on())
    }

    fn has_flash_unit(&self) -> bool {
        self.torch.has_devices()
    }

    fn linear_zoom(&self) -> f32 {
        f32::from_bits(self.linear_zoom.load(Ordering::Relaxed))
    }
}

impl BoundCamera for GstV4l2Camera {
    fn device(&self) -> &CameraDevice {
        &self.device
    }

    fn control(&self) -> &dyn CameraControl {
        self
    }

    fn info(&self) -> &dyn CameraInfo {
        self
    }
}

impl Drop for GstV4l2Camera {
    fn drop(&mut self) {
        // Leave the LED the way the user found it
        if self.torch.has_devices() && self.torch.is_on() {
            let _ = self.torch.set_on(false);
        }
    }
}
