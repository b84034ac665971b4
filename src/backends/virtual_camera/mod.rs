// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic camera backend
//!
//! Produces an NV12 colour-bar pattern from a generator thread, so the whole
//! session (preview, analysis, capture, zoom, torch) runs without hardware.
//!
//! ```text
//! generator thread ──(every frame interval)──▶ render_nv12 ──▶ FrameSender
//!        ▲
//!        └── zoom / torch state shared with the bound camera handle
//! ```

mod pattern;

pub use pattern::{PatternParams, TORCH_BOOST, render_nv12};

use crate::backends::camera::types::*;
use crate::backends::camera::{BoundCamera, CameraBackend, CameraControl, CameraInfo, FrameSender};
use crate::constants::zoom;
use crate::session::use_cases::StreamConfig;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Device path reported for the synthetic camera
pub const VIRTUAL_DEVICE_PATH: &str = "virtual:0";

/// Backend producing a test pattern
#[derive(Debug, Clone)]
pub struct VirtualCameraBackend {
    frame_interval: Duration,
}

impl Default for VirtualCameraBackend {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(33),
        }
    }
}

impl VirtualCameraBackend {
    /// Backend delivering one frame per `frame_interval`
    pub fn with_frame_interval(frame_interval: Duration) -> Self {
        Self { frame_interval }
    }

    pub fn device() -> CameraDevice {
        CameraDevice {
            name: "Virtual Camera".to_string(),
            path: VIRTUAL_DEVICE_PATH.to_string(),
            driver: "snapcam".to_string(),
            facing: Some(LensFacing::Back),
        }
    }
}

impl CameraBackend for VirtualCameraBackend {
    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::Virtual
    }

    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        vec![Self::device()]
    }

    fn bind(
        &self,
        device: &CameraDevice,
        stream: &StreamConfig,
        sender: FrameSender,
    ) -> BackendResult<Box<dyn BoundCamera>> {
        if device.path != VIRTUAL_DEVICE_PATH {
            return Err(BackendError::DeviceNotFound(device.path.clone()));
        }
        if stream.width == 0 || stream.height == 0 || stream.width % 2 != 0 || stream.height % 2 != 0
        {
            return Err(BackendError::FormatNotSupported(format!(
                "NV12 needs even, non-zero dimensions, got {}",
                stream
            )));
        }

        let state = Arc::new(GeneratorState {
            zoom_bits: AtomicU32::new(0.0f32.to_bits()),
            torch: AtomicBool::new(false),
            stop: AtomicBool::new(false),
        });

        let thread_state = Arc::clone(&state);
        let stream = *stream;
        let interval = self.frame_interval;
        let thread_handle = thread::Builder::new()
            .name("virtual-camera".to_string())
            .spawn(move || run_generator(&thread_state, stream, interval, sender))?;

        info!(stream = %stream, interval_ms = interval.as_millis(), "Virtual camera streaming");

        Ok(Box::new(VirtualCamera {
            device: device.clone(),
            state,
            thread_handle: Some(thread_handle),
        }))
    }
}

struct GeneratorState {
    zoom_bits: AtomicU32,
    torch: AtomicBool,
    stop: AtomicBool,
}

impl GeneratorState {
    fn linear_zoom(&self) -> f32 {
        f32::from_bits(self.zoom_bits.load(Ordering::Relaxed))
    }
}

fn run_generator(state: &GeneratorState, stream: StreamConfig, interval: Duration, sender: FrameSender) {
    debug!("Virtual camera generator started");
    let mut tick: u64 = 0;
    let mut next_frame = Instant::now();

    while !state.stop.load(Ordering::SeqCst) {
        let params = PatternParams {
            width: stream.width,
            height: stream.height,
            zoom_ratio: 1.0 + state.linear_zoom() * (zoom::MAX_DIGITAL_ZOOM - 1.0),
            torch: state.torch.load(Ordering::Relaxed),
            tick,
        };
        let data = render_nv12(&params);
        sender(CameraFrame::nv12(stream.width, stream.height, data, tick));
        tick += 1;

        next_frame += interval;
        let now = Instant::now();
        match next_frame.checked_duration_since(now) {
            Some(wait) => thread::sleep(wait),
            None => next_frame = now,
        }
    }

    debug!(frames = tick, "Virtual camera generator exiting");
}

/// Bound synthetic camera. Dropping it stops the generator.
pub struct VirtualCamera {
    device: CameraDevice,
    state: Arc<GeneratorState>,
    thread_handle: Option<JoinHandle<()>>,
}

impl CameraControl for VirtualCamera {
    fn set_linear_zoom(&self, linear_zoom: f32) -> BackendResult<()> {
        if !linear_zoom.is_finite() {
            return Err(BackendError::ControlFailed(format!(
                "invalid zoom {}",
                linear_zoom
            )));
        }
        let linear_zoom = linear_zoom.clamp(0.0, 1.0);
        self.state
            .zoom_bits
            .store(linear_zoom.to_bits(), Ordering::Relaxed);
        debug!(linear_zoom, "Virtual zoom set");
        Ok(())
    }

    fn enable_torch(&self, on: bool) -> BackendResult<()> {
        self.state.torch.store(on, Ordering::Relaxed);
        Ok(())
    }
}

impl CameraInfo for VirtualCamera {
    fn torch_state(&self) -> TorchState {
        TorchState::from(self.state.torch.load(Ordering::Relaxed))
    }

    fn has_flash_unit(&self) -> bool {
        true
    }

    fn linear_zoom(&self) -> f32 {
        self.state.linear_zoom()
    }
}

impl BoundCamera for VirtualCamera {
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

impl Drop for VirtualCamera {
    fn drop(&mut self) {
        self.state.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take()
            && handle.join().is_err()
        {
            warn!("Virtual camera generator panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn stream() -> StreamConfig {
        StreamConfig {
            width: 32,
            height: 18,
        }
    }

    #[test]
    fn test_enumerates_one_back_camera() {
        let cameras = VirtualCameraBackend::default().enumerate_cameras();
        assert_eq!(cameras.len(), 1);
        assert_eq!(cameras[0].facing, Some(LensFacing::Back));
    }

    #[test]
    fn test_streams_until_dropped() {
        let backend = VirtualCameraBackend::with_frame_interval(Duration::from_millis(2));
        let (tx, rx) = mpsc::channel();
        let tx = std::sync::Mutex::new(tx);
        let sender: FrameSender = Arc::new(move |frame: CameraFrame| {
            if let Ok(tx) = tx.lock() {
                tx.send(frame.sequence).ok();
            }
        });

        let camera = backend
            .bind(&VirtualCameraBackend::device(), &stream(), sender)
            .unwrap();
        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(second > first);

        drop(camera);
        // Drain whatever was in flight; the channel then disconnects
        while rx.recv_timeout(Duration::from_millis(200)).is_ok() {}
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_controls_round_trip() {
        let backend = VirtualCameraBackend::with_frame_interval(Duration::from_millis(5));
        let sender: FrameSender = Arc::new(|_| {});
        let camera = backend
            .bind(&VirtualCameraBackend::device(), &stream(), sender)
            .unwrap();

        camera.control().set_linear_zoom(0.5).unwrap();
        assert_eq!(camera.info().linear_zoom(), 0.5);
        assert!(camera.control().set_linear_zoom(f32::NAN).is_err());

        assert_eq!(camera.info().torch_state(), TorchState::Off);
        camera.control().enable_torch(true).unwrap();
        assert!(camera.info().torch_state().is_on());
    }

    #[test]
    fn test_rejects_odd_stream() {
        let backend = VirtualCameraBackend::default();
        let odd = StreamConfig {
            width: 31,
            height: 18,
        };
        let result = backend.bind(&VirtualCameraBackend::device(), &odd, Arc::new(|_| {}));
        assert!(matches!(result, Err(BackendError::FormatNotSupported(_))));
    }
}
