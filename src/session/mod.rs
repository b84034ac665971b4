// SPDX-License-Identifier: GPL-3.0-only

//! Capture session
//!
//! A [`SessionBuilder`] collects the use cases (preview, image analysis,
//! still capture, video capture), selects a camera and binds everything to
//! one backend stream. The resulting [`CaptureSession`] is the single handle
//! the screen passes around: camera control and info, the latest preview
//! frame, and still capture.
//!
//! ```text
//! backend thread ──▶ FrameDispatcher ──┬──▶ latest frame (preview, capture)
//!                                      └──▶ CameraExecutor ──▶ Analyzer
//! ```

pub mod dispatch;
pub mod executor;
pub mod use_cases;

use crate::analysis::{Analyzer, LatestLuma};
use crate::backends::camera::types::{BackendError, CameraDevice, CameraFrame};
use crate::backends::camera::{BoundCamera, CameraBackend, CameraControl, CameraInfo};
use crate::errors::{AppResult, CaptureError};
use crate::pipelines::photo::capture::{CaptureContext, CaptureFuture, OutputFileOptions, StillCapture};
use dispatch::FrameDispatcher;
use executor::CameraExecutor;
use std::sync::Arc;
use tracing::info;
use use_cases::{CameraSelector, ImageCaptureConfig, Preview, StreamConfig, VideoCaptureConfig};

/// Name of the camera worker thread
const EXECUTOR_NAME: &str = "camera-executor";

/// What happens to frames that arrive while the analyzer is busy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backpressure {
    /// Keep only the newest waiting frame; older ones are released unseen
    #[default]
    KeepOnlyLatest,
}

/// Image analysis use case
pub struct ImageAnalysis {
    analyzer: Box<dyn Analyzer>,
    backpressure: Backpressure,
}

impl ImageAnalysis {
    pub fn new(analyzer: impl Analyzer + 'static) -> Self {
        Self {
            analyzer: Box::new(analyzer),
            backpressure: Backpressure::default(),
        }
    }

    pub fn with_backpressure(mut self, backpressure: Backpressure) -> Self {
        self.backpressure = backpressure;
        self
    }

    pub fn backpressure(&self) -> Backpressure {
        self.backpressure
    }
}

/// Collects use cases and binds them to a camera
#[derive(Default)]
pub struct SessionBuilder {
    selector: CameraSelector,
    preview: Preview,
    analysis: Option<ImageAnalysis>,
    image_capture: Option<ImageCaptureConfig>,
    video_capture: Option<VideoCaptureConfig>,
    latest_luma: LatestLuma,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selector(mut self, selector: CameraSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn preview(mut self, preview: Preview) -> Self {
        self.preview = preview;
        self
    }

    pub fn image_analysis(mut self, analysis: ImageAnalysis) -> Self {
        self.analysis = Some(analysis);
        self
    }

    pub fn image_capture(mut self, config: ImageCaptureConfig) -> Self {
        self.image_capture = Some(config);
        self
    }

    pub fn video_capture(mut self, config: VideoCaptureConfig) -> Self {
        self.video_capture = Some(config);
        self
    }

    /// Shared slot analyzers write luminance into; flash decisions read it
    pub fn latest_luma(&self) -> LatestLuma {
        self.latest_luma.clone()
    }

    /// Camera the selector picks on `backend`
    pub fn select_camera(&self, backend: &dyn CameraBackend) -> AppResult<CameraDevice> {
        let cameras = backend.enumerate_cameras();
        info!(count = cameras.len(), backend = %backend.backend_type(), "Cameras enumerated");
        self.selector
            .select(&cameras)
            .cloned()
            .ok_or_else(|| BackendError::DeviceNotFound("no camera available".to_string()).into())
    }

    /// Select a camera and bind
    pub fn bind(self, backend: &dyn CameraBackend) -> AppResult<CaptureSession> {
        let device = self.select_camera(backend)?;
        self.bind_device(backend, &device)
    }

    /// Bind every configured use case to `device` in one step
    pub fn bind_device(
        self,
        backend: &dyn CameraBackend,
        device: &CameraDevice,
    ) -> AppResult<CaptureSession> {
        let stream = StreamConfig::resolve(&self.preview, self.video_capture.as_ref());

        let analyzer = self.analysis.map(|analysis| {
            info!(backpressure = ?analysis.backpressure, "Image analysis enabled");
            analysis.analyzer
        });
        let executor = Arc::new(CameraExecutor::spawn(EXECUTOR_NAME, analyzer)?);
        let dispatcher = FrameDispatcher::new(executor);

        let camera: Arc<dyn BoundCamera> =
            Arc::from(backend.bind(device, &stream, dispatcher.sender())?);

        info!(
            camera = %device.name,
            stream = %stream,
            preview = %self.preview.target_aspect_ratio,
            analysis = dispatcher.executor().has_analyzer(),
            image_capture = self.image_capture.is_some(),
            video_capture = self.video_capture.is_some(),
            "Use cases bound"
        );

        Ok(CaptureSession {
            camera,
            still_capture: self.image_capture.map(StillCapture::new),
            dispatcher,
            latest_luma: self.latest_luma,
            stream,
            preview: self.preview,
        })
    }
}

/// A bound camera with its use cases.
///
/// Dropping it shuts the camera executor down first, then stops the stream.
pub struct CaptureSession {
    camera: Arc<dyn BoundCamera>,
    still_capture: Option<StillCapture>,
    dispatcher: FrameDispatcher,
    latest_luma: LatestLuma,
    stream: StreamConfig,
    preview: Preview,
}

impl CaptureSession {
    pub fn device(&self) -> &CameraDevice {
        self.camera.device()
    }

    pub fn control(&self) -> &dyn CameraControl {
        self.camera.control()
    }

    pub fn info(&self) -> &dyn CameraInfo {
        self.camera.info()
    }

    pub fn stream(&self) -> StreamConfig {
        self.stream
    }

    pub fn preview(&self) -> &Preview {
        &self.preview
    }

    /// Most recent frame for the preview
    pub fn latest_frame(&self) -> Option<Arc<CameraFrame>> {
        self.dispatcher.latest_frame()
    }

    /// Last mean luminance reported by the analyzer
    pub fn latest_luma(&self) -> Option<f64> {
        self.latest_luma.get()
    }

    pub fn dispatcher(&self) -> &FrameDispatcher {
        &self.dispatcher
    }

    /// Whether a still capture is in flight
    pub fn is_capturing(&self) -> bool {
        self.still_capture
            .as_ref()
            .is_some_and(StillCapture::is_busy)
    }

    /// Capture a still into `options`
    pub fn take_picture(&self, options: OutputFileOptions) -> CaptureFuture {
        let Some(still_capture) = &self.still_capture else {
            return CaptureFuture::ready(Err(CaptureError::NotConfigured));
        };
        still_capture.take_picture(
            options,
            CaptureContext {
                dispatcher: self.dispatcher.clone(),
                camera: Arc::clone(&self.camera),
                latest_luma: self.latest_luma.clone(),
            },
        )
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        info!(camera = %self.camera.device().name, "Closing capture session");
        // Breaks the executor → task → camera → executor cycle
        self.dispatcher.executor().shutdown();
    }
}
