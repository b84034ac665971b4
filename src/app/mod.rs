// SPDX-License-Identifier: GPL-3.0-only

//! The camera screen
//!
//! [`CameraScreen::launch`] runs the startup sequence: pick the camera, pass
//! the permission gate, then bind the session. A denied permission ends the
//! screen with `AppError::Permission` before anything is bound.
//!
//! Afterwards the screen is driven by [`Message`]s (from [`input::map_key`])
//! and by [`CameraScreen::poll`], which turns finished captures into toasts.
//! Rendering lives in [`crate::terminal`].

pub mod input;
pub mod toast;

use crate::analysis::LuminosityAnalyzer;
use crate::backends::camera::CameraBackend;
use crate::config::Config;
use crate::constants::{FILENAME_FORMAT, PHOTO_EXTENSION, timing};
use crate::errors::AppResult;
use crate::permission::{PermissionGate, PermissionProvider};
use crate::pipelines::photo::{CaptureFuture, OutputFileOptions};
use crate::session::use_cases::{
    AspectRatio, CameraSelector, ImageCaptureConfig, Preview, VideoCaptureConfig,
};
use crate::session::{CaptureSession, ImageAnalysis, SessionBuilder};
use crate::storage;
use crate::zoom::{ZoomController, ZoomKey};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::time::Instant;
use toast::Toasts;
use tracing::{info, warn};

/// Everything the screen reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    Zoom(ZoomKey),
    TakePicture,
    ToggleTorch,
    ToggleHelp,
    Quit,
}

pub struct CameraScreen {
    session: CaptureSession,
    zoom: ZoomController,
    toasts: Toasts,
    pending_captures: Vec<CaptureFuture>,
    output_dir: PathBuf,
    show_help: bool,
}

impl CameraScreen {
    /// Permission first, then bind preview, analysis, still and video capture
    pub fn launch<P: PermissionProvider>(
        backend: &dyn CameraBackend,
        permissions: P,
        config: &Config,
    ) -> AppResult<Self> {
        let mut builder = SessionBuilder::new()
            .selector(CameraSelector {
                lens_facing: config.lens_facing,
            })
            .preview(Preview {
                target_aspect_ratio: config.aspect_ratio,
            })
            .image_capture(ImageCaptureConfig {
                capture_mode: config.capture_mode,
                flash_mode: config.flash_mode,
            })
            .video_capture(VideoCaptureConfig {
                target_aspect_ratio: AspectRatio::Ratio16x9,
            });

        if config.analysis_enabled {
            let latest_luma = builder.latest_luma();
            let analyzer = LuminosityAnalyzer::new()
                .with_interval(config.analysis_interval())
                .on_luma(move |luma| latest_luma.store(luma));
            builder = builder.image_analysis(ImageAnalysis::new(analyzer));
        }

        let device = builder.select_camera(backend)?;
        PermissionGate::new(permissions).ensure(&device)?;

        let session = builder.bind_device(backend, &device)?;
        let output_dir = storage::output_directory(config.output_directory.as_deref());
        info!(camera = %device.name, output = %output_dir.display(), "Camera screen ready");

        Ok(Self {
            session,
            zoom: ZoomController::new(),
            toasts: Toasts::default(),
            pending_captures: Vec::new(),
            output_dir,
            show_help: false,
        })
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn zoom(&self) -> &ZoomController {
        &self.zoom
    }

    pub fn output_dir(&self) -> &std::path::Path {
        &self.output_dir
    }

    /// Captures not yet reported
    pub fn pending_captures(&self) -> usize {
        self.pending_captures.len()
    }

    pub fn update(&mut self, message: Message) -> ControlFlow<()> {
        match message {
            Message::Zoom(key) => self.on_zoom(key),
            Message::TakePicture => self.take_picture(),
            Message::ToggleTorch => self.toggle_torch(),
            Message::ToggleHelp => self.show_help = !self.show_help,
            Message::Quit => {
                info!("Quit requested");
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn on_zoom(&mut self, key: ZoomKey) {
        if let Err(e) = self.zoom.handle(key, self.session.control()) {
            warn!(error = %e, "Zoom change failed");
            self.toast(format!("Zoom failed: {}", e));
        }
    }

    fn take_picture(&mut self) {
        let file = storage::create_file(
            &self.output_dir,
            FILENAME_FORMAT,
            PHOTO_EXTENSION,
            chrono::Local::now(),
        );
        let future = self.session.take_picture(OutputFileOptions::new(file));
        self.pending_captures.push(future);
    }

    /// Read the torch state, then ask for the opposite
    fn toggle_torch(&mut self) {
        let on = self.session.info().torch_state().is_on();
        match self.session.control().enable_torch(!on) {
            Ok(()) => info!(on = !on, "Torch toggled"),
            Err(e) => {
                warn!(error = %e, "Torch toggle failed");
                self.toast(e.to_string());
            }
        }
    }

    /// Report finished captures
    pub fn poll(&mut self) {
        let mut outcomes = Vec::new();
        self.pending_captures.retain_mut(|future| match future.try_result() {
            Some(outcome) => {
                outcomes.push(outcome);
                false
            }
            None => true,
        });

        for outcome in outcomes {
            let message = match outcome {
                Ok(path) => format!("Photo capture succeeded: {}", path.display()),
                Err(e) => format!("Photo capture failed: {}", e),
            };
            info!(message = %message, "Capture reported");
            self.toast(message);
        }
    }

    fn toast(&mut self, message: String) {
        self.toasts.show(message, timing::TOAST_LONG, Instant::now());
    }

    /// Toast on screen at `now`, if any
    pub fn current_toast(&mut self, now: Instant) -> Option<&str> {
        self.toasts.current(now)
    }

    /// Status bar text at `now`
    pub fn status_line(&mut self, now: Instant) -> String {
        if let Some(toast) = self.toasts.current(now) {
            return toast.to_string();
        }
        if self.show_help {
            return "Space/p/Enter: Take picture | t: Torch | Vol+/+/Up: Zoom in | \
                    Vol-/-/Down: Zoom out | h: Toggle help | q/Ctrl+C: Quit"
                .to_string();
        }

        let torch = if self.session.info().torch_state().is_on() {
            "on"
        } else {
            "off"
        };
        let luma = self
            .session
            .latest_luma()
            .map(|l| format!("{:.1}", l))
            .unwrap_or_else(|| "-".to_string());
        format!(
            "zoom {} | torch {} | luma {} | 'space' picture | 't' torch | 'h' help | 'q' quit",
            self.zoom.level(),
            torch,
            luma
        )
    }
}
