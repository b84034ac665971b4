// SPDX-License-Identifier: GPL-3.0-only

//! Still capture use case
//!
//! Grabs the first frame delivered after the request, without pausing the
//! preview stream, and saves it as JPEG on the camera executor.

use super::encoding;
use crate::analysis::LatestLuma;
use crate::backends::camera::BoundCamera;
use crate::constants::{analysis, capture};
use crate::errors::CaptureError;
use crate::session::dispatch::FrameDispatcher;
use crate::session::use_cases::ImageCaptureConfig;
use futures::channel::oneshot;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use tracing::{debug, error, info, warn};

/// Result of one capture: the saved file or why it failed
pub type CaptureResult = Result<PathBuf, CaptureError>;

/// Where a capture is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFileOptions {
    file: PathBuf,
}

impl OutputFileOptions {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self { file: file.into() }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }
}

/// Single-shot completion of a capture request.
///
/// Resolves exactly once. Await it, or poll it without blocking through
/// [`try_result`](Self::try_result) from a UI loop.
#[must_use = "a capture outcome is only observable through its future"]
pub struct CaptureFuture {
    receiver: oneshot::Receiver<CaptureResult>,
}

impl CaptureFuture {
    /// A future that is already resolved
    pub(crate) fn ready(result: CaptureResult) -> Self {
        let (sender, receiver) = oneshot::channel();
        // The receiver is alive, so this cannot fail
        let _ = sender.send(result);
        Self { receiver }
    }

    /// The outcome if the capture has finished
    pub fn try_result(&mut self) -> Option<CaptureResult> {
        match self.receiver.try_recv() {
            Ok(result) => result,
            Err(oneshot::Canceled) => Some(Err(CaptureError::Aborted)),
        }
    }
}

impl Future for CaptureFuture {
    type Output = CaptureResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|outcome| outcome.unwrap_or(Err(CaptureError::Aborted)))
    }
}

/// Clears the in-flight flag when the capture job ends, however it ends
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Everything a capture job reads from its session
pub struct CaptureContext {
    pub dispatcher: FrameDispatcher,
    pub camera: Arc<dyn BoundCamera>,
    pub latest_luma: LatestLuma,
}

/// The still-capture endpoint of a session
pub struct StillCapture {
    config: ImageCaptureConfig,
    in_flight: Arc<AtomicBool>,
}

impl StillCapture {
    pub fn new(config: ImageCaptureConfig) -> Self {
        Self {
            config,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &ImageCaptureConfig {
        &self.config
    }

    /// Whether a capture is currently in flight
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Start a capture into `options`. Never blocks.
    pub fn take_picture(&self, options: OutputFileOptions, context: CaptureContext) -> CaptureFuture {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            warn!("Capture already in progress, rejecting request");
            return CaptureFuture::ready(Err(CaptureError::Busy));
        }
        let guard = InFlightGuard(Arc::clone(&self.in_flight));

        let (sender, receiver) = oneshot::channel();
        let config = self.config;
        let requested_after = context.dispatcher.latest_sequence();
        let executor = Arc::clone(context.dispatcher.executor());

        info!(
            path = %options.file().display(),
            mode = ?config.capture_mode,
            flash = ?config.flash_mode,
            "Capture requested"
        );

        let accepted = executor.execute(move || {
            let result = run_capture(&context, &config, requested_after, options.file());
            match &result {
                Ok(path) => debug!(path = %path.display(), "Capture finished"),
                Err(e) => error!(error = %e, "Capture failed"),
            }
            // Free the slot before the outcome becomes visible
            drop(guard);
            let _ = sender.send(result);
        });

        if !accepted {
            // The dropped job already released the guard and the sender
            warn!("Camera executor is shut down, capture aborted");
        }

        CaptureFuture { receiver }
    }
}

fn run_capture(
    context: &CaptureContext,
    config: &ImageCaptureConfig,
    mut requested_after: u64,
    file: &Path,
) -> CaptureResult {
    let info = context.camera.info();
    let fire_flash = info.has_flash_unit()
        && !info.torch_state().is_on()
        && config
            .flash_mode
            .should_fire(context.latest_luma.get(), analysis::DARK_SCENE_LUMA);

    if fire_flash {
        match context.camera.control().enable_torch(true) {
            Ok(()) => {
                debug!("Flash fired for capture");
                std::thread::sleep(capture::FLASH_WARMUP);
                requested_after = context.dispatcher.latest_sequence();
            }
            Err(e) => warn!(error = %e, "Flash failed, capturing without it"),
        }
    }

    let frame = context
        .dispatcher
        .wait_for_frame_after(requested_after, capture::FRAME_TIMEOUT);

    if fire_flash && let Err(e) = context.camera.control().enable_torch(false) {
        warn!(error = %e, "Failed to switch flash off after capture");
    }

    let frame = frame.ok_or(CaptureError::NoFrameAvailable)?;
    debug!(
        sequence = frame.sequence,
        width = frame.width,
        height = frame.height,
        "Frame selected for capture"
    );

    encoding::write_jpeg(&frame, file, config.capture_mode.jpeg_quality())?;
    Ok(file.to_path_buf())
}
