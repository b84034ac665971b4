// SPDX-License-Identifier: GPL-3.0-only

//! Frame analysis
//!
//! Analyzers receive frames one at a time on the session's dedicated worker
//! thread (see [`crate::session::executor`]). Each frame arrives wrapped in an
//! [`ImageProxy`], which must be released exactly once; the proxy does this on
//! [`ImageProxy::close`] or, failing that, when it is dropped.

pub mod clock;
pub mod luminosity;

pub use clock::{Clock, ManualClock, SystemClock};
pub use luminosity::{LuminosityAnalyzer, mean_luma};

use crate::backends::camera::types::{CameraFrame, PixelFormat};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Consumer of analysis frames.
///
/// Invocations are strictly sequential, so implementations keep plain
/// `&mut self` state without locks.
pub trait Analyzer: Send {
    fn analyze(&mut self, image: ImageProxy);
}

impl<F> Analyzer for F
where
    F: FnMut(ImageProxy) + Send,
{
    fn analyze(&mut self, image: ImageProxy) {
        self(image)
    }
}

/// One plane of an analysis frame
#[derive(Debug, Clone, Copy)]
pub struct PlaneProxy<'a> {
    /// Raw plane bytes, row padding included
    pub buffer: &'a [u8],
    pub row_stride: u32,
    /// Distance between two samples of this plane within a row
    pub pixel_stride: u32,
}

/// A frame lent to an analyzer, with a one-shot release hook
pub struct ImageProxy {
    frame: Arc<CameraFrame>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl ImageProxy {
    pub fn new(frame: Arc<CameraFrame>) -> Self {
        Self {
            frame,
            release: None,
        }
    }

    /// Wrap a frame; `hook` runs when the proxy is closed or dropped
    pub fn with_release_hook(frame: Arc<CameraFrame>, hook: impl FnOnce() + Send + 'static) -> Self {
        Self {
            frame,
            release: Some(Box::new(hook)),
        }
    }

    pub fn width(&self) -> u32 {
        self.frame.width
    }

    pub fn height(&self) -> u32 {
        self.frame.height
    }

    pub fn format(&self) -> PixelFormat {
        self.frame.format
    }

    pub fn captured_at(&self) -> Instant {
        self.frame.captured_at
    }

    pub fn sequence(&self) -> u64 {
        self.frame.sequence
    }

    /// Planes in storage order; plane 0 is always luminance
    pub fn planes(&self) -> Vec<PlaneProxy<'_>> {
        let frame = &*self.frame;
        let data = frame.data_slice();
        let luma = PlaneProxy {
            buffer: frame.luma_plane(),
            row_stride: frame.stride,
            pixel_stride: 1,
        };
        let layout = frame.chroma_layout();
        let tail = |from: usize, to: usize| &data[from.min(data.len())..to.min(data.len())];

        match frame.format {
            PixelFormat::Gray8 => vec![luma],
            PixelFormat::NV12 => vec![
                luma,
                PlaneProxy {
                    buffer: tail(layout.uv_offset, data.len()),
                    row_stride: layout.uv_stride,
                    pixel_stride: 2,
                },
            ],
            PixelFormat::I420 => vec![
                luma,
                PlaneProxy {
                    buffer: tail(layout.uv_offset, layout.v_offset),
                    row_stride: layout.uv_stride,
                    pixel_stride: 1,
                },
                PlaneProxy {
                    buffer: tail(layout.v_offset, data.len()),
                    row_stride: layout.v_stride,
                    pixel_stride: 1,
                },
            ],
        }
    }

    /// Release the frame now
    pub fn close(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(hook) = self.release.take() {
            hook();
        }
    }
}

impl Drop for ImageProxy {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl std::fmt::Debug for ImageProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageProxy")
            .field("sequence", &self.frame.sequence)
            .field("width", &self.frame.width)
            .field("height", &self.frame.height)
            .field("released", &self.release.is_none())
            .finish()
    }
}

/// Most recent luminance reading, readable from any thread.
#[derive(Debug, Clone)]
pub struct LatestLuma(Arc<AtomicU64>);

impl Default for LatestLuma {
    fn default() -> Self {
        Self(Arc::new(AtomicU64::new(f64::NAN.to_bits())))
    }
}

impl LatestLuma {
    pub fn store(&self, luma: f64) {
        self.0.store(luma.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> Option<f64> {
        let value = f64::from_bits(self.0.load(Ordering::Relaxed));
        (!value.is_nan()).then_some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counted_proxy(counter: &Arc<AtomicUsize>) -> ImageProxy {
        let frame = Arc::new(CameraFrame::nv12(2, 2, vec![1, 2, 3, 4, 128, 128], 7));
        let counter = Arc::clone(counter);
        ImageProxy::with_release_hook(frame, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_close_releases_once() {
        let released = Arc::new(AtomicUsize::new(0));
        counted_proxy(&released).close();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases_once() {
        let released = Arc::new(AtomicUsize::new(0));
        {
            let _proxy = counted_proxy(&released);
        }
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_release_on_unwind() {
        let released = Arc::new(AtomicUsize::new(0));
        let proxy = counted_proxy(&released);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _held = proxy;
            panic!("malformed buffer");
        }));
        assert!(result.is_err());
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_nv12_planes() {
        let proxy = ImageProxy::new(Arc::new(CameraFrame::nv12(
            2,
            2,
            vec![1, 2, 3, 4, 100, 200],
            0,
        )));
        let planes = proxy.planes();
        assert_eq!(planes.len(), 2);
        assert_eq!(planes[0].buffer, &[1, 2, 3, 4]);
        assert_eq!(planes[1].buffer, &[100, 200]);
        assert_eq!(planes[1].pixel_stride, 2);
        assert_eq!(proxy.sequence(), 0);
    }

    #[test]
    fn test_i420_planes() {
        let mut frame = CameraFrame::nv12(2, 2, vec![1, 2, 3, 4, 50, 60], 0);
        frame.format = PixelFormat::I420;
        frame.stride = 2;
        let proxy = ImageProxy::new(Arc::new(frame));
        let planes = proxy.planes();
        assert_eq!(planes.len(), 3);
        assert_eq!(planes[1].buffer, &[50]);
        assert_eq!(planes[2].buffer, &[60]);
    }

    #[test]
    fn test_latest_luma() {
        let latest = LatestLuma::default();
        assert_eq!(latest.get(), None);
        latest.store(42.5);
        assert_eq!(latest.clone().get(), Some(42.5));
    }
}
