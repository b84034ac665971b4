// SPDX-License-Identifier: GPL-3.0-only

//! Average luminosity sampler
//!
//! Computes the mean of the luminance plane at most once per interval and
//! skips every frame in between. The only state carried from frame to frame
//! is the wall-clock time of the last analyzed frame.

use super::clock::{Clock, SystemClock};
use super::{Analyzer, ImageProxy};
use crate::constants::{LUMINOSITY_TARGET, analysis};
use std::time::Duration;
use tracing::{debug, warn};

/// Callback receiving each computed mean
pub type LumaListener = Box<dyn FnMut(f64) + Send>;

/// Arithmetic mean of a plane, each byte read as an unsigned 8-bit sample
pub fn mean_luma(plane: &[u8]) -> Option<f64> {
    if plane.is_empty() {
        return None;
    }
    let sum: u64 = plane.iter().map(|&v| u64::from(v)).sum();
    Some(sum as f64 / plane.len() as f64)
}

pub struct LuminosityAnalyzer {
    last_analyzed_ms: i64,
    interval_ms: i64,
    clock: Box<dyn Clock>,
    listener: Option<LumaListener>,
}

impl Default for LuminosityAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LuminosityAnalyzer {
    /// Analyzer on the system clock with the default one-second interval
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            last_analyzed_ms: 0,
            interval_ms: analysis::INTERVAL.as_millis() as i64,
            clock: Box::new(clock),
            listener: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval_ms = interval.as_millis() as i64;
        self
    }

    /// Also hand every computed mean to `listener`
    pub fn on_luma(mut self, listener: impl FnMut(f64) + Send + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }
}

impl Analyzer for LuminosityAnalyzer {
    fn analyze(&mut self, image: ImageProxy) {
        let now = self.clock.now_millis();

        if now - self.last_analyzed_ms >= self.interval_ms {
            let planes = image.planes();
            match planes.first().and_then(|luma| mean_luma(luma.buffer)) {
                Some(luma) => {
                    debug!(target: LUMINOSITY_TARGET, luma, "Average luminosity");
                    if let Some(listener) = self.listener.as_mut() {
                        listener(luma);
                    }
                }
                None => {
                    warn!(
                        target: LUMINOSITY_TARGET,
                        sequence = image.sequence(),
                        "Empty luminance plane"
                    );
                }
            }
            self.last_analyzed_ms = now;
        }

        image.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ManualClock;
    use crate::backends::camera::types::CameraFrame;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn frame_with_luma(luma: Vec<u8>, sequence: u64) -> Arc<CameraFrame> {
        let width = luma.len() as u32;
        let mut frame = CameraFrame::nv12(width, 1, luma, sequence);
        frame.format = crate::backends::camera::types::PixelFormat::Gray8;
        Arc::new(frame)
    }

    fn recording_analyzer(clock: &ManualClock) -> (LuminosityAnalyzer, Arc<Mutex<Vec<f64>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let analyzer = LuminosityAnalyzer::with_clock(clock.clone())
            .on_luma(move |luma| sink.lock().unwrap().push(luma));
        (analyzer, seen)
    }

    #[test]
    fn test_mean_of_extremes() {
        assert_eq!(mean_luma(&[0, 0, 255, 255]), Some(127.5));
        assert_eq!(mean_luma(&[]), None);
        assert_eq!(mean_luma(&[200]), Some(200.0));
    }

    #[test]
    fn test_first_frame_is_analyzed() {
        let clock = ManualClock::starting_at(1_700_000_000_000);
        let (mut analyzer, seen) = recording_analyzer(&clock);

        analyzer.analyze(ImageProxy::new(frame_with_luma(vec![0, 0, 255, 255], 0)));

        assert_eq!(*seen.lock().unwrap(), vec![127.5]);
    }

    #[test]
    fn test_frames_inside_window_are_skipped() {
        let clock = ManualClock::starting_at(10_000);
        let (mut analyzer, seen) = recording_analyzer(&clock);

        analyzer.analyze(ImageProxy::new(frame_with_luma(vec![10], 0)));
        clock.advance(999);
        analyzer.analyze(ImageProxy::new(frame_with_luma(vec![20], 1)));
        clock.advance(1);
        // Exactly 1000 ms after the last analyzed frame
        analyzer.analyze(ImageProxy::new(frame_with_luma(vec![30], 2)));

        assert_eq!(*seen.lock().unwrap(), vec![10.0, 30.0]);
    }

    #[test]
    fn test_window_restarts_from_analyzed_frame() {
        let clock = ManualClock::starting_at(0);
        let (mut analyzer, seen) = recording_analyzer(&clock);
        clock.set(5_000);

        analyzer.analyze(ImageProxy::new(frame_with_luma(vec![1], 0)));
        clock.set(6_500);
        analyzer.analyze(ImageProxy::new(frame_with_luma(vec![2], 1)));
        // 900 ms after the second analyzed frame, although 1900 ms after the first
        clock.set(7_400);
        analyzer.analyze(ImageProxy::new(frame_with_luma(vec![3], 2)));

        assert_eq!(*seen.lock().unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_every_frame_released_once() {
        let clock = ManualClock::starting_at(50_000);
        let (mut analyzer, _) = recording_analyzer(&clock);
        let released = Arc::new(AtomicUsize::new(0));

        for sequence in 0..25 {
            let counter = Arc::clone(&released);
            let image = ImageProxy::with_release_hook(
                frame_with_luma(vec![sequence as u8; 4], sequence),
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                },
            );
            analyzer.analyze(image);
            clock.advance(100);
        }

        assert_eq!(released.load(Ordering::SeqCst), 25);
    }

    #[test]
    fn test_empty_plane_consumes_window() {
        let clock = ManualClock::starting_at(2_000);
        let (mut analyzer, seen) = recording_analyzer(&clock);

        analyzer.analyze(ImageProxy::new(frame_with_luma(Vec::new(), 0)));
        clock.advance(500);
        analyzer.analyze(ImageProxy::new(frame_with_luma(vec![9], 1)));

        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_custom_interval() {
        let clock = ManualClock::starting_at(1_000);
        let (analyzer, seen) = recording_analyzer(&clock);
        let mut analyzer = analyzer.with_interval(Duration::from_millis(250));

        for value in 0..4u8 {
            analyzer.analyze(ImageProxy::new(frame_with_luma(vec![value], value as u64)));
            clock.advance(125);
        }

        assert_eq!(*seen.lock().unwrap(), vec![0.0, 2.0]);
    }
}
