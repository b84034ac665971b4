// SPDX-License-Identifier: GPL-3.0-only

//! Frame fan-out
//!
//! Backends push every frame into a [`FrameDispatcher`], which keeps the most
//! recent frame for the preview and for still capture, and lends a copy-free
//! [`ImageProxy`] of it to the analysis worker.

use super::executor::CameraExecutor;
use crate::analysis::ImageProxy;
use crate::backends::camera::FrameSender;
use crate::backends::camera::types::CameraFrame;
use crate::constants::timing;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;

struct DispatchInner {
    latest: Mutex<Option<Arc<CameraFrame>>>,
    arrived: Condvar,
    handoff: Mutex<()>,
    executor: Arc<CameraExecutor>,
    next_sequence: AtomicU64,
    images_in_flight: Arc<AtomicUsize>,
}

impl DispatchInner {
    fn lock_latest(&self) -> MutexGuard<'_, Option<Arc<CameraFrame>>> {
        self.latest.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Cheap to clone; all clones feed the same session
#[derive(Clone)]
pub struct FrameDispatcher {
    inner: Arc<DispatchInner>,
}

impl FrameDispatcher {
    pub fn new(executor: Arc<CameraExecutor>) -> Self {
        Self {
            inner: Arc::new(DispatchInner {
                latest: Mutex::new(None),
                arrived: Condvar::new(),
                handoff: Mutex::new(()),
                executor,
                next_sequence: AtomicU64::new(1),
                images_in_flight: Arc::new(AtomicUsize::new(0)),
            }),
        }
    }

    /// Accept a frame from the backend
    pub fn deliver(&self, mut frame: CameraFrame) {
        frame.sequence = self.inner.next_sequence.fetch_add(1, Ordering::Relaxed);
        let frame = Arc::new(frame);

        if frame.sequence % timing::FRAME_LOG_INTERVAL == 0 {
            debug!(
                sequence = frame.sequence,
                width = frame.width,
                height = frame.height,
                in_flight = self.images_in_flight(),
                "Frame delivered"
            );
        }

        *self.inner.lock_latest() = Some(Arc::clone(&frame));
        self.inner.arrived.notify_all();

        if self.inner.executor.has_analyzer() {
            // The stale frame is released before the new one is counted, so at
            // most one frame in the analyzer and one waiting are ever in flight
            let _handoff = self
                .inner
                .handoff
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            self.inner.executor.discard_pending();

            let in_flight = Arc::clone(&self.inner.images_in_flight);
            in_flight.fetch_add(1, Ordering::SeqCst);
            let image = ImageProxy::with_release_hook(frame, move || {
                in_flight.fetch_sub(1, Ordering::SeqCst);
            });
            self.inner.executor.post_image(image);
        }
    }

    /// Callback handed to backends
    pub fn sender(&self) -> FrameSender {
        let dispatcher = self.clone();
        Arc::new(move |frame| dispatcher.deliver(frame))
    }

    /// Most recent frame, for the preview
    pub fn latest_frame(&self) -> Option<Arc<CameraFrame>> {
        self.inner.lock_latest().clone()
    }

    /// Sequence number of the most recent frame (0 before the first frame)
    pub fn latest_sequence(&self) -> u64 {
        self.inner
            .lock_latest()
            .as_ref()
            .map(|frame| frame.sequence)
            .unwrap_or(0)
    }

    /// Block until a frame newer than `after` arrives, or `timeout` passes
    pub fn wait_for_frame_after(&self, after: u64, timeout: Duration) -> Option<Arc<CameraFrame>> {
        let deadline = Instant::now() + timeout;
        let mut latest = self.inner.lock_latest();
        loop {
            if let Some(frame) = latest.as_ref()
                && frame.sequence > after
            {
                return Some(Arc::clone(frame));
            }
            let remaining = deadline.checked_duration_since(Instant::now())?;
            let (guard, _) = self
                .inner
                .arrived
                .wait_timeout(latest, remaining)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            latest = guard;
        }
    }

    /// Analysis frames handed out and not yet released
    pub fn images_in_flight(&self) -> usize {
        self.inner.images_in_flight.load(Ordering::SeqCst)
    }

    pub fn executor(&self) -> &Arc<CameraExecutor> {
        &self.inner.executor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Analyzer;
    use std::sync::mpsc;

    fn frame() -> CameraFrame {
        CameraFrame::nv12(2, 2, vec![0; 6], 0)
    }

    #[test]
    fn test_sequences_are_assigned() {
        let executor = Arc::new(CameraExecutor::spawn("dispatch-seq", None).unwrap());
        let dispatcher = FrameDispatcher::new(executor);
        assert_eq!(dispatcher.latest_sequence(), 0);

        let send = dispatcher.sender();
        send(frame());
        send(frame());

        assert_eq!(dispatcher.latest_sequence(), 2);
        assert_eq!(dispatcher.latest_frame().unwrap().sequence, 2);
        assert_eq!(dispatcher.images_in_flight(), 0);
    }

    #[test]
    fn test_wait_for_frame_after() {
        let executor = Arc::new(CameraExecutor::spawn("dispatch-wait", None).unwrap());
        let dispatcher = FrameDispatcher::new(executor);
        dispatcher.deliver(frame());

        assert!(
            dispatcher
                .wait_for_frame_after(1, Duration::from_millis(20))
                .is_none()
        );

        let producer = dispatcher.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            producer.deliver(frame());
        });
        let fresh = dispatcher.wait_for_frame_after(1, Duration::from_secs(2));
        handle.join().unwrap();
        assert_eq!(fresh.unwrap().sequence, 2);
    }

    #[test]
    fn test_analysis_frames_are_returned() {
        let (tx, rx) = mpsc::channel();
        let analyzer = move |image: ImageProxy| {
            tx.send(image.sequence()).ok();
            image.close();
        };
        let analyzer: Box<dyn Analyzer> = Box::new(analyzer);
        let executor = Arc::new(CameraExecutor::spawn("dispatch-analysis", Some(analyzer)).unwrap());
        let dispatcher = FrameDispatcher::new(executor);

        dispatcher.deliver(frame());
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), 1);

        let deadline = Instant::now() + Duration::from_secs(2);
        while dispatcher.images_in_flight() > 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(dispatcher.images_in_flight(), 0);
    }

    #[test]
    fn test_in_flight_never_exceeds_two() {
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let (started_tx, started_rx) = mpsc::channel();
        let analyzer = move |image: ImageProxy| {
            started_tx.send(image.sequence()).ok();
            gate_rx.recv().ok();
            drop(image);
        };
        let analyzer: Box<dyn Analyzer> = Box::new(analyzer);
        let executor = Arc::new(CameraExecutor::spawn("dispatch-bound", Some(analyzer)).unwrap());
        let dispatcher = FrameDispatcher::new(Arc::clone(&executor));

        dispatcher.deliver(frame());
        assert_eq!(started_rx.recv_timeout(Duration::from_secs(2)).unwrap(), 1);

        let sampler = dispatcher.clone();
        let done = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let stop = Arc::clone(&done);
        let watcher = std::thread::spawn(move || {
            let mut peak = 0;
            while !stop.load(Ordering::SeqCst) {
                peak = peak.max(sampler.images_in_flight());
            }
            peak
        });

        for _ in 0..5000 {
            dispatcher.deliver(frame());
        }
        done.store(true, Ordering::SeqCst);
        let peak = watcher.join().unwrap();

        assert!(peak <= 2, "peak in-flight frames: {}", peak);
        assert_eq!(dispatcher.images_in_flight(), 2);

        drop(gate_tx);
        executor.shutdown();
        assert_eq!(dispatcher.images_in_flight(), 0);
    }
}
