// SPDX-License-Identifier: GPL-3.0-only

//! Single-thread camera worker
//!
//! Runs frame analysis and still-capture work on one dedicated thread. The
//! analyzer is moved into that thread at spawn time and never leaves it, so
//! its state needs no locking. Input arrives through two queues guarded by
//! one mutex:
//!
//! - a single pending-frame slot with keep-only-latest semantics: posting a
//!   frame while another is still waiting replaces (and so releases) the
//!   older one
//! - a FIFO of one-shot tasks
//!
//! Tasks run before a waiting frame so a capture is not held up by analysis.

use crate::analysis::{Analyzer, ImageProxy};
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct WorkQueue {
    pending_image: Option<ImageProxy>,
    tasks: VecDeque<Task>,
    shutdown: bool,
}

struct Shared {
    queue: Mutex<WorkQueue>,
    wakeup: Condvar,
    accepts_images: bool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, WorkQueue> {
        // A panicking task leaves the queue itself consistent
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

enum Work {
    Task(Task),
    Image(ImageProxy),
}

/// Handle to the worker thread. Dropping it stops and joins the thread.
pub struct CameraExecutor {
    shared: Arc<Shared>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
    name: String,
}

impl CameraExecutor {
    /// Start the worker. Without an analyzer, posted frames are released immediately.
    pub fn spawn(name: &str, analyzer: Option<Box<dyn Analyzer>>) -> std::io::Result<Self> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(WorkQueue::default()),
            wakeup: Condvar::new(),
            accepts_images: analyzer.is_some(),
        });

        let worker_shared = Arc::clone(&shared);
        let thread_name = name.to_string();
        let thread_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run_worker(&thread_name, &worker_shared, analyzer))?;

        info!(name, "Camera executor started");

        Ok(Self {
            shared,
            thread_handle: Mutex::new(Some(thread_handle)),
            name: name.to_string(),
        })
    }

    /// Offer a frame for analysis, replacing any frame still waiting
    pub fn post_image(&self, image: ImageProxy) {
        if !self.shared.accepts_images {
            image.close();
            return;
        }

        let replaced = {
            let mut queue = self.shared.lock();
            if queue.shutdown {
                drop(queue);
                image.close();
                return;
            }
            queue.pending_image.replace(image)
        };
        self.shared.wakeup.notify_one();

        // Released outside the lock
        if let Some(stale) = replaced {
            debug!(sequence = stale.sequence(), "Dropping stale analysis frame");
            stale.close();
        }
    }

    /// Release the frame waiting for the analyzer, if any
    pub fn discard_pending(&self) {
        let stale = self.shared.lock().pending_image.take();
        if let Some(stale) = stale {
            debug!(sequence = stale.sequence(), "Dropping stale analysis frame");
            stale.close();
        }
    }

    /// Queue a task; returns false once the executor is shutting down
    pub fn execute(&self, task: impl FnOnce() + Send + 'static) -> bool {
        {
            let mut queue = self.shared.lock();
            if queue.shutdown {
                return false;
            }
            queue.tasks.push_back(Box::new(task));
        }
        self.shared.wakeup.notify_one();
        true
    }

    /// Whether the worker runs an analyzer
    pub fn has_analyzer(&self) -> bool {
        self.shared.accepts_images
    }

    /// Stop accepting work and wait for the thread to exit.
    ///
    /// Queued tasks are discarded, the pending frame is released. Safe to
    /// call more than once.
    pub fn shutdown(&self) {
        let (pending, discarded) = {
            let mut queue = self.shared.lock();
            queue.shutdown = true;
            (queue.pending_image.take(), std::mem::take(&mut queue.tasks))
        };
        self.shared.wakeup.notify_all();

        drop(pending);
        if !discarded.is_empty() {
            debug!(name = %self.name, count = discarded.len(), "Discarding queued tasks");
        }
        drop(discarded);

        let handle = self
            .thread_handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let Some(handle) = handle else {
            return;
        };
        // Last reference dropped from inside a task: nothing to join
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            warn!(name = %self.name, "Camera executor thread panicked");
        }
    }
}

impl Drop for CameraExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn next_work(shared: &Shared) -> Option<Work> {
    let mut queue = shared.lock();
    loop {
        if queue.shutdown {
            return None;
        }
        if let Some(task) = queue.tasks.pop_front() {
            return Some(Work::Task(task));
        }
        if let Some(image) = queue.pending_image.take() {
            return Some(Work::Image(image));
        }
        queue = shared
            .wakeup
            .wait(queue)
            .unwrap_or_else(|poisoned| poisoned.into_inner());
    }
}

fn run_worker(name: &str, shared: &Shared, mut analyzer: Option<Box<dyn Analyzer>>) {
    debug!(name, "Camera executor thread running");

    while let Some(work) = next_work(shared) {
        match work {
            Work::Task(task) => {
                if std::panic::catch_unwind(std::panic::AssertUnwindSafe(task)).is_err() {
                    warn!(name, "Camera executor task panicked");
                }
            }
            Work::Image(image) => match analyzer.as_mut() {
                Some(analyzer) => {
                    // A malformed frame only costs that frame
                    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        analyzer.analyze(image)
                    }));
                    if outcome.is_err() {
                        warn!(name, "Analyzer panicked on a frame");
                    }
                }
                None => image.close(),
            },
        }
    }

    info!(name, "Camera executor thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::CameraFrame;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    fn counted_image(sequence: u64, released: &Arc<AtomicUsize>) -> ImageProxy {
        let counter = Arc::clone(released);
        ImageProxy::with_release_hook(
            Arc::new(CameraFrame::nv12(2, 2, vec![0; 6], sequence)),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        )
    }

    fn recording_analyzer() -> (Box<dyn Analyzer>, mpsc::Receiver<u64>) {
        let (tx, rx) = mpsc::channel();
        let analyzer = move |image: ImageProxy| {
            tx.send(image.sequence()).ok();
            image.close();
        };
        (Box::new(analyzer), rx)
    }

    #[test]
    fn test_tasks_run_in_order() {
        let executor = CameraExecutor::spawn("test-order", None).unwrap();
        let (tx, rx) = mpsc::channel();
        for i in 0..5 {
            let tx = tx.clone();
            assert!(executor.execute(move || tx.send(i).unwrap()));
        }
        let got: Vec<i32> = (0..5)
            .map(|_| rx.recv_timeout(Duration::from_secs(2)).unwrap())
            .collect();
        assert_eq!(got, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_keep_only_latest_frame() {
        let (analyzer, analyzed) = recording_analyzer();
        let executor = CameraExecutor::spawn("test-latest", Some(analyzer)).unwrap();
        let released = Arc::new(AtomicUsize::new(0));

        // Hold the worker inside a task while frames pile up
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let (started_tx, started_rx) = mpsc::channel::<()>();
        executor.execute(move || {
            started_tx.send(()).unwrap();
            gate_rx.recv().unwrap();
        });
        started_rx.recv_timeout(Duration::from_secs(2)).unwrap();

        for sequence in 0..10 {
            executor.post_image(counted_image(sequence, &released));
        }
        // Nine replaced frames are already released
        assert_eq!(released.load(Ordering::SeqCst), 9);

        gate_tx.send(()).unwrap();
        assert_eq!(analyzed.recv_timeout(Duration::from_secs(2)).unwrap(), 9);
        drop(executor);

        assert_eq!(released.load(Ordering::SeqCst), 10);
        assert!(analyzed.try_recv().is_err());
    }

    #[test]
    fn test_discard_pending_releases_waiting_frame() {
        let (analyzer, analyzed) = recording_analyzer();
        let executor = CameraExecutor::spawn("test-discard", Some(analyzer)).unwrap();
        let released = Arc::new(AtomicUsize::new(0));

        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let (started_tx, started_rx) = mpsc::channel::<()>();
        executor.execute(move || {
            started_tx.send(()).unwrap();
            gate_rx.recv().unwrap();
        });
        started_rx.recv_timeout(Duration::from_secs(2)).unwrap();

        executor.post_image(counted_image(3, &released));
        executor.discard_pending();
        assert_eq!(released.load(Ordering::SeqCst), 1);
        // Nothing left to discard
        executor.discard_pending();
        assert_eq!(released.load(Ordering::SeqCst), 1);

        gate_tx.send(()).unwrap();
        drop(executor);
        assert!(analyzed.try_recv().is_err());
    }

    #[test]
    fn test_frames_released_without_analyzer() {
        let executor = CameraExecutor::spawn("test-none", None).unwrap();
        let released = Arc::new(AtomicUsize::new(0));
        executor.post_image(counted_image(0, &released));
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert!(!executor.has_analyzer());
    }

    #[test]
    fn test_shutdown_releases_pending_frame() {
        let (analyzer, _analyzed) = recording_analyzer();
        let executor = CameraExecutor::spawn("test-shutdown", Some(analyzer)).unwrap();
        let released = Arc::new(AtomicUsize::new(0));

        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let (started_tx, started_rx) = mpsc::channel::<()>();
        executor.execute(move || {
            started_tx.send(()).unwrap();
            gate_rx.recv_timeout(Duration::from_millis(200)).ok();
        });
        started_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        executor.post_image(counted_image(1, &released));
        drop(gate_tx);

        executor.shutdown();
        assert_eq!(released.load(Ordering::SeqCst), 1);

        // Work after shutdown is refused, frames still released
        assert!(!executor.execute(|| {}));
        executor.post_image(counted_image(2, &released));
        assert_eq!(released.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_panicking_analyzer_keeps_worker_alive() {
        let (tx, rx) = mpsc::channel();
        let analyzer = move |image: ImageProxy| {
            if image.sequence() == 0 {
                panic!("bad frame");
            }
            tx.send(image.sequence()).ok();
        };
        let executor = CameraExecutor::spawn("test-panic", Some(Box::new(analyzer))).unwrap();
        let released = Arc::new(AtomicUsize::new(0));

        executor.post_image(counted_image(0, &released));
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while released.load(Ordering::SeqCst) == 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(released.load(Ordering::SeqCst), 1);

        executor.post_image(counted_image(1, &released));
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), 1);
        drop(executor);
        assert_eq!(released.load(Ordering::SeqCst), 2);
    }
}
