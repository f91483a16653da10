//! Run control for a restartable worker thread.
//!
//! A [`Worker`] owns at most one thread at a time plus an atomic stop-request
//! flag. `stop` only raises the flag; the thread body is expected to poll it
//! through its [`StopSignal`] at well-defined checkpoints. `wait_for_stop`
//! joins the thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crate::error::{Error, Result};

/// Shared stop-request flag of a worker.
#[derive(Clone, Debug, Default)]
pub struct StopSignal {
    requested: Arc<AtomicBool>,
}

impl StopSignal {
    /// Create a flag with no stop requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the worker to stop at its next checkpoint.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Whether a stop has been requested.
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }
}

/// A joinable thread handle plus its stop-request flag.
pub struct Worker {
    name: String,
    signal: StopSignal,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    /// Create a stopped worker. `name` is used for the thread and in logs.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signal: StopSignal::new(),
            thread: Mutex::new(None),
        }
    }

    /// Worker name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Clone of the stop-request flag, usable from any thread.
    pub fn stop_signal(&self) -> StopSignal {
        self.signal.clone()
    }

    /// Start `body` on a new thread.
    ///
    /// Any previous thread is joined first, so at most one thread runs per
    /// worker. A stop requested before `start` is kept, so the body exits at
    /// its first checkpoint. The flag is cleared when the body returns.
    pub fn start<F>(&self, body: F) -> Result<()>
    where
        F: FnOnce(StopSignal) + Send + 'static,
    {
        let mut slot = self.thread.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.take() {
            self.join(previous)?;
        }

        let signal = self.signal.clone();
        let handle = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                body(signal.clone());
                signal.reset();
            })
            .map_err(Error::WorkerSpawn)?;
        log::debug!("Worker '{}' started", self.name);
        *slot = Some(handle);
        Ok(())
    }

    /// Request the thread to stop. Does not block.
    pub fn stop(&self) {
        self.signal.request();
    }

    /// Whether a thread has been started and has not finished yet.
    pub fn is_running(&self) -> bool {
        self.thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Block until the thread has exited, then clear the stop flag.
    ///
    /// Returns [`Error::JoinFromWorker`] instead of deadlocking when called
    /// from the worker's own thread.
    pub fn wait_for_stop(&self) -> Result<()> {
        let mut slot = self.thread.lock().unwrap_or_else(PoisonError::into_inner);
        let joined = match slot.as_ref() {
            Some(handle) if handle.thread().id() == thread::current().id() => {
                return Err(Error::JoinFromWorker(self.name.clone()));
            }
            Some(_) => match slot.take() {
                Some(handle) => self.join(handle),
                None => Ok(()),
            },
            None => Ok(()),
        };
        // A panicked body skips its own reset.
        self.signal.reset();
        joined
    }

    fn join(&self, handle: JoinHandle<()>) -> Result<()> {
        handle
            .join()
            .map_err(|_| Error::WorkerPanicked(self.name.clone()))?;
        log::debug!("Worker '{}' stopped", self.name);
        Ok(())
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
        if let Err(e) = self.wait_for_stop() {
            log::warn!("Failed to join worker '{}': {}", self.name, e);
        }
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .field("stop_requested", &self.signal.is_requested())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn spin_until_stopped(counter: Arc<AtomicUsize>) -> impl FnOnce(StopSignal) + Send + 'static {
        move |signal| {
            counter.fetch_add(1, Ordering::SeqCst);
            while !signal.is_requested() {
                thread::sleep(Duration::from_millis(1));
            }
        }
    }

    #[test]
    fn test_start_stop_wait() {
        let worker = Worker::new("test-worker");
        let runs = Arc::new(AtomicUsize::new(0));
        assert!(!worker.is_running());

        worker.start(spin_until_stopped(runs.clone())).unwrap();
        assert!(worker.is_running());

        worker.stop();
        worker.wait_for_stop().unwrap();
        assert!(!worker.is_running());
        assert!(!worker.stop_signal().is_requested(), "flag is reset on exit");
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_restart_after_stop() {
        let worker = Worker::new("restart");
        let runs = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            worker.start(spin_until_stopped(runs.clone())).unwrap();
            worker.stop();
            worker.wait_for_stop().unwrap();
        }
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_start_joins_finished_thread() {
        let worker = Worker::new("short");
        let runs = Arc::new(AtomicUsize::new(0));
        let r = runs.clone();
        worker.start(move |_| {
            r.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        let r = runs.clone();
        worker.start(move |_| {
            r.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        worker.wait_for_stop().unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_wait_without_thread_is_noop() {
        let worker = Worker::new("idle");
        worker.stop();
        worker.wait_for_stop().unwrap();
        assert!(!worker.is_running());
    }

    #[test]
    fn test_stop_before_start_is_kept() {
        let worker = Worker::new("early-stop");
        let runs = Arc::new(AtomicUsize::new(0));
        worker.stop();
        worker.start(spin_until_stopped(runs.clone())).unwrap();
        // The body sees the earlier request and returns without another stop.
        worker.wait_for_stop().unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!worker.stop_signal().is_requested());

        worker.start(spin_until_stopped(runs.clone())).unwrap();
        thread::sleep(Duration::from_millis(20));
        assert!(worker.is_running(), "a consumed request does not stop the next run");
        worker.stop();
        worker.wait_for_stop().unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_wait_from_inside_worker_is_refused() {
        let worker = Arc::new(Worker::new("self-join"));
        let (tx, rx) = crossbeam_channel::bounded(1);
        let inner = worker.clone();
        worker
            .start(move |_| {
                // Give start() time to store the handle.
                thread::sleep(Duration::from_millis(50));
                let _ = tx.send(inner.wait_for_stop().is_err());
            })
            .unwrap();
        assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
        worker.wait_for_stop().unwrap();
    }

    #[test]
    fn test_panicking_body_is_reported() {
        let worker = Worker::new("panics");
        worker.start(|_| panic!("worker failure")).unwrap();
        assert!(matches!(worker.wait_for_stop(), Err(Error::WorkerPanicked(_))));
        assert!(!worker.is_running());
    }

    #[test]
    fn test_idle_stop_does_not_leak_into_next_run() {
        let worker = Worker::new("idle-stop");
        let runs = Arc::new(AtomicUsize::new(0));
        worker.stop();
        worker.wait_for_stop().unwrap();
        worker.start(spin_until_stopped(runs.clone())).unwrap();
        thread::sleep(Duration::from_millis(20));
        assert!(worker.is_running());
        worker.stop();
        worker.wait_for_stop().unwrap();
    }

    #[test]
    fn test_drop_stops_thread() {
        let runs = Arc::new(AtomicUsize::new(0));
        {
            let worker = Worker::new("dropped");
            worker.start(spin_until_stopped(runs.clone())).unwrap();
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
