//! Flush policies and the background save worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Controls when a connected tree gets written to disk.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FlushPolicy {
    /// Write before every set/delete returns. One write per mutation call.
    #[default]
    Immediate,
    /// Coalesce writes on a background thread that wakes on every change and
    /// at least once per interval. Call `flush()` before reading the file.
    Async(Duration),
    /// Only write when you call `flush()` or `save()` yourself.
    Manual,
}

/// Background thread that calls a save closure on a timer or when poked.
/// Joins the thread on drop so nothing leaks.
pub(crate) struct AsyncFlushWorker {
    stop: Arc<AtomicBool>,
    tx: Option<mpsc::SyncSender<()>>,
    join_handle: Option<thread::JoinHandle<()>>,
}

impl AsyncFlushWorker {
    /// Spawn a worker that owns both ends of the channel.
    pub(crate) fn start<F>(name: String, interval: Duration, flush_fn: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let (tx, rx) = mpsc::sync_channel::<()>(0);

        let body = move || loop {
            if stop_flag.load(Ordering::Relaxed) {
                break;
            }
            match rx.recv_timeout(interval) {
                Ok(()) | Err(mpsc::RecvTimeoutError::Timeout) => flush_fn(),
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        };
        let join_handle = match thread::Builder::new().name(name).spawn(body) {
            Ok(h) => Some(h),
            Err(e) => {
                // Changes stay pending until flush() or drop.
                tracing::warn!(error = %e, "could not spawn save worker");
                None
            }
        };

        Self {
            stop,
            tx: Some(tx),
            join_handle,
        }
    }

    /// Non-blocking nudge to save now. If the worker is busy the nudge is
    /// silently dropped (the next timer tick will catch up).
    pub(crate) fn trigger(&self) {
        if let Some(ref t) = self.tx {
            let _ = t.try_send(());
        }
    }
}

impl Drop for AsyncFlushWorker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        drop(self.tx.take());
        if let Some(h) = self.join_handle.take() {
            let _ = h.join();
        }
    }
}
