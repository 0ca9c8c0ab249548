//! Thread lifecycle for background loops
//!
//! Both driver threads and the calibration worker are a closure called in a
//! loop until a stop flag is raised. `LoopThread` owns that flag and the join
//! handle so every loop starts, stops and reports panics the same way.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Returned by each loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    Continue,
    Stop,
}

/// A named background thread running one closure repeatedly.
///
/// Stopping is cooperative: the flag is checked before every iteration and
/// the thread is then joined without a timeout, so iterations must stay
/// short.
pub struct LoopThread {
    handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl LoopThread {
    /// Spawn a loop that calls `step` until it returns `LoopAction::Stop` or
    /// `stop()` is called.
    ///
    /// Fails only if the OS refuses to create the thread.
    pub fn spawn<F>(name: &str, mut step: F) -> io::Result<Self>
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop_signal);
        let thread_name = name.to_string();

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                debug!(name = %thread_name, "Loop thread started");
                loop {
                    if thread_stop.load(Ordering::Acquire) {
                        debug!(name = %thread_name, "Stop signal received");
                        break;
                    }
                    if step() == LoopAction::Stop {
                        debug!(name = %thread_name, "Loop requested stop");
                        break;
                    }
                }
                debug!(name = %thread_name, "Loop thread exiting");
            })?;

        info!(name = %name, "Started loop thread");

        Ok(Self {
            handle: Some(handle),
            stop_signal,
            name: name.to_string(),
        })
    }

    /// Whether the thread has not finished yet.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Raise the stop flag without waiting.
    pub fn request_stop(&self) {
        self.stop_signal.store(true, Ordering::Release);
    }

    /// Raise the stop flag and join.
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Join without raising the stop flag.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Loop thread panicked: {:?}", e);
            } else {
                info!(name = %self.name, "Loop thread stopped");
            }
        }
    }
}

impl Drop for LoopThread {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop();
        }
    }
}
