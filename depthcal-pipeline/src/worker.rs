//! The calibration worker thread.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread;
use std::time::Duration;

use depthcal_capture::{LoopAction, LoopThread};
use depthcal_data::{CalibratedFrame, RawFrame};
use tracing::{debug, warn};

use crate::controller::PipelineState;
use crate::corrector::Corrector;
use crate::mailbox::Mailbox;
use crate::stats::PipelineStats;

/// Everything the producer, worker and consumer share.
///
/// Frames only cross threads through the two mailboxes; the remaining fields
/// are atomics.
pub struct SharedState {
    pub input: Mailbox<RawFrame>,
    pub output: Mailbox<CalibratedFrame>,
    pub stats: PipelineStats,
    state: AtomicU8,
    calibration_enabled: AtomicBool,
}

impl SharedState {
    pub fn new(calibration_enabled: bool) -> Self {
        Self {
            input: Mailbox::new(),
            output: Mailbox::new(),
            stats: PipelineStats::new(),
            state: AtomicU8::new(PipelineState::Disconnected as u8),
            calibration_enabled: AtomicBool::new(calibration_enabled),
        }
    }

    pub fn state(&self) -> PipelineState {
        PipelineState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: PipelineState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn calibration_enabled(&self) -> bool {
        self.calibration_enabled.load(Ordering::Acquire)
    }

    pub(crate) fn set_calibration_enabled(&self, enabled: bool) {
        self.calibration_enabled.store(enabled, Ordering::Release);
    }
}

/// Owns the single background thread that drains the input mailbox.
pub struct CalibrationWorker {
    thread: LoopThread,
}

impl CalibrationWorker {
    /// Start the worker loop.
    ///
    /// Each iteration either processes one frame or sleeps `idle_interval`,
    /// which therefore bounds how long `stop` waits.
    pub fn start(
        shared: Arc<SharedState>,
        mut corrector: Corrector,
        idle_interval: Duration,
    ) -> io::Result<Self> {
        let thread = LoopThread::spawn("depthcal-calibration", move || {
            if shared.state() == PipelineState::Paused {
                thread::sleep(idle_interval);
                return LoopAction::Continue;
            }
            match shared.input.take() {
                Some(frame) => process_one(&shared, &mut corrector, frame),
                None => thread::sleep(idle_interval),
            }
            LoopAction::Continue
        })?;
        Ok(Self { thread })
    }

    pub fn is_running(&self) -> bool {
        self.thread.is_running()
    }

    /// Raise the stop flag and join.
    pub fn stop(&mut self) {
        self.thread.stop();
    }
}

fn process_one(shared: &SharedState, corrector: &mut Corrector, frame: RawFrame) {
    let index = frame.index;

    if !shared.calibration_enabled() {
        let displaced = shared.output.put(CalibratedFrame::pass_through(frame));
        shared.stats.record_passed_through();
        shared.stats.record_published(displaced.is_some());
        return;
    }

    // A bad frame must never take the worker down with it.
    match panic::catch_unwind(AssertUnwindSafe(|| corrector.process(frame))) {
        Ok(Ok(calibrated)) => {
            let elapsed = calibrated.processing_time;
            debug!(
                index,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                valid = calibrated.valid_count(),
                "Frame calibrated"
            );
            let displaced = shared.output.put(calibrated);
            shared.stats.record_calibrated(elapsed);
            shared.stats.record_published(displaced.is_some());
        }
        Ok(Err(e)) => {
            shared.stats.record_dropped();
            warn!(index, error = %e, "Dropping frame");
        }
        Err(_) => {
            shared.stats.record_dropped();
            warn!(index, "Corrector panicked, dropping frame");
        }
    }
}
