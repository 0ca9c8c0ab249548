//! Frame counters shared between the producer, worker and consumer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Live counters. All updates are relaxed; read them through `snapshot`.
#[derive(Debug, Default)]
pub struct PipelineStats {
    received: AtomicU64,
    input_overwritten: AtomicU64,
    skipped_paused: AtomicU64,
    calibrated: AtomicU64,
    passed_through: AtomicU64,
    dropped: AtomicU64,
    output_overwritten: AtomicU64,
    fetched: AtomicU64,
    last_processing_us: AtomicU64,
}

/// A point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Frames put in the input mailbox.
    pub received: u64,
    /// Input frames replaced before the worker took them.
    pub input_overwritten: u64,
    /// Frames discarded because the pipeline was paused.
    pub skipped_paused: u64,
    pub calibrated: u64,
    pub passed_through: u64,
    /// Frames the corrector failed on.
    pub dropped: u64,
    /// Finished frames replaced before the consumer fetched them.
    pub output_overwritten: u64,
    pub fetched: u64,
    pub last_processing_time: Duration,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_received(&self, overwrote: bool) {
        self.received.fetch_add(1, Ordering::Relaxed);
        if overwrote {
            self.input_overwritten.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_skipped_paused(&self) {
        self.skipped_paused.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_calibrated(&self, elapsed: Duration) {
        self.calibrated.fetch_add(1, Ordering::Relaxed);
        self.last_processing_us
            .store(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_passed_through(&self) {
        self.passed_through.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_published(&self, overwrote: bool) {
        if overwrote {
            self.output_overwritten.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_fetched(&self) {
        self.fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            input_overwritten: self.input_overwritten.load(Ordering::Relaxed),
            skipped_paused: self.skipped_paused.load(Ordering::Relaxed),
            calibrated: self.calibrated.load(Ordering::Relaxed),
            passed_through: self.passed_through.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            output_overwritten: self.output_overwritten.load(Ordering::Relaxed),
            fetched: self.fetched.load(Ordering::Relaxed),
            last_processing_time: Duration::from_micros(
                self.last_processing_us.load(Ordering::Relaxed),
            ),
        }
    }
}

impl StatsSnapshot {
    /// Frames that left the worker, calibrated or not.
    pub fn produced(&self) -> u64 {
        self.calibrated + self.passed_through
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts() {
        let stats = PipelineStats::new();
        stats.record_received(false);
        stats.record_received(true);
        stats.record_calibrated(Duration::from_micros(1500));
        stats.record_passed_through();
        stats.record_published(true);
        stats.record_dropped();
        stats.record_fetched();

        let snap = stats.snapshot();
        assert_eq!(snap.received, 2);
        assert_eq!(snap.input_overwritten, 1);
        assert_eq!(snap.produced(), 2);
        assert_eq!(snap.output_overwritten, 1);
        assert_eq!(snap.dropped, 1);
        assert_eq!(snap.fetched, 1);
        assert_eq!(snap.last_processing_time, Duration::from_micros(1500));
    }
}
