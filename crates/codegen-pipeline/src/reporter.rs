//! Periodic progress reporting.
//!
//! The reporting loop wakes on a fixed tick, takes a [`Progress`] snapshot
//! and hands it to a [`ProgressObserver`]. It ends once the feed is ready
//! (after a final `on_finished`) or once the run stops for any other
//! reason.

use crate::progress::{Progress, ProgressFeed};
use crate::shutdown::{ShutdownReason, ShutdownSignal};
use crate::worker::GenerationCounters;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::warn;

/// Candidates to see before the rejection ratio is trusted.
const MIN_SAMPLE: u64 = 100_000;

/// Receives progress snapshots from the reporting loop.
pub trait ProgressObserver: Send + 'static {
    fn on_progress(&mut self, progress: &Progress);

    /// Called once, after the last snapshot of a completed run.
    fn on_finished(&mut self, _progress: &Progress) {}
}

/// Observer that ignores every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl ProgressObserver for Silent {
    fn on_progress(&mut self, _progress: &Progress) {}
}

/// Warns once when a probabilistic filter rejects too many candidates.
///
/// Near the full keyspace most rejections are genuine duplicates, but
/// with a Bloom filter false positives also count here and can throttle
/// throughput well before that.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateRateMonitor {
    threshold: f64,
    warned: bool,
}

impl DuplicateRateMonitor {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            warned: false,
        }
    }

    /// Returns `true` when the warning was emitted by this call.
    pub fn check(&mut self, counters: &GenerationCounters) -> bool {
        if self.warned || counters.generated() < MIN_SAMPLE {
            return false;
        }
        let ratio = counters.rejection_ratio();
        if ratio <= self.threshold {
            return false;
        }
        self.warned = true;
        warn!(
            rejection_ratio = ratio,
            threshold = self.threshold,
            "probabilistic filter is rejecting most candidates; false positives may be limiting throughput"
        );
        true
    }
}

pub struct Reporter<O: ProgressObserver> {
    feed: Arc<ProgressFeed>,
    shutdown: ShutdownSignal,
    counters: Arc<GenerationCounters>,
    monitor: Option<DuplicateRateMonitor>,
    tick: Duration,
    observer: O,
}

impl<O: ProgressObserver> Reporter<O> {
    pub fn new(
        feed: Arc<ProgressFeed>,
        shutdown: ShutdownSignal,
        counters: Arc<GenerationCounters>,
        tick: Duration,
        observer: O,
    ) -> Self {
        Self {
            feed,
            shutdown,
            counters,
            monitor: None,
            tick,
            observer,
        }
    }

    pub fn with_monitor(mut self, monitor: DuplicateRateMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    fn stopped_early(&self) -> bool {
        self.feed.is_failed()
            || matches!(
                self.shutdown.reason(),
                Some(ShutdownReason::Interrupted | ShutdownReason::Failed)
            )
    }

    /// Runs the loop on the current thread and returns the observer.
    pub fn run(mut self) -> O {
        loop {
            // read the flag first so the final snapshot is the complete one
            let ready = self.feed.is_ready();
            let progress = self.feed.snapshot();
            self.observer.on_progress(&progress);

            if ready {
                self.observer.on_finished(&progress);
                break;
            }
            if self.stopped_early() {
                break;
            }
            if let Some(monitor) = self.monitor.as_mut() {
                monitor.check(&self.counters);
            }
            thread::sleep(self.tick);
        }
        self.observer
    }

    pub fn spawn(self) -> std::io::Result<JoinHandle<O>> {
        thread::Builder::new()
            .name("codegen-reporter".into())
            .spawn(move || self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recording {
        updates: Vec<Progress>,
        finished: Option<Progress>,
    }

    impl ProgressObserver for Recording {
        fn on_progress(&mut self, progress: &Progress) {
            self.updates.push(*progress);
        }

        fn on_finished(&mut self, progress: &Progress) {
            self.finished = Some(*progress);
        }
    }

    fn reporter(feed: &Arc<ProgressFeed>, shutdown: &ShutdownSignal) -> Reporter<Recording> {
        Reporter::new(
            Arc::clone(feed),
            shutdown.clone(),
            Arc::default(),
            Duration::from_millis(5),
            Recording::default(),
        )
    }

    #[test]
    fn reports_until_ready() {
        let feed = Arc::new(ProgressFeed::new(4));
        let shutdown = ShutdownSignal::new();
        let handle = reporter(&feed, &shutdown).spawn().unwrap();

        for completed in 1..=4 {
            feed.record(completed, Some(Duration::from_millis(10 * (4 - completed))));
            thread::sleep(Duration::from_millis(10));
        }
        shutdown.fire(ShutdownReason::Completed);
        feed.mark_ready();

        let recording = handle.join().unwrap();
        let finished = recording.finished.expect("finished callback");
        assert_eq!(finished.completed, 4);
        assert_eq!(finished.percent(), 100.0);
        assert!(recording
            .updates
            .windows(2)
            .all(|w| w[0].percent() <= w[1].percent()));
    }

    #[test]
    fn stops_without_finishing_on_interrupt() {
        let feed = Arc::new(ProgressFeed::new(10));
        let shutdown = ShutdownSignal::new();
        let handle = reporter(&feed, &shutdown).spawn().unwrap();

        feed.record(3, None);
        shutdown.fire(ShutdownReason::Interrupted);

        let recording = handle.join().unwrap();
        assert!(recording.finished.is_none());
        assert!(!recording.updates.is_empty());
    }

    #[test]
    fn stops_without_finishing_when_flush_fails_after_completion() {
        let feed = Arc::new(ProgressFeed::new(2));
        let shutdown = ShutdownSignal::new();
        feed.record(2, Some(Duration::ZERO));
        // the consumer claimed completion, then its flush failed
        shutdown.fire(ShutdownReason::Completed);
        let handle = reporter(&feed, &shutdown).spawn().unwrap();
        thread::sleep(Duration::from_millis(20));
        feed.mark_failed();

        let recording = handle.join().unwrap();
        assert!(recording.finished.is_none());
        assert!(!feed.is_ready());
    }

    #[test]
    fn monitor_waits_for_a_sample_and_warns_once() {
        let counters = GenerationCounters::default();
        let mut monitor = DuplicateRateMonitor::new(0.5);

        counters.publish(1_000, 900);
        assert!(!monitor.check(&counters));

        counters.publish(MIN_SAMPLE, MIN_SAMPLE);
        assert!(monitor.check(&counters));
        assert!(!monitor.check(&counters));
    }

    #[test]
    fn monitor_ignores_healthy_ratio() {
        let counters = GenerationCounters::default();
        let mut monitor = DuplicateRateMonitor::new(0.5);
        counters.publish(MIN_SAMPLE * 2, MIN_SAMPLE / 10);
        assert!(!monitor.check(&counters));
    }
}
