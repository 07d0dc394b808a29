//! Progress accounting shared between the consumer and the reporting loop.
//!
//! The consumer is the only writer; the reporter only takes snapshots.
//! All fields are atomics so neither side takes a lock.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

const UNKNOWN: u64 = u64::MAX;

/// Estimates the time left from the average time per accepted code.
///
/// Returns `None` until at least one code has been accepted. No smoothing
/// is applied, so early estimates can swing widely.
pub fn estimate_remaining(elapsed: Duration, completed: u64, remaining: u64) -> Option<Duration> {
    if completed == 0 {
        return None;
    }
    let per_item = elapsed.as_nanos() / u128::from(completed);
    let total = per_item.saturating_mul(u128::from(remaining));
    Some(Duration::from_nanos(u64::try_from(total).unwrap_or(u64::MAX)))
}

/// Clock-bound wrapper around [`estimate_remaining`].
#[derive(Debug, Clone, Copy)]
pub struct ProgressEstimator {
    started: Instant,
}

impl ProgressEstimator {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn estimate(&self, completed: u64, target: u64) -> Option<Duration> {
        estimate_remaining(self.elapsed(), completed, target.saturating_sub(completed))
    }
}

/// A point-in-time view of the run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub completed: u64,
    pub target: u64,
    pub remaining: Option<Duration>,
}

impl Progress {
    /// Share of the target written so far, exactly `100.0` once complete.
    pub fn percent(&self) -> f64 {
        if self.target == 0 {
            return 100.0;
        }
        self.completed as f64 / self.target as f64 * 100.0
    }

    pub fn is_complete(&self) -> bool {
        self.completed >= self.target
    }
}

/// Live progress feed written by the consumer.
#[derive(Debug)]
pub struct ProgressFeed {
    target: u64,
    completed: AtomicU64,
    remaining_nanos: AtomicU64,
    ready: AtomicBool,
    failed: AtomicBool,
}

impl ProgressFeed {
    pub fn new(target: u64) -> Self {
        Self {
            target,
            completed: AtomicU64::new(0),
            remaining_nanos: AtomicU64::new(UNKNOWN),
            ready: AtomicBool::new(false),
            failed: AtomicBool::new(false),
        }
    }

    pub fn target(&self) -> u64 {
        self.target
    }

    /// Publishes the count of written codes and the fresh estimate.
    pub fn record(&self, completed: u64, remaining: Option<Duration>) {
        let nanos = remaining.map_or(UNKNOWN, |d| {
            u64::try_from(d.as_nanos()).unwrap_or(UNKNOWN - 1)
        });
        self.remaining_nanos.store(nanos, Ordering::Relaxed);
        self.completed.store(completed, Ordering::Release);
    }

    pub fn snapshot(&self) -> Progress {
        let completed = self.completed.load(Ordering::Acquire);
        let nanos = self.remaining_nanos.load(Ordering::Relaxed);
        Progress {
            completed,
            target: self.target,
            remaining: (nanos != UNKNOWN).then(|| Duration::from_nanos(nanos)),
        }
    }

    /// Flips the ready flag. Returns `true` only the first time.
    pub fn mark_ready(&self) -> bool {
        !self.ready.swap(true, Ordering::AcqRel)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn mark_failed(&self) {
        self.failed.store(true, Ordering::Release);
    }

    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }
}
