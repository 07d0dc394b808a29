//! Producer threads.
//!
//! Every worker owns a [`Generator`] and shares the duplicate filter, the
//! dispatcher and the shutdown signal with its siblings. A worker never
//! reports an error; it only stops, either because the signal fired or
//! because the consumer went away.

use crate::channel::{Dispatcher, SendError};
use crate::error::{PipelineError, Result};
use crate::shutdown::ShutdownSignal;
use codegen_core::Code;
use codegen_filter::DuplicateFilter;
use codegen_generator::Generator;
use std::ops::AddAssign;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{trace, warn};

/// Local counters are folded into the shared ones this often.
const PUBLISH_EVERY: u64 = 1_024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Running,
    Stopped,
}

/// What a worker (or the whole pool) did during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Candidates produced by the generator.
    pub generated: u64,
    /// Candidates the filter reported as already seen.
    pub rejected: u64,
    /// Codes handed to the consumer.
    pub delivered: u64,
}

impl AddAssign for WorkerStats {
    fn add_assign(&mut self, rhs: Self) {
        self.generated += rhs.generated;
        self.rejected += rhs.rejected;
        self.delivered += rhs.delivered;
    }
}

/// Pool-wide candidate counters, read by the reporting loop.
#[derive(Debug, Default)]
pub struct GenerationCounters {
    generated: AtomicU64,
    rejected: AtomicU64,
}

impl GenerationCounters {
    pub(crate) fn publish(&self, generated: u64, rejected: u64) {
        self.generated.fetch_add(generated, Ordering::Relaxed);
        self.rejected.fetch_add(rejected, Ordering::Relaxed);
    }

    pub fn generated(&self) -> u64 {
        self.generated.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Share of candidates rejected as duplicates so far.
    pub fn rejection_ratio(&self) -> f64 {
        let generated = self.generated();
        if generated == 0 {
            return 0.0;
        }
        self.rejected() as f64 / generated as f64
    }
}

pub struct Worker<G: Generator> {
    id: usize,
    generator: G,
    filter: Arc<dyn DuplicateFilter>,
    dispatcher: Dispatcher,
    shutdown: ShutdownSignal,
    counters: Arc<GenerationCounters>,
    stats: WorkerStats,
    unpublished: WorkerStats,
}

impl<G: Generator> Worker<G> {
    pub fn new(
        id: usize,
        generator: G,
        filter: Arc<dyn DuplicateFilter>,
        dispatcher: Dispatcher,
        shutdown: ShutdownSignal,
        counters: Arc<GenerationCounters>,
    ) -> Self {
        Self {
            id,
            generator,
            filter,
            dispatcher,
            shutdown,
            counters,
            stats: WorkerStats::default(),
            unpublished: WorkerStats::default(),
        }
    }

    /// One generation attempt.
    pub fn step(&mut self) -> WorkerState {
        if self.shutdown.is_fired() {
            return WorkerState::Stopped;
        }

        let candidate = self.generator.generate();
        self.unpublished.generated += 1;

        if !self.filter.test_and_insert(candidate) {
            self.unpublished.rejected += 1;
            self.maybe_publish();
            return WorkerState::Running;
        }

        // only winners are copied out of the generator
        let code = Code::new_unchecked(candidate);
        let state = match self.dispatcher.send(code, &self.shutdown) {
            Ok(()) => {
                self.unpublished.delivered += 1;
                WorkerState::Running
            }
            Err(SendError::Shutdown) => WorkerState::Stopped,
            Err(SendError::Disconnected) => {
                trace!(worker = self.id, "consumer gone, stopping");
                WorkerState::Stopped
            }
        };
        self.maybe_publish();
        state
    }

    fn maybe_publish(&mut self) {
        if self.unpublished.generated >= PUBLISH_EVERY {
            self.publish();
        }
    }

    fn publish(&mut self) {
        let batch = std::mem::take(&mut self.unpublished);
        self.counters.publish(batch.generated, batch.rejected);
        self.stats += batch;
    }

    /// Runs until the worker stops and returns its totals.
    pub fn run(mut self) -> WorkerStats {
        trace!(worker = self.id, "worker started");
        while self.step() == WorkerState::Running {}
        self.publish();
        trace!(worker = self.id, generated = self.stats.generated, "worker stopped");
        self.stats
    }
}

/// The fixed set of worker threads of one run.
pub struct WorkerPool {
    handles: Vec<JoinHandle<WorkerStats>>,
}

impl WorkerPool {
    /// Spawns `size` workers, building each one's generator with
    /// `make_generator(worker_id)`.
    ///
    /// # Errors
    ///
    /// If a thread cannot be spawned the signal is fired with
    /// [`ShutdownReason::Failed`](crate::ShutdownReason::Failed), the
    /// workers already running are joined, and the spawn error is returned.
    pub fn spawn<G, F>(
        size: usize,
        mut make_generator: F,
        filter: Arc<dyn DuplicateFilter>,
        dispatcher: Dispatcher,
        shutdown: ShutdownSignal,
        counters: Arc<GenerationCounters>,
    ) -> Result<Self>
    where
        G: Generator,
        F: FnMut(usize) -> G,
    {
        let mut pool = Self {
            handles: Vec::with_capacity(size),
        };

        for id in 0..size {
            let worker = Worker::new(
                id,
                make_generator(id),
                Arc::clone(&filter),
                dispatcher.clone(),
                shutdown.clone(),
                Arc::clone(&counters),
            );
            let spawned = thread::Builder::new()
                .name(format!("codegen-worker-{id}"))
                .spawn(move || worker.run());

            match spawned {
                Ok(handle) => pool.handles.push(handle),
                Err(source) => {
                    shutdown.fire(crate::ShutdownReason::Failed);
                    pool.join();
                    return Err(PipelineError::Spawn {
                        role: "worker",
                        source,
                    });
                }
            }
        }

        Ok(pool)
    }

    /// Waits for every worker and sums their stats.
    ///
    /// Callers fire the shutdown signal first; a panicked worker is logged
    /// and left out of the totals.
    pub fn join(self) -> WorkerStats {
        let mut total = WorkerStats::default();
        for (id, handle) in self.handles.into_iter().enumerate() {
            match handle.join() {
                Ok(stats) => total += stats,
                Err(_) => warn!(worker = id, "worker thread panicked"),
            }
        }
        total
    }
}
