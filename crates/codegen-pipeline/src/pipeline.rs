use crate::artifact::{Artifact, ArtifactStore};
use crate::cancel::{CancellationController, Interrupts, Resolution};
use crate::channel::dispatch_channel;
use crate::consumer::{Consumer, ConsumerOutcome};
use crate::error::{PipelineError, Result};
use crate::progress::ProgressFeed;
use crate::reporter::{DuplicateRateMonitor, ProgressObserver, Reporter};
use crate::shutdown::{ShutdownReason, ShutdownSignal};
use crate::worker::{GenerationCounters, WorkerPool, WorkerStats};
use codegen_core::GenerationRequest;
use codegen_filter::{build_filter, FilterKind};
use codegen_generator::{Generator, RandomCodeGenerator};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use typed_builder::TypedBuilder;

pub const DEFAULT_WORKERS: usize = 500;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 500;
pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_STALL_ATTEMPT_FACTOR: u64 = 20;
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);
pub const DEFAULT_DUPLICATE_WARN_RATIO: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct PipelineConfig {
    /// Number of producer threads.
    #[builder(default = DEFAULT_WORKERS)]
    pub workers: usize,
    #[builder(default = DEFAULT_CHANNEL_CAPACITY)]
    pub channel_capacity: usize,
    #[builder(default)]
    pub filter: FilterKind,
    /// How long the consumer waits for a code before checking whether
    /// the run is stuck.
    #[builder(default = DEFAULT_STALL_TIMEOUT)]
    pub stall_timeout: Duration,
    /// A run is stuck once the workers drew this many times the keyspace
    /// size in candidates without finding a new code.
    #[builder(default = DEFAULT_STALL_ATTEMPT_FACTOR)]
    pub stall_attempt_factor: u64,
    /// Interval between progress snapshots.
    #[builder(default = DEFAULT_TICK)]
    pub tick: Duration,
    /// Rejection share above which a probabilistic filter is reported.
    #[builder(default = DEFAULT_DUPLICATE_WARN_RATIO)]
    pub duplicate_warn_ratio: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Code lines written to the output.
    pub written: u64,
    pub elapsed: Duration,
    pub stats: WorkerStats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every code was written and flushed to `path`.
    Completed { path: PathBuf, summary: RunSummary },
    /// The run was interrupted and the partial output discarded.
    Interrupted { summary: RunSummary },
}

impl RunOutcome {
    pub fn summary(&self) -> &RunSummary {
        match self {
            RunOutcome::Completed { summary, .. } | RunOutcome::Interrupted { summary } => summary,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }
}

/// Runs one generation request end to end.
///
/// A run owns a worker pool, a consumer thread, a reporting thread and the
/// calling thread, which acts as the control thread. Nothing is shared
/// between runs.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Generates `request.target_count` random codes into `out`.
    ///
    /// `out` must write to the file behind `artifact`; the artifact is
    /// discarded whenever the run does not complete.
    pub fn run<W, S, O>(
        &self,
        request: &GenerationRequest,
        out: W,
        artifact: Artifact<S>,
        interrupts: Interrupts,
        observer: O,
    ) -> Result<RunOutcome>
    where
        W: Write + Send + 'static,
        S: ArtifactStore,
        O: ProgressObserver,
    {
        self.run_with(
            request,
            |_| RandomCodeGenerator::for_request(request),
            out,
            artifact,
            interrupts,
            observer,
        )
    }

    /// Like [`Pipeline::run`], with `make_generator(worker_id)` building each
    /// worker's candidate source.
    pub fn run_with<G, F, W, S, O>(
        &self,
        request: &GenerationRequest,
        make_generator: F,
        out: W,
        artifact: Artifact<S>,
        interrupts: Interrupts,
        observer: O,
    ) -> Result<RunOutcome>
    where
        G: Generator,
        F: FnMut(usize) -> G,
        W: Write + Send + 'static,
        S: ArtifactStore,
        O: ProgressObserver,
    {
        let started = Instant::now();

        let filter = match request
            .validate()
            .map_err(PipelineError::from)
            .and_then(|()| Ok(build_filter(self.config.filter, request.target_count)?))
        {
            Ok(filter) => filter,
            Err(e) => {
                drop(out);
                artifact.discard();
                return Err(e);
            }
        };

        info!(
            prefix = %request.prefix,
            digit_length = request.digit_length,
            target_count = request.target_count,
            workers = self.config.workers,
            filter = %self.config.filter,
            path = %artifact.path().display(),
            "starting code generation"
        );

        let shutdown = ShutdownSignal::new();
        let counters = Arc::new(GenerationCounters::default());
        let feed = Arc::new(ProgressFeed::new(request.target_count));
        let (dispatcher, collector) = dispatch_channel(self.config.channel_capacity);

        let workers = match WorkerPool::spawn(
            self.config.workers,
            make_generator,
            Arc::clone(&filter),
            dispatcher,
            shutdown.clone(),
            Arc::clone(&counters),
        ) {
            Ok(workers) => workers,
            Err(e) => {
                drop(out);
                artifact.discard();
                return Err(e);
            }
        };

        let consumer = Consumer::new(
            out,
            request.line_numbers,
            Arc::clone(&feed),
            shutdown.clone(),
            self.config.stall_timeout,
        )
        .with_attempt_budget(
            Arc::clone(&counters),
            self.config
                .stall_attempt_factor
                .saturating_mul(request.possible_outcomes()),
        );
        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(0);
        let consumer = thread::Builder::new()
            .name("codegen-consumer".into())
            .spawn(move || {
                // disconnects the control thread's wait, also on panic
                let _done = done_tx;
                consumer.run(collector)
            });
        let consumer = match consumer {
            Ok(handle) => handle,
            Err(source) => {
                shutdown.fire(ShutdownReason::Failed);
                workers.join();
                artifact.discard();
                return Err(PipelineError::Spawn {
                    role: "consumer",
                    source,
                });
            }
        };

        let mut reporter = Reporter::new(
            Arc::clone(&feed),
            shutdown.clone(),
            Arc::clone(&counters),
            self.config.tick,
            observer,
        );
        if filter.is_probabilistic() {
            reporter = reporter.with_monitor(DuplicateRateMonitor::new(
                self.config.duplicate_warn_ratio,
            ));
        }
        let reporter = match reporter.spawn() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "failed to spawn reporter, continuing without progress");
                None
            }
        };

        let controller = CancellationController::new(shutdown, interrupts, artifact);
        let resolution = controller.resolve(consumer, done_rx, workers);

        if let Some(reporter) = reporter {
            if reporter.join().is_err() {
                warn!("reporter thread panicked");
            }
        }

        let Resolution { outcome, stats } = resolution?;
        let summary = RunSummary {
            written: outcome.written(),
            elapsed: started.elapsed(),
            stats,
        };

        match outcome {
            ConsumerOutcome::Completed { .. } => {
                info!(
                    written = summary.written,
                    generated = stats.generated,
                    rejected = stats.rejected,
                    elapsed = ?summary.elapsed,
                    "code generation completed"
                );
                Ok(RunOutcome::Completed {
                    path: controller.artifact().path().to_path_buf(),
                    summary,
                })
            }
            ConsumerOutcome::Interrupted { .. } => {
                info!(written = summary.written, "code generation interrupted");
                Ok(RunOutcome::Interrupted { summary })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.workers, 500);
        assert_eq!(config.channel_capacity, 500);
        assert_eq!(config.filter, FilterKind::Exact);
        assert_eq!(config.stall_timeout, Duration::from_secs(1));
        assert_eq!(config.stall_attempt_factor, 20);
        assert_eq!(config.tick, Duration::from_millis(100));
        assert_eq!(config.duplicate_warn_ratio, 0.5);
    }

    #[test]
    fn builder_overrides() {
        let config = PipelineConfig::builder()
            .workers(4)
            .filter(FilterKind::Bloom {
                false_positive_rate: 0.001,
            })
            .build();
        assert_eq!(config.workers, 4);
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert!(matches!(config.filter, FilterKind::Bloom { .. }));
    }
}
