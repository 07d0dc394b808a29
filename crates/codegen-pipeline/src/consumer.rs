use crate::channel::{Collector, Received};
use crate::error::{PipelineError, Result};
use crate::progress::{ProgressEstimator, ProgressFeed};
use crate::shutdown::{ShutdownReason, ShutdownSignal};
use crate::worker::GenerationCounters;
use codegen_core::{write_code_line, Header};
use jiff::Zoned;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// How the consumer loop ended without a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerOutcome {
    /// Every requested code was written and flushed.
    Completed { written: u64 },
    /// The run was interrupted; the output was not flushed.
    Interrupted { written: u64 },
}

impl ConsumerOutcome {
    pub fn written(&self) -> u64 {
        match self {
            ConsumerOutcome::Completed { written } | ConsumerOutcome::Interrupted { written } => {
                *written
            }
        }
    }
}

/// Candidates the workers may draw between two accepted codes before a
/// quiet channel counts as a stall.
struct AttemptBudget {
    counters: Arc<GenerationCounters>,
    max_attempts: u64,
}

/// The single reader of the dispatch channel and sole owner of the output.
pub struct Consumer<W: Write> {
    out: W,
    target: u64,
    line_numbers: bool,
    feed: Arc<ProgressFeed>,
    shutdown: ShutdownSignal,
    stall_timeout: Duration,
    budget: Option<AttemptBudget>,
}

impl<W: Write> Consumer<W> {
    pub fn new(
        out: W,
        line_numbers: bool,
        feed: Arc<ProgressFeed>,
        shutdown: ShutdownSignal,
        stall_timeout: Duration,
    ) -> Self {
        Self {
            out,
            target: feed.target(),
            line_numbers,
            feed,
            shutdown,
            stall_timeout,
            budget: None,
        }
    }

    /// Keeps waiting past `stall_timeout` while the workers have drawn at
    /// most `max_attempts` candidates since the last accepted code.
    ///
    /// Without a budget the first quiet `stall_timeout` is fatal. With one,
    /// `stall_timeout` only sets how often the budget is checked, so a
    /// full keyspace run may spend as long as it needs on its last codes.
    pub fn with_attempt_budget(
        mut self,
        counters: Arc<GenerationCounters>,
        max_attempts: u64,
    ) -> Self {
        self.budget = Some(AttemptBudget {
            counters,
            max_attempts,
        });
        self
    }

    fn attempts(&self) -> u64 {
        self.budget.as_ref().map_or(0, |b| b.counters.generated())
    }

    /// Writes the header and then exactly `target` codes.
    ///
    /// On success the consumer claims the shutdown signal with
    /// [`ShutdownReason::Completed`], which stops the workers, and only
    /// then flushes. If an interrupt claimed the signal first, the output is
    /// dropped unflushed and `Interrupted` is returned.
    pub fn run(mut self, collector: Collector) -> Result<ConsumerOutcome> {
        self.write_header()?;

        let estimator = ProgressEstimator::start();
        let mut written = 0_u64;
        let mut last_code = Instant::now();
        let mut attempts_mark = self.attempts();

        while written < self.target {
            match collector.recv(&self.shutdown, self.stall_timeout) {
                Received::Code(code) => {
                    if let Err(e) =
                        write_code_line(&mut self.out, written + 1, &code, self.line_numbers)
                    {
                        return Err(self.fail(PipelineError::Sink(e)));
                    }
                    written += 1;
                    last_code = Instant::now();
                    attempts_mark = self.attempts();
                    self.feed
                        .record(written, estimator.estimate(written, self.target));
                }
                Received::Shutdown => {
                    debug!(written, "consumer observed shutdown");
                    return Ok(ConsumerOutcome::Interrupted { written });
                }
                Received::Stalled => {
                    let attempts = self.attempts().saturating_sub(attempts_mark);
                    if let Some(budget) = &self.budget {
                        if attempts <= budget.max_attempts {
                            debug!(written, attempts, "still searching for the next code");
                            continue;
                        }
                    }
                    return Err(self.fail(PipelineError::Stalled {
                        completed: written,
                        target: self.target,
                        attempts,
                        waited: last_code.elapsed(),
                    }));
                }
                Received::Disconnected => {
                    return Err(self.fail(PipelineError::WorkersExhausted {
                        completed: written,
                        target: self.target,
                    }));
                }
            }
        }

        if !self.shutdown.fire(ShutdownReason::Completed) {
            debug!(written, "interrupt won the race against completion");
            return Ok(ConsumerOutcome::Interrupted { written });
        }

        if let Err(e) = self.out.flush() {
            return Err(self.fail(PipelineError::Sink(e)));
        }

        self.feed.mark_ready();
        debug!(written, elapsed = ?estimator.elapsed(), "all codes written");
        Ok(ConsumerOutcome::Completed { written })
    }

    fn write_header(&mut self) -> Result<()> {
        Header::new(self.target)
            .write_to(&Zoned::now(), &mut self.out)
            .map_err(|e| self.fail(PipelineError::Sink(e)))
    }

    fn fail(&self, err: PipelineError) -> PipelineError {
        error!(error = %err, "consumer failed");
        self.shutdown.fire(ShutdownReason::Failed);
        self.feed.mark_failed();
        err
    }
}
