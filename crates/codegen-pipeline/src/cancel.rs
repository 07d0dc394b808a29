//! Interrupt handling and the end-of-run decision.
//!
//! The controller waits for whichever comes first: an external interrupt
//! or the consumer finishing. Both paths race for the [`ShutdownSignal`];
//! only the winner acts on the output file, so the file is never both
//! kept and deleted.

use crate::artifact::{Artifact, ArtifactStore};
use crate::consumer::ConsumerOutcome;
use crate::error::{PipelineError, Result};
use crate::shutdown::{ShutdownReason, ShutdownSignal};
use crate::worker::{WorkerPool, WorkerStats};
use crossbeam_channel::{select, Receiver, Sender};
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

/// Source of external interrupt notifications.
#[derive(Debug, Clone)]
pub struct Interrupts {
    rx: Receiver<()>,
}

/// Sending half of [`Interrupts`], for embedding and tests.
#[derive(Debug, Clone)]
pub struct InterruptTrigger {
    tx: Sender<()>,
}

impl InterruptTrigger {
    pub fn trigger(&self) {
        // a pending interrupt is enough; extra ones are dropped
        let _ = self.tx.try_send(());
    }
}

impl Interrupts {
    /// Creates an interrupt source fed by the returned trigger.
    pub fn channel() -> (InterruptTrigger, Self) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        (InterruptTrigger { tx }, Self { rx })
    }

    /// Subscribes to SIGINT and SIGTERM (Ctrl+C on Windows).
    ///
    /// # Errors
    ///
    /// The process-wide handler can only be installed once.
    pub fn install() -> Result<Self> {
        let (trigger, interrupts) = Self::channel();
        ctrlc::set_handler(move || trigger.trigger())?;
        Ok(interrupts)
    }

    /// An interrupt source that never fires.
    pub fn never() -> Self {
        Self {
            rx: crossbeam_channel::never(),
        }
    }
}

/// Everything the control thread knows at the end of a run.
#[derive(Debug)]
pub struct Resolution {
    pub outcome: ConsumerOutcome,
    pub stats: WorkerStats,
}

pub struct CancellationController<S: ArtifactStore> {
    shutdown: ShutdownSignal,
    interrupts: Interrupts,
    artifact: Artifact<S>,
}

impl<S: ArtifactStore> CancellationController<S> {
    pub fn new(shutdown: ShutdownSignal, interrupts: Interrupts, artifact: Artifact<S>) -> Self {
        Self {
            shutdown,
            interrupts,
            artifact,
        }
    }

    pub fn artifact(&self) -> &Artifact<S> {
        &self.artifact
    }

    /// Waits for the run to end and applies the terminal file action.
    ///
    /// `done` disconnects when the consumer thread returns. On an
    /// interrupt or a failure every thread is joined, so the output handle
    /// is closed, before the partial artifact is discarded.
    pub fn resolve(
        &self,
        consumer: JoinHandle<Result<ConsumerOutcome>>,
        done: Receiver<()>,
        workers: WorkerPool,
    ) -> Result<Resolution> {
        let interrupted = select! {
            recv(self.interrupts.rx) -> msg => msg.is_ok(),
            recv(done) -> _ => false,
        };

        if interrupted {
            if self.shutdown.fire(ShutdownReason::Interrupted) {
                info!("interrupt received, stopping generation");
            } else {
                debug!(reason = ?self.shutdown.reason(), "interrupt arrived after the run ended");
            }
        }

        let result = consumer.join().map_err(|_| PipelineError::Panicked("consumer"));
        if self.shutdown.fire(ShutdownReason::Failed) {
            // the consumer returned without claiming the signal
            warn!("consumer exited without settling the run");
        }
        let stats = workers.join();

        match result.and_then(|r| r) {
            Ok(ConsumerOutcome::Completed { written }) => Ok(Resolution {
                outcome: ConsumerOutcome::Completed { written },
                stats,
            }),
            Ok(ConsumerOutcome::Interrupted { written }) => {
                self.artifact.discard();
                info!(written, "partial output discarded");
                Ok(Resolution {
                    outcome: ConsumerOutcome::Interrupted { written },
                    stats,
                })
            }
            Err(e) => {
                self.artifact.discard();
                Err(e)
            }
        }
    }
}
