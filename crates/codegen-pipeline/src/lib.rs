//! Concurrent generation of unique codes into a single output file.
//!
//! A run is split over four kinds of threads:
//!
//! - a pool of workers, each generating candidates and claiming them in the
//!   shared duplicate filter before sending them on the dispatch channel;
//! - one consumer, the only owner of the output writer, which writes the
//!   header and exactly the requested number of lines;
//! - a reporter that periodically snapshots progress for an observer;
//! - the control thread, which waits for completion or an interrupt and
//!   decides whether the output is kept or discarded.
//!
//! Completion and interruption race for a single [`ShutdownSignal`]. The
//! winner decides the outcome, so a file is never flushed after an
//! interrupt was honored, nor deleted after it was completed.

pub mod artifact;
pub mod cancel;
pub mod channel;
pub mod consumer;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod reporter;
pub mod shutdown;
pub mod worker;

pub use artifact::{Artifact, ArtifactStore, FsArtifactStore};
pub use cancel::{CancellationController, InterruptTrigger, Interrupts};
pub use consumer::{Consumer, ConsumerOutcome};
pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, PipelineConfig, RunOutcome, RunSummary};
pub use progress::{estimate_remaining, Progress, ProgressEstimator, ProgressFeed};
pub use reporter::{DuplicateRateMonitor, ProgressObserver, Reporter, Silent};
pub use shutdown::{ShutdownReason, ShutdownSignal};
pub use worker::{GenerationCounters, WorkerPool, WorkerStats};
