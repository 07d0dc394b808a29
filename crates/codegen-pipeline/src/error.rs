use codegen_core::RequestError;
use codegen_filter::FilterError;
use std::io;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Fatal conditions of a generation run.
///
/// Workers never produce these; they only stop. The consumer and the
/// control thread are the only places a run can fail.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    Request(#[from] RequestError),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(
        "no new code after {attempts} candidates over {waited:?}; {completed} of {target} codes written"
    )]
    Stalled {
        completed: u64,
        target: u64,
        attempts: u64,
        waited: Duration,
    },
    #[error("every worker stopped after {completed} of {target} codes")]
    WorkersExhausted { completed: u64, target: u64 },
    #[error("failed to write codes: {0}")]
    Sink(#[source] io::Error),
    #[error("failed to spawn {role} thread: {source}")]
    Spawn {
        role: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("{0} thread panicked")]
    Panicked(&'static str),
    #[error("failed to install interrupt handler: {0}")]
    Interrupt(#[from] ctrlc::Error),
}
