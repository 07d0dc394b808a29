//! Bounded fan-in from the worker pool to the single consumer.
//!
//! Both ends block: a worker when the queue is full, the consumer when it
//! is empty. Each blocking call also watches the [`ShutdownSignal`], so a
//! parked thread wakes as soon as the run ends.

use crate::shutdown::ShutdownSignal;
use codegen_core::Code;
use crossbeam_channel::{select, Receiver, Sender};
use std::time::Duration;

/// Creates a dispatch channel holding at most `capacity` codes.
pub fn dispatch_channel(capacity: usize) -> (Dispatcher, Collector) {
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    (Dispatcher { tx }, Collector { rx })
}

/// Why a send did not deliver its code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// The shutdown signal fired while waiting for space.
    Shutdown,
    /// The consumer is gone.
    Disconnected,
}

/// Producer end, cloned into every worker.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    tx: Sender<Code>,
}

impl Dispatcher {
    /// Sends `code`, blocking while the channel is full.
    pub fn send(&self, code: Code, shutdown: &ShutdownSignal) -> Result<(), SendError> {
        select! {
            send(self.tx, code) -> res => res.map_err(|_| SendError::Disconnected),
            recv(shutdown.watch()) -> _ => Err(SendError::Shutdown),
        }
    }
}

/// Result of waiting for the next code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    Code(Code),
    /// The shutdown signal fired.
    Shutdown,
    /// Nothing arrived within the stall timeout.
    Stalled,
    /// Every dispatcher was dropped.
    Disconnected,
}

/// Consumer end. Not cloneable: there is exactly one reader.
#[derive(Debug)]
pub struct Collector {
    rx: Receiver<Code>,
}

impl Collector {
    /// Waits up to `stall_timeout` for the next code.
    pub fn recv(&self, shutdown: &ShutdownSignal, stall_timeout: Duration) -> Received {
        if shutdown.is_fired() {
            return Received::Shutdown;
        }
        select! {
            recv(self.rx) -> msg => match msg {
                Ok(code) => Received::Code(code),
                Err(_) => Received::Disconnected,
            },
            recv(shutdown.watch()) -> _ => Received::Shutdown,
            default(stall_timeout) => Received::Stalled,
        }
    }

    /// Number of codes waiting in the channel.
    pub fn backlog(&self) -> usize {
        self.rx.len()
    }
}
