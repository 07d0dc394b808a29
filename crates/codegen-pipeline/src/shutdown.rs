//! One-shot broadcast stop signal.
//!
//! The signal moves from armed to fired exactly once and never back. The
//! first caller of [`ShutdownSignal::fire`] wins and records why the run
//! ended. Every later call is a no-op that returns `false`, which makes
//! the signal the arbitration point between the normal completion path and
//! the interrupt path.
//!
//! Blocking operations observe the signal through [`ShutdownSignal::watch`],
//! a channel that never carries a message and disconnects when the signal
//! fires, so it can sit in a `select!` next to a send or a receive.

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const ARMED: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ShutdownReason {
    /// The consumer wrote every requested code.
    Completed = 1,
    /// An external interrupt arrived first.
    Interrupted = 2,
    /// The consumer hit a fatal error.
    Failed = 3,
}

impl ShutdownReason {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Completed),
            2 => Some(Self::Interrupted),
            3 => Some(Self::Failed),
            _ => None,
        }
    }
}

impl Display for ShutdownReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownReason::Completed => write!(f, "completed"),
            ShutdownReason::Interrupted => write!(f, "interrupted"),
            ShutdownReason::Failed => write!(f, "failed"),
        }
    }
}

struct Inner {
    state: AtomicU8,
    trigger: Mutex<Option<Sender<()>>>,
    watch: Receiver<()>,
}

/// Cloneable handle to a shared one-shot stop signal.
#[derive(Clone)]
pub struct ShutdownSignal {
    inner: Arc<Inner>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (trigger, watch) = crossbeam_channel::bounded(0);
        Self {
            inner: Arc::new(Inner {
                state: AtomicU8::new(ARMED),
                trigger: Mutex::new(Some(trigger)),
                watch,
            }),
        }
    }

    /// Fires the signal. Returns `true` only for the call that fired it.
    pub fn fire(&self, reason: ShutdownReason) -> bool {
        let won = self
            .inner
            .state
            .compare_exchange(ARMED, reason as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            // dropping the only sender wakes every select! on `watch`
            self.inner.trigger.lock().take();
        }
        won
    }

    pub fn is_fired(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) != ARMED
    }

    /// Why the signal fired, or `None` while still armed.
    pub fn reason(&self) -> Option<ShutdownReason> {
        ShutdownReason::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Receiver that becomes ready (disconnected) once the signal fires.
    pub fn watch(&self) -> &Receiver<()> {
        &self.inner.watch
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ShutdownSignal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownSignal")
            .field("reason", &self.reason())
            .finish()
    }
}
