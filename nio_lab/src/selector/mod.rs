//! Multi-port readiness loop.
//!
//! One [`Selector`] owns several listening sockets and every connection they
//! accept, all registered with a single `mio::Poll`. Each connection cycles
//! between read readiness (fill its buffer from the socket) and write
//! readiness (drain its buffer into the shared sink).

mod connection;
#[allow(clippy::module_inception)]
pub mod selector;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use mio::Waker;

use crate::error::Result;

pub use selector::Selector;

/// Counters accumulated by a [`Selector`] since it was bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectorStats {
    pub accepted: u64,
    pub closed: u64,
    pub reads: u64,
    pub writes: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
}

/// Stops a running [`Selector`] from another thread.
#[derive(Clone)]
pub struct SelectorHandle {
    shutdown: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl SelectorHandle {
    pub(crate) fn new(shutdown: Arc<AtomicBool>, waker: Arc<Waker>) -> Self {
        Self { shutdown, waker }
    }

    /// Asks the loop to stop and interrupts its blocking wait.
    pub fn shutdown(&self) -> Result<()> {
        self.shutdown.store(true, Ordering::Release);
        self.waker.wake()?;
        Ok(())
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}
