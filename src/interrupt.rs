//! Per-call deadlines and cooperative cancellation.
//!
//! Stores poll [`Interrupt::check`] between units of work. Nothing is mutated
//! during search, so aborting leaves no state to roll back.

use crate::error::{Result, SearchError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared flag a caller flips to abort in-flight searches.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct Interrupt {
    started: Instant,
    deadline: Option<Instant>,
    cancel: Option<CancelHandle>,
}

impl Interrupt {
    /// No deadline, not cancellable.
    pub fn none() -> Self {
        Self {
            started: Instant::now(),
            deadline: None,
            cancel: None,
        }
    }

    /// Deadline `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        let started = Instant::now();
        Self {
            started,
            deadline: started.checked_add(timeout),
            cancel: None,
        }
    }

    /// Optional deadline plus optional cancellation.
    pub fn new(timeout: Option<Duration>, cancel: Option<CancelHandle>) -> Self {
        let mut interrupt = match timeout {
            Some(timeout) => Self::with_timeout(timeout),
            None => Self::none(),
        };
        interrupt.cancel = cancel;
        interrupt
    }

    pub fn cancellable(mut self, handle: CancelHandle) -> Self {
        self.cancel = Some(handle);
        self
    }

    /// `Err(Cancelled)` or `Err(TimedOut)` once the call should stop.
    pub fn check(&self) -> Result<()> {
        if self.cancel.as_ref().is_some_and(CancelHandle::is_cancelled) {
            return Err(SearchError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            let now = Instant::now();
            if now >= deadline {
                return Err(SearchError::TimedOut {
                    elapsed_ms: now.duration_since(self.started).as_millis() as u64,
                });
            }
        }
        Ok(())
    }
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::none()
    }
}
