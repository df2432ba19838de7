//! Cooperative cancellation for long-running searches.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::SolveError;

/// Shared cancel flag plus an optional deadline.
///
/// Clones share the flag, so the caller keeps one handle and gives another
/// to the search. The solver polls it at every recursive expansion.
#[derive(Clone, Debug, Default)]
pub struct Interrupt {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interrupt that trips at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Interrupt {
            cancelled: Arc::default(),
            deadline: Some(deadline),
        }
    }

    /// Interrupt that trips `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Request cancellation. Visible to every clone.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    #[inline]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Check the flag and the deadline.
    ///
    /// `expansions` is only used to annotate the deadline error.
    pub fn check(&self, expansions: u64) -> Result<(), SolveError> {
        if self.is_cancelled() {
            return Err(SolveError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Err(SolveError::DeadlineExceeded { expansions })
            }
            _ => Ok(()),
        }
    }
}
