//! Repair loop states.
//!
//! ```text
//! Generated ─► Validating ─► Passed
//!                   │
//!                   ▼
//!              Failed(category) ─► Refining ─► Regenerating ─► Generated ...
//!                   │
//!                   ▼ (attempts used up)
//!               Exhausted
//! ```
//!
//! `Cancelled` is entered between attempts when the caller gives up.

use std::fmt;

use strata_diagnostic::Category;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RepairState {
    /// Code arrived from the decoder.
    Generated,
    Validating,
    Passed,
    /// A hard diagnostic of this category failed the attempt.
    Failed(Category),
    /// Turning diagnostics into constraint edits.
    Refining,
    /// Composing and decoding again.
    Regenerating,
    Exhausted,
    Cancelled,
}

impl RepairState {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RepairState::Passed | RepairState::Exhausted | RepairState::Cancelled
        )
    }

    /// Whether the loop may move from `self` to `next`.
    pub fn can_transition(self, next: RepairState) -> bool {
        use RepairState::{
            Cancelled, Exhausted, Failed, Generated, Passed, Refining, Regenerating, Validating,
        };
        match (self, next) {
            (Generated, Validating)
            | (Validating, Passed | Failed(_))
            | (Failed(_), Refining | Exhausted | Cancelled)
            | (Refining, Regenerating)
            | (Regenerating, Generated | Failed(_) | Cancelled) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RepairState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepairState::Generated => f.write_str("generated"),
            RepairState::Validating => f.write_str("validating"),
            RepairState::Passed => f.write_str("passed"),
            RepairState::Failed(category) => write!(f, "failed({category})"),
            RepairState::Refining => f.write_str("refining"),
            RepairState::Regenerating => f.write_str("regenerating"),
            RepairState::Exhausted => f.write_str("exhausted"),
            RepairState::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// One recorded transition target.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TraceEntry {
    pub attempt: u32,
    pub state: RepairState,
}

/// Audit trail of a repair run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StateTrace {
    entries: Vec<TraceEntry>,
}

impl StateTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record entering `state`.
    ///
    /// An illegal transition is a bug in the loop; it is logged and recorded
    /// anyway so the trail stays complete.
    pub fn enter(&mut self, attempt: u32, state: RepairState) {
        if let Some(last) = self.current() {
            if !last.can_transition(state) {
                tracing::error!(%last, next = %state, attempt, "illegal repair transition");
            }
        }
        tracing::debug!(attempt, %state, "repair state");
        self.entries.push(TraceEntry { attempt, state });
    }

    pub fn current(&self) -> Option<RepairState> {
        self.entries.last().map(|e| e.state)
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn states(&self) -> impl Iterator<Item = RepairState> + '_ {
        self.entries.iter().map(|e| e.state)
    }
}

impl fmt::Display for StateTrace {
    /// `1:generated -> 1:validating -> ...`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{}:{}", entry.attempt, entry.state)?;
        }
        Ok(())
    }
}
