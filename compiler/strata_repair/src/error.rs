//! Repair errors.

use std::time::Duration;

use strata_grammar::GrammarCompilationError;
use thiserror::Error;

/// Why the decoder produced no code.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The decoder gave up at the caller's timeout.
    #[error("decode timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The decoder failed for another reason (transport, refusal, ...).
    #[error("decode failed: {0}")]
    Failed(String),
}

/// Failures that end a repair run without an outcome.
///
/// Everything else (conflicts, timeouts, failed validation, running out of
/// attempts) is reported inside the outcome.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RepairError {
    #[error(transparent)]
    Grammar(#[from] GrammarCompilationError),

    #[error(transparent)]
    Decode(DecodeError),
}
