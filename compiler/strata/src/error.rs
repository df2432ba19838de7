//! The engine's error type.

use strata_compose::ComposeError;
use strata_grammar::CompileError;
use strata_repair::RepairError;
use strata_solver::{NoInhabitantFound, SolveError};
use strata_types::SymbolError;
use thiserror::Error;

/// How far an error reaches.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Handled within the request by widening, relaxing or retrying.
    Recoverable,
    /// Ends the whole request. Only malformed grammars land here.
    Fatal,
}

/// Anything a synthesis request can fail with.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SynthesisError {
    #[error("symbol table rejected: {0}")]
    Symbol(#[from] SymbolError),

    #[error(transparent)]
    Solve(#[from] SolveError),

    #[error(transparent)]
    NoInhabitant(#[from] NoInhabitantFound),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    Repair(#[from] RepairError),
}

impl SynthesisError {
    pub fn class(&self) -> ErrorClass {
        match self {
            SynthesisError::Compile(CompileError::Invalid(_))
            | SynthesisError::Compose(ComposeError::Invalid(_))
            | SynthesisError::Repair(RepairError::Grammar(_)) => ErrorClass::Fatal,
            _ => ErrorClass::Recoverable,
        }
    }

    #[inline]
    pub fn is_fatal(&self) -> bool {
        self.class() == ErrorClass::Fatal
    }
}
