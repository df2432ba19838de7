//! Validation and repair for Strata.
//!
//! A repair run composes the active constraints, asks a [`Decoder`] for
//! code, and checks it with every registered [`Validator`]. Failures are
//! turned into constraint edits by the [`Refiner`] and the loop goes again,
//! up to [`RepairConfig::max_attempts`]. Running out of attempts still
//! returns the best code seen along with its diagnostics.
//!
//! The decoder and validators are external; [`testing`] has scripted
//! stand-ins.

mod decode;
mod error;
mod orchestrator;
mod refine;
mod state;
mod validate;

pub mod testing;

pub use decode::{DecodeRequest, Decoded, Decoder, Provenance};
pub use error::{DecodeError, RepairError};
pub use orchestrator::{
    Attempt, AttemptRank, Orchestrator, RepairConfig, RepairOutcome, RepairStatus,
};
pub use refine::{Edit, Exclusion, PathSearch, Refiner, SolverSearch};
pub use state::{RepairState, StateTrace, TraceEntry};
pub use validate::{run_validators, ValidationRequest, Validator, ValidatorKind};
