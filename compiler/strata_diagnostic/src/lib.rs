//! Diagnostics produced by validators and the repair loop.
//!
//! Every diagnostic has a [`Category`] that decides how repair reacts to it:
//!
//! - `Syntax`: short-circuits the rest of validation for the attempt
//! - `Type`: narrows the Type constraint on the implicated hole
//! - `Test`: becomes a new Semantic example
//! - `Lint`: soft, only lowers the attempt's score
//! - `DecodeTimeout` / `ValidationTimeout`: distinguished failures
//! - `ValidatorCrash`: a validator panicked; never reported as a timeout
//! - `Conflict`: constraint tiers could not be composed

mod collection;
mod diagnostic;

pub use collection::{Diagnostics, Summary};
pub use diagnostic::{
    conflict, decode_timeout, lint, syntax_error, test_failure, type_mismatch,
    validation_timeout, validator_crash, Category, Diagnostic, Severity, TestCase,
};
