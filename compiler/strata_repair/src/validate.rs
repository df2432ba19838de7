//! Validators and concurrent validation.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, RecvTimeoutError};
use strata_compose::ConstraintSet;
use strata_diagnostic::{validation_timeout, validator_crash, Diagnostics};

use crate::Provenance;

/// What a validator checks. Syntax validators run first and gate the rest.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValidatorKind {
    Syntax,
    Type,
    Semantic,
    Lint,
}

impl ValidatorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ValidatorKind::Syntax => "syntax",
            ValidatorKind::Type => "type",
            ValidatorKind::Semantic => "semantic",
            ValidatorKind::Lint => "lint",
        }
    }
}

impl fmt::Display for ValidatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a validator may look at.
#[derive(Clone, Debug)]
pub struct ValidationRequest {
    pub code: String,
    pub provenance: Vec<Provenance>,
    /// Active constraints; Semantic ones carry the examples to run.
    pub constraints: ConstraintSet,
}

/// External checker for generated code.
///
/// Validators run on the rayon pool. One that overruns the validation
/// timeout is abandoned and reported as a `validation-timeout` diagnostic;
/// its late result is dropped, but it keeps its pool worker until it
/// returns. A panicking validator is reported as `validator-crash`.
pub trait Validator: Send + Sync {
    fn name(&self) -> &str;
    fn kind(&self) -> ValidatorKind;
    fn validate(&self, request: &ValidationRequest) -> Diagnostics;
}

/// Run `validators` concurrently and merge their diagnostics in validator
/// order.
#[tracing::instrument(level = "debug", skip_all, fields(validators = validators.len()))]
pub fn run_validators(
    validators: &[Arc<dyn Validator>],
    request: &Arc<ValidationRequest>,
    timeout: Duration,
) -> Diagnostics {
    let (tx, rx) = channel::unbounded::<(usize, Result<Diagnostics, String>)>();
    for (i, validator) in validators.iter().enumerate() {
        let tx = tx.clone();
        let validator = Arc::clone(validator);
        let request = Arc::clone(request);
        rayon::spawn(move || {
            let found = panic::catch_unwind(AssertUnwindSafe(|| validator.validate(&request)))
                .map_err(|payload| panic_message(payload.as_ref()));
            // The receiver is gone once the deadline passed.
            let _ = tx.send((i, found));
        });
    }
    drop(tx);

    let deadline = Instant::now() + timeout;
    let mut results: Vec<Option<Result<Diagnostics, String>>> =
        validators.iter().map(|_| None).collect();
    let mut pending = validators.len();
    while pending > 0 {
        match rx.recv_deadline(deadline) {
            Ok((i, found)) => {
                results[i] = Some(found);
                pending -= 1;
            }
            Err(RecvTimeoutError::Timeout) => break,
            Err(RecvTimeoutError::Disconnected) => {
                tracing::error!(pending, "validator tasks vanished without reporting");
                break;
            }
        }
    }

    let mut merged = Diagnostics::new();
    for (validator, result) in validators.iter().zip(results) {
        match result {
            Some(Ok(found)) => merged.extend(found.into_vec()),
            Some(Err(message)) => {
                tracing::error!(validator = validator.name(), %message, "validator panicked");
                merged.push(validator_crash(validator.name(), &message));
            }
            None => {
                tracing::warn!(validator = validator.name(), "validator timed out");
                merged.push(validation_timeout(validator.name(), timeout));
            }
        }
    }
    merged
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "tests panic on failure")]
mod tests;
