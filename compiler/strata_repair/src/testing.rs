//! Scripted decoders and closure validators for exercising the loop
//! without a model.

use std::collections::VecDeque;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use strata_diagnostic::Diagnostics;

use crate::{
    DecodeError, DecodeRequest, Decoded, Decoder, ValidationRequest, Validator, ValidatorKind,
};

/// What a [`ScriptedDecoder`] saw on one call.
#[derive(Clone, Debug, PartialEq)]
pub struct SeenRequest {
    pub attempt: u32,
    pub lark: String,
    /// Rendered paths per hole, in rank order.
    pub holes: Vec<(String, Vec<String>)>,
}

/// Replays queued results in order. Runs out as `DecodeError::Failed`.
#[derive(Default)]
pub struct ScriptedDecoder {
    script: Mutex<VecDeque<(Duration, Result<Decoded, DecodeError>)>>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl ScriptedDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn then(self, decoded: Decoded) -> Self {
        self.script.lock().push_back((Duration::ZERO, Ok(decoded)));
        self
    }

    #[must_use]
    pub fn then_err(self, err: DecodeError) -> Self {
        self.script.lock().push_back((Duration::ZERO, Err(err)));
        self
    }

    /// Return `decoded` only after sleeping `delay`.
    #[must_use]
    pub fn then_after(self, delay: Duration, decoded: Decoded) -> Self {
        self.script.lock().push_back((delay, Ok(decoded)));
        self
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().clone()
    }
}

impl Decoder for ScriptedDecoder {
    fn decode(&self, request: &DecodeRequest<'_>) -> Result<Decoded, DecodeError> {
        let composition = request.composition;
        self.seen.lock().push(SeenRequest {
            attempt: request.attempt,
            lark: composition.lark(),
            holes: composition
                .holes
                .iter()
                .map(|(hole, paths)| {
                    (hole.clone(), paths.iter().map(ToString::to_string).collect())
                })
                .collect(),
        });

        let next = self.script.lock().pop_front();
        let Some((delay, result)) = next else {
            return Err(DecodeError::Failed("script exhausted".to_owned()));
        };
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        result
    }
}

type Check = dyn Fn(&ValidationRequest) -> Diagnostics + Send + Sync;

/// A validator backed by a closure.
pub struct FnValidator {
    name: String,
    kind: ValidatorKind,
    check: Box<Check>,
}

impl FnValidator {
    pub fn new(
        name: impl Into<String>,
        kind: ValidatorKind,
        check: impl Fn(&ValidationRequest) -> Diagnostics + Send + Sync + 'static,
    ) -> Self {
        FnValidator {
            name: name.into(),
            kind,
            check: Box::new(check),
        }
    }

    /// A validator that never reports anything.
    pub fn passing(name: impl Into<String>, kind: ValidatorKind) -> Self {
        Self::new(name, kind, |_| Diagnostics::new())
    }

    /// A validator that sleeps for `delay` and reports nothing.
    pub fn sleeping(name: impl Into<String>, kind: ValidatorKind, delay: Duration) -> Self {
        Self::new(name, kind, move |_| {
            thread::sleep(delay);
            Diagnostics::new()
        })
    }
}

impl Validator for FnValidator {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ValidatorKind {
        self.kind
    }

    fn validate(&self, request: &ValidationRequest) -> Diagnostics {
        (self.check)(request)
    }
}
