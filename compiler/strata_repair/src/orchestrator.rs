//! The validate/repair loop.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use strata_compose::{ComposeError, Composer, Composition, ConstraintSet, Tier};
use strata_diagnostic::{decode_timeout, Category, Diagnostics, Summary};
use strata_solver::{Interrupt, SolveError, DEFAULT_MAX_DEPTH};

use crate::{
    run_validators, DecodeError, DecodeRequest, Decoded, Decoder, Exclusion, PathSearch,
    Provenance, Refiner, RepairError, RepairState, StateTrace, ValidationRequest, Validator,
    ValidatorKind,
};

/// Bounds for one repair run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepairConfig {
    /// Generation attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// How long validators of one phase may take together.
    pub validation_timeout: Duration,
    /// How long one decoder call may take.
    pub decode_timeout: Duration,
    /// Depth for re-searches during refinement.
    pub max_depth: u32,
    pub exclusion: Exclusion,
}

impl Default for RepairConfig {
    fn default() -> Self {
        RepairConfig {
            max_attempts: 3,
            validation_timeout: Duration::from_secs(10),
            decode_timeout: Duration::from_secs(30),
            max_depth: DEFAULT_MAX_DEPTH,
            exclusion: Exclusion::Offered,
        }
    }
}

/// One generation attempt.
#[derive(Clone, Debug)]
pub struct Attempt {
    /// 1-based.
    pub number: u32,
    /// `None` when nothing was decoded (conflict or decode timeout).
    pub code: Option<String>,
    pub provenance: Vec<Provenance>,
    pub diagnostics: Diagnostics,
    /// Scoring-function score of the provenance.
    pub score: f64,
    /// Tiers relaxed to make composition succeed.
    pub relaxed: Vec<Tier>,
}

impl Attempt {
    pub fn passed(&self) -> bool {
        self.code.is_some() && !self.diagnostics.has_hard()
    }

    /// Ordering key: attempts with code, then fewer hard errors, then fewer
    /// warnings, then higher score.
    pub fn rank(&self) -> AttemptRank {
        AttemptRank {
            has_code: self.code.is_some(),
            summary: self.diagnostics.summary(),
            score: self.score,
        }
    }
}

/// Comparable quality of an attempt. `Ordering::Less` means better.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AttemptRank {
    pub has_code: bool,
    pub summary: Summary,
    pub score: f64,
}

impl AttemptRank {
    pub fn compare(&self, other: &AttemptRank) -> Ordering {
        other
            .has_code
            .cmp(&self.has_code)
            .then(self.summary.hard.cmp(&other.summary.hard))
            .then(self.summary.warnings.cmp(&other.summary.warnings))
            .then(other.score.total_cmp(&self.score))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RepairStatus {
    Passed,
    /// Attempts ran out. The best attempt is still returned.
    Exhausted,
    Cancelled,
}

/// Result of a repair run.
#[derive(Clone, Debug)]
pub struct RepairOutcome {
    pub status: RepairStatus,
    /// Code of the best attempt. `None` only if no attempt decoded anything.
    pub code: Option<String>,
    pub provenance: Vec<Provenance>,
    /// Diagnostics from every attempt.
    pub diagnostics: Diagnostics,
    pub attempts: Vec<Attempt>,
    /// Index of the best attempt in `attempts`.
    pub best: Option<usize>,
    pub trace: StateTrace,
    /// Constraints as they stood after the last refinement.
    pub constraints: ConstraintSet,
}

impl RepairOutcome {
    #[inline]
    pub fn is_passed(&self) -> bool {
        self.status == RepairStatus::Passed
    }

    pub fn best_attempt(&self) -> Option<&Attempt> {
        self.best.and_then(|i| self.attempts.get(i))
    }
}

/// Drives compose, decode, validate and refine until the code passes or
/// attempts run out.
pub struct Orchestrator<'a> {
    composer: &'a Composer<'a>,
    decoder: &'a dyn Decoder,
    search: &'a dyn PathSearch,
    validators: Vec<Arc<dyn Validator>>,
    config: RepairConfig,
    interrupt: Option<&'a Interrupt>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        composer: &'a Composer<'a>,
        decoder: &'a dyn Decoder,
        search: &'a dyn PathSearch,
    ) -> Self {
        Orchestrator {
            composer,
            decoder,
            search,
            validators: Vec::new(),
            config: RepairConfig::default(),
            interrupt: None,
        }
    }

    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validators.push(validator);
        self
    }

    #[must_use]
    pub fn with_validators(
        mut self,
        validators: impl IntoIterator<Item = Arc<dyn Validator>>,
    ) -> Self {
        self.validators.extend(validators);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: RepairConfig) -> Self {
        self.config = config;
        self
    }

    /// Checked between attempts; a running attempt always finishes.
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: &'a Interrupt) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    /// Run the loop from `constraints`.
    ///
    /// Only a grammar the compiler itself rejects, or a decoder failure
    /// other than a timeout, is an error. Running out of attempts is the
    /// `Exhausted` outcome.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(constraints = constraints.len(), max_attempts = self.config.max_attempts)
    )]
    pub fn run(&self, constraints: ConstraintSet) -> Result<RepairOutcome, RepairError> {
        let mut set = constraints;
        let mut trace = StateTrace::new();
        let mut attempts: Vec<Attempt> = Vec::new();
        let mut refiner =
            Refiner::new(self.search, self.config.max_depth).with_exclusion(self.config.exclusion);
        let max_attempts = self.config.max_attempts.max(1);
        let mut status = RepairStatus::Exhausted;

        for number in 1..=max_attempts {
            if number > 1 {
                trace.enter(number, RepairState::Regenerating);
            }
            let (attempt, composition) = self.attempt(number, &mut set, &mut trace)?;

            if attempt.passed() {
                if let Some(composition) = &composition {
                    for p in &attempt.provenance {
                        composition.scoring.record(&p.path, true);
                    }
                }
                attempts.push(attempt);
                status = RepairStatus::Passed;
                break;
            }

            if let Some(composition) = &composition {
                record_rejections(composition, &attempt);
            }
            if number == max_attempts {
                trace.enter(number, RepairState::Exhausted);
                attempts.push(attempt);
                break;
            }
            if self.interrupt.is_some_and(Interrupt::is_cancelled) {
                trace.enter(number, RepairState::Cancelled);
                attempts.push(attempt);
                status = RepairStatus::Cancelled;
                break;
            }

            trace.enter(number, RepairState::Refining);
            let offered = composition.map(|c| c.holes).unwrap_or_default();
            match refiner.refine(&mut set, &attempt.diagnostics, &attempt.provenance, &offered) {
                Ok(_) => {}
                Err(SolveError::Cancelled) => {
                    trace.enter(number, RepairState::Cancelled);
                    attempts.push(attempt);
                    status = RepairStatus::Cancelled;
                    break;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "refinement search failed");
                }
            }
            attempts.push(attempt);
        }

        let best = best_attempt(&attempts);
        let mut diagnostics = Diagnostics::new();
        for attempt in &attempts {
            diagnostics.extend(attempt.diagnostics.iter().cloned());
        }
        let (code, provenance) = match best.and_then(|i| attempts.get(i)) {
            Some(attempt) => (attempt.code.clone(), attempt.provenance.clone()),
            None => (None, Vec::new()),
        };

        tracing::debug!(?status, attempts = attempts.len(), ?best, "repair finished");
        Ok(RepairOutcome {
            status,
            code,
            provenance,
            diagnostics,
            attempts,
            best,
            trace,
            constraints: set,
        })
    }

    /// Compose, decode and validate once.
    fn attempt(
        &self,
        number: u32,
        set: &mut ConstraintSet,
        trace: &mut StateTrace,
    ) -> Result<(Attempt, Option<Composition>), RepairError> {
        let mut attempt = Attempt {
            number,
            code: None,
            provenance: Vec::new(),
            diagnostics: Diagnostics::new(),
            score: 0.0,
            relaxed: Vec::new(),
        };

        let composition = match self.composer.compose_relaxing(set) {
            Ok((composition, relaxed)) => {
                attempt.relaxed = relaxed;
                composition
            }
            Err(ComposeError::Conflict(conflict)) => {
                attempt.diagnostics.push(conflict.to_diagnostic());
                trace.enter(number, RepairState::Failed(Category::Conflict));
                return Ok((attempt, None));
            }
            Err(ComposeError::Invalid(invalid)) => return Err(invalid.into()),
        };

        let decoded = match self.decode(number, &composition) {
            Ok(decoded) => decoded,
            Err(DecodeError::Timeout(after)) => {
                attempt.diagnostics.push(decode_timeout(after));
                trace.enter(number, RepairState::Failed(Category::DecodeTimeout));
                return Ok((attempt, Some(composition)));
            }
            Err(err) => return Err(RepairError::Decode(err)),
        };

        trace.enter(number, RepairState::Generated);
        trace.enter(number, RepairState::Validating);
        attempt.score = composition.scoring.score_provenance(&decoded.paths());
        attempt.diagnostics = self.validate(&decoded, set);
        attempt.code = Some(decoded.code);
        attempt.provenance = decoded.provenance;

        let failed = attempt
            .diagnostics
            .iter()
            .find(|d| d.is_hard())
            .map(|d| d.category);
        match failed {
            Some(category) => trace.enter(number, RepairState::Failed(category)),
            None => trace.enter(number, RepairState::Passed),
        }
        Ok((attempt, Some(composition)))
    }

    fn decode(&self, number: u32, composition: &Composition) -> Result<Decoded, DecodeError> {
        let timeout = self.config.decode_timeout;
        let started = Instant::now();
        let decoded = self.decoder.decode(&DecodeRequest {
            composition,
            attempt: number,
            timeout,
        })?;
        let elapsed = started.elapsed();
        if elapsed > timeout {
            tracing::warn!(
                attempt = number,
                elapsed_ms = elapsed.as_millis(),
                "late decode discarded"
            );
            return Err(DecodeError::Timeout(timeout));
        }
        Ok(decoded)
    }

    /// Syntax validators first; the rest only if syntax is clean.
    fn validate(&self, decoded: &Decoded, set: &ConstraintSet) -> Diagnostics {
        let request = Arc::new(ValidationRequest {
            code: decoded.code.clone(),
            provenance: decoded.provenance.clone(),
            constraints: set.clone(),
        });
        let (syntax, rest): (Vec<_>, Vec<_>) = self
            .validators
            .iter()
            .cloned()
            .partition(|v| v.kind() == ValidatorKind::Syntax);

        let timeout = self.config.validation_timeout;
        let mut diagnostics = run_validators(&syntax, &request, timeout);
        if diagnostics.has_hard() {
            tracing::debug!("syntax failed, skipping remaining validators");
            return diagnostics;
        }
        diagnostics.extend(run_validators(&rest, &request, timeout).into_vec());
        diagnostics
    }
}

/// Feed type failures back as rejections of the implicated paths.
fn record_rejections(composition: &Composition, attempt: &Attempt) {
    for diagnostic in attempt.diagnostics.of_category(Category::Type) {
        for p in &attempt.provenance {
            if diagnostic.hole.as_ref().map_or(true, |hole| *hole == p.hole) {
                composition.scoring.record(&p.path, false);
            }
        }
    }
}

fn best_attempt(attempts: &[Attempt]) -> Option<usize> {
    let mut best: Option<(usize, AttemptRank)> = None;
    for (i, attempt) in attempts.iter().enumerate() {
        let rank = attempt.rank();
        let better = match &best {
            None => true,
            Some((_, top)) => rank.compare(top) == Ordering::Less,
        };
        if better {
            best = Some((i, rank));
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "tests panic on failure")]
mod tests;
