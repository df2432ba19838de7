//! Compilation errors.

use thiserror::Error;

/// The template and the type constraint cannot be combined.
///
/// Not a bug: the caller relaxes a constraint tier and retries.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConstraintConflict {
    #[error("hole `{hole}` accepts {accepts}, but the type constraint targets {target}")]
    IncompatibleHole {
        hole: String,
        accepts: String,
        target: String,
    },

    #[error("no path can fill hole `{hole}`")]
    EmptyHole { hole: String },

    #[error("template `{template}` has no hole named `{hole}`")]
    UnknownHole { template: String, hole: String },
}

impl ConstraintConflict {
    /// Hole the conflict is about.
    pub fn hole(&self) -> &str {
        match self {
            ConstraintConflict::IncompatibleHole { hole, .. }
            | ConstraintConflict::EmptyHole { hole }
            | ConstraintConflict::UnknownHole { hole, .. } => hole,
        }
    }
}

/// Structural defect in a grammar.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvalidGrammar {
    #[error("start rule `{0}` is not defined")]
    MissingStart(String),

    #[error("rule `{rule}` is defined more than once")]
    DuplicateRule { rule: String },

    #[error("rule `{referenced_by}` references undefined rule `{rule}`")]
    UndefinedRule { rule: String, referenced_by: String },

    #[error("rule `{rule}` still contains hole `{hole}`")]
    UnfilledHole { rule: String, hole: String },

    #[error("rule `{rule}` derives no terminal string")]
    Unproductive { rule: String },

    #[error("argument `{param}` of `{callee}` has no candidates")]
    EmptyArgument { callee: String, param: String },
}

/// A compiled grammar failed verification.
///
/// Carries the template and the rendered paths so the failing input can be
/// reproduced from the report.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error(
    "grammar compilation failed for template `{template}`: {kind} (paths: [{}])",
    .paths.join(", ")
)]
pub struct GrammarCompilationError {
    pub template: String,
    pub kind: InvalidGrammar,
    pub paths: Vec<String>,
}

/// Any compile failure.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Conflict(#[from] ConstraintConflict),

    #[error(transparent)]
    Invalid(#[from] GrammarCompilationError),
}

impl CompileError {
    #[inline]
    pub fn is_conflict(&self) -> bool {
        matches!(self, CompileError::Conflict(_))
    }
}
