//! Constraint tier composition.
//!
//! A [`ConstraintSet`] holds constraints from four tiers:
//!
//! | Tier | Effect |
//! |---|---|
//! | Syntactic | grammar template |
//! | Type | paths compiled into a hole (ANDed per hole) |
//! | Semantic | passed through to validation |
//! | Contextual | learned weights in the [`ScoringFn`] |
//!
//! [`compose`] turns the hard tiers into a grammar and the soft tier into a
//! scoring function. When hard tiers cannot be satisfied together the result
//! is a [`TierConflict`] naming them; [`ConstraintSet::relax`] drops the
//! lowest-priority tier so the caller can try again.

mod compose;
mod constraint;
mod scoring;
mod store;
mod tier;

pub use compose::{
    compose, ComposeError, Composer, Composition, DirectCompiler, GrammarCompiler, TierConflict,
    OPEN_EXPRESSION,
};
pub use constraint::{
    Constraint, ConstraintSet, ContextualWeight, SemanticConstraint, TypeConstraint,
};
pub use scoring::{ScoreBlend, ScoringFn};
pub use store::{InMemoryWeights, PatternKey, PatternWeightStore, WeightScope};
pub use tier::{Tier, TierSet};
