//! Strata: type-directed constraint synthesis.
//!
//! Given the symbols in scope at a generation site and the type the code
//! must produce, Strata searches for ranked construction paths, compiles
//! them into a grammar an external constrained decoder can enforce, and
//! drives a validate/repair loop over what the decoder produces.
//!
//! # Architecture
//!
//! ```text
//! SymbolSource ──► TypeContext
//!                      │
//!                      ▼
//!          Solver ──► RankedPathSet ──(PathCache)
//!                      │
//!                      ▼
//!        Composer ──► Grammar + ScoringFn ──(GrammarCache)
//!                      │
//!                      ▼
//!        Decoder (external) ──► code + provenance
//!                      │
//!                      ▼
//!     Validators ──► Diagnostics ──► Refiner ──► back to Composer
//! ```
//!
//! [`Engine`] owns the caches and ties the crates together. Set `RUST_LOG`
//! (and optionally `STRATA_LOG_TREE`) and call [`init_tracing`] to see what
//! it does.

mod config;
mod engine;
mod error;

use std::sync::Once;

pub use config::EngineConfig;
pub use engine::{Engine, EngineStats, SynthesisRequest};
pub use error::{ErrorClass, SynthesisError};

// Re-exports for convenience
pub use strata_compose::{
    Constraint, ConstraintSet, InMemoryWeights, PatternWeightStore, ScoreBlend, Tier, WeightScope,
};
pub use strata_diagnostic::{Category, Diagnostic, Diagnostics, TestCase};
pub use strata_grammar::{template, Grammar, GrammarTemplate, Recognition};
pub use strata_repair::{
    Decoded, DecodeError, DecodeRequest, Decoder, RepairOutcome, RepairStatus, ValidationRequest,
    Validator, ValidatorKind,
};
pub use strata_solver::{Interrupt, Path, RankedPathSet, SearchOptions};
pub use strata_types::{
    ContextFingerprint, SymbolError, SymbolSink, SymbolSource, TypeContext, TypeContextBuilder,
    TypeId, TypeRegistry,
};

static TRACING_INIT: Once = Once::new();

/// Install a global tracing subscriber.
///
/// Does nothing unless `RUST_LOG` is set. With `STRATA_LOG_TREE` also set,
/// spans render as an indented tree instead of flat lines. Safe to call
/// more than once; a subscriber installed elsewhere is left alone.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_err() {
            return;
        }
        let registry = tracing_subscriber::registry().with(EnvFilter::from_default_env());
        let installed = if std::env::var_os("STRATA_LOG_TREE").is_some() {
            registry
                .with(tracing_tree::HierarchicalLayer::new(2).with_targets(true))
                .try_init()
        } else {
            registry
                .with(fmt::layer().with_target(true).with_level(true))
                .try_init()
        };
        if let Err(err) = installed {
            tracing::debug!(error = %err, "tracing subscriber already installed");
        }
    });
}
