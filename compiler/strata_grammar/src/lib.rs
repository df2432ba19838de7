//! Path-to-grammar compilation.
//!
//! [`compile`] turns a [`RankedPathSet`](strata_solver::RankedPathSet) into a
//! context-free [`Grammar`] by substituting one alternative per path into a
//! [`GrammarTemplate`]'s hole. The result is emitted as Lark-style text for an
//! external constrained decoder and is verified to have the prefix property:
//! every reachable rule derives at least one terminal string, and rules that
//! cannot be reached are removed.
//!
//! Compilation is deterministic. The same paths and template always produce
//! the same rule names in the same order, so grammars can be cached by
//! content.
//!
//! # Errors
//!
//! - [`ConstraintConflict`]: the template cannot host the paths (wrong hole
//!   type, nothing to fill a hole). Recoverable by relaxing constraints.
//! - [`GrammarCompilationError`]: the output would violate the prefix
//!   property or reference undefined rules. Always a bug.

mod check;
mod compile;
mod error;
mod grammar;
mod recognize;
pub mod template;

pub use compile::{compile, compile_holes, HoleFill};
pub use error::{CompileError, ConstraintConflict, GrammarCompilationError, InvalidGrammar};
pub use grammar::{Grammar, Rule, Symbol, Terminal};
pub use recognize::{Recognition, Recognizer};
pub use template::{ConstructorStyle, GrammarTemplate, HoleKind, HoleSpec};
