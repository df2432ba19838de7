//! Type model for Strata.
//!
//! Everything downstream (solver, grammar compiler, composer, caches) reads
//! types through this crate:
//!
//! - [`TypeId`]: a 32-bit handle into a per-request [`TypeRegistry`] arena.
//!   Equality is index equality; there are no object pointers between types.
//! - [`TypeData`]: the interned shape behind a handle (primitive, union,
//!   array, generic, function, struct).
//! - [`Members`]: properties and methods attached to a type id. Member order
//!   is insertion order and matters for ranking.
//! - [`TypeContext`]: the immutable symbol table of one generation site,
//!   produced by [`TypeContextBuilder`] from a language-specific
//!   [`SymbolSource`].

mod context;
mod data;
mod fitness;
mod idx;
mod registry;
mod signature;

pub use context::{
    Binding, ContextFingerprint, FunctionDef, FunctionKind, NamingConvention, StyleSummary,
    SymbolError, SymbolSink, SymbolSource, TypeContext, TypeContextBuilder,
};
pub use data::TypeData;
pub use fitness::Fitness;
pub use idx::TypeId;
pub use registry::TypeRegistry;
pub use signature::{FieldDef, Members, MethodDef, Param, Signature};
