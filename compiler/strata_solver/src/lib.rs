//! Type inhabitation search.
//!
//! Given a [`TypeContext`](strata_types::TypeContext) and a target type, the
//! solver finds ranked expression-construction [`Path`]s that produce a value
//! of that type from what is in scope:
//!
//! ```text
//! bindings ──► identity          user
//! members  ──► property access   user.name
//!          └─► method call       user.toString()
//! callables──► application       greet(user)
//!          └─► constructor       new User(id)
//! ```
//!
//! Search is bounded by depth, memoized per request, cycle-safe through a
//! per-branch visited set, and cooperatively cancellable via [`Interrupt`].
//! An empty [`RankedPathSet`] means "no inhabitant found" and is not an error.

mod error;
mod interrupt;
mod path;
mod ranked;
mod search;
mod weights;

pub use error::{NoInhabitantFound, PathError, SolveError};
pub use interrupt::Interrupt;
pub use path::{Argument, Path, PathKey, Step};
pub use ranked::RankedPathSet;
pub use search::{
    find_paths, SearchOptions, SearchStats, Solver, DEFAULT_MAX_CANDIDATES, DEFAULT_MAX_DEPTH,
    DEFAULT_MAX_PATHS,
};
pub use weights::PathWeights;
