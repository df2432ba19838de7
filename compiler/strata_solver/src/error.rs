//! Solver errors.

use strata_types::TypeId;

/// Reasons a search did not run to completion.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SolveError {
    /// The caller cancelled the request.
    #[error("search cancelled")]
    Cancelled,

    /// The request deadline passed mid-search.
    #[error("search deadline exceeded after {expansions} expansions")]
    DeadlineExceeded { expansions: u64 },

    /// The target id is not in the context's registry.
    #[error("target {0} is not in the type registry")]
    UnknownTarget(TypeId),
}

/// A step sequence that does not replay to its claimed target.
///
/// Paths are checked when built; hitting one of these means the solver (or
/// a hand-built path) is wrong, not that the input was unusual.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("path has no steps")]
    Empty,

    #[error("step {index} must be a root (identity, application or constructor)")]
    RootExpected { index: usize },

    #[error("step {index} is a root but appears after the start of the path")]
    MemberExpected { index: usize },

    #[error("no binding named `{0}` in scope")]
    UnknownBinding(String),

    #[error("no callable named `{0}` in scope")]
    UnknownFunction(String),

    #[error("type {owner} has no member `{name}`")]
    UnknownMember { owner: TypeId, name: String },

    #[error("`{callee}` takes {expected} arguments, path supplies {found}")]
    ArityMismatch {
        callee: String,
        expected: usize,
        found: usize,
    },

    #[error("argument `{param}` of `{callee}` has no candidate fitting {expected}")]
    ArgumentMismatch {
        callee: String,
        param: String,
        expected: TypeId,
    },

    #[error("path produces {found}, which does not fit target {target}")]
    TypeMismatch { found: TypeId, target: TypeId },
}

/// Marker returned by [`RankedPathSet::into_result`](crate::RankedPathSet::into_result)
/// when a search came back empty.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("no inhabitant found for {target} within depth {max_depth}")]
pub struct NoInhabitantFound {
    pub target: TypeId,
    pub max_depth: u32,
}
