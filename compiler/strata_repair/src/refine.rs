//! Diagnostics to constraint edits.

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};
use strata_compose::ConstraintSet;
use strata_diagnostic::{Category, Diagnostics};
use strata_solver::{Interrupt, PathKey, RankedPathSet, SearchOptions, SolveError, Solver};
use strata_types::{TypeContext, TypeId};

use crate::Provenance;

/// Where refinement gets fresh paths from.
pub trait PathSearch {
    fn search(&self, target: TypeId, options: &SearchOptions) -> Result<RankedPathSet, SolveError>;
}

impl<F> PathSearch for F
where
    F: Fn(TypeId, &SearchOptions) -> Result<RankedPathSet, SolveError>,
{
    fn search(&self, target: TypeId, options: &SearchOptions) -> Result<RankedPathSet, SolveError> {
        self(target, options)
    }
}

/// Searches a context directly, without caching.
pub struct SolverSearch<'a> {
    ctx: &'a TypeContext,
    interrupt: Option<&'a Interrupt>,
}

impl<'a> SolverSearch<'a> {
    pub fn new(ctx: &'a TypeContext) -> Self {
        SolverSearch {
            ctx,
            interrupt: None,
        }
    }

    #[must_use]
    pub fn with_interrupt(mut self, interrupt: &'a Interrupt) -> Self {
        self.interrupt = Some(interrupt);
        self
    }
}

impl PathSearch for SolverSearch<'_> {
    fn search(&self, target: TypeId, options: &SearchOptions) -> Result<RankedPathSet, SolveError> {
        let solver = Solver::new(self.ctx);
        match self.interrupt {
            Some(interrupt) => solver.with_interrupt(interrupt).search(target, options),
            None => solver.search(target, options),
        }
    }
}

/// A change made to the constraint set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Edit {
    /// The hole's Type constraint was replaced by a fresh search with the
    /// failing paths excluded.
    NarrowedType {
        hole: String,
        excluded: usize,
        remaining: usize,
    },
    /// A failing test became a Semantic example.
    AddedExample { name: String },
}

impl fmt::Display for Edit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edit::NarrowedType {
                hole,
                excluded,
                remaining,
            } => write!(
                f,
                "narrowed `{hole}`: {excluded} excluded, {remaining} remaining"
            ),
            Edit::AddedExample { name } => write!(f, "added example `{name}`"),
        }
    }
}

/// Which paths a type diagnostic takes out of its hole.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Exclusion {
    /// Every path the hole offered in the failed attempt.
    #[default]
    Offered,
    /// Only the paths the decoder reported using. Falls back to
    /// [`Exclusion::Offered`] when the attempt carries no provenance for
    /// the hole.
    Used,
}

/// Turns one attempt's diagnostics into edits for the next.
///
/// Exclusions accumulate across attempts, so a path rejected once stays out
/// for the rest of the run.
pub struct Refiner<'a> {
    search: &'a dyn PathSearch,
    max_depth: u32,
    exclusion: Exclusion,
    excluded: FxHashMap<String, FxHashSet<PathKey>>,
}

impl<'a> Refiner<'a> {
    pub fn new(search: &'a dyn PathSearch, max_depth: u32) -> Self {
        Refiner {
            search,
            max_depth,
            exclusion: Exclusion::default(),
            excluded: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn with_exclusion(mut self, exclusion: Exclusion) -> Self {
        self.exclusion = exclusion;
        self
    }

    /// Keys excluded so far on `hole`.
    pub fn excluded(&self, hole: &str) -> usize {
        self.excluded.get(hole).map_or(0, FxHashSet::len)
    }

    /// Apply the edits `diagnostics` call for.
    ///
    /// Type diagnostics exclude the implicated hole's previous path set
    /// (see [`Exclusion`]) and search again. A diagnostic without a hole
    /// implicates every hole the attempt drew from. Test diagnostics add
    /// their case as an example. Other categories need no edit.
    ///
    /// Only a cancelled search is an error; any other search failure leaves
    /// the hole as it was.
    pub fn refine(
        &mut self,
        set: &mut ConstraintSet,
        diagnostics: &Diagnostics,
        provenance: &[Provenance],
        offered: &[(String, RankedPathSet)],
    ) -> Result<Vec<Edit>, SolveError> {
        let mut edits = Vec::new();

        let mut holes: Vec<String> = Vec::new();
        for diagnostic in diagnostics.of_category(Category::Type) {
            match &diagnostic.hole {
                Some(hole) => holes.push(hole.clone()),
                None => holes.extend(provenance.iter().map(|p| p.hole.clone())),
            }
        }
        let mut seen = FxHashSet::default();
        holes.retain(|h| seen.insert(h.clone()));

        for hole in holes {
            if let Some(edit) = self.narrow(set, &hole, provenance, offered)? {
                edits.push(edit);
            }
        }

        for diagnostic in diagnostics.of_category(Category::Test) {
            if let Some(case) = &diagnostic.test_case {
                set.add_example(case.clone());
                edits.push(Edit::AddedExample {
                    name: case.name.clone(),
                });
            }
        }

        for edit in &edits {
            tracing::debug!(%edit, "refined constraints");
        }
        Ok(edits)
    }

    fn narrow(
        &mut self,
        set: &mut ConstraintSet,
        hole: &str,
        provenance: &[Provenance],
        offered: &[(String, RankedPathSet)],
    ) -> Result<Option<Edit>, SolveError> {
        let Some(target) = set.for_hole(hole).next().map(|t| t.target) else {
            tracing::debug!(hole, "no type constraint left to narrow");
            return Ok(None);
        };

        let used: Vec<PathKey> = match self.exclusion {
            Exclusion::Used => provenance
                .iter()
                .filter(|p| p.hole == hole)
                .map(|p| p.path.key())
                .collect(),
            Exclusion::Offered => Vec::new(),
        };
        let rejected: Vec<PathKey> = if used.is_empty() {
            match offered.iter().find(|(h, _)| h == hole) {
                Some((_, paths)) => paths.keys().collect(),
                None => set.for_hole(hole).flat_map(|t| t.paths.keys()).collect(),
            }
        } else {
            used
        };

        let excluded = self.excluded.entry(hole.to_owned()).or_default();
        let before = excluded.len();
        excluded.extend(rejected);

        let options = SearchOptions {
            excluded: excluded.clone(),
            ..SearchOptions::with_max_depth(self.max_depth)
        };
        let paths = match self.search.search(target, &options) {
            Ok(paths) => paths,
            Err(SolveError::Cancelled) => return Err(SolveError::Cancelled),
            Err(err) => {
                tracing::warn!(hole, error = %err, "re-search failed, keeping constraint");
                return Ok(None);
            }
        };

        let edit = Edit::NarrowedType {
            hole: hole.to_owned(),
            excluded: excluded.len() - before,
            remaining: paths.len(),
        };
        set.narrow_type(hole, target, paths);
        Ok(Some(edit))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "tests panic on failure")]
mod tests;
