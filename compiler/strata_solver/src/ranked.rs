//! Immutable ranked path sets.

use std::cmp::Ordering;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use strata_types::TypeId;

use crate::{NoInhabitantFound, Path, PathKey, PathWeights};

/// Paths ordered best first.
///
/// Order: length ascending, fitness descending, learned weight descending,
/// then discovery order. Paths with the same [`PathKey`] appear once.
/// Storage is shared, so clones are cheap.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct RankedPathSet {
    paths: Arc<[Path]>,
}

impl Default for RankedPathSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl RankedPathSet {
    pub fn empty() -> Self {
        RankedPathSet {
            paths: Arc::from(Vec::new()),
        }
    }

    /// Rank paths in discovery order without learned weights.
    pub fn rank(paths: impl IntoIterator<Item = Path>) -> Self {
        Self::rank_weighted(paths, &|_: &Path| None::<f64>)
    }

    /// Rank paths, using `weights` as the tertiary key.
    ///
    /// A path without a weight sorts as weight `0.0`. The sort is stable,
    /// so discovery order breaks remaining ties.
    pub fn rank_weighted(paths: impl IntoIterator<Item = Path>, weights: &dyn PathWeights) -> Self {
        let mut seen = FxHashSet::default();
        let mut scored: Vec<(Path, f64)> = paths
            .into_iter()
            .filter(|path| seen.insert(path.key()))
            .map(|path| {
                let weight = weights.weight(&path).unwrap_or(0.0);
                (path, weight)
            })
            .collect();

        scored.sort_by(|(a, wa), (b, wb)| compare(a, *wa, b, *wb));
        RankedPathSet {
            paths: scored.into_iter().map(|(path, _)| path).collect(),
        }
    }

    /// Keep ranked order; used when the input is already ordered.
    fn from_ordered(paths: Vec<Path>) -> Self {
        RankedPathSet {
            paths: Arc::from(paths),
        }
    }

    // === Access ===

    #[inline]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    #[inline]
    pub fn first(&self) -> Option<&Path> {
        self.paths.first()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Path> {
        self.paths.get(index)
    }

    #[inline]
    pub fn as_slice(&self) -> &[Path] {
        &self.paths
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Path> {
        self.paths.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = PathKey> + '_ {
        self.paths.iter().map(Path::key)
    }

    pub fn contains_key(&self, key: PathKey) -> bool {
        self.paths.iter().any(|path| path.key() == key)
    }

    // === Derived sets ===

    /// Paths matching `keep`, order preserved.
    #[must_use]
    pub fn retain(&self, mut keep: impl FnMut(&Path) -> bool) -> Self {
        Self::from_ordered(self.paths.iter().filter(|p| keep(p)).cloned().collect())
    }

    /// Drop every path whose key is in `excluded`.
    #[must_use]
    pub fn without(&self, excluded: &FxHashSet<PathKey>) -> Self {
        if excluded.is_empty() {
            return self.clone();
        }
        self.retain(|path| !excluded.contains(&path.key()))
    }

    /// Paths present in both sets, in this set's order.
    #[must_use]
    pub fn intersect(&self, other: &RankedPathSet) -> Self {
        let other_keys: FxHashSet<PathKey> = other.keys().collect();
        self.retain(|path| other_keys.contains(&path.key()))
    }

    /// First `max` paths.
    #[must_use]
    pub fn truncate(&self, max: usize) -> Self {
        if self.paths.len() <= max {
            return self.clone();
        }
        Self::from_ordered(self.paths[..max].to_vec())
    }

    /// Re-rank with new learned weights.
    #[must_use]
    pub fn rerank(&self, weights: &dyn PathWeights) -> Self {
        Self::rank_weighted(self.paths.iter().cloned(), weights)
    }

    /// Treat an empty set as [`NoInhabitantFound`].
    pub fn into_result(self, target: TypeId, max_depth: u32) -> Result<Self, NoInhabitantFound> {
        if self.is_empty() {
            Err(NoInhabitantFound { target, max_depth })
        } else {
            Ok(self)
        }
    }
}

impl<'a> IntoIterator for &'a RankedPathSet {
    type Item = &'a Path;
    type IntoIter = std::slice::Iter<'a, Path>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn compare(a: &Path, wa: f64, b: &Path, wb: f64) -> Ordering {
    a.length()
        .cmp(&b.length())
        .then_with(|| b.fitness().cmp(&a.fitness()))
        .then_with(|| wb.total_cmp(&wa))
}
