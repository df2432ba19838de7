//! Soft-tier scoring.
//!
//! A [`ScoringFn`] ranks candidates that the grammar already accepts. It
//! never rejects one: the worst a low score does is push a candidate to the
//! back.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use strata_solver::{Path, PathWeights, RankedPathSet};
use strata_types::Fitness;

use crate::{PatternWeightStore, WeightScope};

/// Share of the final score taken by learned weights.
///
/// `score = (1 - blend) * structural + blend * learned`. At `0.0` learned
/// weights are ignored; at `1.0` they decide alone.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScoreBlend(f64);

impl ScoreBlend {
    pub const DEFAULT: ScoreBlend = ScoreBlend(0.25);

    /// Clamped to `[0, 1]`. NaN falls back to [`ScoreBlend::DEFAULT`].
    pub fn new(blend: f64) -> Self {
        if blend.is_nan() {
            return Self::DEFAULT;
        }
        ScoreBlend(blend.clamp(0.0, 1.0))
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }

    #[inline]
    pub fn mix(self, structural: f64, learned: f64) -> f64 {
        (1.0 - self.0) * structural + self.0 * learned
    }
}

impl Default for ScoreBlend {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Scoring function produced by composition.
///
/// Learned weights come from Contextual constraints first and the injected
/// [`PatternWeightStore`] second, both keyed by `Path::pattern_id`.
#[derive(Clone, Default)]
pub struct ScoringFn {
    blend: ScoreBlend,
    patterns: FxHashMap<String, f64>,
    store: Option<Arc<dyn PatternWeightStore>>,
    scope: WeightScope,
}

impl ScoringFn {
    pub fn new(blend: ScoreBlend) -> Self {
        ScoringFn {
            blend,
            ..Self::default()
        }
    }

    /// Pin a pattern's learned weight. Later calls for the same pattern win.
    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>, weight: f64) -> Self {
        self.patterns.insert(pattern.into(), weight.clamp(0.0, 1.0));
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn PatternWeightStore>, scope: WeightScope) -> Self {
        self.store = Some(store);
        self.scope = scope;
        self
    }

    pub fn blend(&self) -> ScoreBlend {
        self.blend
    }

    pub fn scope(&self) -> &WeightScope {
        &self.scope
    }

    // === Scores ===

    /// Score from shape alone, in `(0, 1]`: shorter and exact is better.
    pub fn structural(&self, path: &Path) -> f64 {
        let fitness = match path.fitness() {
            Fitness::Exact => 1.0,
            Fitness::Widening => 0.5,
        };
        fitness / (1.0 + f64::from(path.length()))
    }

    /// Learned weight for the path's pattern, if anything is known.
    pub fn learned(&self, path: &Path) -> Option<f64> {
        let pattern = path.pattern_id();
        if let Some(&weight) = self.patterns.get(&pattern) {
            return Some(weight);
        }
        let store = self.store.as_ref()?;
        store.get_weight(&self.scope.key(pattern))
    }

    /// Blended score. Without a learned weight the structural score stands
    /// alone.
    pub fn score(&self, path: &Path) -> f64 {
        let structural = self.structural(path);
        match self.learned(path) {
            Some(learned) => self.blend.mix(structural, learned),
            None => structural,
        }
    }

    /// Mean score of the paths an output was generated from; `0.0` when
    /// there is no provenance.
    pub fn score_provenance(&self, provenance: &[Path]) -> f64 {
        if provenance.is_empty() {
            return 0.0;
        }
        provenance.iter().map(|p| self.score(p)).sum::<f64>() / provenance.len() as f64
    }

    // === Ranking ===

    /// Re-rank with learned weights as the tertiary key. Never drops a path.
    pub fn rerank(&self, paths: &RankedPathSet) -> RankedPathSet {
        paths.rerank(self)
    }

    /// Best of several grammar-valid candidates; ties go to the earlier one.
    pub fn select<'c>(&self, candidates: &'c [Path]) -> Option<&'c Path> {
        let mut best: Option<(&'c Path, f64)> = None;
        for candidate in candidates {
            let score = self.score(candidate);
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((candidate, score));
            }
        }
        best.map(|(path, _)| path)
    }

    /// Feed an accept/reject outcome back into the store.
    pub fn record(&self, path: &Path, accepted: bool) {
        let Some(store) = &self.store else {
            return;
        };
        let key = self.scope.key(path.pattern_id());
        let observation = if accepted { 1.0 } else { 0.0 };
        tracing::trace!(%key, accepted, "recording pattern outcome");
        store.update_weight(&key, observation);
    }
}

impl PathWeights for ScoringFn {
    fn weight(&self, path: &Path) -> Option<f64> {
        self.learned(path)
    }
}

impl fmt::Debug for ScoringFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoringFn")
            .field("blend", &self.blend)
            .field("patterns", &self.patterns)
            .field("store", &self.store.is_some())
            .field("scope", &self.scope)
            .finish()
    }
}
