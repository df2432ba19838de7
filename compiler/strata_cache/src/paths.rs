//! Cache of solver results.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;
use strata_solver::{Interrupt, RankedPathSet, SearchOptions, SolveError, Solver};
use strata_types::{ContextFingerprint, TypeContext, TypeId};

use crate::{CacheKey, CacheStats, ShardedLru};

/// Default [`PathCache`] capacity.
pub const DEFAULT_PATH_CAPACITY: usize = 10_000;

/// Identity of one search.
///
/// A context with new symbols has a new fingerprint, so its searches never
/// match entries stored for the old context.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PathCacheKey {
    /// Type whose receiver or parameter is being inhabited; `NONE` at the
    /// top level.
    pub origin: TypeId,
    pub target: TypeId,
    pub context: ContextFingerprint,
    pub max_depth: u32,
    /// [`SearchOptions::fingerprint`].
    pub options: u64,
}

impl PathCacheKey {
    pub fn new(ctx: &TypeContext, target: TypeId, options: &SearchOptions) -> Self {
        PathCacheKey {
            origin: TypeId::NONE,
            target,
            context: ctx.fingerprint(),
            max_depth: options.max_depth,
            options: options.fingerprint(),
        }
    }
}

impl CacheKey for PathCacheKey {
    fn fingerprint(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// LRU cache of ranked path sets.
///
/// Only unweighted searches are cached: learned weights change between
/// requests, so callers re-rank a cached set instead.
pub struct PathCache {
    lru: ShardedLru<PathCacheKey, RankedPathSet>,
}

impl PathCache {
    pub fn new(capacity: usize) -> Self {
        PathCache {
            lru: ShardedLru::new("path", capacity),
        }
    }

    pub fn get(&self, key: &PathCacheKey) -> Option<RankedPathSet> {
        self.lru.get(key)
    }

    pub fn insert(&self, key: PathCacheKey, paths: RankedPathSet) {
        self.lru.insert(key, paths);
    }

    /// Search through the cache.
    ///
    /// Errors are returned, never cached.
    pub fn search(
        &self,
        ctx: &TypeContext,
        target: TypeId,
        options: &SearchOptions,
        interrupt: Option<&Interrupt>,
    ) -> Result<RankedPathSet, SolveError> {
        let key = PathCacheKey::new(ctx, target, options);
        if let Some(paths) = self.lru.get(&key) {
            tracing::debug!(%target, context = %key.context, "path cache hit");
            return Ok(paths);
        }

        let solver = Solver::new(ctx);
        let solver = match interrupt {
            Some(interrupt) => solver.with_interrupt(interrupt),
            None => solver,
        };
        let paths = solver.search(target, options)?;
        tracing::debug!(%target, context = %key.context, paths = paths.len(), "path cache miss");
        self.lru.insert(key, paths.clone());
        Ok(paths)
    }

    pub fn len(&self) -> usize {
        self.lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lru.is_empty()
    }

    pub fn clear(&self) {
        self.lru.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.lru.stats()
    }
}

impl Default for PathCache {
    fn default() -> Self {
        Self::new(DEFAULT_PATH_CAPACITY)
    }
}
