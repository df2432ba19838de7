//! Cache of compiled grammars.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHasher;
use strata_compose::GrammarCompiler;
use strata_grammar::{compile_holes, CompileError, Grammar, GrammarTemplate, HoleFill};
use strata_solver::RankedPathSet;
use strata_types::{TypeId, TypeRegistry};

use crate::lru::digest;
use crate::{CacheKey, CacheStats, ShardedLru};

/// Default [`GrammarCache`] capacity.
pub const DEFAULT_GRAMMAR_CAPACITY: usize = 1_000;

/// Identity of one compilation: the serialized fills, the template, and
/// the rendered names of the types the holes are asked to accept.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GrammarCacheKey {
    pub template: String,
    pub version: u32,
    /// Digest of the full template, so edited templates that kept their
    /// version still miss.
    pub template_digest: u64,
    /// bincode of `[(hole, target, paths)]`.
    pub fills: Vec<u8>,
    /// Per fill, the registry's name for each target the hole must accept.
    /// Raw ids from different registries can collide; names decide
    /// hole compatibility.
    pub target_names: Vec<Vec<String>>,
}

impl GrammarCacheKey {
    pub fn new(
        fills: &[HoleFill<'_>],
        template: &GrammarTemplate,
        registry: &TypeRegistry,
    ) -> Result<Self, bincode::Error> {
        let serializable: Vec<(&str, Option<TypeId>, &RankedPathSet)> = fills
            .iter()
            .map(|fill| (fill.hole, fill.target, fill.paths))
            .collect();
        let target_names = fills
            .iter()
            .map(|fill| {
                fill.targets()
                    .into_iter()
                    .map(|target| registry.display(target))
                    .collect()
            })
            .collect();
        Ok(GrammarCacheKey {
            template: template.id.clone(),
            version: template.version,
            template_digest: digest(template),
            fills: bincode::serialize(&serializable)?,
            target_names,
        })
    }
}

impl CacheKey for GrammarCacheKey {
    fn fingerprint(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// LRU cache of compiled grammars.
///
/// Compilation is deterministic, so a hit is byte-identical to what a fresh
/// compile would produce. Failed compilations are not cached.
pub struct GrammarCache {
    lru: ShardedLru<GrammarCacheKey, Arc<Grammar>>,
}

impl GrammarCache {
    pub fn new(capacity: usize) -> Self {
        GrammarCache {
            lru: ShardedLru::new("grammar", capacity),
        }
    }

    pub fn get(&self, key: &GrammarCacheKey) -> Option<Arc<Grammar>> {
        self.lru.get(key)
    }

    pub fn insert(&self, key: GrammarCacheKey, grammar: Arc<Grammar>) {
        self.lru.insert(key, grammar);
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

impl Default for GrammarCache {
    fn default() -> Self {
        Self::new(DEFAULT_GRAMMAR_CAPACITY)
    }
}

impl GrammarCompiler for GrammarCache {
    fn compile(
        &self,
        fills: &[HoleFill<'_>],
        template: &GrammarTemplate,
        registry: &TypeRegistry,
    ) -> Result<Arc<Grammar>, CompileError> {
        let key = match GrammarCacheKey::new(fills, template, registry) {
            Ok(key) => key,
            Err(err) => {
                tracing::warn!(
                    template = %template.id,
                    error = %err,
                    "cannot key grammar, compiling uncached"
                );
                return compile_holes(fills, template, registry).map(Arc::new);
            }
        };

        if let Some(grammar) = self.lru.get(&key) {
            tracing::debug!(template = %template.id, "grammar cache hit");
            return Ok(grammar);
        }

        let grammar = Arc::new(compile_holes(fills, template, registry)?);
        tracing::debug!(
            template = %template.id,
            rules = grammar.rules().len(),
            "grammar cache miss"
        );
        self.lru.insert(key, Arc::clone(&grammar));
        Ok(grammar)
    }
}
