//! The engine facade: cached search, cached compilation, composition and
//! the repair loop behind one handle.

use std::fmt;
use std::sync::Arc;

use strata_cache::{CacheStats, GrammarCache, PathCache};
use strata_compose::{
    Composer, Composition, Constraint, ConstraintSet, GrammarCompiler, PatternWeightStore,
    ScoringFn, WeightScope,
};
use strata_diagnostic::TestCase;
use strata_grammar::{template, Grammar, GrammarTemplate, HoleFill};
use strata_repair::{Decoder, Orchestrator, PathSearch, RepairOutcome, Validator};
use strata_solver::{Interrupt, RankedPathSet, SearchOptions, SolveError};
use strata_types::{SymbolSource, TypeContext, TypeContextBuilder, TypeId, TypeRegistry};

use crate::{EngineConfig, SynthesisError};

/// Shared, thread-safe entry point.
///
/// Holds the two caches; every other piece of state is per request. One
/// engine can serve concurrent requests.
pub struct Engine {
    config: EngineConfig,
    paths: PathCache,
    grammars: GrammarCache,
    store: Option<(Arc<dyn PatternWeightStore>, WeightScope)>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        tracing::debug!(?config, "creating engine");
        Engine {
            paths: PathCache::new(config.path_cache_capacity),
            grammars: GrammarCache::new(config.grammar_cache_capacity),
            config,
            store: None,
        }
    }

    /// Learned pattern weights, read for ranking and updated by repair.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn PatternWeightStore>, scope: WeightScope) -> Self {
        self.store = Some((store, scope));
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build a context from an indexer's symbols.
    pub fn context(&self, source: &dyn SymbolSource) -> Result<TypeContext, SynthesisError> {
        Ok(TypeContextBuilder::new(source).build()?)
    }

    // === Search ===

    /// Ranked paths to `target` at the configured depth.
    ///
    /// An empty set is a valid answer; see [`Engine::require_paths`].
    pub fn find_paths(
        &self,
        ctx: &TypeContext,
        target: TypeId,
    ) -> Result<RankedPathSet, SynthesisError> {
        self.search(ctx, target, &self.config.search_options(), None)
    }

    /// Like [`Engine::find_paths`], but an empty set is `NoInhabitant`.
    pub fn require_paths(
        &self,
        ctx: &TypeContext,
        target: TypeId,
    ) -> Result<RankedPathSet, SynthesisError> {
        let paths = self.find_paths(ctx, target)?;
        Ok(paths.into_result(target, self.config.max_depth)?)
    }

    /// Cached search with explicit options.
    ///
    /// With a weight store attached, results are re-ranked by learned
    /// weight; the cache itself always holds the unweighted ranking.
    pub fn search(
        &self,
        ctx: &TypeContext,
        target: TypeId,
        options: &SearchOptions,
        interrupt: Option<&Interrupt>,
    ) -> Result<RankedPathSet, SynthesisError> {
        let paths = self.paths.search(ctx, target, options, interrupt)?;
        Ok(match self.scoring() {
            Some(scoring) => scoring.rerank(&paths),
            None => paths,
        })
    }

    fn scoring(&self) -> Option<ScoringFn> {
        let (store, scope) = self.store.as_ref()?;
        Some(ScoringFn::new(self.config.blend).with_store(Arc::clone(store), scope.clone()))
    }

    // === Grammar ===

    /// Compile `paths` into the template's primary hole, through the
    /// grammar cache.
    pub fn compile(
        &self,
        paths: &RankedPathSet,
        template: &GrammarTemplate,
        registry: &TypeRegistry,
    ) -> Result<Arc<Grammar>, SynthesisError> {
        let fills: Vec<HoleFill<'_>> = template
            .primary_hole()
            .map(|hole| HoleFill::new(&hole.name, paths))
            .into_iter()
            .collect();
        Ok(self.grammars.compile(&fills, template, registry)?)
    }

    /// A composer wired to the grammar cache, blend and weight store.
    pub fn composer<'a>(&'a self, registry: &'a TypeRegistry) -> Composer<'a> {
        let composer = Composer::new(registry)
            .with_compiler(&self.grammars)
            .with_blend(self.config.blend);
        match &self.store {
            Some((store, scope)) => composer.with_store(Arc::clone(store), scope.clone()),
            None => composer,
        }
    }

    pub fn compose(
        &self,
        set: &ConstraintSet,
        registry: &TypeRegistry,
    ) -> Result<Composition, SynthesisError> {
        Ok(self.composer(registry).compose(set)?)
    }

    // === Repair ===

    /// Run the repair loop over `constraints`.
    pub fn repair(
        &self,
        ctx: &TypeContext,
        constraints: ConstraintSet,
        decoder: &dyn Decoder,
        validators: &[Arc<dyn Validator>],
        interrupt: Option<&Interrupt>,
    ) -> Result<RepairOutcome, SynthesisError> {
        let composer = self.composer(ctx.registry());
        let search = CachedSearch {
            paths: &self.paths,
            ctx,
            interrupt,
        };
        let orchestrator = Orchestrator::new(&composer, decoder, &search)
            .with_validators(validators.iter().cloned())
            .with_config(self.config.repair_config());
        let orchestrator = match interrupt {
            Some(interrupt) => orchestrator.with_interrupt(interrupt),
            None => orchestrator,
        };
        Ok(orchestrator.run(constraints)?)
    }

    /// Search, compose and repair for one generation site.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(
            target = %request.target,
            template = %request.template.id,
            context = %request.ctx.fingerprint()
        )
    )]
    pub fn synthesize(
        &self,
        request: &SynthesisRequest<'_>,
        decoder: &dyn Decoder,
        validators: &[Arc<dyn Validator>],
    ) -> Result<RepairOutcome, SynthesisError> {
        let constraints = self.constraints(request)?;
        let outcome = self.repair(
            request.ctx,
            constraints,
            decoder,
            validators,
            request.interrupt,
        )?;
        tracing::debug!(
            status = ?outcome.status,
            attempts = outcome.attempts.len(),
            diagnostics = outcome.diagnostics.len(),
            "synthesis finished"
        );
        Ok(outcome)
    }

    /// The initial constraint set for `request`.
    ///
    /// An uninhabited target still yields a Type constraint; composition
    /// reports the empty hole as a conflict and relaxes it.
    pub fn constraints(
        &self,
        request: &SynthesisRequest<'_>,
    ) -> Result<ConstraintSet, SynthesisError> {
        let mut set = ConstraintSet::new().with(Constraint::syntactic(request.template.clone()));

        if let Some(hole) = request.hole() {
            let paths = self.search(
                request.ctx,
                request.target,
                &self.config.search_options(),
                request.interrupt,
            )?;
            if paths.is_empty() {
                tracing::debug!(ty = %request.target, hole, "no inhabitant found");
            }
            set.push(Constraint::type_paths(hole, request.target, paths));
        }
        if !request.examples.is_empty() {
            set.push(Constraint::examples(request.examples.clone()));
        }
        for (pattern, weight) in &request.weights {
            set.push(Constraint::contextual(pattern.clone(), *weight));
        }
        Ok(set)
    }

    // === Caches ===

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            paths: self.paths.stats(),
            grammars: self.grammars.stats(),
        }
    }

    /// Drop every cached path set and grammar.
    pub fn clear_caches(&self) {
        self.paths.clear();
        self.grammars.clear();
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .field("store", &self.store.as_ref().map(|(_, scope)| scope))
            .finish()
    }
}

/// Re-searches during repair go through the path cache.
struct CachedSearch<'a> {
    paths: &'a PathCache,
    ctx: &'a TypeContext,
    interrupt: Option<&'a Interrupt>,
}

impl PathSearch for CachedSearch<'_> {
    fn search(&self, target: TypeId, options: &SearchOptions) -> Result<RankedPathSet, SolveError> {
        self.paths.search(self.ctx, target, options, self.interrupt)
    }
}

/// One generation site.
#[derive(Clone, Debug)]
pub struct SynthesisRequest<'a> {
    pub ctx: &'a TypeContext,
    pub target: TypeId,
    pub template: GrammarTemplate,
    /// Hole the target fills; the template's primary hole when `None`.
    pub hole: Option<String>,
    pub examples: Vec<TestCase>,
    /// Contextual weights by pattern id.
    pub weights: Vec<(String, f64)>,
    pub interrupt: Option<&'a Interrupt>,
}

impl<'a> SynthesisRequest<'a> {
    /// A bare expression of type `target`.
    pub fn new(ctx: &'a TypeContext, target: TypeId) -> Self {
        SynthesisRequest {
            ctx,
            target,
            template: template::expression(),
            hole: None,
            examples: Vec::new(),
            weights: Vec::new(),
            interrupt: None,
        }
    }

    #[must_use]
    pub fn with_template(mut self, template: GrammarTemplate) -> Self {
        self.template = template;
        self
    }

    #[must_use]
    pub fn with_hole(mut self, hole: impl Into<String>) -> Self {
        self.hole = Some(hole.into());
        self
    }

    #[must_use]
    pub fn with_example(mut self, case: TestCase) -> Self {
        self.examples.push(case);
        self
    }

    #[must_use]
    pub fn with_weight(mut self, pattern: impl Into<String>, weight: f64) -> Self {
        self.weights.push((pattern.into(), weight));
        self
    }

    #[must_use]
    pub fn with_interrupt(mut self, interrupt: &'a Interrupt) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    /// Hole the Type constraint goes into.
    pub fn hole(&self) -> Option<&str> {
        self.hole
            .as_deref()
            .or_else(|| self.template.primary_hole().map(|h| h.name.as_str()))
    }
}

/// Counters of both caches.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub paths: CacheStats,
    pub grammars: CacheStats,
}

impl fmt::Display for EngineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "paths: {}; grammars: {}", self.paths, self.grammars)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "tests panic on failure")]
mod tests;
