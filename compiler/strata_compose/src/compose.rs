//! Tier composition.

use std::sync::Arc;

use strata_grammar::template::{self, GrammarTemplate};
use strata_grammar::{
    compile_holes, CompileError, ConstraintConflict, Grammar, GrammarCompilationError, HoleFill,
    HoleKind, Symbol,
};
use strata_solver::RankedPathSet;
use strata_types::{TypeId, TypeRegistry};
use thiserror::Error;

use crate::{
    ConstraintSet, PatternWeightStore, ScoreBlend, ScoringFn, SemanticConstraint, Tier, TierSet,
    WeightScope,
};

/// Token accepted by an expression hole no Type constraint covers.
pub const OPEN_EXPRESSION: &str = r"[^\s;]+";

// === Errors ===

/// Hard constraint tiers that cannot be satisfied together.
///
/// Recoverable: relax the lowest-priority tier and compose again.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("constraint conflict between {tiers}: {detail}")]
pub struct TierConflict {
    pub tiers: TierSet,
    pub hole: Option<String>,
    pub detail: String,
    /// Compiler-level conflict this was raised from, if any.
    pub cause: Option<ConstraintConflict>,
}

impl TierConflict {
    /// Render as a `conflict` diagnostic.
    pub fn to_diagnostic(&self) -> strata_diagnostic::Diagnostic {
        let diagnostic = strata_diagnostic::conflict(self.tiers, &self.detail);
        match &self.hole {
            Some(hole) => diagnostic.with_hole(hole.clone()),
            None => diagnostic,
        }
    }
}

impl From<ConstraintConflict> for TierConflict {
    fn from(conflict: ConstraintConflict) -> Self {
        TierConflict {
            tiers: TierSet::SYNTACTIC | TierSet::TYPE,
            hole: Some(conflict.hole().to_owned()),
            detail: conflict.to_string(),
            cause: Some(conflict),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ComposeError {
    #[error(transparent)]
    Conflict(#[from] TierConflict),

    /// The compiler produced an invalid grammar. Never retried.
    #[error(transparent)]
    Invalid(#[from] GrammarCompilationError),
}

impl From<CompileError> for ComposeError {
    fn from(err: CompileError) -> Self {
        match err {
            CompileError::Conflict(conflict) => ComposeError::Conflict(conflict.into()),
            CompileError::Invalid(invalid) => ComposeError::Invalid(invalid),
        }
    }
}

// === Compiler seam ===

/// Compiles hole fills into a grammar.
///
/// The grammar cache wraps this to serve repeated fills without compiling.
pub trait GrammarCompiler: Send + Sync {
    fn compile(
        &self,
        fills: &[HoleFill<'_>],
        template: &GrammarTemplate,
        registry: &TypeRegistry,
    ) -> Result<Arc<Grammar>, CompileError>;
}

/// Compiles every request.
#[derive(Copy, Clone, Debug, Default)]
pub struct DirectCompiler;

impl GrammarCompiler for DirectCompiler {
    fn compile(
        &self,
        fills: &[HoleFill<'_>],
        template: &GrammarTemplate,
        registry: &TypeRegistry,
    ) -> Result<Arc<Grammar>, CompileError> {
        compile_holes(fills, template, registry).map(Arc::new)
    }
}

static DIRECT: DirectCompiler = DirectCompiler;

// === Output ===

/// Result of composing a constraint set.
#[derive(Clone, Debug)]
pub struct Composition {
    /// Hard tiers, compiled.
    pub grammar: Arc<Grammar>,
    /// Soft tiers, for ranking grammar-valid candidates.
    pub scoring: ScoringFn,
    /// Passed through untouched for post-hoc validation.
    pub semantic: Vec<SemanticConstraint>,
    /// Surviving paths per constrained hole, re-ranked by `scoring`.
    pub holes: Vec<(String, RankedPathSet)>,
    /// Id of the template the grammar was built from.
    pub template: String,
    /// Tiers present in the composed set.
    pub tiers: TierSet,
}

impl Composition {
    pub fn paths(&self, hole: &str) -> Option<&RankedPathSet> {
        self.holes
            .iter()
            .find(|(name, _)| name == hole)
            .map(|(_, paths)| paths)
    }

    /// Grammar in the decoder's dialect.
    pub fn lark(&self) -> String {
        self.grammar.to_lark()
    }
}

// === Composer ===

/// Composes constraint sets against one registry.
pub struct Composer<'a> {
    registry: &'a TypeRegistry,
    compiler: &'a dyn GrammarCompiler,
    blend: ScoreBlend,
    store: Option<(Arc<dyn PatternWeightStore>, WeightScope)>,
}

impl<'a> Composer<'a> {
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Composer {
            registry,
            compiler: &DIRECT,
            blend: ScoreBlend::DEFAULT,
            store: None,
        }
    }

    #[must_use]
    pub fn with_compiler(mut self, compiler: &'a dyn GrammarCompiler) -> Self {
        self.compiler = compiler;
        self
    }

    #[must_use]
    pub fn with_blend(mut self, blend: ScoreBlend) -> Self {
        self.blend = blend;
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn PatternWeightStore>, scope: WeightScope) -> Self {
        self.store = Some((store, scope));
        self
    }

    /// Compose `set` into a grammar and a scoring function.
    ///
    /// Type constraints on the same hole are intersected. Expression holes
    /// without a Type constraint accept any single [`OPEN_EXPRESSION`]
    /// token. Contextual constraints only reach the scoring function, and
    /// Semantic constraints are handed back unchanged.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(constraints = set.len(), tiers = %set.tiers())
    )]
    pub fn compose(&self, set: &ConstraintSet) -> Result<Composition, ComposeError> {
        let base = set.template().cloned().unwrap_or_else(template::expression);
        let merged = merge_type_constraints(set)?;

        let constrained: Vec<&str> = merged.iter().map(|m| m.hole.as_str()).collect();
        let template = open_unconstrained(&base, &constrained);

        let fills: Vec<HoleFill<'_>> = merged
            .iter()
            .flat_map(|m| {
                m.targets
                    .iter()
                    .map(move |&target| HoleFill::new(&m.hole, &m.paths).with_target(target))
            })
            .collect();
        let grammar = self
            .compiler
            .compile(&fills, &template, self.registry)
            .map_err(|err| {
                let err = ComposeError::from(err);
                match &err {
                    ComposeError::Conflict(conflict) => {
                        tracing::debug!(%conflict, "hard tiers conflict");
                    }
                    ComposeError::Invalid(invalid) => {
                        tracing::error!(error = %invalid, "composed grammar is invalid");
                    }
                }
                err
            })?;

        let scoring = self.scoring(set);
        let holes = merged
            .into_iter()
            .map(|m| {
                let ranked = scoring.rerank(&m.paths);
                (m.hole, ranked)
            })
            .collect();

        Ok(Composition {
            grammar,
            scoring,
            semantic: set.semantic().cloned().collect(),
            holes,
            template: base.id,
            tiers: set.tiers(),
        })
    }

    /// Compose, relaxing the lowest-priority tier on each conflict.
    ///
    /// Returns the composition and the tiers dropped from `set` along the
    /// way. When nothing is left to relax the last conflict is returned.
    pub fn compose_relaxing(
        &self,
        set: &mut ConstraintSet,
    ) -> Result<(Composition, Vec<Tier>), ComposeError> {
        let mut relaxed = Vec::new();
        loop {
            match self.compose(set) {
                Ok(composition) => return Ok((composition, relaxed)),
                Err(ComposeError::Conflict(conflict)) => match set.relax() {
                    Some(tier) => {
                        tracing::debug!(%tier, %conflict, "relaxing after conflict");
                        relaxed.push(tier);
                    }
                    None => return Err(ComposeError::Conflict(conflict)),
                },
                Err(err) => return Err(err),
            }
        }
    }

    fn scoring(&self, set: &ConstraintSet) -> ScoringFn {
        let mut scoring = ScoringFn::new(self.blend);
        if let Some((store, scope)) = &self.store {
            scoring = scoring.with_store(Arc::clone(store), scope.clone());
        }
        set.contextual().fold(scoring, |scoring, w| {
            scoring.with_pattern(w.pattern.clone(), w.weight)
        })
    }
}

/// Compose `set` with the default compiler and blend.
pub fn compose(set: &ConstraintSet, registry: &TypeRegistry) -> Result<Composition, ComposeError> {
    Composer::new(registry).compose(set)
}

/// Type constraints of one hole, ANDed.
struct MergedHole {
    hole: String,
    paths: RankedPathSet,
    /// Declared target of each constraint, deduplicated.
    targets: Vec<TypeId>,
}

/// AND together the Type constraints of each hole, in first-seen order.
fn merge_type_constraints(set: &ConstraintSet) -> Result<Vec<MergedHole>, TierConflict> {
    let mut merged = Vec::new();
    for hole in set.holes() {
        let mut count = 0usize;
        let mut paths: Option<RankedPathSet> = None;
        let mut targets: Vec<TypeId> = Vec::new();
        for constraint in set.for_hole(hole) {
            count += 1;
            if !targets.contains(&constraint.target) {
                targets.push(constraint.target);
            }
            paths = Some(match paths {
                Some(acc) => acc.intersect(&constraint.paths),
                None => constraint.paths.clone(),
            });
        }
        let paths = paths.unwrap_or_default();
        if count > 1 && paths.is_empty() {
            return Err(TierConflict {
                tiers: TierSet::TYPE,
                hole: Some(hole.to_owned()),
                detail: format!("{count} type constraints on hole `{hole}` share no path"),
                cause: None,
            });
        }
        merged.push(MergedHole {
            hole: hole.to_owned(),
            paths,
            targets,
        });
    }
    Ok(merged)
}

/// Replace expression holes outside `constrained` with an open token.
fn open_unconstrained(base: &GrammarTemplate, constrained: &[&str]) -> GrammarTemplate {
    let open: Vec<&str> = base
        .holes
        .iter()
        .filter(|h| matches!(h.kind, HoleKind::Expression { .. }))
        .map(|h| h.name.as_str())
        .filter(|name| !constrained.contains(name))
        .collect();
    if open.is_empty() {
        return base.clone();
    }

    let mut template = base.clone();
    template.holes.retain(|h| !open.contains(&h.name.as_str()));
    for rule in &mut template.rules {
        for alt in &mut rule.alternatives {
            for sym in alt.iter_mut() {
                if matches!(sym, Symbol::Hole(name) if open.contains(&name.as_str())) {
                    *sym = Symbol::regex(OPEN_EXPRESSION);
                }
            }
        }
    }
    template
}
