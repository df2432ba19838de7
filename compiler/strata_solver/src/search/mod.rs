//! Bounded, memoized inhabitation search.
//!
//! For a target type the search unions four source kinds, in this order:
//!
//! 1. bindings whose type fits the target,
//! 2. properties that fit, read off recursively inhabited receivers,
//! 3. methods whose return type fits, called on inhabited receivers with
//!    inhabited arguments,
//! 4. free functions and constructors whose return type fits, applied to
//!    inhabited arguments.
//!
//! Discovery order only breaks ties; the result is ranked afterwards.
//!
//! Each recursion level costs one unit of depth. A per-branch `visited` set
//! stops a chain from re-entering a type it is already inhabiting; when that
//! happens only bindings are offered, which is what lets `node.next` be found
//! while inhabiting `Node`. Results are memoized per request by
//! `(origin, target, depth)`; the memo never outlives one `search` call.

use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashMap, FxHashSet, FxHasher};
use strata_stack::with_stack;
use strata_types::{FunctionKind, Signature, TypeContext, TypeId};

use crate::{
    Argument, Interrupt, Path, PathError, PathKey, PathWeights, RankedPathSet, SolveError, Step,
};

/// Default recursion bound per branch.
pub const DEFAULT_MAX_DEPTH: u32 = 5;

/// Default cap on ranked paths kept per target.
pub const DEFAULT_MAX_PATHS: usize = 64;

/// Default cap on candidates kept per call argument.
pub const DEFAULT_MAX_CANDIDATES: usize = 8;

/// Bounds and exclusions for one search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchOptions {
    /// Recursive expansions allowed per branch.
    pub max_depth: u32,
    /// Paths kept per target (including the top-level result).
    pub max_paths: usize,
    /// Candidates kept per call argument.
    pub max_candidates: usize,
    /// Keys removed from the top-level result.
    pub excluded: FxHashSet<PathKey>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            max_depth: DEFAULT_MAX_DEPTH,
            max_paths: DEFAULT_MAX_PATHS,
            max_candidates: DEFAULT_MAX_CANDIDATES,
            excluded: FxHashSet::default(),
        }
    }
}

impl SearchOptions {
    pub fn with_max_depth(max_depth: u32) -> Self {
        SearchOptions {
            max_depth,
            ..Self::default()
        }
    }

    /// Also exclude every path in `previous`.
    #[must_use]
    pub fn excluding(mut self, previous: &RankedPathSet) -> Self {
        self.excluded.extend(previous.keys());
        self
    }

    /// Hash of the breadth limits and exclusions.
    ///
    /// `max_depth` is left out; cache keys carry it separately.
    pub fn fingerprint(&self) -> u64 {
        let mut excluded: Vec<PathKey> = self.excluded.iter().copied().collect();
        excluded.sort_unstable();

        let mut hasher = FxHasher::default();
        self.max_paths.hash(&mut hasher);
        self.max_candidates.hash(&mut hasher);
        excluded.hash(&mut hasher);
        hasher.finish()
    }
}

/// Find ranked paths producing `target` within `max_depth`.
///
/// Uses default breadth limits and no learned weights. An empty set means no
/// inhabitant was found.
pub fn find_paths(ctx: &TypeContext, target: TypeId, max_depth: u32) -> RankedPathSet {
    match Solver::new(ctx).search(target, &SearchOptions::with_max_depth(max_depth)) {
        Ok(paths) => paths,
        Err(err) => {
            tracing::debug!(%target, error = %err, "search produced no paths");
            RankedPathSet::empty()
        }
    }
}

/// Work done by one search.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Memo misses that expanded a type.
    pub expansions: u64,
    /// Requests answered from the memo without re-descending.
    pub memo_hits: u64,
    /// Distinct `(origin, target, depth)` entries memoized.
    pub memoized: usize,
}

/// Inhabitation search over one read-only context.
pub struct Solver<'a> {
    ctx: &'a TypeContext,
    weights: Option<&'a dyn PathWeights>,
    interrupt: Option<&'a Interrupt>,
}

impl<'a> Solver<'a> {
    pub fn new(ctx: &'a TypeContext) -> Self {
        Solver {
            ctx,
            weights: None,
            interrupt: None,
        }
    }

    /// Use learned weights as the tertiary ranking key.
    #[must_use]
    pub fn with_weights(mut self, weights: &'a dyn PathWeights) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Poll `interrupt` at every expansion.
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: &'a Interrupt) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    /// Run the search.
    ///
    /// Returns at most `options.max_paths` paths, none of them in
    /// `options.excluded`.
    pub fn search(
        &self,
        target: TypeId,
        options: &SearchOptions,
    ) -> Result<RankedPathSet, SolveError> {
        self.search_with_stats(target, options).map(|(paths, _)| paths)
    }

    /// [`Solver::search`], also reporting the work it took.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(target = %target, max_depth = options.max_depth)
    )]
    pub fn search_with_stats(
        &self,
        target: TypeId,
        options: &SearchOptions,
    ) -> Result<(RankedPathSet, SearchStats), SolveError> {
        if !self.ctx.registry().contains(target) {
            return Err(SolveError::UnknownTarget(target));
        }

        let mut state = SearchState {
            solver: self,
            options,
            memo: FxHashMap::default(),
            visited: FxHashSet::default(),
            expansions: 0,
            memo_hits: 0,
        };
        let found = state.inhabit(TypeId::NONE, target, options.max_depth)?;
        let result = found.without(&options.excluded).truncate(options.max_paths);
        let stats = SearchStats {
            expansions: state.expansions,
            memo_hits: state.memo_hits,
            memoized: state.memo.len(),
        };

        tracing::debug!(
            found = found.len(),
            kept = result.len(),
            expansions = stats.expansions,
            memo_hits = stats.memo_hits,
            memoized = stats.memoized,
            "search complete"
        );
        Ok((result, stats))
    }

    fn rank(&self, paths: Vec<Path>) -> RankedPathSet {
        match self.weights {
            Some(weights) => RankedPathSet::rank_weighted(paths, weights),
            None => RankedPathSet::rank(paths),
        }
    }
}

// === Search state ===

/// Memo key: the type being expanded when the request was made, the type
/// requested, and the depth remaining.
type MemoKey = (TypeId, TypeId, u32);

struct SearchState<'s, 'a> {
    solver: &'s Solver<'a>,
    options: &'s SearchOptions,
    memo: FxHashMap<MemoKey, RankedPathSet>,
    visited: FxHashSet<TypeId>,
    expansions: u64,
    memo_hits: u64,
}

impl SearchState<'_, '_> {
    fn ctx(&self) -> &TypeContext {
        self.solver.ctx
    }

    fn inhabit(
        &mut self,
        origin: TypeId,
        target: TypeId,
        depth: u32,
    ) -> Result<RankedPathSet, SolveError> {
        if let Some(interrupt) = self.solver.interrupt {
            interrupt.check(self.expansions)?;
        }

        // Re-entering a type on the current chain: bindings only.
        if self.visited.contains(&target) {
            return Ok(self.solver.rank(self.identities(target)));
        }

        let key = (origin, target, depth);
        if let Some(hit) = self.memo.get(&key) {
            tracing::trace!(%origin, %target, depth, "memo hit");
            self.memo_hits += 1;
            return Ok(hit.clone());
        }

        self.expansions += 1;
        self.visited.insert(target);
        let expanded = with_stack(|| self.expand(target, depth));
        self.visited.remove(&target);

        let ranked = self.solver.rank(expanded?);
        self.memo.insert(key, ranked.clone());
        Ok(ranked)
    }

    fn expand(&mut self, target: TypeId, depth: u32) -> Result<Vec<Path>, SolveError> {
        let mut paths = self.identities(target);
        if depth == 0 {
            return Ok(paths);
        }
        let next = depth - 1;
        let registry = self.ctx().shared_registry();

        // Properties
        for owner in registry.member_owners() {
            let Some(members) = registry.members(owner) else {
                continue;
            };
            for field in members.fields.iter().filter(|f| registry.fits(f.ty, target)) {
                let receivers = self.receivers(target, owner, next)?;
                for receiver in &receivers {
                    let step = Step::PropertyAccess {
                        name: field.name.clone(),
                    };
                    self.push_checked(&mut paths, receiver.extend(step, target, self.ctx()));
                }
            }
        }

        // Methods
        for owner in registry.member_owners() {
            let Some(members) = registry.members(owner) else {
                continue;
            };
            for method in members
                .methods
                .iter()
                .filter(|m| registry.fits(m.sig.ret, target))
            {
                let Some(args) = self.arguments(target, &method.sig, next)? else {
                    continue;
                };
                let receivers = self.receivers(target, owner, next)?;
                for receiver in &receivers {
                    let step = Step::MethodCall {
                        name: method.name.clone(),
                        args: args.clone(),
                    };
                    self.push_checked(&mut paths, receiver.extend(step, target, self.ctx()));
                }
            }
        }

        // Functions and constructors
        let ctx = self.solver.ctx;
        for function in ctx
            .functions()
            .iter()
            .filter(|f| registry.fits(f.sig.ret, target))
        {
            let Some(args) = self.arguments(target, &function.sig, next)? else {
                continue;
            };
            let step = match function.kind {
                FunctionKind::Free => Step::FunctionApplication {
                    name: function.name.clone(),
                    args,
                },
                FunctionKind::Constructor => Step::Constructor {
                    ty: function.sig.ret,
                    name: function.name.clone(),
                    args,
                },
            };
            self.push_checked(&mut paths, Path::new([step], target, ctx));
        }

        Ok(paths)
    }

    /// Bindings in declaration order whose type fits `target`.
    fn identities(&self, target: TypeId) -> Vec<Path> {
        let ctx = self.ctx();
        ctx.bindings()
            .iter()
            .filter(|b| ctx.registry().fits(b.ty, target))
            .filter_map(|b| {
                let step = Step::Identity {
                    binding: b.name.clone(),
                };
                Path::new([step], target, ctx).ok()
            })
            .collect()
    }

    fn receivers(
        &mut self,
        origin: TypeId,
        owner: TypeId,
        depth: u32,
    ) -> Result<RankedPathSet, SolveError> {
        Ok(self
            .inhabit(origin, owner, depth)?
            .truncate(self.options.max_paths))
    }

    /// One argument per parameter, or `None` if any parameter has no
    /// candidate.
    fn arguments(
        &mut self,
        origin: TypeId,
        sig: &Signature,
        depth: u32,
    ) -> Result<Option<Vec<Argument>>, SolveError> {
        let mut args = Vec::with_capacity(sig.arity());
        for param in &sig.params {
            let candidates = self
                .inhabit(origin, param.ty, depth)?
                .truncate(self.options.max_candidates);
            if candidates.is_empty() {
                return Ok(None);
            }
            args.push(Argument {
                param: param.name.clone(),
                ty: param.ty,
                candidates,
            });
        }
        Ok(Some(args))
    }

    fn push_checked(&self, paths: &mut Vec<Path>, built: Result<Path, PathError>) {
        match built {
            Ok(path) => paths.push(path),
            Err(err) => tracing::error!(error = %err, "solver built an invalid path"),
        }
    }
}
