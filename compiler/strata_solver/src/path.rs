//! Expression-construction paths.
//!
//! A [`Path`] is a root step (a binding, a free function call, or a
//! constructor) followed by member steps (property reads and method calls).
//! Call steps carry one [`Argument`] per parameter, each holding the ranked
//! candidate paths that can fill it.
//!
//! Paths are only built through [`Path::new`] / [`Path::extend`], which
//! replay every step against the context and refuse sequences whose computed
//! type does not fit the target.

use std::fmt;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;
use smallvec::SmallVec;
use strata_types::{
    Fitness, FunctionDef, FunctionKind, Signature, TypeContext, TypeId, TypeRegistry,
};

use crate::{PathError, RankedPathSet};

/// One operation in a path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Step {
    /// Use a binding in scope as-is.
    Identity { binding: String },

    /// Read a property of the current value.
    PropertyAccess { name: String },

    /// Call a method on the current value.
    MethodCall { name: String, args: Vec<Argument> },

    /// Call a free function.
    FunctionApplication { name: String, args: Vec<Argument> },

    /// Construct a value of `ty`; `name` is the rendered type name.
    Constructor {
        ty: TypeId,
        name: String,
        args: Vec<Argument>,
    },
}

impl Step {
    /// Roots start a path; member steps continue one.
    #[inline]
    pub fn is_root(&self) -> bool {
        matches!(
            self,
            Step::Identity { .. } | Step::FunctionApplication { .. } | Step::Constructor { .. }
        )
    }

    /// Arguments of a call step, empty otherwise.
    pub fn args(&self) -> &[Argument] {
        match self {
            Step::MethodCall { args, .. }
            | Step::FunctionApplication { args, .. }
            | Step::Constructor { args, .. } => args,
            Step::Identity { .. } | Step::PropertyAccess { .. } => &[],
        }
    }
}

/// Ranked candidates for one call parameter.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct Argument {
    /// Parameter name from the callee signature.
    pub param: String,
    /// Parameter type.
    pub ty: TypeId,
    /// Paths that can fill the parameter, best first. Never empty in a
    /// checked path.
    pub candidates: RankedPathSet,
}

impl Argument {
    /// Highest-ranked candidate.
    #[inline]
    pub fn best(&self) -> Option<&Path> {
        self.candidates.first()
    }
}

/// Stable identity of a path's step sequence, independent of its target.
///
/// Two paths with the same key render to the same expression, so keys are
/// what exclusion and intersection compare.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct PathKey(u64);

impl PathKey {
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// A checked step sequence producing a value that fits `target`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct Path {
    steps: SmallVec<[Step; 2]>,
    /// Type the steps actually produce.
    ty: TypeId,
    /// Type the path was built for.
    target: TypeId,
    fitness: Fitness,
    length: u32,
}

impl Hash for Path {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.steps.hash(state);
    }
}

impl Path {
    /// Build and check a path.
    pub fn new(
        steps: impl IntoIterator<Item = Step>,
        target: TypeId,
        ctx: &TypeContext,
    ) -> Result<Path, PathError> {
        let steps: SmallVec<[Step; 2]> = steps.into_iter().collect();
        let replay = replay(&steps, ctx)?;
        let Some(fitness) = ctx.registry().fitness(replay.ty, target) else {
            return Err(PathError::TypeMismatch {
                found: replay.ty,
                target,
            });
        };

        Ok(Path {
            steps,
            ty: replay.ty,
            target,
            fitness: fitness.meet(replay.arg_fitness),
            length: replay.length,
        })
    }

    /// A checked copy of this path with one more member step.
    pub fn extend(&self, step: Step, target: TypeId, ctx: &TypeContext) -> Result<Path, PathError> {
        Path::new(self.steps.iter().cloned().chain([step]), target, ctx)
    }

    #[inline]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Type produced by replaying the steps.
    #[inline]
    pub fn ty(&self) -> TypeId {
        self.ty
    }

    #[inline]
    pub fn target(&self) -> TypeId {
        self.target
    }

    #[inline]
    pub fn fitness(&self) -> Fitness {
        self.fitness
    }

    /// Non-identity steps plus the length of each argument's best candidate.
    #[inline]
    pub fn length(&self) -> u32 {
        self.length
    }

    /// True for a bare binding reference.
    #[inline]
    pub fn is_identity(&self) -> bool {
        self.length == 0 && matches!(self.steps.as_slice(), [Step::Identity { .. }])
    }

    /// Target-independent identity of the step sequence.
    pub fn key(&self) -> PathKey {
        let mut hasher = FxHasher::default();
        self.steps.hash(&mut hasher);
        PathKey(hasher.finish())
    }

    /// Shape of the expression with arguments elided, e.g. `user.format(_)`.
    ///
    /// Used as the pattern id that contextual weights attach to.
    pub fn pattern_id(&self) -> String {
        let mut out = String::new();
        for step in &self.steps {
            match step {
                Step::Identity { binding } => out.push_str(binding),
                Step::PropertyAccess { name } => {
                    out.push('.');
                    out.push_str(name);
                }
                Step::MethodCall { name, args } => {
                    out.push('.');
                    push_elided_call(&mut out, name, args.len());
                }
                Step::FunctionApplication { name, args } => {
                    push_elided_call(&mut out, name, args.len());
                }
                Step::Constructor { name, args, .. } => {
                    out.push_str("new ");
                    push_elided_call(&mut out, name, args.len());
                }
            }
        }
        out
    }
}

fn push_elided_call(out: &mut String, name: &str, arity: usize) {
    out.push_str(name);
    out.push('(');
    for i in 0..arity {
        if i > 0 {
            out.push_str(", ");
        }
        out.push('_');
    }
    out.push(')');
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            match step {
                Step::Identity { binding } => f.write_str(binding)?,
                Step::PropertyAccess { name } => write!(f, ".{name}")?,
                Step::MethodCall { name, args } => {
                    write!(f, ".{name}(")?;
                    write_args(f, args)?;
                    f.write_str(")")?;
                }
                Step::FunctionApplication { name, args } => {
                    write!(f, "{name}(")?;
                    write_args(f, args)?;
                    f.write_str(")")?;
                }
                Step::Constructor { name, args, .. } => {
                    write!(f, "new {name}(")?;
                    write_args(f, args)?;
                    f.write_str(")")?;
                }
            }
        }
        Ok(())
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Argument]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        match arg.best() {
            Some(best) => write!(f, "{best}")?,
            None => f.write_str("?")?,
        }
    }
    Ok(())
}

// === Replay ===

struct Replay {
    ty: TypeId,
    arg_fitness: Fitness,
    length: u32,
}

fn replay(steps: &[Step], ctx: &TypeContext) -> Result<Replay, PathError> {
    let registry = ctx.registry();
    let Some((root, members)) = steps.split_first() else {
        return Err(PathError::Empty);
    };

    let mut state = Replay {
        ty: TypeId::NONE,
        arg_fitness: Fitness::Exact,
        length: 0,
    };

    match root {
        Step::Identity { binding } => {
            let found = ctx
                .binding(binding)
                .ok_or_else(|| PathError::UnknownBinding(binding.clone()))?;
            state.ty = found.ty;
        }
        Step::FunctionApplication { name, args } => {
            let function = resolve_callable(ctx, name, args, |f| {
                f.kind == FunctionKind::Free && f.name == *name
            })?;
            check_call(&mut state, name, &function.sig, args, registry)?;
            state.ty = function.sig.ret;
        }
        Step::Constructor { ty, name, args } => {
            let function = resolve_callable(ctx, name, args, |f| {
                f.kind == FunctionKind::Constructor && f.sig.ret == *ty
            })?;
            check_call(&mut state, name, &function.sig, args, registry)?;
            state.ty = *ty;
        }
        Step::PropertyAccess { .. } | Step::MethodCall { .. } => {
            return Err(PathError::RootExpected { index: 0 });
        }
    }

    for (offset, step) in members.iter().enumerate() {
        let index = offset + 1;
        match step {
            Step::PropertyAccess { name } => {
                let field = registry.field(state.ty, name).ok_or_else(|| {
                    PathError::UnknownMember {
                        owner: state.ty,
                        name: name.clone(),
                    }
                })?;
                state.ty = field.ty;
                state.length += 1;
            }
            Step::MethodCall { name, args } => {
                let method = registry.method(state.ty, name).ok_or_else(|| {
                    PathError::UnknownMember {
                        owner: state.ty,
                        name: name.clone(),
                    }
                })?;
                check_call(&mut state, name, &method.sig, args, registry)?;
                state.ty = method.sig.ret;
            }
            Step::Identity { .. } | Step::FunctionApplication { .. } | Step::Constructor { .. } => {
                return Err(PathError::MemberExpected { index });
            }
        }
    }

    Ok(state)
}

/// The callable a root call step names.
///
/// Overloads share a name (or, for constructors, a return type) and are
/// told apart by the parameters recorded in the step's arguments. When none
/// matches exactly the first is returned, so `check_call` reports why.
fn resolve_callable<'c>(
    ctx: &'c TypeContext,
    name: &str,
    args: &[Argument],
    named: impl Fn(&FunctionDef) -> bool,
) -> Result<&'c FunctionDef, PathError> {
    let mut overloads = ctx.functions().iter().filter(|f| named(f));
    let first = overloads
        .next()
        .ok_or_else(|| PathError::UnknownFunction(name.to_owned()))?;
    if takes(&first.sig, args) {
        return Ok(first);
    }
    Ok(overloads.find(|f| takes(&f.sig, args)).unwrap_or(first))
}

fn takes(sig: &Signature, args: &[Argument]) -> bool {
    sig.arity() == args.len()
        && sig
            .params
            .iter()
            .zip(args)
            .all(|(param, arg)| param.ty == arg.ty && param.name == arg.param)
}

/// Check a call's arguments against its signature and account for them.
///
/// The call itself counts as one step; each argument adds its best
/// candidate's length.
fn check_call(
    state: &mut Replay,
    callee: &str,
    sig: &Signature,
    args: &[Argument],
    registry: &TypeRegistry,
) -> Result<(), PathError> {
    if sig.arity() != args.len() {
        return Err(PathError::ArityMismatch {
            callee: callee.to_owned(),
            expected: sig.arity(),
            found: args.len(),
        });
    }

    state.length += 1;
    for (param, arg) in sig.params.iter().zip(args) {
        let mismatch = || PathError::ArgumentMismatch {
            callee: callee.to_owned(),
            param: param.name.clone(),
            expected: param.ty,
        };
        let best = arg.best().ok_or_else(mismatch)?;
        if !arg
            .candidates
            .iter()
            .all(|candidate| registry.fits(candidate.ty(), param.ty))
        {
            return Err(mismatch());
        }
        state.arg_fitness = state.arg_fitness.meet(best.fitness());
        state.length += best.length();
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "tests panic on failure")]
mod tests;
