//! Symbol table snapshot for one generation site.
//!
//! A [`TypeContext`] is produced once per request by [`TypeContextBuilder`]
//! and is read-only afterwards: the solver, grammar compiler and composer
//! only ever borrow it. Language-specific extraction stays outside the
//! engine behind the [`SymbolSource`] trait.
//!
//! Every context carries a [`ContextFingerprint`] over its full contents,
//! which the cache layer uses as part of its keys. New symbols mean a new
//! fingerprint, so stale cache entries simply stop matching.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHasher;

use crate::{Signature, TypeId, TypeRegistry};

/// A variable or parameter in scope.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Binding {
    pub name: String,
    pub ty: TypeId,
}

/// How a callable produces its value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    /// A free function: `name(args)`.
    Free,
    /// A constructor of `sig.ret`: `new T(args)` or the language equivalent.
    Constructor,
}

/// A free function or constructor in scope.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionDef {
    pub name: String,
    pub sig: Signature,
    pub kind: FunctionKind,
}

/// Identifier convention observed by the indexer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum NamingConvention {
    CamelCase,
    SnakeCase,
    #[default]
    Mixed,
}

/// Style hints reported by the indexer alongside symbols.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StyleSummary {
    /// Language tag, e.g. `typescript` or `python`.
    pub language: String,
    /// One level of indentation as used in the file.
    pub indent: String,
    pub naming: NamingConvention,
}

impl Default for StyleSummary {
    fn default() -> Self {
        StyleSummary {
            language: "generic".to_owned(),
            indent: "    ".to_owned(),
            naming: NamingConvention::default(),
        }
    }
}

/// Hash over the full contents of a [`TypeContext`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct ContextFingerprint(u64);

impl ContextFingerprint {
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        ContextFingerprint(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ContextFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextFingerprint({:016x})", self.0)
    }
}

impl fmt::Display for ContextFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Immutable symbol table: bindings, callables, style, and the registry they
/// reference.
#[derive(Clone, Debug)]
pub struct TypeContext {
    registry: Arc<TypeRegistry>,
    bindings: Vec<Binding>,
    functions: Vec<FunctionDef>,
    style: StyleSummary,
    fingerprint: ContextFingerprint,
}

impl TypeContext {
    /// The registry all type ids in this context point into.
    #[inline]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Shared handle to the registry.
    #[inline]
    pub fn shared_registry(&self) -> Arc<TypeRegistry> {
        Arc::clone(&self.registry)
    }

    /// Bindings in declaration order.
    #[inline]
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Free functions and constructors in declaration order.
    #[inline]
    pub fn functions(&self) -> &[FunctionDef] {
        &self.functions
    }

    #[inline]
    pub fn style(&self) -> &StyleSummary {
        &self.style
    }

    #[inline]
    pub fn fingerprint(&self) -> ContextFingerprint {
        self.fingerprint
    }

    /// Look up a binding by name.
    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.name == name)
    }

    /// Look up a callable by name. For overloaded names the first wins.
    pub fn function(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Constructor for a type, if one is in scope.
    pub fn constructor_of(&self, ty: TypeId) -> Option<&FunctionDef> {
        self.functions
            .iter()
            .find(|f| f.kind == FunctionKind::Constructor && f.sig.ret == ty)
    }

    fn compute_fingerprint(
        registry: &TypeRegistry,
        bindings: &[Binding],
        functions: &[FunctionDef],
        style: &StyleSummary,
    ) -> ContextFingerprint {
        let mut hasher = FxHasher::default();
        registry.hash_contents(&mut hasher);
        bindings.hash(&mut hasher);
        functions.hash(&mut hasher);
        style.hash(&mut hasher);
        ContextFingerprint(hasher.finish())
    }
}

/// Errors raised while building a [`TypeContext`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SymbolError {
    /// A symbol referenced a type id the registry does not contain.
    #[error("symbol `{symbol}` references unknown type {ty}")]
    UnknownType { symbol: String, ty: TypeId },

    /// Two bindings share a name.
    #[error("binding `{0}` declared twice")]
    DuplicateBinding(String),

    /// The symbol source itself failed.
    #[error("symbol source `{language}` failed: {message}")]
    Source { language: String, message: String },
}

/// Language-specific symbol extraction, implemented outside the engine.
///
/// Implementations push what they find into the [`SymbolSink`]; they never
/// see the finished context.
pub trait SymbolSource {
    /// Language tag recorded in the style summary.
    fn language(&self) -> &str {
        "generic"
    }

    /// Populate the sink with types, bindings and callables.
    fn collect(&self, sink: &mut SymbolSink<'_>) -> Result<(), SymbolError>;
}

impl<F> SymbolSource for F
where
    F: Fn(&mut SymbolSink<'_>) -> Result<(), SymbolError>,
{
    fn collect(&self, sink: &mut SymbolSink<'_>) -> Result<(), SymbolError> {
        self(sink)
    }
}

/// Write side handed to a [`SymbolSource`] during collection.
pub struct SymbolSink<'a> {
    registry: &'a mut TypeRegistry,
    bindings: &'a mut Vec<Binding>,
    functions: &'a mut Vec<FunctionDef>,
    style: &'a mut StyleSummary,
}

impl SymbolSink<'_> {
    /// Mutable access to the registry for declaring types and members.
    #[inline]
    pub fn registry(&mut self) -> &mut TypeRegistry {
        self.registry
    }

    /// Add a binding in scope.
    pub fn bind(&mut self, name: &str, ty: TypeId) -> Result<(), SymbolError> {
        if self.bindings.iter().any(|b| b.name == name) {
            return Err(SymbolError::DuplicateBinding(name.to_owned()));
        }
        self.bindings.push(Binding {
            name: name.to_owned(),
            ty,
        });
        Ok(())
    }

    /// Add a free function. Overloads may share a name.
    pub fn function(&mut self, name: &str, sig: Signature) {
        self.functions.push(FunctionDef {
            name: name.to_owned(),
            sig,
            kind: FunctionKind::Free,
        });
    }

    /// Add a constructor for `sig.ret`. `name` is the rendered type name.
    pub fn constructor(&mut self, name: &str, sig: Signature) {
        self.functions.push(FunctionDef {
            name: name.to_owned(),
            sig,
            kind: FunctionKind::Constructor,
        });
    }

    /// Replace the style summary (language tag is kept from the source).
    pub fn style(&mut self, style: StyleSummary) {
        let language = std::mem::take(&mut self.style.language);
        *self.style = StyleSummary { language, ..style };
    }
}

/// Builds a [`TypeContext`] from an injected [`SymbolSource`].
pub struct TypeContextBuilder<'s> {
    source: &'s dyn SymbolSource,
    registry: TypeRegistry,
}

impl<'s> TypeContextBuilder<'s> {
    /// Create a builder over a fresh registry.
    pub fn new(source: &'s dyn SymbolSource) -> Self {
        TypeContextBuilder {
            source,
            registry: TypeRegistry::new(),
        }
    }

    /// Start from a pre-populated registry (e.g. shared library types).
    #[must_use]
    pub fn with_registry(mut self, registry: TypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Run the source and freeze the result.
    ///
    /// Every type id mentioned by a binding or signature must exist in the
    /// registry; dangling ids are rejected here rather than discovered
    /// mid-search.
    #[tracing::instrument(level = "debug", skip_all, fields(language = self.source.language()))]
    pub fn build(self) -> Result<TypeContext, SymbolError> {
        let TypeContextBuilder {
            source,
            mut registry,
        } = self;

        let mut bindings = Vec::new();
        let mut functions = Vec::new();
        let mut style = StyleSummary {
            language: source.language().to_owned(),
            ..StyleSummary::default()
        };

        source.collect(&mut SymbolSink {
            registry: &mut registry,
            bindings: &mut bindings,
            functions: &mut functions,
            style: &mut style,
        })?;

        validate(&registry, &bindings, &functions)?;

        let fingerprint =
            TypeContext::compute_fingerprint(&registry, &bindings, &functions, &style);
        tracing::debug!(
            bindings = bindings.len(),
            functions = functions.len(),
            types = registry.len(),
            %fingerprint,
            "type context built"
        );

        Ok(TypeContext {
            registry: Arc::new(registry),
            bindings,
            functions,
            style,
            fingerprint,
        })
    }
}

fn validate(
    registry: &TypeRegistry,
    bindings: &[Binding],
    functions: &[FunctionDef],
) -> Result<(), SymbolError> {
    let check = |symbol: &str, ty: TypeId| {
        if registry.contains(ty) {
            Ok(())
        } else {
            Err(SymbolError::UnknownType {
                symbol: symbol.to_owned(),
                ty,
            })
        }
    };

    for binding in bindings {
        check(&binding.name, binding.ty)?;
    }
    for function in functions {
        check(&function.name, function.sig.ret)?;
        for param in &function.sig.params {
            check(&function.name, param.ty)?;
        }
    }
    for owner in registry.member_owners() {
        let Some(members) = registry.members(owner) else {
            continue;
        };
        for field in &members.fields {
            check(&field.name, field.ty)?;
        }
        for method in &members.methods {
            check(&method.name, method.sig.ret)?;
            for param in &method.sig.params {
                check(&method.name, param.ty)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "tests panic on failure")]
mod tests;
