//! Signatures and member tables.

use crate::TypeId;

/// A function or method parameter.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct Param {
    /// Parameter name as written in source.
    pub name: String,
    /// Parameter type.
    pub ty: TypeId,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: TypeId) -> Self {
        Param {
            name: name.into(),
            ty,
        }
    }
}

/// Parameter list plus return type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct Signature {
    pub params: Vec<Param>,
    pub ret: TypeId,
}

impl Signature {
    pub fn new(params: Vec<Param>, ret: TypeId) -> Self {
        Signature { params, ret }
    }

    /// A nullary signature returning `ret`.
    pub fn returning(ret: TypeId) -> Self {
        Signature {
            params: Vec::new(),
            ret,
        }
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Parameter types in order.
    pub fn param_types(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.params.iter().map(|p| p.ty)
    }
}

/// A property of a struct (or an intrinsic property of any type).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeId,
}

/// A method callable on values of the owning type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct MethodDef {
    pub name: String,
    pub sig: Signature,
}

/// Properties and methods attached to one type id.
///
/// Stored as vectors: declaration order is part of the data model (it breaks
/// ranking ties), and member lists are short enough that linear lookup wins.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct Members {
    pub fields: Vec<FieldDef>,
    pub methods: Vec<MethodDef>,
}

impl Members {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a property by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a method by name.
    pub fn method(&self, name: &str) -> Option<&MethodDef> {
        self.methods.iter().find(|m| m.name == name)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.methods.is_empty()
    }
}
