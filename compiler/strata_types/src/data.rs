//! Interned type shapes.

use crate::TypeId;

/// The shape stored behind a [`TypeId`].
///
/// Child types are handles, so `TypeData` is flat and cheap to hash; the
/// registry uses it as the interning key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum TypeData {
    /// A named primitive (`string`, `number`, `int`, ...).
    Primitive(Box<str>),

    /// A normalized union: at least two members, sorted, no duplicates,
    /// never containing another union.
    Union(Box<[TypeId]>),

    /// Homogeneous array.
    Array(TypeId),

    /// Applied generic, e.g. `Promise<string>` or `Map<string, number>`.
    Generic {
        /// Generic type name.
        name: Box<str>,
        /// Type arguments in order.
        args: Box<[TypeId]>,
    },

    /// Function type.
    Function {
        /// Parameter types.
        params: Box<[TypeId]>,
        /// Return type.
        ret: TypeId,
    },

    /// Nominal struct/class. Properties and methods live in the registry's
    /// member table so that self-referential structs need no back edges.
    Struct(Box<str>),
}

impl TypeData {
    /// Check if this is a union.
    #[inline]
    pub fn is_union(&self) -> bool {
        matches!(self, Self::Union(_))
    }

    /// Check if this is a struct.
    #[inline]
    pub fn is_struct(&self) -> bool {
        matches!(self, Self::Struct(_))
    }

    /// Union members, if this is a union.
    pub fn union_members(&self) -> Option<&[TypeId]> {
        match self {
            Self::Union(members) => Some(&**members),
            _ => None,
        }
    }

    /// Nominal name for primitives, structs and generics.
    pub fn nominal_name(&self) -> Option<&str> {
        match self {
            Self::Primitive(name) | Self::Struct(name) | Self::Generic { name, .. } => {
                Some(&**name)
            }
            Self::Union(_) | Self::Array(_) | Self::Function { .. } => None,
        }
    }
}
