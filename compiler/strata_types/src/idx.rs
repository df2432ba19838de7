//! Type handle.
//!
//! `TypeId` is the only way the rest of the engine refers to a type. Handles
//! are indices into a [`TypeRegistry`](crate::TypeRegistry) arena, so cycles
//! in the type graph (a `Node` with a `next: Node` property) never become
//! cycles in memory.
//!
//! # Pre-interned primitives
//!
//! The primitives shared by every supported language are interned at fixed
//! indices when a registry is created, so they can be named without a
//! registry at hand.

use std::fmt;

/// A 32-bit index into the type registry.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct TypeId(u32);

impl TypeId {
    // === Primitive Types (indices 0-5) ===

    /// The `string` type.
    pub const STRING: Self = Self(0);
    /// The `number` type.
    pub const NUMBER: Self = Self(1);
    /// The `boolean` type.
    pub const BOOLEAN: Self = Self(2);
    /// The `void` type (no value).
    pub const VOID: Self = Self(3);
    /// The `null` type.
    pub const NULL: Self = Self(4);
    /// The `never` type (empty union, no values).
    pub const NEVER: Self = Self(5);

    /// Number of pre-interned primitive types.
    pub const PRIMITIVE_COUNT: u32 = 6;

    /// First index handed out for dynamically interned types.
    pub const FIRST_DYNAMIC: u32 = Self::PRIMITIVE_COUNT;

    /// Sentinel meaning "no type", used as the origin of top-level searches.
    pub const NONE: Self = Self(u32::MAX);

    /// Create a handle from a raw index.
    ///
    /// The caller is responsible for the index being valid in the registry
    /// it is used with; lookups on an unknown index return `None`.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw index.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Index as `usize` for arena access.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Check if this is one of the pre-interned primitives.
    #[inline]
    pub const fn is_builtin_primitive(self) -> bool {
        self.0 < Self::FIRST_DYNAMIC
    }

    /// Check if this is the NONE sentinel.
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    /// Name of a pre-interned primitive, `None` for everything else.
    #[inline]
    pub const fn builtin_name(self) -> Option<&'static str> {
        match self.0 {
            0 => Some("string"),
            1 => Some("number"),
            2 => Some("boolean"),
            3 => Some("void"),
            4 => Some("null"),
            5 => Some("never"),
            _ => None,
        }
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::STRING => write!(f, "TypeId::STRING"),
            Self::NUMBER => write!(f, "TypeId::NUMBER"),
            Self::BOOLEAN => write!(f, "TypeId::BOOLEAN"),
            Self::VOID => write!(f, "TypeId::VOID"),
            Self::NULL => write!(f, "TypeId::NULL"),
            Self::NEVER => write!(f, "TypeId::NEVER"),
            Self::NONE => write!(f, "TypeId::NONE"),
            _ => write!(f, "TypeId({})", self.0),
        }
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.builtin_name() {
            Some(name) => f.write_str(name),
            None if self.is_none() => f.write_str("<none>"),
            None => write!(f, "type#{}", self.0),
        }
    }
}

const _: () = assert!(std::mem::size_of::<TypeId>() == 4);
