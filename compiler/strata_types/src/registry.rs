//! Type registry: the per-request arena behind every [`TypeId`].
//!
//! # Design
//!
//! - Interning: structurally equal shapes share one id, so equality is O(1)
//! - Dense `Vec` storage indexed by id, `FxHashMap` for deduplication
//! - Member tables keyed by owner id, kept out of `TypeData` so struct
//!   shapes stay hashable and self-references stay index-based
//! - Built mutably by the indexer, then frozen behind an `Arc` inside a
//!   [`TypeContext`](crate::TypeContext)

use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::{FieldDef, Members, MethodDef, Signature, TypeData, TypeId};

/// Arena of interned types plus their member tables.
#[derive(Clone, Debug)]
pub struct TypeRegistry {
    /// Type shapes indexed by `TypeId::index()`.
    types: Vec<TypeData>,

    /// Shape -> id, for deduplication.
    map: FxHashMap<TypeData, TypeId>,

    /// Properties and methods by owning type.
    members: FxHashMap<TypeId, Members>,

    /// Registered primitive widenings (`from`, `to`), e.g. `int -> float`.
    widenings: FxHashSet<(TypeId, TypeId)>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Create a registry with the builtin primitives pre-interned.
    pub fn new() -> Self {
        let mut registry = TypeRegistry {
            types: Vec::with_capacity(64),
            map: FxHashMap::default(),
            members: FxHashMap::default(),
            widenings: FxHashSet::default(),
        };

        for raw in 0..TypeId::PRIMITIVE_COUNT {
            let id = TypeId::from_raw(raw);
            if let Some(name) = id.builtin_name() {
                let interned = registry.intern(TypeData::Primitive(name.into()));
                debug_assert_eq!(interned, id);
            }
        }

        registry
    }

    /// Intern a shape, returning the existing id if it is already known.
    ///
    /// Unions should go through [`TypeRegistry::union`], which normalizes
    /// them first; interning a raw `TypeData::Union` skips normalization.
    pub fn intern(&mut self, data: TypeData) -> TypeId {
        if let Some(&id) = self.map.get(&data) {
            return id;
        }

        #[expect(
            clippy::cast_possible_truncation,
            reason = "a single request never holds 4 billion types"
        )]
        let id = TypeId::from_raw(self.types.len() as u32);
        self.types.push(data.clone());
        self.map.insert(data, id);
        id
    }

    // === Constructors ===

    /// Intern a primitive by name. Builtin names return their fixed ids.
    pub fn primitive(&mut self, name: &str) -> TypeId {
        self.intern(TypeData::Primitive(name.into()))
    }

    /// Intern a normalized union.
    ///
    /// Nested unions are flattened, members are sorted and deduplicated.
    /// A single remaining member is returned as-is; no members yields `never`.
    pub fn union(&mut self, members: impl IntoIterator<Item = TypeId>) -> TypeId {
        let mut flat = Vec::new();
        for member in members {
            match self.get(member) {
                Some(TypeData::Union(inner)) => flat.extend_from_slice(inner),
                _ => flat.push(member),
            }
        }
        flat.retain(|&m| m != TypeId::NEVER);
        flat.sort_unstable();
        flat.dedup();

        match flat.len() {
            0 => TypeId::NEVER,
            1 => flat[0],
            _ => self.intern(TypeData::Union(flat.into_boxed_slice())),
        }
    }

    /// Intern an array type.
    pub fn array(&mut self, elem: TypeId) -> TypeId {
        self.intern(TypeData::Array(elem))
    }

    /// Intern an applied generic.
    pub fn generic(&mut self, name: &str, args: impl Into<Box<[TypeId]>>) -> TypeId {
        self.intern(TypeData::Generic {
            name: name.into(),
            args: args.into(),
        })
    }

    /// Intern a function type.
    pub fn function(&mut self, params: impl Into<Box<[TypeId]>>, ret: TypeId) -> TypeId {
        self.intern(TypeData::Function {
            params: params.into(),
            ret,
        })
    }

    /// Declare a nominal struct, returning its id.
    ///
    /// Declaring the same name twice returns the same id. Members are added
    /// afterwards, which lets a struct refer to itself.
    pub fn declare_struct(&mut self, name: &str) -> TypeId {
        self.intern(TypeData::Struct(name.into()))
    }

    // === Members ===

    /// Attach a property to `owner`. Re-adding a name replaces its type in place.
    pub fn add_field(&mut self, owner: TypeId, name: &str, ty: TypeId) {
        let members = self.members.entry(owner).or_default();
        if let Some(existing) = members.fields.iter_mut().find(|f| f.name == name) {
            existing.ty = ty;
        } else {
            members.fields.push(FieldDef {
                name: name.to_owned(),
                ty,
            });
        }
    }

    /// Attach a method to `owner`. Re-adding a name replaces its signature in place.
    pub fn add_method(&mut self, owner: TypeId, name: &str, sig: Signature) {
        let members = self.members.entry(owner).or_default();
        if let Some(existing) = members.methods.iter_mut().find(|m| m.name == name) {
            existing.sig = sig;
        } else {
            members.methods.push(MethodDef {
                name: name.to_owned(),
                sig,
            });
        }
    }

    /// Declare a struct and attach its members in one call.
    pub fn define_struct(
        &mut self,
        name: &str,
        fields: &[(&str, TypeId)],
        methods: Vec<(&str, Signature)>,
    ) -> TypeId {
        let id = self.declare_struct(name);
        for &(field, ty) in fields {
            self.add_field(id, field, ty);
        }
        for (method, sig) in methods {
            self.add_method(id, method, sig);
        }
        id
    }

    /// Register a primitive widening `from -> to` (e.g. `int -> float`).
    pub fn allow_widening(&mut self, from: TypeId, to: TypeId) {
        self.widenings.insert((from, to));
    }

    // === Lookup ===

    /// Look up the shape behind an id.
    #[inline]
    pub fn get(&self, id: TypeId) -> Option<&TypeData> {
        self.types.get(id.index())
    }

    /// Check whether an id belongs to this registry.
    #[inline]
    pub fn contains(&self, id: TypeId) -> bool {
        id.index() < self.types.len()
    }

    /// Member table of a type, if any members were attached.
    #[inline]
    pub fn members(&self, id: TypeId) -> Option<&Members> {
        self.members.get(&id)
    }

    /// Property of `owner` by name.
    pub fn field(&self, owner: TypeId, name: &str) -> Option<&FieldDef> {
        self.members(owner)?.field(name)
    }

    /// Method of `owner` by name.
    pub fn method(&self, owner: TypeId, name: &str) -> Option<&MethodDef> {
        self.members(owner)?.method(name)
    }

    /// Owners that have at least one member, in id order.
    pub fn member_owners(&self) -> Vec<TypeId> {
        let mut owners: Vec<TypeId> = self.members.keys().copied().collect();
        owners.sort_unstable();
        owners
    }

    /// Check whether `from -> to` was registered as a widening.
    #[inline]
    pub fn is_registered_widening(&self, from: TypeId, to: TypeId) -> bool {
        self.widenings.contains(&(from, to))
    }

    /// Number of interned types.
    #[inline]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Always false: builtins are interned at creation.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterate over all `(id, shape)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeData)> {
        self.types.iter().enumerate().map(|(i, data)| {
            #[expect(clippy::cast_possible_truncation, reason = "bounded by intern")]
            let id = TypeId::from_raw(i as u32);
            (id, data)
        })
    }

    /// Feed the full registry contents into a hasher in a stable order.
    ///
    /// Used for context fingerprints: any new type, member or widening
    /// changes the hash.
    pub fn hash_contents<H: Hasher>(&self, state: &mut H) {
        self.types.hash(state);
        for owner in self.member_owners() {
            owner.hash(state);
            self.members[&owner].hash(state);
        }
        let mut widenings: Vec<_> = self.widenings.iter().copied().collect();
        widenings.sort_unstable();
        widenings.hash(state);
    }

    // === Formatting ===

    /// Format a type for diagnostics and grammar rendering.
    pub fn display(&self, id: TypeId) -> String {
        let mut buf = String::new();
        self.display_into(id, &mut buf);
        buf
    }

    /// Format a type into an existing buffer.
    pub fn display_into(&self, id: TypeId, buf: &mut String) {
        let Some(data) = self.get(id) else {
            buf.push_str(&id.to_string());
            return;
        };

        match data {
            TypeData::Primitive(name) | TypeData::Struct(name) => buf.push_str(name),
            TypeData::Union(members) => {
                for (i, &member) in members.iter().enumerate() {
                    if i > 0 {
                        buf.push_str(" | ");
                    }
                    self.display_into(member, buf);
                }
            }
            TypeData::Array(elem) => {
                let needs_parens = matches!(
                    self.get(*elem),
                    Some(TypeData::Union(_) | TypeData::Function { .. })
                );
                if needs_parens {
                    buf.push('(');
                }
                self.display_into(*elem, buf);
                if needs_parens {
                    buf.push(')');
                }
                buf.push_str("[]");
            }
            TypeData::Generic { name, args } => {
                buf.push_str(name);
                buf.push('<');
                self.display_list(args, buf);
                buf.push('>');
            }
            TypeData::Function { params, ret } => {
                buf.push('(');
                self.display_list(params, buf);
                buf.push_str(") => ");
                self.display_into(*ret, buf);
            }
        }
    }

    fn display_list(&self, ids: &[TypeId], buf: &mut String) {
        for (i, &id) in ids.iter().enumerate() {
            if i > 0 {
                buf.push_str(", ");
            }
            self.display_into(id, buf);
        }
    }
}
