//! Type fitness: how well a value of one type fills a slot of another.
//!
//! Only two outcomes admit a value: an exact match or a widening. Anything
//! else (`number` into `string`, say) is a coercion and is rejected outright
//! rather than ranked lower.

use std::cmp::Ordering;

use crate::{TypeData, TypeId, TypeRegistry};

/// Degree to which a source type fits a target type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Fitness {
    /// Source and target are the same type.
    Exact,
    /// Source widens into target without conversion code.
    Widening,
}

impl Fitness {
    /// Ranking weight: higher is better.
    #[inline]
    pub const fn score(self) -> u8 {
        match self {
            Fitness::Exact => 2,
            Fitness::Widening => 1,
        }
    }

    /// Combine the fitness of two positions: the result is only as good as
    /// the weaker part.
    #[inline]
    #[must_use]
    pub fn meet(self, other: Fitness) -> Fitness {
        if self == Fitness::Exact && other == Fitness::Exact {
            Fitness::Exact
        } else {
            Fitness::Widening
        }
    }
}

impl PartialOrd for Fitness {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fitness {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score().cmp(&other.score())
    }
}

impl TypeRegistry {
    /// Fitness of a `from` value in a `to` slot, `None` if it would need a
    /// coercion.
    ///
    /// Widening rules:
    /// - a member flows into any union containing it
    /// - a union flows into a union containing all of its members
    /// - `T[]` flows into `U[]` when `T` widens into `U`
    /// - registered primitive widenings (`int -> float`)
    /// - `never` flows anywhere
    pub fn fitness(&self, from: TypeId, to: TypeId) -> Option<Fitness> {
        if from == to {
            return Some(Fitness::Exact);
        }
        if from == TypeId::NEVER || self.is_registered_widening(from, to) {
            return Some(Fitness::Widening);
        }

        match (self.get(from)?, self.get(to)?) {
            (TypeData::Union(sources), TypeData::Union(_)) => sources
                .iter()
                .all(|&s| self.fitness(s, to).is_some())
                .then_some(Fitness::Widening),
            (_, TypeData::Union(targets)) => targets
                .iter()
                .any(|&t| self.fitness(from, t).is_some())
                .then_some(Fitness::Widening),
            (TypeData::Array(a), TypeData::Array(b)) => {
                self.fitness(*a, *b).map(|_| Fitness::Widening)
            }
            _ => None,
        }
    }

    /// Shorthand for `fitness(from, to).is_some()`.
    #[inline]
    pub fn fits(&self, from: TypeId, to: TypeId) -> bool {
        self.fitness(from, to).is_some()
    }
}
