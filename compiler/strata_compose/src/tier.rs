//! Constraint tiers and tier sets.

use std::fmt;

use bitflags::bitflags;

/// The four constraint tiers, from strongest to weakest.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    /// Grammar template: what the surrounding code looks like.
    Syntactic,
    /// Ranked paths for a hole: which expressions type-check.
    Type,
    /// Behavioral examples, checked after generation.
    Semantic,
    /// Learned pattern weights, used only for ranking.
    Contextual,
}

impl Tier {
    /// Relaxation order: the first tier present in this list is dropped
    /// first. Syntactic never relaxes.
    pub const RELAXATION_ORDER: [Tier; 3] = [Tier::Contextual, Tier::Semantic, Tier::Type];

    /// Hard tiers restrict the grammar.
    #[inline]
    pub fn is_hard(self) -> bool {
        matches!(self, Tier::Syntactic | Tier::Type)
    }

    pub fn flag(self) -> TierSet {
        match self {
            Tier::Syntactic => TierSet::SYNTACTIC,
            Tier::Type => TierSet::TYPE,
            Tier::Semantic => TierSet::SEMANTIC,
            Tier::Contextual => TierSet::CONTEXTUAL,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Syntactic => "Syntactic",
            Tier::Type => "Type",
            Tier::Semantic => "Semantic",
            Tier::Contextual => "Contextual",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    /// A set of tiers, e.g. the tiers present in a constraint set or the
    /// tiers a conflict involves.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct TierSet: u8 {
        const SYNTACTIC = 1 << 0;
        const TYPE = 1 << 1;
        const SEMANTIC = 1 << 2;
        const CONTEXTUAL = 1 << 3;

        const HARD = Self::SYNTACTIC.bits() | Self::TYPE.bits();
    }
}

impl TierSet {
    /// Member tiers, strongest first.
    pub fn tiers(self) -> impl Iterator<Item = Tier> {
        [Tier::Syntactic, Tier::Type, Tier::Semantic, Tier::Contextual]
            .into_iter()
            .filter(move |t| self.contains(t.flag()))
    }
}

impl fmt::Display for TierSet {
    /// `Syntactic + Type`, or `none`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        for (i, tier) in self.tiers().enumerate() {
            if i > 0 {
                f.write_str(" + ")?;
            }
            f.write_str(tier.as_str())?;
        }
        Ok(())
    }
}
