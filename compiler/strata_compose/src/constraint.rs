//! Constraints and constraint sets.

use strata_diagnostic::TestCase;
use strata_grammar::GrammarTemplate;
use strata_solver::RankedPathSet;
use strata_types::TypeId;

use crate::{Tier, TierSet};

/// Paths allowed in one hole.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeConstraint {
    pub hole: String,
    pub target: TypeId,
    pub paths: RankedPathSet,
}

/// Behavioral expectations checked after generation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SemanticConstraint {
    pub examples: Vec<TestCase>,
    /// Free-form properties for property-based validators.
    pub properties: Vec<String>,
}

/// Learned weight for a path pattern (see `Path::pattern_id`).
#[derive(Clone, Debug, PartialEq)]
pub struct ContextualWeight {
    pub pattern: String,
    pub weight: f64,
}

/// One constraint, tagged by tier.
#[derive(Clone, Debug, PartialEq)]
pub enum Constraint {
    Syntactic(GrammarTemplate),
    Type(TypeConstraint),
    Semantic(SemanticConstraint),
    Contextual(ContextualWeight),
}

impl Constraint {
    pub fn syntactic(template: GrammarTemplate) -> Self {
        Constraint::Syntactic(template)
    }

    pub fn type_paths(hole: impl Into<String>, target: TypeId, paths: RankedPathSet) -> Self {
        Constraint::Type(TypeConstraint {
            hole: hole.into(),
            target,
            paths,
        })
    }

    pub fn examples(examples: Vec<TestCase>) -> Self {
        Constraint::Semantic(SemanticConstraint {
            examples,
            properties: Vec::new(),
        })
    }

    pub fn contextual(pattern: impl Into<String>, weight: f64) -> Self {
        Constraint::Contextual(ContextualWeight {
            pattern: pattern.into(),
            weight,
        })
    }

    pub fn tier(&self) -> Tier {
        match self {
            Constraint::Syntactic(_) => Tier::Syntactic,
            Constraint::Type(_) => Tier::Type,
            Constraint::Semantic(_) => Tier::Semantic,
            Constraint::Contextual(_) => Tier::Contextual,
        }
    }
}

/// The constraints active for one generation attempt.
///
/// Hard tiers (Syntactic, Type) shape the grammar, Contextual weights feed
/// the scoring function, and Semantic constraints pass through untouched to
/// validation. Rebuilt for every repair attempt.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConstraintSet {
    constraints: Vec<Constraint>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, constraint: Constraint) -> Self {
        self.push(constraint);
        self
    }

    pub fn push(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Constraint> {
        self.constraints.iter()
    }

    /// Tiers with at least one constraint.
    pub fn tiers(&self) -> TierSet {
        self.constraints
            .iter()
            .fold(TierSet::empty(), |acc, c| acc | c.tier().flag())
    }

    // === Per-tier views ===

    /// The grammar template. With several Syntactic constraints the first
    /// one wins.
    pub fn template(&self) -> Option<&GrammarTemplate> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::Syntactic(template) => Some(template),
            _ => None,
        })
    }

    pub fn type_constraints(&self) -> impl Iterator<Item = &TypeConstraint> {
        self.constraints.iter().filter_map(|c| match c {
            Constraint::Type(t) => Some(t),
            _ => None,
        })
    }

    pub fn semantic(&self) -> impl Iterator<Item = &SemanticConstraint> {
        self.constraints.iter().filter_map(|c| match c {
            Constraint::Semantic(s) => Some(s),
            _ => None,
        })
    }

    pub fn contextual(&self) -> impl Iterator<Item = &ContextualWeight> {
        self.constraints.iter().filter_map(|c| match c {
            Constraint::Contextual(w) => Some(w),
            _ => None,
        })
    }

    /// Holes named by Type constraints, in first-seen order.
    pub fn holes(&self) -> Vec<&str> {
        let mut holes: Vec<&str> = Vec::new();
        for t in self.type_constraints() {
            if !holes.contains(&t.hole.as_str()) {
                holes.push(&t.hole);
            }
        }
        holes
    }

    /// Type constraints on one hole.
    pub fn for_hole<'s>(&'s self, hole: &'s str) -> impl Iterator<Item = &'s TypeConstraint> {
        self.type_constraints().filter(move |t| t.hole == hole)
    }

    // === Refinement ===

    /// Add a failing example to the first Semantic constraint, creating one
    /// if needed.
    pub fn add_example(&mut self, case: TestCase) {
        let existing = self.constraints.iter_mut().find_map(|c| match c {
            Constraint::Semantic(s) => Some(s),
            _ => None,
        });
        match existing {
            Some(semantic) => {
                if !semantic.examples.contains(&case) {
                    semantic.examples.push(case);
                }
            }
            None => self.push(Constraint::examples(vec![case])),
        }
    }

    /// Replace every Type constraint on `hole` with one allowing `paths`.
    pub fn narrow_type(&mut self, hole: &str, target: TypeId, paths: RankedPathSet) {
        self.constraints
            .retain(|c| !matches!(c, Constraint::Type(t) if t.hole == hole));
        self.push(Constraint::type_paths(hole, target, paths));
    }

    /// Drop every constraint of the lowest-priority tier present.
    ///
    /// Tiers relax in the order Contextual, Semantic, Type. Returns the tier
    /// dropped, or `None` when only Syntactic constraints (or nothing)
    /// remain.
    pub fn relax(&mut self) -> Option<Tier> {
        let present = self.tiers();
        let tier = Tier::RELAXATION_ORDER
            .into_iter()
            .find(|t| present.contains(t.flag()))?;
        self.constraints.retain(|c| c.tier() != tier);
        tracing::debug!(%tier, remaining = self.constraints.len(), "relaxed constraint tier");
        Some(tier)
    }
}

impl FromIterator<Constraint> for ConstraintSet {
    fn from_iter<I: IntoIterator<Item = Constraint>>(iter: I) -> Self {
        ConstraintSet {
            constraints: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ConstraintSet {
    type Item = &'a Constraint;
    type IntoIter = std::slice::Iter<'a, Constraint>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
