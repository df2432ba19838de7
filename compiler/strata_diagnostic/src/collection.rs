//! Deduplicating diagnostic collection.

use rustc_hash::FxHashSet;

use crate::{Category, Diagnostic, Severity};

/// Counts used to score an attempt.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Summary {
    /// Errors that fail the attempt.
    pub hard: usize,
    /// Warnings, plus errors in soft categories.
    pub warnings: usize,
}

/// Diagnostics in report order, without repeats.
///
/// Two diagnostics repeat when they share category, hole and message; the
/// first one reported is kept.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
    seen: FxHashSet<(Category, Option<String>, String)>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic. Returns `false` if it repeats an earlier one.
    pub fn push(&mut self, diagnostic: Diagnostic) -> bool {
        let key = (
            diagnostic.category,
            diagnostic.hole.clone(),
            diagnostic.message.clone(),
        );
        if !self.seen.insert(key) {
            return false;
        }
        self.items.push(diagnostic);
        true
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.items
    }

    pub fn has_hard(&self) -> bool {
        self.items.iter().any(Diagnostic::is_hard)
    }

    pub fn has_category(&self, category: Category) -> bool {
        self.items.iter().any(|d| d.category == category)
    }

    pub fn of_category(&self, category: Category) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(move |d| d.category == category)
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for d in &self.items {
            if d.is_hard() {
                summary.hard += 1;
            } else if d.severity != Severity::Note {
                summary.warnings += 1;
            }
        }
        summary
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        for d in iter {
            self.push(d);
        }
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        let mut out = Diagnostics::new();
        out.extend(iter);
        out
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
