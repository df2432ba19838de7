//! Learned path weights.

use crate::Path;

/// Source of the tertiary ranking key.
///
/// `None` means "no opinion"; such paths rank as weight `0.0`.
pub trait PathWeights {
    fn weight(&self, path: &Path) -> Option<f64>;
}

impl<F> PathWeights for F
where
    F: Fn(&Path) -> Option<f64>,
{
    fn weight(&self, path: &Path) -> Option<f64> {
        self(path)
    }
}
