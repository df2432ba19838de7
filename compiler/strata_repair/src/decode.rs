//! Decoder seam.

use std::time::Duration;

use strata_compose::Composition;
use strata_solver::Path;

use crate::DecodeError;

/// A path the decoder followed to fill a hole.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Provenance {
    pub hole: String,
    pub path: Path,
}

/// What a decoder returns: the code and the paths it came from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Decoded {
    pub code: String,
    pub provenance: Vec<Provenance>,
}

impl Decoded {
    pub fn new(code: impl Into<String>) -> Self {
        Decoded {
            code: code.into(),
            provenance: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_provenance(mut self, hole: impl Into<String>, path: Path) -> Self {
        self.provenance.push(Provenance {
            hole: hole.into(),
            path,
        });
        self
    }

    pub fn paths(&self) -> Vec<Path> {
        self.provenance.iter().map(|p| p.path.clone()).collect()
    }
}

/// One call to the decoder.
pub struct DecodeRequest<'a> {
    /// Grammar (via `composition.lark()`), ranked paths and scoring.
    pub composition: &'a Composition,
    /// 1-based attempt number.
    pub attempt: u32,
    /// The decoder must return within this long. Output arriving later is
    /// discarded as a timeout.
    pub timeout: Duration,
}

/// External constrained decoder.
///
/// Applies the grammar token by token and returns the generated code.
pub trait Decoder: Send + Sync {
    fn decode(&self, request: &DecodeRequest<'_>) -> Result<Decoded, DecodeError>;
}
