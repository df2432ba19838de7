use thiserror::Error;

/// What was wrong with a corrupt entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CorruptionKind {
    /// Another key with the same fingerprint is stored.
    KeyMismatch,
    /// The payload no longer matches the digest taken at insert.
    DigestMismatch,
}

/// A cache entry failed verification on read.
///
/// Only the affected key is lost: the entry is evicted and the caller
/// recomputes.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("corrupt entry {fingerprint:016x} in {cache} cache ({kind:?})")]
pub struct CacheCorruption {
    pub cache: &'static str,
    pub fingerprint: u64,
    pub kind: CorruptionKind,
}
