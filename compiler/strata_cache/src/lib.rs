//! In-memory caches for search and compilation.
//!
//! - [`PathCache`]: ranked paths keyed by origin, target, context
//!   fingerprint, depth and search options.
//! - [`GrammarCache`]: compiled grammars keyed by the serialized path sets
//!   and the template. It implements
//!   [`GrammarCompiler`](strata_compose::GrammarCompiler), so the composer
//!   can use it directly.
//!
//! Neither cache invalidates anything. Keys are content fingerprints; when
//! the content changes, the key changes and the old entry ages out.

mod error;
mod grammars;
mod lru;
mod paths;
mod stats;

pub use error::{CacheCorruption, CorruptionKind};
pub use grammars::{GrammarCache, GrammarCacheKey, DEFAULT_GRAMMAR_CAPACITY};
pub use lru::{CacheKey, ShardedLru, NUM_SHARDS};
pub use paths::{PathCache, PathCacheKey, DEFAULT_PATH_CAPACITY};
pub use stats::CacheStats;
