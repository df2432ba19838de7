use std::fmt;

/// Counters for one cache. A snapshot; later activity is not reflected.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
    pub corruptions: u64,
    pub entries: usize,
}

impl CacheStats {
    /// Hits over lookups, or `0.0` before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries, {} hits / {} misses ({:.1}%), {} evicted, {} corrupt",
            self.entries,
            self.hits,
            self.misses,
            self.hit_rate() * 100.0,
            self.evictions,
            self.corruptions
        )
    }
}
