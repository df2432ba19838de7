//! Sharded LRU map.
//!
//! Keys are spread over a fixed number of shards by fingerprint. Each shard
//! has its own `RwLock`, so readers never block each other and a writer only
//! blocks its own shard. Recency is a global atomic tick stamped on every
//! hit; eviction scans one shard for its oldest stamp.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHasher};

use crate::{CacheCorruption, CacheStats, CorruptionKind};

/// Number of lock stripes.
pub const NUM_SHARDS: usize = 16;

/// A cache key with a content fingerprint.
///
/// Equal keys must have equal fingerprints. Unequal keys may collide; the
/// cache detects that on read.
pub trait CacheKey: Clone + Eq {
    fn fingerprint(&self) -> u64;
}

/// Digest of a payload, checked on every read.
pub(crate) fn digest<V: Hash>(value: &V) -> u64 {
    let mut hasher = FxHasher::default();
    value.hash(&mut hasher);
    hasher.finish()
}

struct Entry<K, V> {
    key: K,
    value: V,
    digest: u64,
    last_access: AtomicU64,
}

struct Shard<K, V> {
    entries: FxHashMap<u64, Entry<K, V>>,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
    corruptions: AtomicU64,
}

/// Bounded, lock-striped LRU map.
pub struct ShardedLru<K, V> {
    name: &'static str,
    shards: [RwLock<Shard<K, V>>; NUM_SHARDS],
    shard_capacity: usize,
    tick: AtomicU64,
    counters: Counters,
}

impl<K: CacheKey, V: Clone + Hash> ShardedLru<K, V> {
    /// `capacity` is split evenly across shards, rounding up, so the cache
    /// may hold slightly more than requested. Zero is treated as one.
    pub fn new(name: &'static str, capacity: usize) -> Self {
        ShardedLru {
            name,
            shards: std::array::from_fn(|_| {
                RwLock::new(Shard {
                    entries: FxHashMap::default(),
                })
            }),
            shard_capacity: capacity.max(1).div_ceil(NUM_SHARDS),
            tick: AtomicU64::new(0),
            counters: Counters::default(),
        }
    }

    #[inline]
    fn shard_for(fingerprint: u64) -> usize {
        // Fx mixes the low bits poorly for sequential ids; fold the high half in.
        #[expect(
            clippy::cast_possible_truncation,
            reason = "result is reduced modulo NUM_SHARDS"
        )]
        let folded = (fingerprint ^ (fingerprint >> 32)) as usize;
        folded % NUM_SHARDS
    }

    /// Total capacity across shards.
    pub fn capacity(&self) -> usize {
        self.shard_capacity * NUM_SHARDS
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|s| s.read().entries.is_empty())
    }

    /// Look up `key`, treating corruption as a miss.
    pub fn get(&self, key: &K) -> Option<V> {
        match self.try_get(key) {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(error = %err, "evicted corrupt cache entry");
                None
            }
        }
    }

    /// Look up `key`.
    ///
    /// A corrupt entry (key mismatch or digest mismatch) is evicted before
    /// the error is returned, so the next insert replaces it.
    pub fn try_get(&self, key: &K) -> Result<Option<V>, CacheCorruption> {
        let fingerprint = key.fingerprint();
        let shard = &self.shards[Self::shard_for(fingerprint)];

        let kind = {
            let guard = shard.read();
            match guard.entries.get(&fingerprint) {
                None => {
                    self.counters.misses.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!(cache = self.name, fingerprint, "miss");
                    return Ok(None);
                }
                Some(entry) if entry.key != *key => CorruptionKind::KeyMismatch,
                Some(entry) if digest(&entry.value) != entry.digest => {
                    CorruptionKind::DigestMismatch
                }
                Some(entry) => {
                    let now = self.tick.fetch_add(1, Ordering::Relaxed);
                    entry.last_access.store(now, Ordering::Relaxed);
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!(cache = self.name, fingerprint, "hit");
                    return Ok(Some(entry.value.clone()));
                }
            }
        };

        shard.write().entries.remove(&fingerprint);
        self.counters.corruptions.fetch_add(1, Ordering::Relaxed);
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        Err(CacheCorruption {
            cache: self.name,
            fingerprint,
            kind,
        })
    }

    /// Insert or replace `key`. Replacing with an equal value is harmless,
    /// so concurrent writers of one key need no coordination.
    pub fn insert(&self, key: K, value: V) {
        let fingerprint = key.fingerprint();
        let entry = Entry {
            digest: digest(&value),
            key,
            value,
            last_access: AtomicU64::new(self.tick.fetch_add(1, Ordering::Relaxed)),
        };

        let mut guard = self.shards[Self::shard_for(fingerprint)].write();
        guard.entries.insert(fingerprint, entry);
        self.counters.inserts.fetch_add(1, Ordering::Relaxed);

        while guard.entries.len() > self.shard_capacity {
            let oldest = guard
                .entries
                .iter()
                .filter(|(fp, _)| **fp != fingerprint)
                .min_by_key(|(_, e)| e.last_access.load(Ordering::Relaxed))
                .map(|(fp, _)| *fp);
            let Some(oldest) = oldest else { break };
            guard.entries.remove(&oldest);
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(cache = self.name, fingerprint = oldest, "evicted");
        }
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let fingerprint = key.fingerprint();
        let mut guard = self.shards[Self::shard_for(fingerprint)].write();
        match guard.entries.get(&fingerprint) {
            Some(entry) if entry.key == *key => guard.entries.remove(&fingerprint).map(|e| e.value),
            _ => None,
        }
    }

    pub fn clear(&self) {
        for shard in &self.shards {
            shard.write().entries.clear();
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            inserts: self.counters.inserts.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            corruptions: self.counters.corruptions.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    /// Overwrite a stored payload without updating its digest.
    #[cfg(test)]
    pub(crate) fn tamper(&self, key: &K, value: V) {
        let fingerprint = key.fingerprint();
        let mut guard = self.shards[Self::shard_for(fingerprint)].write();
        if let Some(entry) = guard.entries.get_mut(&fingerprint) {
            entry.value = value;
        }
    }
}
