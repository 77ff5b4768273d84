use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;
use passage_core::{Error, Result};
use serde::Serialize;

/// Counters and occupancy of a [`QueryCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub len: usize,
    pub capacity: usize,
}

struct CacheState {
    entries: LruCache<String, Vec<f32>>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// Bounded LRU of query embeddings keyed by the exact query text.
///
/// Lookups and inserts take one short lock; the embedding itself is computed
/// outside it.
pub struct QueryCache {
    state: Mutex<CacheState>,
}

impl QueryCache {
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| Error::InvalidConfig("cache capacity must be greater than zero".into()))?;
        Ok(Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
        })
    }

    /// Returns a copy of the cached vector and marks it most recently used.
    pub fn get(&self, key: &str) -> Option<Vec<f32>> {
        let mut state = self.state.lock();
        match state.entries.get(key).cloned() {
            Some(v) => {
                state.hits += 1;
                Some(v)
            }
            None => {
                state.misses += 1;
                None
            }
        }
    }

    /// Inserts or refreshes `key`, evicting the least recently used entry when full.
    pub fn insert(&self, key: String, value: Vec<f32>) {
        let mut state = self.state.lock();
        if let Some((old_key, _)) = state.entries.push(key.clone(), value) {
            // `push` hands back the previous value when the key was already present.
            if old_key != key {
                state.evictions += 1;
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().entries.contains(key)
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            len: state.entries.len(),
            capacity: state.entries.cap().get(),
        }
    }
}
