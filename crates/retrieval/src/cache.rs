//! Bounded LRU cache of query vectors with single-flight misses.
//!
//! Keys are the exact query text. The mutex guards only the map and recency
//! bookkeeping and is never held while a vector is being computed. Concurrent
//! misses on one key share a single in-flight computation: the first caller
//! runs it, later callers wait on the same cell and reuse its result.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Shared, immutable query vector.
pub type CachedVector = Arc<[f32]>;

/// Counters exposed through engine status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub capacity: usize,
    pub len: usize,
    pub hits: u64,
    pub misses: u64,

    /// Misses that joined another caller's in-flight computation
    pub coalesced: u64,
    pub evictions: u64,
}

struct Slot {
    vector: CachedVector,
    tick: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, Slot>,
    /// tick -> key, oldest first
    recency: BTreeMap<u64, String>,
    next_tick: u64,
    in_flight: HashMap<String, Arc<OnceCell<CachedVector>>>,
    hits: u64,
    misses: u64,
    coalesced: u64,
    evictions: u64,
}

impl CacheState {
    fn tick(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }

    /// Return the cached vector and mark it most recently used.
    fn touch(&mut self, key: &str) -> Option<CachedVector> {
        let tick = self.tick();
        let slot = self.entries.get_mut(key)?;
        let old = std::mem::replace(&mut slot.tick, tick);
        let vector = slot.vector.clone();

        self.recency.remove(&old);
        self.recency.insert(tick, key.to_string());
        Some(vector)
    }

    fn insert(&mut self, key: &str, vector: CachedVector, capacity: usize) {
        if self.touch(key).is_some() {
            return;
        }

        while self.entries.len() >= capacity {
            let Some((_, oldest)) = self.recency.pop_first() else {
                break;
            };
            self.entries.remove(&oldest);
            self.evictions += 1;
            tracing::debug!(key = %oldest, "Evicted query vector");
        }

        let tick = self.tick();
        self.recency.insert(tick, key.to_string());
        self.entries.insert(key.to_string(), Slot { vector, tick });
    }

    /// Drop the in-flight marker if it still belongs to `cell`.
    fn finish(&mut self, key: &str, cell: &Arc<OnceCell<CachedVector>>) {
        if self
            .in_flight
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, cell))
        {
            self.in_flight.remove(key);
        }
    }
}

pub struct QueryCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

impl QueryCache {
    /// Create a cache holding at most `capacity` vectors (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Read an entry without touching recency or counters.
    pub fn peek(&self, key: &str) -> Option<CachedVector> {
        self.lock().entries.get(key).map(|slot| slot.vector.clone())
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            capacity: self.capacity,
            len: state.entries.len(),
            hits: state.hits,
            misses: state.misses,
            coalesced: state.coalesced,
            evictions: state.evictions,
        }
    }

    /// Return the vector for `key`, computing it with `compute` on a miss.
    ///
    /// At most one computation runs per missing key at a time. Failures are
    /// not cached; if the running computation fails or is dropped, a waiting
    /// caller runs its own `compute` instead.
    pub async fn get_or_compute<F, Fut, E>(&self, key: &str, compute: F) -> Result<CachedVector, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<f32>, E>>,
    {
        let (cell, owner) = {
            let mut state = self.lock();

            if let Some(vector) = state.touch(key) {
                state.hits += 1;
                tracing::trace!(key, "Query cache hit");
                return Ok(vector);
            }

            match state.in_flight.get(key) {
                Some(cell) => {
                    let cell = cell.clone();
                    state.coalesced += 1;
                    tracing::debug!(key, "Joining in-flight query embedding");
                    (cell, false)
                }
                None => {
                    let cell = Arc::new(OnceCell::new());
                    state.in_flight.insert(key.to_string(), cell.clone());
                    state.misses += 1;
                    tracing::debug!(key, "Query cache miss");
                    (cell, true)
                }
            }
        };

        // The owner clears the in-flight marker even if dropped mid-compute
        let flight = InFlight {
            cache: self,
            key,
            cell,
            owner,
        };

        let result = flight
            .cell
            .get_or_try_init(|| async { compute().await.map(CachedVector::from) })
            .await
            .cloned();

        if let Ok(vector) = &result {
            self.lock().insert(key, vector.clone(), self.capacity);
        }

        result
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock()
    }
}

/// A caller's stake in one in-flight computation.
struct InFlight<'a> {
    cache: &'a QueryCache,
    key: &'a str,
    cell: Arc<OnceCell<CachedVector>>,
    owner: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.owner {
            self.cache.lock().finish(self.key, &self.cell);
        }
    }
}
