//! Variant Cache
//!
//! Stores built variants (assembled source, or compiled program handles)
//! keyed by permutation identity and guarantees **at most one build per key**
//! even when many threads request the same unseen key at once.
//!
//! # Concurrency
//!
//! A single `parking_lot::Mutex` guards two maps and is only held for map
//! operations, never across a build:
//!
//! - `ready`: finished entries (`Arc<V>`), optionally LRU-bounded.
//! - `in_flight`: one [`InFlight`] slot per key currently being built.
//!
//! The first caller for a key registers a slot and runs the build without the
//! lock. Later callers for that key clone the slot and block on its condvar
//! until the result is published. Callers for other keys never wait on it.
//!
//! A failed build is removed from `in_flight` and its error delivered to every
//! waiter, so the next request retries. A panicking build is reported as
//! [`WeaveError::BuildAbandoned`] through the same path.
//!
//! Eviction only touches `ready`; in-flight builds are never evicted.

use std::fmt;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::{Condvar, Mutex};
use rustc_hash::{FxBuildHasher, FxHashMap};

use crate::errors::{Result, WeaveError};

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests served from a finished entry.
    pub hits: u64,
    /// Requests that ran a build.
    pub builds: u64,
    /// Requests that waited on another caller's build.
    pub waits: u64,
    /// Builds that returned an error or panicked.
    pub failures: u64,
    /// Finished entries dropped by the capacity bound.
    pub evictions: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    builds: AtomicU64,
    waits: AtomicU64,
    failures: AtomicU64,
    evictions: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Completion handle for one in-progress build.
struct InFlight<V> {
    result: Mutex<Option<Result<Arc<V>>>>,
    done: Condvar,
}

impl<V> InFlight<V> {
    fn new() -> Self {
        Self {
            result: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    fn publish(&self, result: Result<Arc<V>>) {
        *self.result.lock() = Some(result);
        self.done.notify_all();
    }

    fn wait(&self) -> Result<Arc<V>> {
        let mut guard = self.result.lock();
        loop {
            if let Some(result) = guard.as_ref() {
                return result.clone();
            }
            self.done.wait(&mut guard);
        }
    }
}

struct CacheState<K, V> {
    ready: LruCache<K, Arc<V>, FxBuildHasher>,
    in_flight: FxHashMap<K, Arc<InFlight<V>>>,
}

/// Keyed build-once cache.
pub struct VariantCache<K, V> {
    state: Mutex<CacheState<K, V>>,
    counters: Counters,
    capacity: Option<NonZeroUsize>,
}

impl<K, V> Default for VariantCache<K, V>
where
    K: Hash + Eq + Clone + fmt::Debug,
{
    fn default() -> Self {
        Self::new(None)
    }
}

impl<K, V> VariantCache<K, V>
where
    K: Hash + Eq + Clone + fmt::Debug,
{
    /// Creates a cache; `None` means unbounded.
    #[must_use]
    pub fn new(capacity: Option<NonZeroUsize>) -> Self {
        let ready = match capacity {
            Some(capacity) => LruCache::with_hasher(capacity, FxBuildHasher),
            None => LruCache::unbounded_with_hasher(FxBuildHasher),
        };
        Self {
            state: Mutex::new(CacheState {
                ready,
                in_flight: FxHashMap::default(),
            }),
            counters: Counters::default(),
            capacity,
        }
    }

    /// Returns the entry for `key`, running `build` only if no entry exists
    /// and no other caller is already building it.
    pub fn get_or_build<F>(&self, key: K, build: F) -> Result<Arc<V>>
    where
        F: FnOnce() -> Result<V>,
    {
        let slot = {
            let mut state = self.state.lock();
            if let Some(value) = state.ready.get(&key) {
                Counters::bump(&self.counters.hits);
                return Ok(Arc::clone(value));
            }
            if let Some(in_flight) = state.in_flight.get(&key) {
                let in_flight = Arc::clone(in_flight);
                drop(state);
                Counters::bump(&self.counters.waits);
                log::trace!("Waiting on in-flight build for {key:?}");
                return in_flight.wait();
            }
            let slot = Arc::new(InFlight::new());
            state.in_flight.insert(key.clone(), Arc::clone(&slot));
            slot
        };

        Counters::bump(&self.counters.builds);
        log::debug!("Building variant {key:?}");
        let guard = BuildGuard {
            cache: self,
            key,
            slot,
            finished: false,
        };
        let result = build().map(Arc::new);
        guard.finish(result)
    }

    /// Returns a finished entry without building.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.state.lock().ready.get(key).cloned()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.state.lock().ready.contains(key)
    }

    /// Number of finished entries.
    pub fn len(&self) -> usize {
        self.state.lock().ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().ready.is_empty()
    }

    /// Number of builds currently running.
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    #[must_use]
    pub fn capacity(&self) -> Option<NonZeroUsize> {
        self.capacity
    }

    /// Drops all finished entries. Running builds are unaffected.
    pub fn clear(&self) {
        self.state.lock().ready.clear();
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        CacheStats {
            hits: load(&self.counters.hits),
            builds: load(&self.counters.builds),
            waits: load(&self.counters.waits),
            failures: load(&self.counters.failures),
            evictions: load(&self.counters.evictions),
        }
    }

    fn complete(&self, key: &K, slot: &InFlight<V>, result: Result<Arc<V>>) {
        {
            let mut state = self.state.lock();
            state.in_flight.remove(key);
            if let Ok(value) = &result
                && let Some((evicted, _)) = state.ready.push(key.clone(), Arc::clone(value))
                && evicted != *key
            {
                Counters::bump(&self.counters.evictions);
                log::debug!("Evicted variant {evicted:?}");
            }
        }

        if let Err(err) = &result {
            Counters::bump(&self.counters.failures);
            log::warn!("Variant build for {key:?} failed: {err}");
        }
        slot.publish(result);
    }
}

/// Publishes the outcome of a build, including when the build unwinds.
struct BuildGuard<'c, K, V>
where
    K: Hash + Eq + Clone + fmt::Debug,
{
    cache: &'c VariantCache<K, V>,
    key: K,
    slot: Arc<InFlight<V>>,
    finished: bool,
}

impl<K, V> BuildGuard<'_, K, V>
where
    K: Hash + Eq + Clone + fmt::Debug,
{
    fn finish(mut self, result: Result<Arc<V>>) -> Result<Arc<V>> {
        self.finished = true;
        self.cache.complete(&self.key, &self.slot, result.clone());
        result
    }
}

impl<K, V> Drop for BuildGuard<'_, K, V>
where
    K: Hash + Eq + Clone + fmt::Debug,
{
    fn drop(&mut self) {
        if !self.finished {
            let err = WeaveError::BuildAbandoned(format!("build for {:?} panicked", self.key));
            self.cache.complete(&self.key, &self.slot, Err(err));
        }
    }
}
