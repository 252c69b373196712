//! Memoization of resolved values across rounds and across calls.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::resolvable::{AnyResolvable, Resolvable};
use crate::results::ResolvedValues;

/// Storage for resolved values, consulted by the engine every round.
pub trait EngineCache: Send + Sync {
    /// Drops the resolvables whose value is already known.
    fn remove_cached(&self, resolvables: Vec<AnyResolvable>) -> Vec<AnyResolvable>;

    /// Stores `results` and returns everything known so far, not just the
    /// new entries. This full view is what gets injected into the tree.
    fn update_and_get(&self, results: ResolvedValues) -> ResolvedValues;
}

/// The default in-memory cache.
///
/// A fresh one is created for every [`Engine::resolve`](crate::Engine::resolve)
/// call. Pass the same instance to
/// [`Engine::resolve_with`](crate::Engine::resolve_with) to share values
/// between calls.
#[derive(Default)]
pub struct MemoryCache {
    values: Mutex<ResolvedValues>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ResolvedValues> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get<R: Resolvable>(&self, resolvable: &R) -> Option<R::Output> {
        self.lock().get(resolvable)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl EngineCache for MemoryCache {
    fn remove_cached(&self, resolvables: Vec<AnyResolvable>) -> Vec<AnyResolvable> {
        let values = self.lock();
        resolvables
            .into_iter()
            .filter(|resolvable| !values.contains(resolvable))
            .collect()
    }

    fn update_and_get(&self, results: ResolvedValues) -> ResolvedValues {
        let mut values = self.lock();
        values.merge(results);
        values.clone()
    }
}

impl fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCache").field("len", &self.len()).finish()
    }
}

/// A cache that stores nothing.
///
/// Only the values resolved in the current round are injected, so a
/// resolvable discovered again later is fetched again.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl EngineCache for NoCache {
    fn remove_cached(&self, resolvables: Vec<AnyResolvable>) -> Vec<AnyResolvable> {
        resolvables
    }

    fn update_and_get(&self, results: ResolvedValues) -> ResolvedValues {
        results
    }
}
