//! The resolution engine.
//!
//! An [`Engine`] drives a node tree to its value in rounds. Every round it
//! collects the unresolved leaves, drops the duplicates and the ones already
//! cached, groups the rest into batches by key, lets the selection strategy
//! pick the batches to run, executes their operations through the resolution
//! strategy, and injects everything known so far back into the tree.
//!
//! Rounds are strictly sequential: the batches of the next round are only
//! known once the results of the current one have been injected.

mod diagnostics;
mod round;

use std::fmt;
use std::sync::Arc;

use crate::Node;
use crate::cache::{EngineCache, MemoryCache};
use crate::core::Data;
use crate::error::ResolveError;
use crate::resolver::{EngineRegistry, ResolverDefinition};
use crate::strategy::{All, Parallel, ResolutionStrategy, SelectionStrategy, Sequential};

pub use diagnostics::{BatchStats, Diagnostics, RoundStats};

/// Rounds allowed per resolve call unless configured otherwise.
pub const DEFAULT_MAX_ITERATION_COUNT: usize = 16;

/// Resolves node trees against a set of registered resolvers.
///
/// Built with [`Engine::builder`]. An engine is immutable and can be shared
/// between threads; every resolve call gets its own round counter.
pub struct Engine<E> {
    registry: EngineRegistry<E>,
    selection: Arc<dyn SelectionStrategy>,
    resolution: Arc<dyn ResolutionStrategy>,
    max_iteration_count: usize,
    environment: Arc<E>,
}

impl<E> fmt::Debug for Engine<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry)
            .field("max_iteration_count", &self.max_iteration_count)
            .finish_non_exhaustive()
    }
}

impl<E> Engine<E>
where
    E: Send + Sync + 'static,
{
    pub fn builder() -> EngineBuilder<E> {
        EngineBuilder::new()
    }

    /// The value handed to every resolver.
    pub fn environment(&self) -> &E {
        &self.environment
    }

    pub fn registry(&self) -> &EngineRegistry<E> {
        &self.registry
    }

    pub fn max_iteration_count(&self) -> usize {
        self.max_iteration_count
    }

    /// Resolves `node` with a fresh [`MemoryCache`].
    pub fn resolve<T: Data>(&self, node: Node<T>) -> Result<T, ResolveError> {
        self.resolve_with(node, &MemoryCache::new())
    }

    /// Resolves `node`, reading and filling `cache`.
    pub fn resolve_with<T: Data>(
        &self,
        node: Node<T>,
        cache: &dyn EngineCache,
    ) -> Result<T, ResolveError> {
        self.drive(node, cache, None)
    }

    /// Like [`resolve_with`](Self::resolve_with), also reporting what every
    /// round did.
    pub fn resolve_with_diagnostics<T: Data>(
        &self,
        node: Node<T>,
        cache: &dyn EngineCache,
    ) -> Result<(T, Diagnostics), ResolveError> {
        let mut diagnostics = Diagnostics::default();
        let value = self.drive(node, cache, Some(&mut diagnostics))?;
        Ok((value, diagnostics))
    }
}

/// Configuration of an [`Engine`].
///
/// Every `with_*` method returns an updated builder, so a partially
/// configured builder can be cloned and specialized.
///
/// ```rust
/// use kasane::strategy::Limit;
/// use kasane::Engine;
///
/// let engine = Engine::builder()
///     .with_selection_strategy(Limit(2))
///     .with_max_iteration_count(32)
///     .with_parallelism()
///     .build(());
///
/// assert_eq!(engine.max_iteration_count(), 32);
/// ```
pub struct EngineBuilder<E> {
    registry: EngineRegistry<E>,
    selection: Arc<dyn SelectionStrategy>,
    resolution: Arc<dyn ResolutionStrategy>,
    max_iteration_count: usize,
}

impl<E> Clone for EngineBuilder<E> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            selection: Arc::clone(&self.selection),
            resolution: Arc::clone(&self.resolution),
            max_iteration_count: self.max_iteration_count,
        }
    }
}

impl<E> Default for EngineBuilder<E> {
    fn default() -> Self {
        Self {
            registry: EngineRegistry::default(),
            selection: Arc::new(All),
            resolution: Arc::new(Sequential),
            max_iteration_count: DEFAULT_MAX_ITERATION_COUNT,
        }
    }
}

impl<E> EngineBuilder<E>
where
    E: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resolver. A later registration for the same key wins.
    pub fn with_resolver(self, definition: ResolverDefinition<E>) -> Self {
        Self {
            registry: self.registry.register(definition),
            ..self
        }
    }

    pub fn with_selection_strategy(self, strategy: impl SelectionStrategy + 'static) -> Self {
        Self {
            selection: Arc::new(strategy),
            ..self
        }
    }

    pub fn with_resolution_strategy(self, strategy: impl ResolutionStrategy + 'static) -> Self {
        Self {
            resolution: Arc::new(strategy),
            ..self
        }
    }

    /// Runs the operations of each round on rayon's global thread pool.
    pub fn with_parallelism(self) -> Self {
        self.with_resolution_strategy(Parallel::global())
    }

    /// Caps the number of rounds of a single resolve call.
    pub fn with_max_iteration_count(self, max_iteration_count: usize) -> Self {
        Self {
            max_iteration_count,
            ..self
        }
    }

    pub fn build(&self, environment: E) -> Engine<E> {
        Engine {
            registry: self.registry.clone(),
            selection: Arc::clone(&self.selection),
            resolution: Arc::clone(&self.resolution),
            max_iteration_count: self.max_iteration_count,
            environment: Arc::new(environment),
        }
    }
}
