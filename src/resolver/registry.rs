use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::core::ResolvableKey;
use crate::error::ConfigError;

use super::ResolverDefinition;

/// Resolver definitions by key.
///
/// The registry is persistent: [`register`](Self::register) returns a new
/// registry and leaves the receiver untouched, so engines built from the
/// same builder never observe each other's registrations.
pub struct EngineRegistry<E> {
    resolvers: Arc<BTreeMap<ResolvableKey, ResolverDefinition<E>>>,
}

impl<E> Clone for EngineRegistry<E> {
    fn clone(&self) -> Self {
        Self {
            resolvers: Arc::clone(&self.resolvers),
        }
    }
}

impl<E> Default for EngineRegistry<E> {
    fn default() -> Self {
        Self {
            resolvers: Arc::new(BTreeMap::new()),
        }
    }
}

impl<E> fmt::Debug for EngineRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.resolvers.keys()).finish()
    }
}

impl<E> EngineRegistry<E>
where
    E: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a registry with `definition` added. A definition already
    /// registered under the same key is replaced.
    pub fn register(&self, definition: ResolverDefinition<E>) -> Self {
        let mut resolvers = (*self.resolvers).clone();
        let key = definition.key().clone();

        if resolvers.insert(key.clone(), definition).is_some() {
            tracing::warn!(%key, "Replacing previously registered resolver");
        }

        Self {
            resolvers: Arc::new(resolvers),
        }
    }

    pub fn get(&self, key: &ResolvableKey) -> Result<&ResolverDefinition<E>, ConfigError> {
        self.resolvers
            .get(key)
            .ok_or_else(|| ConfigError::MissingResolver(key.clone()))
    }

    pub fn contains(&self, key: &ResolvableKey) -> bool {
        self.resolvers.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &ResolvableKey> {
        self.resolvers.keys()
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}
