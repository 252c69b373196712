use thiserror::Error;

use crate::core::ResolvableKey;

/// Everything that can go wrong while resolving a node tree.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Maximum iteration count of {max} has been exceeded")]
    IterationLimit { max: usize },

    #[error("Resolver '{key}' failed:\n{source}")]
    Resolver {
        key: ResolvableKey,
        source: anyhow::Error,
    },

    #[error("Cannot read the value of an unresolved node")]
    Unresolved,
}

impl ResolveError {
    pub(crate) fn resolver(key: ResolvableKey, source: impl Into<anyhow::Error>) -> Self {
        Self::Resolver {
            key,
            source: source.into(),
        }
    }
}

/// Errors caused by how the engine or its resolvers were set up. These are
/// never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No resolver registered for key '{0}'")]
    MissingResolver(ResolvableKey),

    #[error("Batch '{key}' expected resolvables of type {expected}, found {found}")]
    InconsistentBatch {
        key: ResolvableKey,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Resolver '{key}' returned {found} values for a batch of {expected}")]
    LengthMismatch {
        key: ResolvableKey,
        expected: usize,
        found: usize,
    },
}
