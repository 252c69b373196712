#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod cache;
mod core;
mod engine;
mod error;
#[cfg(feature = "logging")]
pub mod logging;
mod node;
mod resolvable;
mod resolver;
mod results;
pub mod strategy;

pub use crate::cache::{EngineCache, MemoryCache, NoCache};
pub use crate::core::{Data, ResolvableKey};
pub use crate::engine::{
    BatchStats, DEFAULT_MAX_ITERATION_COUNT, Diagnostics, Engine, EngineBuilder, RoundStats,
};
pub use crate::error::{ConfigError, ResolveError};
pub use crate::node::Node;
pub use crate::resolvable::{AnyResolvable, Resolvable};
pub use crate::resolver::{
    EngineRegistry, Keyed, Operation, Param, Provider, Resolver, ResolverDefinition,
};
pub use crate::results::{ResolvedValues, Results};
pub use crate::strategy::{ResolutionStrategy, SelectionStrategy};

/// Free constructors for nodes.
///
/// ```rust
/// use kasane::nodes::{list, value};
///
/// let node = list([value(1), value(2)]);
/// assert_eq!(node.value().unwrap(), vec![1, 2]);
/// ```
pub mod nodes {
    pub use crate::node::{fetch, list, tuple2, tuple3, tuple4, value, values};
}
