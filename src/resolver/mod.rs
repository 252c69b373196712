//! Resolver definitions.
//!
//! Whatever shape a resolver is written in, the engine only ever talks to a
//! [`ResolverDefinition`]: a key plus a factory turning a batch of erased
//! resolvables into independent [`Operation`]s. The constructors on
//! [`ResolverDefinition`] adapt the supported shapes to this contract:
//!
//! * [`batched`](ResolverDefinition::batched): one call per batch, results
//!   keyed by resolvable. Entries may be omitted.
//! * [`batched_in_order`](ResolverDefinition::batched_in_order): one call per
//!   batch, results aligned with the batch.
//! * [`single`](ResolverDefinition::single): one call, and one operation, per
//!   resolvable.
//! * [`provider`](ResolverDefinition::provider): one call per batch, the same
//!   value for every resolvable in it.

mod declare;
mod registry;

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use crate::core::ResolvableKey;
use crate::error::{ConfigError, ResolveError};
use crate::resolvable::{AnyResolvable, Resolvable};
use crate::results::{ResolvedValues, Results};

pub use declare::{Keyed, Param, Provider, Resolver};
pub use registry::EngineRegistry;

type Job = Box<dyn FnOnce() -> Result<ResolvedValues, ResolveError> + Send>;

/// One independent unit of resolver work.
///
/// All operations selected in a round may run concurrently, in any order.
pub struct Operation {
    key: ResolvableKey,
    job: Job,
}

impl Operation {
    /// Wraps a user computation. Its errors are reported as failures of the
    /// resolver registered under `key`.
    pub fn new<F>(key: ResolvableKey, f: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<ResolvedValues> + Send + 'static,
    {
        let error_key = key.clone();
        Self {
            key,
            job: Box::new(move || f().map_err(|e| ResolveError::resolver(error_key, e))),
        }
    }

    fn fallible<F>(key: ResolvableKey, f: F) -> Self
    where
        F: FnOnce() -> Result<ResolvedValues, ResolveError> + Send + 'static,
    {
        Self {
            key,
            job: Box::new(f),
        }
    }

    pub fn key(&self) -> &ResolvableKey {
        &self.key
    }

    pub fn run(self) -> Result<ResolvedValues, ResolveError> {
        (self.job)()
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Operation").field(&self.key).finish()
    }
}

type Factory<E> =
    dyn Fn(&ResolvableKey, &Arc<E>, Vec<AnyResolvable>) -> OperationsResult + Send + Sync;

type OperationsResult = Result<Vec<Operation>, ConfigError>;

/// A resolver, normalized to `(environment, batch) -> operations`.
///
/// Definitions built from a typed resolver default to the key
/// [`ResolvableKey::of::<R>()`](ResolvableKey::of), which matches resolvables
/// that keep the default [`Resolvable::resolvable_key`]. Use
/// [`with_key`](Self::with_key) otherwise.
pub struct ResolverDefinition<E> {
    key: ResolvableKey,
    factory: Arc<Factory<E>>,
}

impl<E> Clone for ResolverDefinition<E> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<E> fmt::Debug for ResolverDefinition<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResolverDefinition").field(&self.key).finish()
    }
}

impl<E> ResolverDefinition<E>
where
    E: Send + Sync + 'static,
{
    /// A definition producing operations directly.
    pub fn from_operations<F>(key: impl Into<ResolvableKey>, factory: F) -> Self
    where
        F: Fn(&ResolvableKey, &Arc<E>, Vec<AnyResolvable>) -> Result<Vec<Operation>, ConfigError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            key: key.into(),
            factory: Arc::new(factory),
        }
    }

    /// Resolves a whole batch in one call.
    ///
    /// Resolvables left out of the returned [`Results`] stay unresolved and
    /// are offered again in the next round.
    pub fn batched<R, F>(f: F) -> Self
    where
        R: Resolvable,
        F: Fn(&E, &[R]) -> anyhow::Result<Results<R>> + Send + Sync + 'static,
    {
        let f = Arc::new(f);

        Self::from_operations(ResolvableKey::of::<R>(), move |key, env, batch| {
            let batch = downcast_batch::<R>(key, batch)?;
            let f = f.clone();
            let env = env.clone();

            Ok(vec![Operation::new(key.clone(), move || {
                Ok(f(&env, &batch)?.into_resolved())
            })])
        })
    }

    /// Resolves a whole batch in one call, returning values in batch order.
    ///
    /// Returning a different number of values than there were resolvables is
    /// a [`ConfigError::LengthMismatch`].
    pub fn batched_in_order<R, F>(f: F) -> Self
    where
        R: Resolvable,
        F: Fn(&E, &[R]) -> anyhow::Result<Vec<R::Output>> + Send + Sync + 'static,
    {
        let f = Arc::new(f);

        Self::from_operations(ResolvableKey::of::<R>(), move |key, env, batch| {
            let batch = downcast_batch::<R>(key, batch)?;
            let f = f.clone();
            let env = env.clone();
            let key = key.clone();

            Ok(vec![Operation::fallible(key.clone(), move || {
                let values = f(&env, &batch).map_err(|e| ResolveError::resolver(key.clone(), e))?;

                if values.len() != batch.len() {
                    return Err(ConfigError::LengthMismatch {
                        key,
                        expected: batch.len(),
                        found: values.len(),
                    }
                    .into());
                }

                Ok(batch.into_iter().zip(values).collect::<Results<R>>().into_resolved())
            })])
        })
    }

    /// Resolves one resolvable per call. Every resolvable becomes its own
    /// operation, so a parallel strategy can run them concurrently.
    pub fn single<R, F>(f: F) -> Self
    where
        R: Resolvable,
        F: Fn(&E, &R) -> anyhow::Result<R::Output> + Send + Sync + 'static,
    {
        let f = Arc::new(f);

        Self::from_operations(ResolvableKey::of::<R>(), move |key, env, batch| {
            let batch = downcast_batch::<R>(key, batch)?;

            let operations = batch
                .into_iter()
                .map(|resolvable| {
                    let f = f.clone();
                    let env = env.clone();
                    Operation::new(key.clone(), move || {
                        let value = f(&env, &resolvable)?;
                        Ok(Results::single(resolvable, value).into_resolved())
                    })
                })
                .collect();

            Ok(operations)
        })
    }

    /// Resolves a parameterless fetch. Every resolvable in the batch receives
    /// the value of a single call.
    pub fn provider<R, F>(f: F) -> Self
    where
        R: Resolvable,
        F: Fn(&E) -> anyhow::Result<R::Output> + Send + Sync + 'static,
    {
        let f = Arc::new(f);

        Self::from_operations(ResolvableKey::of::<R>(), move |key, env, batch| {
            let batch = downcast_batch::<R>(key, batch)?;
            let f = f.clone();
            let env = env.clone();

            Ok(vec![Operation::new(key.clone(), move || {
                let value = f(&env)?;
                Ok(Results::from_fn(&batch, |_| value.clone()).into_resolved())
            })])
        })
    }

    /// Registers this definition under a different key.
    pub fn with_key(self, key: impl Into<ResolvableKey>) -> Self {
        Self {
            key: key.into(),
            ..self
        }
    }

    pub fn key(&self) -> &ResolvableKey {
        &self.key
    }

    /// Turns a batch into the operations that resolve it.
    pub fn create_operations(
        &self,
        env: &Arc<E>,
        batch: Vec<AnyResolvable>,
    ) -> Result<Vec<Operation>, ConfigError> {
        (self.factory)(&self.key, env, batch)
    }
}

fn downcast_batch<R: Resolvable>(
    key: &ResolvableKey,
    batch: Vec<AnyResolvable>,
) -> Result<Vec<R>, ConfigError> {
    batch
        .iter()
        .map(|resolvable| {
            resolvable
                .downcast_ref::<R>()
                .cloned()
                .ok_or_else(|| ConfigError::InconsistentBatch {
                    key: key.clone(),
                    expected: type_name::<R>(),
                    found: resolvable.type_name(),
                })
        })
        .collect()
}
