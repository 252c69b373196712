//! Declaring a resolver and its resolvable in one go.
//!
//! Writing a dedicated [`Resolvable`] type per fetch is the most explicit
//! option, but for simple lookups it is enough to name the resolver and give
//! it a function. [`Resolver`] and [`Provider`] do exactly that: they hand out
//! nodes over a generic [`Keyed`] resolvable, and build the matching
//! [`ResolverDefinition`] for registration.
//!
//! ```rust
//! use kasane::{Engine, Resolver};
//!
//! let double = Resolver::single("double", |_: &(), n: &u32| Ok(n * 2));
//!
//! let engine = Engine::builder().with_resolver(double.definition()).build(());
//! let node = double.fetch(21);
//!
//! assert_eq!(engine.resolve(node).unwrap(), 42);
//! ```

use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::slice;
use std::sync::Arc;

use crate::Node;
use crate::core::{Data, ResolvableKey};
use crate::resolvable::Resolvable;
use crate::results::Results;

use super::ResolverDefinition;

/// Bounds on the parameter of a [`Keyed`] resolvable.
pub trait Param: Debug + Clone + Eq + Hash + Send + Sync + 'static {}

impl<T> Param for T where T: Debug + Clone + Eq + Hash + Send + Sync + 'static {}

/// A resolvable identified by an explicit key and a parameter.
pub struct Keyed<P, V> {
    key: ResolvableKey,
    param: P,
    output: PhantomData<fn() -> V>,
}

impl<P, V> Keyed<P, V> {
    pub fn new(key: impl Into<ResolvableKey>, param: P) -> Self {
        Self {
            key: key.into(),
            param,
            output: PhantomData,
        }
    }

    pub fn key(&self) -> &ResolvableKey {
        &self.key
    }

    pub fn param(&self) -> &P {
        &self.param
    }
}

impl<P: Clone, V> Clone for Keyed<P, V> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            param: self.param.clone(),
            output: PhantomData,
        }
    }
}

impl<P: PartialEq, V> PartialEq for Keyed<P, V> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.param == other.param
    }
}

impl<P: Eq, V> Eq for Keyed<P, V> {}

impl<P: Hash, V> Hash for Keyed<P, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
        self.param.hash(state);
    }
}

impl<P: Debug, V> Debug for Keyed<P, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", self.key, self.param)
    }
}

impl<P: Param, V: Data> Resolvable for Keyed<P, V> {
    type Output = V;

    fn resolvable_key(&self) -> ResolvableKey {
        self.key.clone()
    }
}

type BatchedFn<E, P, V> = dyn Fn(&E, &[P]) -> anyhow::Result<HashMap<P, V>> + Send + Sync;
type InOrderFn<E, P, V> = dyn Fn(&E, &[P]) -> anyhow::Result<Vec<V>> + Send + Sync;
type SingleFn<E, P, V> = dyn Fn(&E, &P) -> anyhow::Result<V> + Send + Sync;

enum Shape<E, P, V> {
    Batched(Arc<BatchedFn<E, P, V>>),
    InOrder(Arc<InOrderFn<E, P, V>>),
    Single(Arc<SingleFn<E, P, V>>),
}

impl<E, P, V> Clone for Shape<E, P, V> {
    fn clone(&self) -> Self {
        match self {
            Shape::Batched(f) => Shape::Batched(f.clone()),
            Shape::InOrder(f) => Shape::InOrder(f.clone()),
            Shape::Single(f) => Shape::Single(f.clone()),
        }
    }
}

/// A named resolver over parameters of type `P`, producing values of type
/// `V` from an environment `E`.
pub struct Resolver<E, P, V> {
    key: ResolvableKey,
    shape: Shape<E, P, V>,
}

impl<E, P, V> Clone for Resolver<E, P, V> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            shape: self.shape.clone(),
        }
    }
}

impl<E, P, V> Debug for Resolver<E, P, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = match self.shape {
            Shape::Batched(_) => "batched",
            Shape::InOrder(_) => "batched_in_order",
            Shape::Single(_) => "single",
        };

        f.debug_struct("Resolver")
            .field("key", &self.key)
            .field("shape", &shape)
            .finish()
    }
}

impl<E, P, V> Resolver<E, P, V>
where
    E: Send + Sync + 'static,
    P: Param,
    V: Data,
{
    /// Resolves many parameters per call. Parameters missing from the
    /// returned map stay unresolved for the round.
    pub fn batched<F>(name: impl Into<ResolvableKey>, f: F) -> Self
    where
        F: Fn(&E, &[P]) -> anyhow::Result<HashMap<P, V>> + Send + Sync + 'static,
    {
        Self {
            key: name.into(),
            shape: Shape::Batched(Arc::new(f)),
        }
    }

    /// Resolves many parameters per call, returning values in input order.
    pub fn batched_in_order<F>(name: impl Into<ResolvableKey>, f: F) -> Self
    where
        F: Fn(&E, &[P]) -> anyhow::Result<Vec<V>> + Send + Sync + 'static,
    {
        Self {
            key: name.into(),
            shape: Shape::InOrder(Arc::new(f)),
        }
    }

    /// Resolves one parameter per call.
    pub fn single<F>(name: impl Into<ResolvableKey>, f: F) -> Self
    where
        F: Fn(&E, &P) -> anyhow::Result<V> + Send + Sync + 'static,
    {
        Self {
            key: name.into(),
            shape: Shape::Single(Arc::new(f)),
        }
    }

    pub fn key(&self) -> &ResolvableKey {
        &self.key
    }

    /// A node that resolves to the value for `param`.
    pub fn fetch(&self, param: P) -> Node<V> {
        Node::fetch(Keyed::new(self.key.clone(), param))
    }

    /// The definition to register with an engine.
    pub fn definition(&self) -> ResolverDefinition<E> {
        let definition = match self.shape.clone() {
            Shape::Batched(f) => ResolverDefinition::batched(move |env: &E, batch: &[Keyed<P, V>]| {
                let found = f(env, &params(batch))?;

                Ok(batch
                    .iter()
                    .filter_map(|keyed| found.get(&keyed.param).map(|v| (keyed.clone(), v.clone())))
                    .collect::<Results<_>>())
            }),
            Shape::InOrder(f) => {
                ResolverDefinition::batched_in_order(move |env: &E, batch: &[Keyed<P, V>]| {
                    f(env, &params(batch))
                })
            }
            Shape::Single(f) => {
                ResolverDefinition::single(move |env: &E, keyed: &Keyed<P, V>| f(env, &keyed.param))
            }
        };

        definition.with_key(self.key.clone())
    }

    /// Runs the resolver directly, outside of any engine.
    pub fn resolve_all(&self, env: &E, params: &[P]) -> anyhow::Result<HashMap<P, V>> {
        match &self.shape {
            Shape::Batched(f) => f(env, params),
            Shape::InOrder(f) => {
                let values = f(env, params)?;
                anyhow::ensure!(
                    values.len() == params.len(),
                    "Resolver '{}' returned {} values for {} parameters",
                    self.key,
                    values.len(),
                    params.len()
                );
                Ok(params.iter().cloned().zip(values).collect())
            }
            Shape::Single(f) => params
                .iter()
                .map(|param| f(env, param).map(|value| (param.clone(), value)))
                .collect(),
        }
    }

    /// Runs the resolver directly for a single parameter.
    pub fn resolve(&self, env: &E, param: P) -> anyhow::Result<V> {
        let mut values = self.resolve_all(env, slice::from_ref(&param))?;

        values
            .remove(&param)
            .ok_or_else(|| {
                anyhow::anyhow!("Resolver '{}' returned no value for {:?}", self.key, param)
            })
    }
}

fn params<P: Clone, V>(batch: &[Keyed<P, V>]) -> Vec<P> {
    batch.iter().map(|keyed| keyed.param.clone()).collect()
}

/// A named, parameterless fetch, such as loading a global setting.
pub struct Provider<E, V> {
    key: ResolvableKey,
    f: Arc<dyn Fn(&E) -> anyhow::Result<V> + Send + Sync>,
}

impl<E, V> Clone for Provider<E, V> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            f: self.f.clone(),
        }
    }
}

impl<E, V> Debug for Provider<E, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Provider").field(&self.key).finish()
    }
}

impl<E, V> Provider<E, V>
where
    E: Send + Sync + 'static,
    V: Data,
{
    pub fn new<F>(name: impl Into<ResolvableKey>, f: F) -> Self
    where
        F: Fn(&E) -> anyhow::Result<V> + Send + Sync + 'static,
    {
        Self {
            key: name.into(),
            f: Arc::new(f),
        }
    }

    pub fn key(&self) -> &ResolvableKey {
        &self.key
    }

    /// A node that resolves to the provided value.
    pub fn fetch(&self) -> Node<V> {
        Node::fetch(Keyed::<(), V>::new(self.key.clone(), ()))
    }

    /// The definition to register with an engine.
    pub fn definition(&self) -> ResolverDefinition<E> {
        let f = self.f.clone();
        ResolverDefinition::provider::<Keyed<(), V>, _>(move |env: &E| f(env))
            .with_key(self.key.clone())
    }

    /// Runs the provider directly, outside of any engine.
    pub fn provide(&self, env: &E) -> anyhow::Result<V> {
        (self.f)(env)
    }
}
