use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// A type-erased, thread-safe container.
pub(crate) type Dynamic = Arc<dyn Any + Send + Sync>;

/// Values that can be carried by a [`Node`](crate::Node).
///
/// Node values are cloned out of resolved leaves and handed to user closures,
/// and resolver output is shipped between worker threads, hence the bounds.
pub trait Data: Clone + Send + Sync + 'static {}

impl<T> Data for T where T: Clone + Send + Sync + 'static {}

/// The name under which resolvables are grouped into batches.
///
/// Every resolvable reports a key, and the engine uses it twice: to group the
/// resolvables discovered in a round into batches, and to look up the
/// [`ResolverDefinition`](crate::ResolverDefinition) responsible for a batch.
/// By default a resolvable's key is the name of its concrete type.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ResolvableKey(Cow<'static, str>);

impl ResolvableKey {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// The default key of resolvable type `R`.
    pub fn of<R: ?Sized + 'static>() -> Self {
        Self(Cow::Borrowed(std::any::type_name::<R>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for ResolvableKey {
    fn from(value: &'static str) -> Self {
        Self(Cow::Borrowed(value))
    }
}

impl From<String> for ResolvableKey {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

impl fmt::Display for ResolvableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ResolvableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResolvableKey({})", self.0)
    }
}
