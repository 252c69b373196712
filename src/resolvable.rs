//! Resolvables and their type-erased form.
//!
//! A [`Resolvable`] is a request for a value the engine does not have yet,
//! like "user #42" or "all posts by user #42". Resolvables are plain values:
//! two requests that compare equal are the same request, which is what lets
//! the engine deduplicate them and cache their results.
//!
//! ## Erasure
//!
//! A single node tree mixes many resolvable types, so the engine itself only
//! ever sees [`AnyResolvable`]. The typed and the erased views are bridged by a
//! blanket implementation of the internal `ErasedResolvable` trait, and
//! resolver adapters downcast back to the concrete type before calling user
//! code.

use std::any::{Any, TypeId, type_name};
use std::borrow::Borrow;
use std::fmt::{self, Debug};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::Node;
use crate::core::{Data, ResolvableKey};

/// An unresolved leaf of a node tree.
///
/// Implementations must keep [`resolvable_key`](Self::resolvable_key) stable
/// for the lifetime of the value, and their `Eq`/`Hash` must be consistent
/// with it: two resolvables that compare equal are fetched once and share a
/// cache entry.
///
/// ```rust
/// use kasane::{Node, Resolvable};
///
/// #[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// struct UserById(u32);
///
/// impl Resolvable for UserById {
///     type Output = String;
/// }
///
/// let node: Node<String> = UserById(7).into_node();
/// assert!(!node.is_resolved());
/// ```
pub trait Resolvable: Debug + Clone + Eq + Hash + Send + Sync + 'static {
    /// The value this resolvable resolves to.
    type Output: Data;

    /// The key used to select the resolver for this resolvable.
    fn resolvable_key(&self) -> ResolvableKey {
        ResolvableKey::of::<Self>()
    }

    /// Wrap this resolvable into a leaf node.
    fn into_node(self) -> Node<Self::Output>
    where
        Self: Sized,
    {
        Node::fetch(self)
    }
}

/// Object-safe view of a [`Resolvable`]. Not nameable outside the crate.
pub trait ErasedResolvable: Send + Sync {
    fn key(&self) -> ResolvableKey;
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
    fn eq_dyn(&self, other: &dyn ErasedResolvable) -> bool;
    fn hash_dyn(&self, state: &mut dyn Hasher);
    fn fmt_dyn(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

// This is where the type erasure actually happens.
impl<R> ErasedResolvable for R
where
    R: Resolvable,
{
    fn key(&self) -> ResolvableKey {
        self.resolvable_key()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        type_name::<R>()
    }

    fn eq_dyn(&self, other: &dyn ErasedResolvable) -> bool {
        other
            .as_any()
            .downcast_ref::<R>()
            .is_some_and(|other| self == other)
    }

    fn hash_dyn(&self, mut state: &mut dyn Hasher) {
        TypeId::of::<R>().hash(&mut state);
        self.hash(&mut state);
    }

    fn fmt_dyn(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}

impl PartialEq for dyn ErasedResolvable {
    fn eq(&self, other: &Self) -> bool {
        self.eq_dyn(other)
    }
}

impl Eq for dyn ErasedResolvable {}

impl Hash for dyn ErasedResolvable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash_dyn(state)
    }
}

/// A type-erased resolvable, cheap to clone.
///
/// Equality and hashing take the concrete type into account, so resolvables
/// of different types never collide even when their fields are equal.
#[derive(Clone)]
pub struct AnyResolvable(Arc<dyn ErasedResolvable>);

impl AnyResolvable {
    pub fn new<R: Resolvable>(resolvable: R) -> Self {
        Self(Arc::new(resolvable))
    }

    pub fn key(&self) -> ResolvableKey {
        self.0.key()
    }

    /// Name of the concrete resolvable type.
    pub fn type_name(&self) -> &'static str {
        self.0.type_name()
    }

    pub fn downcast_ref<R: Resolvable>(&self) -> Option<&R> {
        self.0.as_any().downcast_ref::<R>()
    }

    pub fn is<R: Resolvable>(&self) -> bool {
        self.downcast_ref::<R>().is_some()
    }
}

impl PartialEq for AnyResolvable {
    fn eq(&self, other: &Self) -> bool {
        *self.0 == *other.0
    }
}

impl Eq for AnyResolvable {}

impl Hash for AnyResolvable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (*self.0).hash(state)
    }
}

// Allows lookups keyed by a borrowed typed resolvable without allocating.
impl Borrow<dyn ErasedResolvable> for AnyResolvable {
    fn borrow(&self) -> &(dyn ErasedResolvable + 'static) {
        &*self.0
    }
}

impl Debug for AnyResolvable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt_dyn(f)
    }
}
