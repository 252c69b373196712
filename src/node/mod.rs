//! The node algebra.
//!
//! A [`Node<T>`] is a lazy, possibly nested computation that eventually yields
//! a `T`. Trees are built from a handful of primitives:
//!
//! * **value**: an already resolved leaf.
//! * **fetch**: an unresolved leaf wrapping a [`Resolvable`].
//! * **map**: apply a function to the value of another node.
//! * **flat_map**: continue with a new node computed from another node's
//!   value. This is the only place where new resolvables enter a tree, which
//!   is what makes dependent fetches possible.
//! * **collection** and **tuples**: combine independent nodes.
//!
//! Everything else ([`juxt`](Node::juxt), [`attach`](Node::attach), the list
//! helpers) is expressed through these primitives.
//!
//! Nodes are immutable. The engine drives a tree towards its value by
//! repeatedly calling [`Node::inject_values`], which returns a new tree with
//! every leaf found in the given results replaced by its value. Subtrees that
//! are already resolved are shared, not rebuilt.

mod collection;
mod leaf;
mod list;
mod map;
mod tuple;

use std::fmt;
use std::sync::Arc;

use crate::core::Data;
use crate::error::ResolveError;
use crate::resolvable::{AnyResolvable, Resolvable};
use crate::results::ResolvedValues;

pub use tuple::{tuple2, tuple3, tuple4};

/// Behaviour shared by all node variants.
pub(crate) trait NodeImpl<T>: Send + Sync {
    fn is_resolved(&self) -> bool;

    fn value(&self) -> Result<T, ResolveError>;

    /// Appends all unresolved leaves reachable from this node, in discovery
    /// order, duplicates included.
    fn collect(&self, out: &mut Vec<AnyResolvable>);

    /// `this` is the handle owning `self`, returned as-is when nothing changes.
    fn inject(&self, this: &Node<T>, results: &ResolvedValues) -> Node<T>;

    fn describe(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

/// A lazy computation yielding a `T` once all of its resolvables are resolved.
///
/// Cloning a node is cheap: it only bumps a reference count.
pub struct Node<T> {
    inner: Arc<dyn NodeImpl<T>>,
}

impl<T> Clone for Node<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.describe(f)
    }
}

impl<T: Data> Node<T> {
    pub(crate) fn from_impl(node: impl NodeImpl<T> + 'static) -> Self {
        Self {
            inner: Arc::new(node),
        }
    }

    /// A resolved leaf holding `value`.
    pub fn from_value(value: T) -> Self {
        Self::from_impl(leaf::ValueNode(value))
    }

    /// An unresolved leaf for `resolvable`.
    pub fn fetch<R>(resolvable: R) -> Self
    where
        R: Resolvable<Output = T>,
    {
        Self::from_impl(leaf::FetchNode(resolvable))
    }

    pub fn is_resolved(&self) -> bool {
        self.inner.is_resolved()
    }

    /// The value of this node.
    ///
    /// Fails with [`ResolveError::Unresolved`] unless
    /// [`is_resolved`](Self::is_resolved) holds.
    pub fn value(&self) -> Result<T, ResolveError> {
        self.inner.value()
    }

    /// All unresolved leaves reachable from this node, in discovery order,
    /// duplicates included.
    pub fn resolvables(&self) -> Vec<AnyResolvable> {
        let mut out = Vec::new();
        self.inner.collect(&mut out);
        out
    }

    pub(crate) fn collect_into(&self, out: &mut Vec<AnyResolvable>) {
        self.inner.collect(out)
    }

    pub(crate) fn ptr_eq(&self, other: &Node<T>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns a new node where every resolvable present in `results` is
    /// replaced by its value. The receiver is left untouched.
    pub fn inject_values(&self, results: &ResolvedValues) -> Node<T> {
        self.inner.inject(self, results)
    }

    /// Applies `f` to the value of this node.
    ///
    /// `f` runs every time the value is read, so it should be pure and cheap.
    pub fn map<R, F>(self, f: F) -> Node<R>
    where
        R: Data,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        Node::from_impl(map::MapNode {
            inner: self,
            f: Arc::new(f),
        })
    }

    /// Continues with the node produced by `f` from the value of this node.
    ///
    /// When this node is already resolved, `f` is applied at most once, on
    /// first use, and its result is memoized.
    pub fn flat_map<R, F>(self, f: F) -> Node<R>
    where
        R: Data,
        F: Fn(T) -> Node<R> + Send + Sync + 'static,
    {
        let f: map::Continuation<T, R> = Arc::new(f);

        if self.is_resolved()
            && let Ok(input) = self.value()
        {
            return Node::from_impl(map::MemoFlatMapNode::new(input, f));
        }

        Node::from_impl(map::FlatMapNode { inner: self, f })
    }

    /// Like [`map`](Self::map), with the value of `other` as an extra argument.
    pub fn map_with<A, R, F>(self, other: Node<A>, f: F) -> Node<R>
    where
        A: Data,
        R: Data,
        F: Fn(T, A) -> R + Send + Sync + 'static,
    {
        tuple2(self, other).map_n(f)
    }

    /// Like [`flat_map`](Self::flat_map), with the value of `other` as an
    /// extra argument.
    pub fn flat_map_with<A, R, F>(self, other: Node<A>, f: F) -> Node<R>
    where
        A: Data,
        R: Data,
        F: Fn(T, A) -> Node<R> + Send + Sync + 'static,
    {
        tuple2(self, other).flat_map_n(f)
    }

    /// Pairs the results of two continuations of this node's value.
    pub fn juxt<A, B, FA, FB>(self, fa: FA, fb: FB) -> Node<(A, B)>
    where
        A: Data,
        B: Data,
        FA: Fn(T) -> Node<A> + Send + Sync + 'static,
        FB: Fn(T) -> Node<B> + Send + Sync + 'static,
    {
        tuple2(self.clone().flat_map(fa), self.flat_map(fb))
    }

    /// Pairs this node's value with the result of a continuation of it.
    pub fn juxt_self<A, F>(self, f: F) -> Node<(T, A)>
    where
        A: Data,
        F: Fn(T) -> Node<A> + Send + Sync + 'static,
    {
        tuple2(self.clone(), self.flat_map(f))
    }

    /// Fetches an attachment for this node's value and combines the two.
    ///
    /// ```rust
    /// use kasane::Node;
    ///
    /// let node = Node::from_value(2).attach(|n, sq| (n, sq), |n| Node::from_value(n * n));
    /// assert_eq!(node.value().unwrap(), (2, 4));
    /// ```
    pub fn attach<A, V, C, F>(self, combine: C, attachment: F) -> Node<V>
    where
        A: Data,
        V: Data,
        C: Fn(T, A) -> V + Send + Sync + 'static,
        F: Fn(T) -> Node<A> + Send + Sync + 'static,
    {
        self.juxt_self(attachment).map_n(combine)
    }

    /// Like [`attach`](Self::attach), with two independent attachments.
    pub fn attach2<A, B, V, C, FA, FB>(self, combine: C, fa: FA, fb: FB) -> Node<V>
    where
        A: Data,
        B: Data,
        V: Data,
        C: Fn(T, A, B) -> V + Send + Sync + 'static,
        FA: Fn(T) -> Node<A> + Send + Sync + 'static,
        FB: Fn(T) -> Node<B> + Send + Sync + 'static,
    {
        tuple3(self.clone(), self.clone().flat_map(fa), self.flat_map(fb)).map_n(combine)
    }
}

/// A resolved leaf holding `value`.
pub fn value<T: Data>(value: T) -> Node<T> {
    Node::from_value(value)
}

/// An unresolved leaf for `resolvable`.
pub fn fetch<R: Resolvable>(resolvable: R) -> Node<R::Output> {
    Node::fetch(resolvable)
}

/// A node yielding the values of all `nodes`, in order.
pub fn list<T: Data>(nodes: impl IntoIterator<Item = Node<T>>) -> Node<Vec<T>> {
    Node::from_impl(collection::CollectionNode::new(nodes.into_iter().collect()))
}

/// A resolved node holding all `items`, in order.
pub fn values<T: Data>(items: impl IntoIterator<Item = T>) -> Node<Vec<T>> {
    Node::from_value(items.into_iter().collect())
}
