use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::core::Data;
use crate::error::ResolveError;
use crate::resolvable::AnyResolvable;
use crate::results::ResolvedValues;

use super::{Node, NodeImpl};

pub(crate) type Transform<U, T> = Arc<dyn Fn(U) -> T + Send + Sync>;
pub(crate) type Continuation<U, T> = Arc<dyn Fn(U) -> Node<T> + Send + Sync>;

pub(crate) struct MapNode<U, T> {
    pub inner: Node<U>,
    pub f: Transform<U, T>,
}

impl<U: Data, T: Data> NodeImpl<T> for MapNode<U, T> {
    fn is_resolved(&self) -> bool {
        self.inner.is_resolved()
    }

    fn value(&self) -> Result<T, ResolveError> {
        self.inner.value().map(|v| (self.f)(v))
    }

    fn collect(&self, out: &mut Vec<AnyResolvable>) {
        self.inner.collect_into(out)
    }

    fn inject(&self, this: &Node<T>, results: &ResolvedValues) -> Node<T> {
        if self.inner.is_resolved() {
            return this.clone();
        }

        let inner = self.inner.inject_values(results);
        if inner.ptr_eq(&self.inner) {
            return this.clone();
        }

        Node::from_impl(MapNode {
            inner,
            f: self.f.clone(),
        })
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Map").field(&self.inner).finish()
    }
}

/// Continuation over a node that is still waiting for values.
pub(crate) struct FlatMapNode<U, T> {
    pub inner: Node<U>,
    pub f: Continuation<U, T>,
}

impl<U: Data, T: Data> NodeImpl<T> for FlatMapNode<U, T> {
    fn is_resolved(&self) -> bool {
        false
    }

    fn value(&self) -> Result<T, ResolveError> {
        Err(ResolveError::Unresolved)
    }

    fn collect(&self, out: &mut Vec<AnyResolvable>) {
        self.inner.collect_into(out)
    }

    fn inject(&self, this: &Node<T>, results: &ResolvedValues) -> Node<T> {
        let inner = self.inner.inject_values(results);

        if inner.is_resolved()
            && let Ok(input) = inner.value()
        {
            // The same results may already answer what the continuation asks for.
            return (self.f)(input).inject_values(results);
        }

        if inner.ptr_eq(&self.inner) {
            return this.clone();
        }

        Node::from_impl(FlatMapNode {
            inner,
            f: self.f.clone(),
        })
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FlatMap").field(&self.inner).finish()
    }
}

/// Continuation over an already known input.
///
/// The continuation runs on first use and the produced node is kept, so
/// inspecting the same tree several times never recomputes it.
pub(crate) struct MemoFlatMapNode<U, T> {
    input: U,
    f: Continuation<U, T>,
    produced: OnceLock<Node<T>>,
}

impl<U: Data, T: Data> MemoFlatMapNode<U, T> {
    pub fn new(input: U, f: Continuation<U, T>) -> Self {
        Self {
            input,
            f,
            produced: OnceLock::new(),
        }
    }

    fn produced(&self) -> &Node<T> {
        self.produced.get_or_init(|| (self.f)(self.input.clone()))
    }
}

impl<U: Data, T: Data> NodeImpl<T> for MemoFlatMapNode<U, T> {
    fn is_resolved(&self) -> bool {
        self.produced().is_resolved()
    }

    fn value(&self) -> Result<T, ResolveError> {
        self.produced().value()
    }

    fn collect(&self, out: &mut Vec<AnyResolvable>) {
        self.produced().collect_into(out)
    }

    fn inject(&self, _: &Node<T>, results: &ResolvedValues) -> Node<T> {
        self.produced().inject_values(results)
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.produced.get() {
            Some(node) => f.debug_tuple("FlatMap").field(node).finish(),
            None => f.write_str("FlatMap(<pending>)"),
        }
    }
}
