use std::sync::Arc;

use crate::core::Data;

use super::{Node, list};

/// Helpers for nodes yielding a list.
impl<T: Data> Node<Vec<T>> {
    /// Applies `f` to every element.
    pub fn map_each<R, F>(self, f: F) -> Node<Vec<R>>
    where
        R: Data,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        self.map(move |items| items.into_iter().map(&f).collect())
    }

    /// Continues every element with its own node and collects the results.
    ///
    /// All element continuations are resolved together, so the resolvables
    /// they expose end up in the same batches.
    pub fn flat_map_each<R, F>(self, f: F) -> Node<Vec<R>>
    where
        R: Data,
        F: Fn(T) -> Node<R> + Send + Sync + 'static,
    {
        self.flat_map(move |items| list(items.into_iter().map(&f)))
    }

    /// Like [`flat_map_each`](Self::flat_map_each), but the continuation
    /// receives every element wrapped in a resolved node.
    pub fn traverse<R, F>(self, f: F) -> Node<Vec<R>>
    where
        R: Data,
        F: Fn(Node<T>) -> Node<R> + Send + Sync + 'static,
    {
        self.flat_map(move |items| list(items.into_iter().map(|item| f(Node::from_value(item)))))
    }

    /// [`attach`](Node::attach) applied to every element.
    pub fn attach_each<A, V, C, F>(self, combine: C, attachment: F) -> Node<Vec<V>>
    where
        A: Data,
        V: Data,
        C: Fn(T, A) -> V + Send + Sync + 'static,
        F: Fn(T) -> Node<A> + Send + Sync + 'static,
    {
        let combine = Arc::new(combine);
        let attachment = Arc::new(attachment);

        self.flat_map_each(move |item| {
            let combine = combine.clone();
            let attachment = attachment.clone();
            Node::from_value(item).attach(move |t, a| combine(t, a), move |t| attachment(t))
        })
    }

    /// Left fold over the elements.
    pub fn fold<A, F>(self, init: A, f: F) -> Node<A>
    where
        A: Data,
        F: Fn(A, T) -> A + Send + Sync + 'static,
    {
        self.map(move |items| items.into_iter().fold(init.clone(), &f))
    }

    /// Right fold over the elements.
    pub fn fold_right<A, F>(self, init: A, f: F) -> Node<A>
    where
        A: Data,
        F: Fn(T, A) -> A + Send + Sync + 'static,
    {
        self.map(move |items| items.into_iter().rev().fold(init.clone(), |acc, item| f(item, acc)))
    }
}
