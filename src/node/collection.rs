use std::fmt;

use crate::core::Data;
use crate::error::ResolveError;
use crate::resolvable::AnyResolvable;
use crate::results::ResolvedValues;

use super::{Node, NodeImpl};

pub(crate) struct CollectionNode<T> {
    children: Vec<Node<T>>,
    resolved: bool,
}

impl<T: Data> CollectionNode<T> {
    pub fn new(children: Vec<Node<T>>) -> Self {
        let resolved = children.iter().all(Node::is_resolved);
        Self { children, resolved }
    }
}

impl<T: Data> NodeImpl<Vec<T>> for CollectionNode<T> {
    fn is_resolved(&self) -> bool {
        self.resolved
    }

    fn value(&self) -> Result<Vec<T>, ResolveError> {
        if !self.resolved {
            return Err(ResolveError::Unresolved);
        }

        self.children.iter().map(Node::value).collect()
    }

    fn collect(&self, out: &mut Vec<AnyResolvable>) {
        for child in &self.children {
            child.collect_into(out);
        }
    }

    fn inject(&self, this: &Node<Vec<T>>, results: &ResolvedValues) -> Node<Vec<T>> {
        if self.resolved {
            return this.clone();
        }

        let children: Vec<_> = self
            .children
            .iter()
            .map(|child| child.inject_values(results))
            .collect();

        let changed = children
            .iter()
            .zip(&self.children)
            .any(|(new, old)| !new.ptr_eq(old));

        if !changed {
            return this.clone();
        }

        let node = CollectionNode::new(children);
        if node.resolved
            && let Ok(values) = node.value()
        {
            return Node::from_value(values);
        }

        Node::from_impl(node)
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Collection").field(&self.children).finish()
    }
}
