use std::fmt;

use crate::core::Data;
use crate::error::ResolveError;
use crate::resolvable::{AnyResolvable, Resolvable};
use crate::results::ResolvedValues;

use super::{Node, NodeImpl};

pub(crate) struct ValueNode<T>(pub T);

impl<T: Data> NodeImpl<T> for ValueNode<T> {
    fn is_resolved(&self) -> bool {
        true
    }

    fn value(&self) -> Result<T, ResolveError> {
        Ok(self.0.clone())
    }

    fn collect(&self, _: &mut Vec<AnyResolvable>) {}

    fn inject(&self, this: &Node<T>, _: &ResolvedValues) -> Node<T> {
        this.clone()
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Value")
    }
}

pub(crate) struct FetchNode<R>(pub R);

impl<R: Resolvable> NodeImpl<R::Output> for FetchNode<R> {
    fn is_resolved(&self) -> bool {
        false
    }

    fn value(&self) -> Result<R::Output, ResolveError> {
        Err(ResolveError::Unresolved)
    }

    fn collect(&self, out: &mut Vec<AnyResolvable>) {
        out.push(AnyResolvable::new(self.0.clone()));
    }

    fn inject(&self, this: &Node<R::Output>, results: &ResolvedValues) -> Node<R::Output> {
        match results.get(&self.0) {
            Some(value) => Node::from_value(value),
            None => this.clone(),
        }
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Fetch").field(&self.0).finish()
    }
}
