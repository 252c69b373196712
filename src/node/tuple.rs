use std::fmt;

use crate::core::Data;
use crate::error::ResolveError;
use crate::resolvable::AnyResolvable;
use crate::results::ResolvedValues;

use super::{Node, NodeImpl};

/// Generates a fixed-arity product node, its constructor, and the `map_n` /
/// `flat_map_n` combinators that spread the tuple into positional arguments.
macro_rules! tuple_node {
    ($name:ident, $ctor:ident; $($T:ident: $field:ident),+) => {
        pub(crate) struct $name<$($T),+> {
            $($field: Node<$T>),+
        }

        impl<$($T: Data),+> $name<$($T),+> {
            fn resolved(&self) -> bool {
                true $(&& self.$field.is_resolved())+
            }
        }

        impl<$($T: Data),+> NodeImpl<($($T,)+)> for $name<$($T),+> {
            fn is_resolved(&self) -> bool {
                self.resolved()
            }

            fn value(&self) -> Result<($($T,)+), ResolveError> {
                Ok(($(self.$field.value()?,)+))
            }

            fn collect(&self, out: &mut Vec<AnyResolvable>) {
                $(self.$field.collect_into(out);)+
            }

            fn inject(&self, this: &Node<($($T,)+)>, results: &ResolvedValues) -> Node<($($T,)+)> {
                if self.resolved() {
                    return this.clone();
                }

                $(let $field = self.$field.inject_values(results);)+

                if true $(&& $field.ptr_eq(&self.$field))+ {
                    return this.clone();
                }

                let node = $name { $($field),+ };
                if node.resolved()
                    && let Ok(values) = node.value()
                {
                    return Node::from_value(values);
                }

                Node::from_impl(node)
            }

            fn describe(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name))
                    $(.field(&self.$field))+
                    .finish()
            }
        }

        /// A node yielding the values of all its components, as a tuple.
        pub fn $ctor<$($T: Data),+>($($field: Node<$T>),+) -> Node<($($T,)+)> {
            Node::from_impl($name { $($field),+ })
        }

        impl<$($T: Data),+> Node<($($T,)+)> {
            /// Maps over the tuple components as separate arguments.
            pub fn map_n<R, F>(self, f: F) -> Node<R>
            where
                R: Data,
                F: Fn($($T),+) -> R + Send + Sync + 'static,
            {
                self.map(move |($($field,)+)| f($($field),+))
            }

            /// Continues from the tuple components as separate arguments.
            pub fn flat_map_n<R, F>(self, f: F) -> Node<R>
            where
                R: Data,
                F: Fn($($T),+) -> Node<R> + Send + Sync + 'static,
            {
                self.flat_map(move |($($field,)+)| f($($field),+))
            }
        }
    };
}

tuple_node!(Tuple2, tuple2; A: a, B: b);
tuple_node!(Tuple3, tuple3; A: a, B: b, C: c);
tuple_node!(Tuple4, tuple4; A: a, B: b, C: c, D: d);
