use std::collections::HashMap;
use std::collections::hash_map;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::core::Dynamic;
use crate::resolvable::{AnyResolvable, ErasedResolvable, Resolvable};

/// Values produced by a resolver, keyed by the resolvable they answer.
///
/// This is what resolver functions hand back to the engine. Entries may be
/// omitted: a resolvable without an entry simply stays unresolved and is
/// offered to its resolver again in the next round.
pub struct Results<R: Resolvable> {
    values: HashMap<R, R::Output>,
}

impl<R: Resolvable> Results<R> {
    pub fn empty() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    pub fn single(resolvable: R, value: R::Output) -> Self {
        let mut results = Self::empty();
        results.insert(resolvable, value);
        results
    }

    /// Pairs resolvables with values positionally. Fails if the lengths differ.
    pub fn zip(resolvables: &[R], values: Vec<R::Output>) -> anyhow::Result<Self> {
        anyhow::ensure!(
            resolvables.len() == values.len(),
            "expected {} values, got {}",
            resolvables.len(),
            values.len()
        );

        Ok(resolvables.iter().cloned().zip(values).collect())
    }

    /// Computes a value for every resolvable.
    pub fn from_fn<F>(resolvables: &[R], mut f: F) -> Self
    where
        F: FnMut(&R) -> R::Output,
    {
        resolvables.iter().map(|r| (r.clone(), f(r))).collect()
    }

    /// Joins values to resolvables through a shared identity, e.g. a database
    /// row to the request that asked for its id. Resolvables without a
    /// matching value are left out.
    pub fn match_by<I, FR, FV>(
        resolvables: &[R],
        by_resolvable: FR,
        values: Vec<R::Output>,
        by_value: FV,
    ) -> Self
    where
        I: Eq + Hash,
        FR: Fn(&R) -> I,
        FV: Fn(&R::Output) -> I,
    {
        let lookup = index_by(values, by_value);

        resolvables
            .iter()
            .filter_map(|r| lookup.get(&by_resolvable(r)).map(|v| (r.clone(), v.clone())))
            .collect()
    }

    /// Like [`match_by`](Self::match_by), but unmatched resolvables get `default`.
    pub fn match_or<I, FR, FV>(
        resolvables: &[R],
        by_resolvable: FR,
        values: Vec<R::Output>,
        by_value: FV,
        default: R::Output,
    ) -> Self
    where
        I: Eq + Hash,
        FR: Fn(&R) -> I,
        FV: Fn(&R::Output) -> I,
    {
        let lookup = index_by(values, by_value);

        resolvables
            .iter()
            .map(|r| {
                let value = lookup.get(&by_resolvable(r)).unwrap_or(&default);
                (r.clone(), value.clone())
            })
            .collect()
    }

    pub fn insert(&mut self, resolvable: R, value: R::Output) -> Option<R::Output> {
        self.values.insert(resolvable, value)
    }

    pub fn get(&self, resolvable: &R) -> Option<&R::Output> {
        self.values.get(resolvable)
    }

    /// Merges `other` into `self`; values from `other` win on collision.
    pub fn merge(&mut self, other: Results<R>) {
        self.values.extend(other.values);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, R, R::Output> {
        self.values.iter()
    }

    pub(crate) fn into_resolved(self) -> ResolvedValues {
        let mut resolved = ResolvedValues::new();
        for (resolvable, value) in self.values {
            resolved.insert(resolvable, value);
        }
        resolved
    }
}

fn index_by<V, I, F>(values: Vec<V>, by_value: F) -> HashMap<I, V>
where
    I: Eq + Hash,
    F: Fn(&V) -> I,
{
    values.into_iter().map(|v| (by_value(&v), v)).collect()
}

impl<R: Resolvable> Default for Results<R> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<R: Resolvable> FromIterator<(R, R::Output)> for Results<R> {
    fn from_iter<I: IntoIterator<Item = (R, R::Output)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl<R: Resolvable> IntoIterator for Results<R> {
    type Item = (R, R::Output);
    type IntoIter = hash_map::IntoIter<R, R::Output>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl<R: Resolvable> fmt::Debug for Results<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

/// Resolved values of any resolvable type, as seen by the engine.
///
/// This is the only channel through which resolver output re-enters a node
/// tree: [`Node::inject_values`](crate::Node::inject_values) replaces every
/// leaf found here with its value.
#[derive(Clone, Default)]
pub struct ResolvedValues {
    values: HashMap<AnyResolvable, Dynamic>,
}

impl ResolvedValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<R: Resolvable>(&mut self, resolvable: R, value: R::Output) {
        self.values
            .insert(AnyResolvable::new(resolvable), Arc::new(value));
    }

    /// Looks up the value of a typed resolvable.
    pub fn get<R: Resolvable>(&self, resolvable: &R) -> Option<R::Output> {
        let probe: &(dyn ErasedResolvable + 'static) = resolvable;

        self.values
            .get(probe)
            .and_then(|value| value.downcast_ref::<R::Output>())
            .cloned()
    }

    pub fn contains(&self, resolvable: &AnyResolvable) -> bool {
        self.values.contains_key(resolvable)
    }

    /// Merges `other` into `self`; values from `other` win on collision.
    pub fn merge(&mut self, other: ResolvedValues) {
        self.values.extend(other.values);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn resolvables(&self) -> impl Iterator<Item = &AnyResolvable> {
        self.values.keys()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl fmt::Debug for ResolvedValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}
