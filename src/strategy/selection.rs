use std::collections::BTreeMap;

use crate::core::ResolvableKey;
use crate::resolvable::AnyResolvable;

/// All uncached resolvables of a round that share a key.
#[derive(Debug, Clone)]
pub struct Batch {
    pub key: ResolvableKey,
    pub resolvables: Vec<AnyResolvable>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.resolvables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvables.is_empty()
    }
}

/// Decides which of the ready batches run in the current round.
///
/// Batches are handed over ordered by key. Batches left out are not lost:
/// their resolvables are discovered again next round.
pub trait SelectionStrategy: Send + Sync {
    fn select(&self, batches: Vec<Batch>) -> Vec<Batch>;
}

/// Runs every ready batch.
#[derive(Debug, Default, Clone, Copy)]
pub struct All;

impl SelectionStrategy for All {
    fn select(&self, batches: Vec<Batch>) -> Vec<Batch> {
        batches
    }
}

/// Runs at most `n` batches per round.
#[derive(Debug, Clone, Copy)]
pub struct Limit(pub usize);

impl SelectionStrategy for Limit {
    fn select(&self, mut batches: Vec<Batch>) -> Vec<Batch> {
        batches.truncate(self.0);
        batches
    }
}

/// Runs only the batches with the highest priority among the ready ones.
///
/// Keys without an explicit priority have priority `0`.
///
/// ```rust
/// use kasane::strategy::Priority;
///
/// let priority = Priority::new()
///     .with_priority("users", 5)
///     .with_priority_higher_than("sessions", &"users".into());
///
/// assert_eq!(priority.priority_of(&"sessions".into()), 6);
/// assert_eq!(priority.priority_of(&"posts".into()), 0);
/// ```
#[derive(Debug, Default, Clone)]
pub struct Priority {
    priorities: BTreeMap<ResolvableKey, i32>,
}

impl Priority {
    pub const DEFAULT: i32 = 0;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_priority(mut self, key: impl Into<ResolvableKey>, priority: i32) -> Self {
        self.priorities.insert(key.into(), priority);
        self
    }

    /// Puts `key` right above `other`.
    pub fn with_priority_higher_than(
        self,
        key: impl Into<ResolvableKey>,
        other: &ResolvableKey,
    ) -> Self {
        let priority = self.priority_of(other).saturating_add(1);
        self.with_priority(key, priority)
    }

    /// Puts `key` right below `other`.
    pub fn with_priority_lower_than(
        self,
        key: impl Into<ResolvableKey>,
        other: &ResolvableKey,
    ) -> Self {
        let priority = self.priority_of(other).saturating_sub(1);
        self.with_priority(key, priority)
    }

    pub fn priority_of(&self, key: &ResolvableKey) -> i32 {
        self.priorities.get(key).copied().unwrap_or(Self::DEFAULT)
    }
}

impl SelectionStrategy for Priority {
    fn select(&self, batches: Vec<Batch>) -> Vec<Batch> {
        let Some(max) = batches.iter().map(|batch| self.priority_of(&batch.key)).max() else {
            return batches;
        };

        batches
            .into_iter()
            .filter(|batch| self.priority_of(&batch.key) == max)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batches(keys: &[&'static str]) -> Vec<Batch> {
        keys.iter()
            .map(|&key| Batch {
                key: key.into(),
                resolvables: Vec::new(),
            })
            .collect()
    }

    fn keys(batches: &[Batch]) -> Vec<&str> {
        batches.iter().map(|batch| batch.key.as_str()).collect()
    }

    #[test]
    fn test_all() {
        assert_eq!(keys(&All.select(batches(&["a", "b", "c"]))), ["a", "b", "c"]);
    }

    #[test]
    fn test_limit() {
        assert_eq!(keys(&Limit(2).select(batches(&["a", "b", "c"]))), ["a", "b"]);
        assert_eq!(keys(&Limit(5).select(batches(&["a"]))), ["a"]);
        assert!(Limit(0).select(batches(&["a"])).is_empty());
    }

    #[test]
    fn test_priority_selects_maximum() {
        let priority = Priority::new().with_priority("a", 1);
        assert_eq!(keys(&priority.select(batches(&["a", "b"]))), ["a"]);
        assert_eq!(keys(&priority.select(batches(&["b", "c"]))), ["b", "c"]);
    }

    #[test]
    fn test_priority_ties_run_together() {
        let priority = Priority::new().with_priority("a", 3).with_priority("c", 3);
        assert_eq!(keys(&priority.select(batches(&["a", "b", "c"]))), ["a", "c"]);
    }

    #[test]
    fn test_relative_priorities() {
        let priority = Priority::new()
            .with_priority_lower_than("b", &"a".into())
            .with_priority_higher_than("c", &"a".into());

        assert_eq!(priority.priority_of(&"b".into()), -1);
        assert_eq!(priority.priority_of(&"c".into()), 1);
        assert_eq!(keys(&priority.select(batches(&["a", "b"]))), ["a"]);
    }

    #[test]
    fn test_priority_empty() {
        assert!(Priority::new().select(Vec::new()).is_empty());
    }
}
