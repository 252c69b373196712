use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use crate::Node;
use crate::cache::EngineCache;
use crate::core::{Data, ResolvableKey};
use crate::error::ResolveError;
use crate::resolvable::AnyResolvable;
use crate::results::ResolvedValues;
use crate::strategy::Batch;

use super::{BatchStats, Diagnostics, Engine, RoundStats};

impl<E> Engine<E>
where
    E: Send + Sync + 'static,
{
    /// Runs rounds until `node` is resolved or the round limit is exceeded.
    pub(super) fn drive<T: Data>(
        &self,
        mut node: Node<T>,
        cache: &dyn EngineCache,
        mut diagnostics: Option<&mut Diagnostics>,
    ) -> Result<T, ResolveError> {
        let span = tracing::debug_span!("resolve", max_iterations = self.max_iteration_count);
        let _enter = span.enter();

        let mut iteration = 0;

        while !node.is_resolved() {
            iteration += 1;

            if iteration > self.max_iteration_count {
                tracing::warn!(max = self.max_iteration_count, "Tree still unresolved, giving up");
                return Err(ResolveError::IterationLimit {
                    max: self.max_iteration_count,
                });
            }

            let (view, stats) = self.round(iteration, &node, cache)?;
            node = node.inject_values(&view);

            if let Some(diagnostics) = diagnostics.as_deref_mut() {
                diagnostics.rounds.push(stats);
            }
        }

        tracing::debug!(rounds = iteration, "Tree resolved");
        node.value()
    }

    /// One round: collect, deduplicate, filter cached, group, select, run,
    /// and merge into the cache. Returns the full view to inject.
    fn round<T: Data>(
        &self,
        iteration: usize,
        node: &Node<T>,
        cache: &dyn EngineCache,
    ) -> Result<(ResolvedValues, RoundStats), ResolveError> {
        let span = tracing::trace_span!("round", iteration);
        let _enter = span.enter();
        let start = Instant::now();

        let discovered = unique(node.resolvables());
        let discovered_count = discovered.len();

        let uncached = cache.remove_cached(discovered);
        let uncached_count = uncached.len();

        if uncached.is_empty() {
            tracing::trace!("All results are already cached");
        } else {
            tracing::trace!("{uncached_count} values need to be resolved");
        }

        let batches = self.selection.select(group(uncached));

        let mut operations = Vec::new();
        let mut requested = Vec::new();
        let mut batch_stats = Vec::with_capacity(batches.len());

        for batch in batches {
            tracing::debug!(key = %batch.key, size = batch.len(), "Resolving batch");

            let definition = self.registry.get(&batch.key)?;

            batch_stats.push(BatchStats {
                key: batch.key.clone(),
                size: batch.len(),
            });
            requested.extend(batch.resolvables.iter().cloned());
            operations.extend(definition.create_operations(&self.environment, batch.resolvables)?);
        }

        let operation_count = operations.len();

        let mut results = ResolvedValues::new();
        for partial in self.resolution.run(operations)? {
            results.merge(partial);
        }
        let resolved = results.len();

        let omitted: Vec<_> = requested
            .iter()
            .filter(|resolvable| !results.contains(resolvable))
            .collect();

        if !omitted.is_empty() {
            tracing::warn!(
                count = omitted.len(),
                ?omitted,
                "Resolvers returned no value for some resolvables, requesting them again next round"
            );
        }

        let view = cache.update_and_get(results);

        let stats = RoundStats {
            round: iteration,
            discovered: discovered_count,
            uncached: uncached_count,
            batches: batch_stats,
            operations: operation_count,
            resolved,
            duration: start.elapsed(),
        };

        Ok((view, stats))
    }
}

/// Drops repeated resolvables, keeping the first occurrence.
fn unique(resolvables: Vec<AnyResolvable>) -> Vec<AnyResolvable> {
    let mut seen = HashSet::with_capacity(resolvables.len());
    resolvables
        .into_iter()
        .filter(|resolvable| seen.insert(resolvable.clone()))
        .collect()
}

/// Groups resolvables into batches ordered by key. Within a batch, discovery
/// order is kept.
fn group(resolvables: Vec<AnyResolvable>) -> Vec<Batch> {
    let mut groups: BTreeMap<ResolvableKey, Vec<AnyResolvable>> = BTreeMap::new();

    for resolvable in resolvables {
        groups.entry(resolvable.key()).or_default().push(resolvable);
    }

    groups
        .into_iter()
        .map(|(key, resolvables)| Batch { key, resolvables })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::cache::{MemoryCache, NoCache};
    use crate::error::ConfigError;
    use crate::node::{fetch, list, value};
    use crate::resolvable::Resolvable;
    use crate::resolver::{Provider, Resolver, ResolverDefinition};
    use crate::results::Results;
    use crate::strategy::{Limit, Parallel, Priority};
    use crate::EngineBuilder;

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    struct Num(u32);

    impl Resolvable for Num {
        type Output = u32;
    }

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    struct Double(u32);

    impl Resolvable for Double {
        type Output = u32;
    }

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    struct Triple(u32);

    impl Resolvable for Triple {
        type Output = u32;
    }

    #[derive(Default)]
    struct Env {
        batches: Mutex<Vec<(&'static str, Vec<u32>)>>,
    }

    impl Env {
        fn record(&self, name: &'static str, ids: impl IntoIterator<Item = u32>) {
            self.batches.lock().unwrap().push((name, ids.into_iter().collect()));
        }

        fn calls(&self, name: &str) -> Vec<Vec<u32>> {
            self.batches
                .lock()
                .unwrap()
                .iter()
                .filter(|(n, _)| *n == name)
                .map(|(_, ids)| ids.clone())
                .collect()
        }
    }

    fn builder() -> EngineBuilder<Env> {
        Engine::builder()
            .with_resolver(ResolverDefinition::batched(|env: &Env, batch: &[Num]| {
                env.record("num", batch.iter().map(|n| n.0));
                Ok(Results::from_fn(batch, |n| n.0))
            }))
            .with_resolver(ResolverDefinition::batched_in_order(|env: &Env, batch: &[Double]| {
                env.record("double", batch.iter().map(|d| d.0));
                Ok(batch.iter().map(|d| d.0 * 2).collect())
            }))
            .with_resolver(ResolverDefinition::single(|env: &Env, t: &Triple| {
                env.record("triple", [t.0]);
                anyhow::ensure!(t.0 != 13, "unlucky number");
                Ok(t.0 * 3)
            }))
    }

    fn engine() -> Engine<Env> {
        builder().build(Env::default())
    }

    /// Every step asks for one more value, forever.
    fn endless(n: u32) -> Node<u32> {
        fetch(Num(n)).flat_map(|n| endless(n + 1))
    }

    #[test]
    fn test_collection_of_leaves_and_values() {
        let engine = engine();
        let node = list([fetch(Num(1)), value(2), fetch(Num(3))]);

        assert_eq!(engine.resolve(node).unwrap(), vec![1, 2, 3]);
        assert_eq!(engine.environment().calls("num"), vec![vec![1, 3]]);
    }

    #[test]
    fn test_resolved_tree_needs_no_round() {
        let engine = engine();
        let (value, diagnostics) = engine
            .resolve_with_diagnostics(value(7), &MemoryCache::new())
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(diagnostics.round_count(), 0);
    }

    #[test]
    fn test_duplicates_fetched_once() {
        let engine = engine();
        let node = list([fetch(Num(1)), fetch(Num(1)), fetch(Num(1)).map(|n| n + 10)]);

        assert_eq!(engine.resolve(node).unwrap(), vec![1, 1, 11]);
        assert_eq!(engine.environment().calls("num"), vec![vec![1]]);
    }

    #[test]
    fn test_shared_cache_across_calls() {
        let engine = engine();
        let cache = MemoryCache::new();

        engine.resolve_with(fetch(Num(1)), &cache).unwrap();
        let second = engine.resolve_with(list([fetch(Num(1)), fetch(Num(2))]), &cache).unwrap();

        assert_eq!(second, vec![1, 2]);
        assert_eq!(engine.environment().calls("num"), vec![vec![1], vec![2]]);
        assert_eq!(cache.get(&Num(2)), Some(2));
    }

    #[test]
    fn test_no_cache_refetches_across_calls() {
        let engine = engine();

        engine.resolve_with(fetch(Num(1)), &NoCache).unwrap();
        engine.resolve_with(fetch(Num(1)), &NoCache).unwrap();

        assert_eq!(engine.environment().calls("num").len(), 2);
    }

    #[test]
    fn test_one_batch_per_key() {
        let engine = engine();
        let node = list([fetch(Num(1)), fetch(Num(2)), fetch(Double(5))]);

        let (value, diagnostics) = engine
            .resolve_with_diagnostics(node, &MemoryCache::new())
            .unwrap();

        assert_eq!(value, vec![1, 2, 10]);
        assert_eq!(diagnostics.round_count(), 1);

        let round = &diagnostics.rounds[0];
        assert_eq!(round.discovered, 3);
        assert_eq!(round.batches.len(), 2);
        assert_eq!(round.operations, 2);
    }

    #[test]
    fn test_single_resolver_operation_per_item() {
        let engine = engine();
        let node = list([fetch(Triple(1)), fetch(Triple(2))]);

        let (value, diagnostics) = engine
            .resolve_with_diagnostics(node, &MemoryCache::new())
            .unwrap();

        assert_eq!(value, vec![3, 6]);
        assert_eq!(diagnostics.rounds[0].batches.len(), 1);
        assert_eq!(diagnostics.rounds[0].operations, 2);
    }

    #[test]
    fn test_limit_runs_one_batch_per_round() {
        let engine = builder().with_selection_strategy(Limit(1)).build(Env::default());
        let node = list([fetch(Num(1)), fetch(Double(1)), fetch(Triple(1))]);

        let (value, diagnostics) = engine
            .resolve_with_diagnostics(node, &MemoryCache::new())
            .unwrap();

        assert_eq!(value, vec![1, 2, 3]);
        assert_eq!(diagnostics.round_count(), 3);
        assert!(diagnostics.rounds.iter().all(|round| round.batches.len() == 1));
    }

    #[test]
    fn test_priority_orders_batches() {
        let priority = Priority::new().with_priority(ResolvableKey::of::<Num>(), 1);
        let engine = builder().with_selection_strategy(priority).build(Env::default());
        let node = list([fetch(Double(4)), fetch(Num(4))]);

        let (value, diagnostics) = engine
            .resolve_with_diagnostics(node, &MemoryCache::new())
            .unwrap();

        assert_eq!(value, vec![8, 4]);
        assert_eq!(diagnostics.round_count(), 2);
        assert_eq!(diagnostics.rounds[0].batches[0].key, ResolvableKey::of::<Num>());
        assert_eq!(diagnostics.rounds[1].batches[0].key, ResolvableKey::of::<Double>());
    }

    #[test]
    fn test_dependent_fetch_takes_two_rounds() {
        let engine = engine();
        let node = fetch(Num(2)).flat_map(|n| fetch(Double(n)));

        let (value, diagnostics) = engine
            .resolve_with_diagnostics(node, &MemoryCache::new())
            .unwrap();

        assert_eq!(value, 4);
        assert_eq!(diagnostics.round_count(), 2);
        assert_eq!(engine.environment().calls("num"), vec![vec![2]]);
        assert_eq!(engine.environment().calls("double"), vec![vec![2]]);
    }

    #[test]
    fn test_continuations_batch_together() {
        let engine = engine();
        let node =
            value(vec![1, 2, 3]).flat_map_each(|n| fetch(Num(n)).flat_map(|n| fetch(Double(n))));

        assert_eq!(engine.resolve(node).unwrap(), vec![2, 4, 6]);
        assert_eq!(engine.environment().calls("num"), vec![vec![1, 2, 3]]);
        assert_eq!(engine.environment().calls("double"), vec![vec![1, 2, 3]]);
    }

    #[test]
    fn test_iteration_limit() {
        let engine = builder().with_max_iteration_count(5).build(Env::default());

        let error = engine.resolve(endless(0)).unwrap_err();

        assert!(matches!(error, ResolveError::IterationLimit { max: 5 }));
        assert_eq!(engine.environment().calls("num").len(), 5);
    }

    #[test]
    fn test_default_iteration_limit() {
        let engine = engine();
        assert_eq!(engine.max_iteration_count(), 16);
        assert!(matches!(
            engine.resolve(endless(0)),
            Err(ResolveError::IterationLimit { max: 16 })
        ));
    }

    #[test]
    fn test_missing_resolver() {
        let engine = Engine::<Env>::builder().build(Env::default());

        match engine.resolve(fetch(Num(1))) {
            Err(ResolveError::Config(ConfigError::MissingResolver(key))) => {
                assert_eq!(key, ResolvableKey::of::<Num>());
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_resolver_error_propagates() {
        let engine = engine();
        let node = list([fetch(Triple(1)), fetch(Triple(13))]);

        match engine.resolve(node) {
            Err(ResolveError::Resolver { key, source }) => {
                assert_eq!(key, ResolvableKey::of::<Triple>());
                assert_eq!(source.to_string(), "unlucky number");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_wrong_length_is_config_error() {
        let engine = Engine::builder()
            .with_resolver(ResolverDefinition::batched_in_order(|_: &(), _: &[Double]| Ok(vec![])))
            .build(());

        assert!(matches!(
            engine.resolve(fetch(Double(1))),
            Err(ResolveError::Config(ConfigError::LengthMismatch { .. }))
        ));
    }

    #[test]
    fn test_omitted_entries_retried() {
        let first = AtomicBool::new(true);
        let engine = Engine::builder()
            .with_resolver(ResolverDefinition::batched(move |_: &(), batch: &[Num]| {
                let skip = first.swap(false, Ordering::SeqCst);
                Ok(batch
                    .iter()
                    .filter(|n| !(skip && n.0 == 2))
                    .map(|n| (n.clone(), n.0))
                    .collect())
            }))
            .build(());

        let (value, diagnostics) = engine
            .resolve_with_diagnostics(list([fetch(Num(1)), fetch(Num(2))]), &MemoryCache::new())
            .unwrap();

        assert_eq!(value, vec![1, 2]);
        assert_eq!(diagnostics.round_count(), 2);
        assert_eq!(diagnostics.rounds[1].uncached, 1);
    }

    #[test]
    fn test_never_answered_hits_limit() {
        let engine = Engine::builder()
            .with_resolver(ResolverDefinition::batched(|_: &(), _: &[Num]| Ok(Results::empty())))
            .with_max_iteration_count(3)
            .build(());

        assert!(matches!(
            engine.resolve(fetch(Num(1))),
            Err(ResolveError::IterationLimit { max: 3 })
        ));
    }

    #[test]
    fn test_parallel_resolution() {
        let engine = builder().with_parallelism().build(Env::default());
        let node = list((1..=12).map(|n| fetch(Triple(n))));

        let value = engine.resolve(node).unwrap();

        assert_eq!(value, (1..=12).map(|n| n * 3).collect::<Vec<_>>());
        assert_eq!(engine.environment().calls("triple").len(), 12);
    }

    #[test]
    fn test_parallel_panic_becomes_error() {
        let engine = Engine::builder()
            .with_resolver(ResolverDefinition::single(|_: &(), n: &Num| {
                if n.0 == 3 {
                    panic!("cannot handle three");
                }
                Ok(n.0)
            }))
            .with_resolution_strategy(Parallel::global())
            .build(());

        let node = list((1..=4).map(|n| fetch(Num(n))));

        match engine.resolve(node) {
            Err(ResolveError::Resolver { source, .. }) => {
                assert_eq!(source.to_string(), "Resolver panicked: cannot handle three");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_declared_resolvers() {
        let users = Resolver::batched("user", |_: &(), ids: &[u32]| {
            Ok(ids.iter().map(|&id| (id, format!("user-{id}"))).collect())
        });
        let greeting = Provider::new("greeting", |_: &()| Ok("hello".to_string()));

        let engine = Engine::builder()
            .with_resolver(users.definition())
            .with_resolver(greeting.definition())
            .build(());

        let node = greeting
            .fetch()
            .map_with(users.fetch(7), |greeting, user| format!("{greeting} {user}"));

        assert_eq!(engine.resolve(node).unwrap(), "hello user-7");
    }

    #[test]
    fn test_later_registration_wins() {
        let engine = builder()
            .with_resolver(ResolverDefinition::batched(|_: &Env, batch: &[Num]| {
                Ok(Results::from_fn(batch, |n| n.0 + 1000))
            }))
            .build(Env::default());

        assert_eq!(engine.resolve(fetch(Num(1))).unwrap(), 1001);
    }

    #[test]
    fn test_builder_is_reusable() {
        let base = builder();
        let limited = base.clone().with_selection_strategy(Limit(1)).build(Env::default());
        let unlimited = base.build(Env::default());

        let node = list([fetch(Num(1)), fetch(Double(1))]);
        let (_, a) = limited.resolve_with_diagnostics(node.clone(), &MemoryCache::new()).unwrap();
        let (_, b) = unlimited.resolve_with_diagnostics(node, &MemoryCache::new()).unwrap();

        assert_eq!(a.round_count(), 2);
        assert_eq!(b.round_count(), 1);
    }
}
