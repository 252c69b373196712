use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use rayon::prelude::*;

use crate::error::ResolveError;
use crate::resolver::Operation;
use crate::results::ResolvedValues;

/// Runs the operations of a round.
///
/// Implementations must return only once every operation has finished.
/// The first error encountered fails the whole round.
pub trait ResolutionStrategy: Send + Sync {
    fn run(&self, operations: Vec<Operation>) -> Result<Vec<ResolvedValues>, ResolveError>;
}

/// Runs operations one after another on the calling thread.
///
/// Stops at the first failing operation. Panics are reported the same way
/// as with [`Parallel`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Sequential;

impl ResolutionStrategy for Sequential {
    fn run(&self, operations: Vec<Operation>) -> Result<Vec<ResolvedValues>, ResolveError> {
        operations.into_iter().map(run_caught).collect()
    }
}

/// Runs operations concurrently on a rayon thread pool.
///
/// A panicking operation is reported as a failure of its resolver instead of
/// tearing down the pool.
#[derive(Debug, Default, Clone)]
pub struct Parallel {
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl Parallel {
    /// Uses rayon's global thread pool.
    pub fn global() -> Self {
        Self::default()
    }

    /// Uses a dedicated thread pool.
    pub fn with_pool(pool: Arc<rayon::ThreadPool>) -> Self {
        Self { pool: Some(pool) }
    }

    fn run_all(operations: Vec<Operation>) -> Result<Vec<ResolvedValues>, ResolveError> {
        operations.into_par_iter().map(run_caught).collect()
    }
}

impl ResolutionStrategy for Parallel {
    fn run(&self, operations: Vec<Operation>) -> Result<Vec<ResolvedValues>, ResolveError> {
        match &self.pool {
            Some(pool) => pool.install(|| Self::run_all(operations)),
            None => Self::run_all(operations),
        }
    }
}

fn run_caught(operation: Operation) -> Result<ResolvedValues, ResolveError> {
    let key = operation.key().clone();

    // Operations only own cloned batches and a shared environment, nothing a
    // panic could leave half-updated for other workers.
    match panic::catch_unwind(AssertUnwindSafe(|| operation.run())) {
        Ok(result) => result,
        Err(payload) => {
            let message = if let Some(s) = payload.downcast_ref::<&str>() {
                format!("Resolver panicked: {s}")
            } else if let Some(s) = payload.downcast_ref::<String>() {
                format!("Resolver panicked: {s}")
            } else {
                String::from("Resolver panicked with unknown payload")
            };

            Err(ResolveError::resolver(key, anyhow::anyhow!(message)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ResolvableKey;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(counter: &Arc<AtomicUsize>, n: usize) -> Vec<Operation> {
        (0..n)
            .map(|_| {
                let counter = counter.clone();
                Operation::new(ResolvableKey::from("count"), move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(ResolvedValues::new())
                })
            })
            .collect()
    }

    #[test]
    fn test_sequential_runs_all() {
        let counter = Arc::new(AtomicUsize::new(0));
        let results = Sequential.run(counting(&counter, 4)).unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_parallel_runs_all() {
        let counter = Arc::new(AtomicUsize::new(0));
        let results = Parallel::global().run(counting(&counter, 16)).unwrap();

        assert_eq!(results.len(), 16);
        assert_eq!(counter.load(Ordering::SeqCst), 16);
    }

    #[test]
    fn test_parallel_on_dedicated_pool() {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        let results = Parallel::with_pool(Arc::new(pool)).run(counting(&counter, 8)).unwrap();
        assert_eq!(results.len(), 8);
    }

    #[test]
    fn test_parallel_catches_panics() {
        let operation = Operation::new(ResolvableKey::from("boom"), || panic!("kaboom"));

        match Parallel::global().run(vec![operation]) {
            Err(ResolveError::Resolver { key, source }) => {
                assert_eq!(key.as_str(), "boom");
                assert_eq!(source.to_string(), "Resolver panicked: kaboom");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_first_error_fails_round() {
        let failing = Operation::new(ResolvableKey::from("fail"), || anyhow::bail!("nope"));
        let mut operations = counting(&Arc::new(AtomicUsize::new(0)), 2);
        operations.push(failing);

        assert!(Sequential.run(operations).is_err());
    }

    #[test]
    fn test_sequential_catches_panics() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut operations = vec![Operation::new(ResolvableKey::from("boom"), || panic!("kaboom"))];
        operations.extend(counting(&counter, 2));

        match Sequential.run(operations) {
            Err(ResolveError::Resolver { key, source }) => {
                assert_eq!(key.as_str(), "boom");
                assert_eq!(source.to_string(), "Resolver panicked: kaboom");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
