//! Pluggable policies of the engine: which batches run in a round, and how
//! their operations are executed.

mod resolution;
mod selection;

pub use resolution::{Parallel, ResolutionStrategy, Sequential};
pub use selection::{All, Batch, Limit, Priority, SelectionStrategy};
