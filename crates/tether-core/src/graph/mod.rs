//! Graph algorithms over the dependency relation.

mod adjacency;
mod cycle_guard;

pub use adjacency::Adjacency;
pub use cycle_guard::{CycleGuard, find_cycle};
