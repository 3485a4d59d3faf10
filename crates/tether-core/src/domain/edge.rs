use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EdgeId, TaskId};

/// A directed dependency: `from` cannot be treated as unblocked while `to` is incomplete.
///
/// Invariants (enforced by the edge store at creation time):
/// - `from != to`
/// - at most one edge per `(from, to)` pair
/// - the edge set stays acyclic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub id: EdgeId,
    /// The dependent task.
    pub from: TaskId,
    /// The prerequisite task.
    pub to: TaskId,
    pub created_at: DateTime<Utc>,
}

impl DependencyEdge {
    pub fn new(id: EdgeId, from: TaskId, to: TaskId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            from,
            to,
            created_at,
        }
    }

    /// Does this edge touch `task` on either end?
    pub fn touches(&self, task: TaskId) -> bool {
        self.from == task || self.to == task
    }
}
