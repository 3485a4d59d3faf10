//! Status - 「なぜ止まっているか」を説明するビュー

use serde::Serialize;

use crate::domain::{TaskId, TaskStatus};

/// An open prerequisite. `status` is `None` if the task store no longer knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Blocker {
    pub task: TaskId,
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockedStatusView {
    pub task: TaskId,
    pub blocked: bool,
    /// Number of direct prerequisites.
    pub dependencies: usize,
    pub blockers: Vec<Blocker>,
}

impl BlockedStatusView {
    pub fn new(task: TaskId, dependencies: usize, blockers: Vec<Blocker>) -> Self {
        Self {
            task,
            blocked: !blockers.is_empty(),
            dependencies,
            blockers,
        }
    }
}
