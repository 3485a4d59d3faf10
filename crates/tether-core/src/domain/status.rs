//! Task status as reported by the task reference store.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Task status.
///
/// The task store owns the lifecycle; this crate only reads it.
/// `Completed` is the single terminal value that satisfies a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    OnHold,
    Completed,
}

impl TaskStatus {
    /// Does this status satisfy dependents waiting on the task?
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::OnHold => "on_hold",
            TaskStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TaskStatus::Todo, false)]
    #[case(TaskStatus::InProgress, false)]
    #[case(TaskStatus::OnHold, false)]
    #[case(TaskStatus::Completed, true)]
    fn only_completed_is_terminal(#[case] status: TaskStatus, #[case] terminal: bool) {
        assert_eq!(status.is_terminal(), terminal);
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        assert_eq!(json.trim_matches('"'), TaskStatus::InProgress.as_str());
    }
}
