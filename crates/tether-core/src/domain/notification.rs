//! Notifications emitted when a prerequisite completes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{NotificationId, TaskId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    DependencyCompleted,
}

/// One message per (dependent, satisfied prerequisite) event,
/// addressed to the dependent task's assignee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyNotification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub recipient: UserId,
    /// The task that is now unblocked.
    pub task: TaskId,
    /// The prerequisite whose completion unblocked `task`.
    pub completed_dependency: TaskId,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl DependencyNotification {
    pub fn dependency_completed(
        id: NotificationId,
        recipient: UserId,
        task: TaskId,
        completed_dependency: TaskId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind: NotificationKind::DependencyCompleted,
            recipient,
            task,
            completed_dependency,
            message: format!(
                "{completed_dependency} is completed; {task} has no remaining open dependencies"
            ),
            created_at,
        }
    }
}
