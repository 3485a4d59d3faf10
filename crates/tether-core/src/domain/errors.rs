//! Errors - エラー型と分類
//!
//! `ErrorKind` は呼び出し側（HTTP/RPC 層）が応答を選ぶための運用分類です。
//! - BadRequest / NotFound: 入力が悪い（リトライ無意味）
//! - Conflict: グラフの状態と衝突（重複・循環）
//! - Transient: ストレージ障害（呼び出し側がリトライ方針を持つ）

use thiserror::Error;

use super::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    NotFound,
    Conflict,
    Transient,
}

impl ErrorKind {
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Transient => 503,
        }
    }

    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Transient)
    }
}

/// Failures of the edge store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("blocking store task failed: {0}")]
    Join(String),

    #[error("store connection poisoned")]
    Poisoned,

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Errors surfaced by dependency operations.
#[derive(Debug, Error)]
pub enum DependencyError {
    #[error("task {task} cannot depend on itself")]
    InvalidEdge { task: TaskId },

    #[error("unknown task {task}")]
    UnknownTask { task: TaskId },

    #[error("{from} already depends on {to}")]
    DuplicateEdge { from: TaskId, to: TaskId },

    /// `path` is the existing chain `to -> ... -> from` that the new edge would close.
    #[error("{from} -> {to} would create a cycle (existing path: {})", display_path(.path))]
    CircularDependency {
        from: TaskId,
        to: TaskId,
        path: Vec<TaskId>,
    },

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl DependencyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DependencyError::InvalidEdge { .. } => ErrorKind::BadRequest,
            DependencyError::UnknownTask { .. } => ErrorKind::NotFound,
            DependencyError::DuplicateEdge { .. } | DependencyError::CircularDependency { .. } => {
                ErrorKind::Conflict
            }
            DependencyError::Storage(_) => ErrorKind::Transient,
        }
    }
}

impl From<rusqlite::Error> for DependencyError {
    fn from(err: rusqlite::Error) -> Self {
        DependencyError::Storage(StoreError::Sqlite(err))
    }
}

fn display_path(path: &[TaskId]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Notification delivery failure. Recorded and skipped, never propagated.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification rejected: {0}")]
    Rejected(String),

    #[error("notification sink unavailable: {0}")]
    Unavailable(String),
}
