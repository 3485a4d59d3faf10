//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryEdgeStore**: 開発・テスト用の辺ストア
//! - **SqliteEdgeStore**: 永続化する辺ストア（rusqlite）
//! - **InMemoryTaskStore**: テスト用のタスク正本
//! - **RecordingSink / TracingSink**: 通知の送り先

pub mod memory_edges;
pub mod memory_tasks;
pub mod sinks;
pub mod sqlite_edges;

pub use self::memory_edges::InMemoryEdgeStore;
pub use self::memory_tasks::{InMemoryTaskStore, TaskRecord};
pub use self::sinks::{RecordingSink, TracingSink};
pub use self::sqlite_edges::SqliteEdgeStore;
