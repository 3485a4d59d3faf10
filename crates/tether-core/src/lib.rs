//! tether-core
//!
//! Task dependency graph engine: an acyclic "task A waits for task B" relation,
//! derived blocked status, and completion propagation with assignee notifications.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, status, edge, notification, errors）
//! - **ports**: 抽象化レイヤー（TaskStore, EdgeStore, NotificationSink, Clock, IdGenerator）
//! - **graph**: 純粋なグラフアルゴリズム（CycleGuard, Adjacency）
//! - **impls**: ports の実装（InMemory / SQLite / sinks）
//! - **app**: エンジン・伝播・ライフサイクル・設定

pub mod app;
pub mod domain;
pub mod graph;
pub mod impls;
pub mod ports;

pub use app::{App, DependencyEngine, EngineBuilder, EngineConfig};
pub use domain::{DependencyError, TaskId, TaskStatus};
