//! App - アプリケーション層
//!
//! ports を組み合わせて依存グラフのユースケースを実装します。
//!
//! # 主要コンポーネント
//! - **DependencyEngine**: 辺の追加・削除と blocked 判定
//! - **CompletionPropagator**: 完了イベントの伝播と通知
//! - **TaskLifecycle**: タスク正本からのコールバック（削除 cascade・状態遷移）
//! - **EngineBuilder**: 設定からのワイヤリング

pub mod builder;
pub mod config;
pub mod engine;
pub mod lifecycle;
pub mod propagator;
pub mod status;

pub use self::builder::{App, BuildError, EngineBuilder};
pub use self::config::{ConfigError, EngineConfig, NotificationConfig, SinkKind, StoreConfig};
pub use self::engine::DependencyEngine;
pub use self::lifecycle::TaskLifecycle;
pub use self::propagator::{CompletionPropagator, PropagationReport};
pub use self::status::{BlockedStatusView, Blocker};
