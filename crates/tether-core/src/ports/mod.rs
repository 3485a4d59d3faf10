//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」。依存グラフエンジンはここに定義された
//! trait だけを通して外部（タスク正本・辺ストレージ・通知）とやり取りします。

pub mod clock;
pub mod edge_store;
pub mod id_generator;
pub mod notification_sink;
pub mod task_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::edge_store::{EdgeGraph, EdgeStore};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::notification_sink::NotificationSink;
pub use self::task_store::TaskStore;
