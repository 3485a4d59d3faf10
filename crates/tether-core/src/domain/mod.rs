//! Domain model (ids, status, edges, notifications, errors).

pub mod edge;
pub mod errors;
pub mod ids;
pub mod notification;
pub mod status;

pub use self::edge::DependencyEdge;
pub use self::errors::{DependencyError, ErrorKind, NotifyError, StoreError};
pub use self::ids::{EdgeId, NotificationId, ParseIdError, TaskId, UserId};
pub use self::notification::{DependencyNotification, NotificationKind};
pub use self::status::TaskStatus;
