//! 通知投递
//!
//! - [`NotificationWorker`] - 事件 → 通知 / 聊天室请求
//! - [`ConnectionRegistry`] - 在线用户连接表（默认投递目标）

pub mod registry;
pub mod worker;

pub use registry::ConnectionRegistry;
pub use worker::{
    ChatRoomRequest, Notification, NotificationKind, NotificationSink, NotificationWorker,
    NotifyError,
};
