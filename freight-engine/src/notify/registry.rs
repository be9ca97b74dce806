//! 在线连接注册表
//!
//! 默认的 [`NotificationSink`]：每个在线用户持有一个 mpsc 接收端
//! （SSE / WebSocket 层负责把它推给客户端）。

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;

use super::worker::{Notification, NotificationSink, NotifyError};

/// 使用 DashMap 实现无锁并发的连接表
#[derive(Debug, Clone)]
pub struct ConnectionRegistry {
    connections: Arc<DashMap<i64, mpsc::Sender<Notification>>>,
    buffer: usize,
}

impl ConnectionRegistry {
    pub fn new(buffer: usize) -> Self {
        Self {
            connections: Arc::new(DashMap::new()),
            buffer: buffer.max(1),
        }
    }

    /// 注册连接；同一用户重复连接时替换旧连接
    pub fn connect(&self, user_id: i64) -> mpsc::Receiver<Notification> {
        let (tx, rx) = mpsc::channel(self.buffer);
        if self.connections.insert(user_id, tx).is_some() {
            tracing::debug!(user_id, "Replaced existing connection");
        }
        rx
    }

    pub fn disconnect(&self, user_id: i64) {
        self.connections.remove(&user_id);
    }

    pub fn is_connected(&self, user_id: i64) -> bool {
        self.connections.contains_key(&user_id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

#[async_trait]
impl NotificationSink for ConnectionRegistry {
    async fn deliver(&self, notification: Notification) -> Result<(), NotifyError> {
        let user_id = notification.recipient;
        // 先克隆 Sender，避免跨 remove 持有分片锁
        let Some(tx) = self.connections.get(&user_id).map(|entry| entry.value().clone()) else {
            tracing::debug!(user_id, "Recipient offline, notification dropped");
            return Ok(());
        };

        match tx.try_send(notification) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(NotifyError::Full(user_id)),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.connections
                    .remove_if(&user_id, |_, current| current.same_channel(&tx));
                Err(NotifyError::Closed(user_id))
            }
        }
    }
}
