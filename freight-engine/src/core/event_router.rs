//! Event Router - 事件路由与分发
//!
//! 解耦 FreightManager 和通知投递，提供独立的通道。
//!
//! ```text
//! FreightManager (broadcast)
//!        │
//!        └── EventRouter
//!               └── mpsc ──► NotificationWorker (notify events only) [best-effort]
//! ```
//!
//! 通知是 best-effort：通道满则丢弃，绝不阻塞命令处理路径。

use shared::freight::{MarketEvent, MarketEventType};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

/// 需要通知用户的事件类型
const NOTIFY_EVENTS: &[MarketEventType] = &[
    MarketEventType::OfferCreated,
    MarketEventType::OfferConfirmed,
    MarketEventType::ResaleCancelled,
    MarketEventType::ContainerStatusChanged,
];

/// 事件路由器
///
/// 订阅 FreightManager 的 broadcast，把需要通知的事件转发到 mpsc 通道。
/// 使用 Arc<MarketEvent> 减少克隆开销。
pub struct EventRouter {
    notify_tx: mpsc::Sender<Arc<MarketEvent>>,
}

impl EventRouter {
    /// 创建路由器和通知通道
    pub fn new(notify_buffer: usize) -> (Self, mpsc::Receiver<Arc<MarketEvent>>) {
        let (notify_tx, notify_rx) = mpsc::channel(notify_buffer.max(1));
        (Self { notify_tx }, notify_rx)
    }

    /// 运行路由器（直到源通道关闭或收到 shutdown）
    pub async fn run(self, mut source: broadcast::Receiver<MarketEvent>, shutdown: CancellationToken) {
        tracing::info!("Event router started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Event router received shutdown signal");
                    break;
                }
                received = source.recv() => match received {
                    Ok(event) => self.dispatch(event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Event router lagged, notifications skipped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Source channel closed, event router stopping");
                        break;
                    }
                }
            }
        }
    }

    /// 分发事件：try_send，满则丢弃
    fn dispatch(&self, event: MarketEvent) {
        if !NOTIFY_EVENTS.contains(&event.event_type) {
            return;
        }

        match self.notify_tx.try_send(Arc::new(event)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!(
                    aggregate_id = %event.aggregate_id,
                    event_type = %event.event_type,
                    sequence = event.sequence,
                    "Notify channel full, event dropped"
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Notify channel closed");
            }
        }
    }
}
