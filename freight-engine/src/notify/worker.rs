//! Notification Worker
//!
//! 监听 EventRouter 的通知通道，把事件转换成面向用户的通知和聊天室请求，
//! 交给 [`NotificationSink`] 投递。投递失败只记录日志。

use std::sync::Arc;

use async_trait::async_trait;
use enum_dispatch::enum_dispatch;
use serde::Serialize;
use shared::freight::{EventPayload, MarketEvent};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// 通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    NewOffer,
    OfferAccepted,
    OfferRejected,
    ShipmentUpdate,
}

/// 面向单个用户的通知
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub recipient: i64,
    pub kind: NotificationKind,
    pub message: String,
    /// 前端跳转路径
    pub link: String,
}

/// 聊天室请求，按 offer 建房
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChatRoomRequest {
    Open { offer_id: i64 },
    Close { offer_id: i64 },
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Connection of user {0} is closed")]
    Closed(i64),

    #[error("Connection of user {0} is full")]
    Full(i64),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// 通知投递目标
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: Notification) -> Result<(), NotifyError>;

    /// 聊天服务不在本引擎内；默认只记录
    async fn chat_room(&self, request: ChatRoomRequest) -> Result<(), NotifyError> {
        tracing::debug!(?request, "Chat room request");
        Ok(())
    }
}

/// 一个事件产生的全部投递
#[derive(Debug, Default, PartialEq)]
pub struct Outbox {
    pub notifications: Vec<Notification>,
    pub chat_rooms: Vec<ChatRoomRequest>,
}

#[enum_dispatch]
pub trait ComposeNotifications {
    fn compose(&self, event: &MarketEvent) -> Outbox;
}

/// EventComposer enum - dispatches to one composer per event type
#[enum_dispatch(ComposeNotifications)]
pub enum EventComposer {
    OfferCreated(OfferCreatedComposer),
    OfferConfirmed(OfferConfirmedComposer),
    ResaleCancelled(ResaleCancelledComposer),
    ContainerStatus(ContainerStatusComposer),
}

impl EventComposer {
    /// 不需要通知的事件返回 None
    pub fn for_event(event: &MarketEvent) -> Option<Self> {
        match &event.payload {
            EventPayload::OfferCreated { .. } => Some(OfferCreatedComposer.into()),
            EventPayload::OfferConfirmed { .. } => Some(OfferConfirmedComposer.into()),
            EventPayload::ResaleCancelled { .. } => Some(ResaleCancelledComposer.into()),
            EventPayload::ContainerStatusChanged { .. } => Some(ContainerStatusComposer.into()),
            _ => None,
        }
    }
}

pub struct OfferCreatedComposer;

impl ComposeNotifications for OfferCreatedComposer {
    fn compose(&self, event: &MarketEvent) -> Outbox {
        let EventPayload::OfferCreated {
            request_id,
            request_owner_id,
            bid_count,
            ..
        } = &event.payload
        else {
            return Outbox::default();
        };
        Outbox {
            notifications: vec![Notification {
                recipient: *request_owner_id,
                kind: NotificationKind::NewOffer,
                message: format!("Request {request_id} received a new offer ({bid_count} in total)"),
                link: format!("/requests/{request_id}"),
            }],
            chat_rooms: vec![],
        }
    }
}

pub struct OfferConfirmedComposer;

impl ComposeNotifications for OfferConfirmedComposer {
    fn compose(&self, event: &MarketEvent) -> Outbox {
        let EventPayload::OfferConfirmed {
            request_id,
            winner,
            outcomes,
            ..
        } = &event.payload
        else {
            return Outbox::default();
        };

        let notifications = outcomes
            .iter()
            .map(|outcome| {
                let (kind, message) = if outcome.accepted {
                    (
                        NotificationKind::OfferAccepted,
                        format!("Your offer on request {request_id} was accepted"),
                    )
                } else {
                    (
                        NotificationKind::OfferRejected,
                        format!("Bidding on request {request_id} has closed"),
                    )
                };
                Notification {
                    recipient: outcome.forwarder_id,
                    kind,
                    message,
                    link: format!("/offers/{}", outcome.offer_id),
                }
            })
            .collect();

        Outbox {
            notifications,
            chat_rooms: vec![ChatRoomRequest::Open {
                offer_id: winner.offer_id,
            }],
        }
    }
}

pub struct ResaleCancelledComposer;

impl ComposeNotifications for ResaleCancelledComposer {
    fn compose(&self, event: &MarketEvent) -> Outbox {
        let EventPayload::ResaleCancelled {
            request_id,
            rejected,
            ..
        } = &event.payload
        else {
            return Outbox::default();
        };
        Outbox {
            notifications: rejected
                .iter()
                .map(|outcome| Notification {
                    recipient: outcome.forwarder_id,
                    kind: NotificationKind::OfferRejected,
                    message: format!("Resale request {request_id} was withdrawn"),
                    link: format!("/offers/{}", outcome.offer_id),
                })
                .collect(),
            chat_rooms: vec![],
        }
    }
}

pub struct ContainerStatusComposer;

impl ComposeNotifications for ContainerStatusComposer {
    fn compose(&self, event: &MarketEvent) -> Outbox {
        let EventPayload::ContainerStatusChanged {
            container_id,
            message,
            recipients,
            closed_chat_offers,
            ..
        } = &event.payload
        else {
            return Outbox::default();
        };
        Outbox {
            notifications: recipients
                .iter()
                .map(|recipient| Notification {
                    recipient: *recipient,
                    kind: NotificationKind::ShipmentUpdate,
                    message: message.clone(),
                    link: format!("/tracking/{container_id}"),
                })
                .collect(),
            chat_rooms: closed_chat_offers
                .iter()
                .map(|offer_id| ChatRoomRequest::Close { offer_id: *offer_id })
                .collect(),
        }
    }
}

/// 通知工作者
pub struct NotificationWorker {
    sink: Arc<dyn NotificationSink>,
}

impl NotificationWorker {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    /// 运行工作者（阻塞直到通道关闭或收到 shutdown）
    pub async fn run(self, mut event_rx: mpsc::Receiver<Arc<MarketEvent>>, shutdown: CancellationToken) {
        tracing::info!("Notification worker started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Notification worker received shutdown signal");
                    break;
                }
                event = event_rx.recv() => {
                    let Some(event) = event else {
                        tracing::info!("Notify channel closed, notification worker stopping");
                        break;
                    };
                    self.handle(&event).await;
                }
            }
        }
    }

    async fn handle(&self, event: &MarketEvent) {
        let Some(composer) = EventComposer::for_event(event) else {
            return;
        };
        let outbox = composer.compose(event);

        for notification in outbox.notifications {
            let recipient = notification.recipient;
            if let Err(e) = self.sink.deliver(notification).await {
                tracing::warn!(recipient, sequence = event.sequence, error = %e, "Notification not delivered");
            }
        }
        for request in outbox.chat_rooms {
            if let Err(e) = self.sink.chat_room(request).await {
                tracing::warn!(?request, error = %e, "Chat room request failed");
            }
        }
    }
}
