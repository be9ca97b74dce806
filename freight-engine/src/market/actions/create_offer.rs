//! CreateOffer command handler
//!
//! A forwarder bids on an open request with space in one of its own
//! SCHEDULED containers. The bid holds the request's cargo volume on that
//! container until the deadline passes or the bid is settled.

use async_trait::async_trait;

use super::ensure_actor;
use crate::market::storage::{MarketReader, OFFER_ID_KEY};
use crate::market::traits::{CommandContext, CommandHandler, CommandMetadata, MarketError};
use rust_decimal::Decimal;
use shared::freight::{EventPayload, MarketEvent, MarketEventType};
use shared::models::{ContainerStatus, Offer, OfferStatus};

/// CreateOffer action
#[derive(Debug, Clone)]
pub struct CreateOfferAction {
    pub request_id: i64,
    pub container_id: String,
    pub price: Decimal,
    pub currency: String,
}

#[async_trait]
impl CommandHandler for CreateOfferAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<MarketEvent>, MarketError> {
        let now = metadata.timestamp;

        if self.price <= Decimal::ZERO {
            return Err(MarketError::Validation("price must be positive".to_string()));
        }
        if self.currency.trim().is_empty() {
            return Err(MarketError::Validation("currency is required".to_string()));
        }

        // 1. Request must still be biddable
        let request = ctx.load_request(self.request_id)?;
        if !request.is_open() {
            return Err(MarketError::AlreadyClosed(request.id));
        }
        if request.is_expired(now) {
            return Err(MarketError::InvalidState(format!(
                "Bidding on request {} closed at {}",
                request.id, request.deadline
            )));
        }
        if request.requester_id == metadata.actor_id {
            return Err(MarketError::Forbidden(
                "Cannot bid on your own request".to_string(),
            ));
        }

        // 2. Container must be the bidder's and still open for booking
        let container = ctx.load_container(&self.container_id)?;
        ensure_actor(metadata, container.forwarder_id, || {
            format!("Container {} belongs to another forwarder", container.id)
        })?;
        if container.status != ContainerStatus::Scheduled {
            return Err(MarketError::InvalidState(format!(
                "Container {} is {}, only SCHEDULED containers take bids",
                container.id, container.status
            )));
        }

        // 3. One bid per forwarder per request
        let siblings = ctx.txn.offers_for_request(request.id)?;
        if siblings.iter().any(|o| o.forwarder_id == metadata.actor_id) {
            return Err(MarketError::DuplicateBid {
                request_id: request.id,
                forwarder_id: metadata.actor_id,
            });
        }

        // 4. Capacity
        let cargo = ctx.load_cargo(request.cargo_id)?;
        let available = ctx.ledger(&container)?.available(now);
        if cargo.total_cbm > available {
            return Err(MarketError::CapacityExceeded {
                requested: cargo.total_cbm,
                available,
            });
        }

        let offer = Offer {
            id: ctx.next_id(OFFER_ID_KEY)?,
            request_id: request.id,
            container_id: container.id.clone(),
            forwarder_id: metadata.actor_id,
            price: self.price,
            currency: self.currency.trim().to_string(),
            status: OfferStatus::Pending,
            created_at: now,
        };
        ctx.save_offer(&offer)?;

        tracing::info!(offer_id = offer.id, request_id = request.id, container_id = %container.id, actor = metadata.actor_id, "Offer placed");

        let event = ctx.event(
            metadata,
            offer.id.to_string(),
            MarketEventType::OfferCreated,
            EventPayload::OfferCreated {
                offer_id: offer.id,
                request_id: request.id,
                container_id: container.id,
                forwarder_id: offer.forwarder_id,
                request_owner_id: request.requester_id,
                price: offer.price,
                currency: offer.currency,
                bid_count: siblings.len() + 1,
            },
        );
        Ok(vec![event])
    }
}
