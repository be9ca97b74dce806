//! CancelOffer command handler
//!
//! A forwarder withdraws its own PENDING bid. The offer row is deleted,
//! releasing the volume it held.

use async_trait::async_trait;

use super::ensure_actor;
use crate::market::traits::{CommandContext, CommandHandler, CommandMetadata, MarketError};
use shared::freight::{EventPayload, MarketEvent, MarketEventType};
use shared::models::OfferStatus;

/// CancelOffer action
#[derive(Debug, Clone)]
pub struct CancelOfferAction {
    pub offer_id: i64,
}

#[async_trait]
impl CommandHandler for CancelOfferAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<MarketEvent>, MarketError> {
        let offer = ctx.load_offer(self.offer_id)?;
        ensure_actor(metadata, offer.forwarder_id, || {
            format!("Offer {} belongs to another forwarder", offer.id)
        })?;
        if offer.status != OfferStatus::Pending {
            return Err(MarketError::InvalidState(format!(
                "Offer {} is {}, only PENDING offers can be withdrawn",
                offer.id, offer.status
            )));
        }

        let request = ctx.load_request(offer.request_id)?;
        ctx.delete_offer(&offer)?;

        tracing::info!(offer_id = offer.id, request_id = request.id, "Offer withdrawn");

        let event = ctx.event(
            metadata,
            offer.id.to_string(),
            MarketEventType::OfferWithdrawn,
            EventPayload::OfferWithdrawn {
                offer_id: offer.id,
                request_id: request.id,
                request_owner_id: request.requester_id,
            },
        );
        Ok(vec![event])
    }
}
