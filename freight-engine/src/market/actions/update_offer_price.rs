//! UpdateOfferPrice command handler

use async_trait::async_trait;

use super::ensure_actor;
use crate::market::traits::{CommandContext, CommandHandler, CommandMetadata, MarketError};
use rust_decimal::Decimal;
use shared::freight::{EventPayload, MarketEvent, MarketEventType};
use shared::models::OfferStatus;

/// UpdateOfferPrice action
#[derive(Debug, Clone)]
pub struct UpdateOfferPriceAction {
    pub offer_id: i64,
    pub price: Decimal,
    pub currency: String,
}

#[async_trait]
impl CommandHandler for UpdateOfferPriceAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<MarketEvent>, MarketError> {
        if self.price <= Decimal::ZERO {
            return Err(MarketError::Validation("price must be positive".to_string()));
        }
        if self.currency.trim().is_empty() {
            return Err(MarketError::Validation("currency is required".to_string()));
        }

        let mut offer = ctx.load_offer(self.offer_id)?;
        ensure_actor(metadata, offer.forwarder_id, || {
            format!("Offer {} belongs to another forwarder", offer.id)
        })?;
        // Status re-read inside the write txn, so a confirmation that
        // committed first wins
        if offer.status != OfferStatus::Pending {
            return Err(MarketError::InvalidState(format!(
                "Offer {} is {}, only PENDING offers can be repriced",
                offer.id, offer.status
            )));
        }

        offer.price = self.price;
        offer.currency = self.currency.trim().to_string();
        ctx.save_offer(&offer)?;

        let request = ctx.load_request(offer.request_id)?;
        tracing::info!(offer_id = offer.id, price = %offer.price, currency = %offer.currency, "Offer repriced");

        let event = ctx.event(
            metadata,
            offer.id.to_string(),
            MarketEventType::OfferPriceUpdated,
            EventPayload::OfferPriceUpdated {
                offer_id: offer.id,
                request_id: request.id,
                request_owner_id: request.requester_id,
                price: offer.price,
                currency: offer.currency,
            },
        );
        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::actions::fixtures::*;
    use crate::market::storage::{FreightStorage, MarketReader};
    use shared::models::ContainerStatus;

    fn reprice(offer_id: i64, price: i64) -> UpdateOfferPriceAction {
        UpdateOfferPriceAction {
            offer_id,
            price: Decimal::from(price),
            currency: "KRW".to_string(),
        }
    }

    #[tokio::test]
    async fn test_reprice_pending_offer() {
        let storage = FreightStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let request = seed_request(&storage, &txn, SHIPPER, 5);
        let container = seed_container(&storage, &txn, FORWARDER_A, ContainerStatus::Scheduled);
        let offer = seed_offer(&storage, &txn, &request, &container, OfferStatus::Pending);
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        reprice(offer.id, 950)
            .execute(&mut ctx, &metadata(FORWARDER_A))
            .await
            .unwrap();

        let stored = txn.get_offer(offer.id).unwrap().unwrap();
        assert_eq!(stored.price, Decimal::from(950));
        assert_eq!(stored.currency, "KRW");
        assert_eq!(stored.status, OfferStatus::Pending);
    }

    #[tokio::test]
    async fn test_reprice_after_acceptance_fails() {
        let storage = FreightStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let request = seed_request(&storage, &txn, SHIPPER, 5);
        let container = seed_container(&storage, &txn, FORWARDER_A, ContainerStatus::Scheduled);
        let offer = seed_offer(&storage, &txn, &request, &container, OfferStatus::Accepted);
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let result = reprice(offer.id, 950)
            .execute(&mut ctx, &metadata(FORWARDER_A))
            .await;
        assert!(matches!(result, Err(MarketError::InvalidState(_))));

        let result = reprice(offer.id, 950)
            .execute(&mut ctx, &metadata(FORWARDER_B))
            .await;
        assert!(matches!(result, Err(MarketError::Forbidden(_))));
    }
}
