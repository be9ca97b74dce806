//! Resell command handler
//!
//! The forwarder holding an ACCEPTED offer relists its cargo as a new resale
//! request. The offer keeps its space (as FOR_SALE) until the resale is
//! confirmed, cancelled or expires.

use async_trait::async_trait;

use super::ensure_actor;
use crate::market::storage::REQUEST_ID_KEY;
use crate::market::traits::{CommandContext, CommandHandler, CommandMetadata, MarketError};
use shared::freight::{EventPayload, MarketEvent, MarketEventType};
use shared::models::{ContainerStatus, OfferStatus, Request, RequestStatus};

/// Resell action
#[derive(Debug, Clone)]
pub struct ResellAction {
    pub offer_id: i64,
}

#[async_trait]
impl CommandHandler for ResellAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<MarketEvent>, MarketError> {
        let mut offer = ctx.load_offer(self.offer_id)?;
        ensure_actor(metadata, offer.forwarder_id, || {
            format!("Offer {} belongs to another forwarder", offer.id)
        })?;
        if offer.status != OfferStatus::Accepted {
            return Err(MarketError::InvalidState(format!(
                "Offer {} is {}, only ACCEPTED offers can be resold",
                offer.id, offer.status
            )));
        }
        let container = ctx.load_container(&offer.container_id)?;
        if container.status != ContainerStatus::Scheduled {
            return Err(MarketError::InvalidState(format!(
                "Container {} is already {}",
                container.id, container.status
            )));
        }

        // 新的转售请求沿用原请求的货物与条款
        let parent = ctx.load_request(offer.request_id)?;
        let resale = Request {
            id: ctx.next_id(REQUEST_ID_KEY)?,
            requester_id: metadata.actor_id,
            status: RequestStatus::Open,
            source_offer_id: Some(offer.id),
            created_at: metadata.timestamp,
            ..parent
        };

        offer.status = OfferStatus::ForSale;
        ctx.save_offer(&offer)?;
        ctx.save_request(&resale)?;

        tracing::info!(offer_id = offer.id, resale_request_id = resale.id, parent_request_id = offer.request_id, "Offer listed for resale");

        let event = ctx.event(
            metadata,
            resale.id.to_string(),
            MarketEventType::ResaleListed,
            EventPayload::ResaleListed {
                request_id: resale.id,
                source_offer_id: offer.id,
                reseller_id: metadata.actor_id,
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
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_resell_lists_new_request() {
        let storage = FreightStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let original = seed_request(&storage, &txn, SHIPPER, 10);
        let container = seed_container(&storage, &txn, FORWARDER_A, ContainerStatus::Scheduled);
        let offer = seed_offer(&storage, &txn, &original, &container, OfferStatus::Accepted);
        seed_platform_row(&storage, &txn, &offer, 10);
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let events = ResellAction { offer_id: offer.id }
            .execute(&mut ctx, &metadata(FORWARDER_A))
            .await
            .unwrap();

        let resale_id: i64 = events[0].aggregate_id.parse().unwrap();
        let resale = txn.get_request(resale_id).unwrap().unwrap();
        assert!(resale.is_open());
        assert_eq!(resale.source_offer_id, Some(offer.id));
        assert_eq!(resale.requester_id, FORWARDER_A);
        assert_eq!(resale.cargo_id, original.cargo_id);
        assert_eq!(resale.deadline, original.deadline);
        assert_eq!(
            txn.resale_for_source(offer.id).unwrap().map(|r| r.id),
            Some(resale_id)
        );

        // Space stays held, reclassified as resale
        let ledger = ctx.ledger(&container).unwrap();
        assert_eq!(ledger.consumed_resale(), Decimal::from(10));
        assert_eq!(ledger.available(NOW), Decimal::from(16));
    }

    #[tokio::test]
    async fn test_only_accepted_offers_resell() {
        let storage = FreightStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let original = seed_request(&storage, &txn, SHIPPER, 10);
        let container = seed_container(&storage, &txn, FORWARDER_A, ContainerStatus::Scheduled);
        let offer = seed_offer(&storage, &txn, &original, &container, OfferStatus::Pending);
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let result = ResellAction { offer_id: offer.id }
            .execute(&mut ctx, &metadata(FORWARDER_A))
            .await;
        assert!(matches!(result, Err(MarketError::InvalidState(_))));

        let result = ResellAction { offer_id: offer.id }
            .execute(&mut ctx, &metadata(FORWARDER_B))
            .await;
        assert!(matches!(result, Err(MarketError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_confirmed_container_blocks_resale() {
        let storage = FreightStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let original = seed_request(&storage, &txn, SHIPPER, 10);
        let container = seed_container(&storage, &txn, FORWARDER_A, ContainerStatus::Confirmed);
        let offer = seed_offer(&storage, &txn, &original, &container, OfferStatus::Accepted);
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let result = ResellAction { offer_id: offer.id }
            .execute(&mut ctx, &metadata(FORWARDER_A))
            .await;
        assert!(matches!(result, Err(MarketError::InvalidState(_))));
    }
}
