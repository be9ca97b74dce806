//! DeleteContainer command handler
//!
//! Only an unused SCHEDULED container can go. Cleanup runs in three phases
//! inside one transaction:
//! 1. resale requests spawned from the container's offers lose their
//!    `source_offer_id` link (they survive as history)
//! 2. the container's offers and loaded-cargo rows are deleted
//! 3. the container itself is deleted

use async_trait::async_trait;

use super::ensure_actor;
use crate::market::storage::MarketReader;
use crate::market::traits::{CommandContext, CommandHandler, CommandMetadata, MarketError};
use shared::freight::{EventPayload, MarketEvent, MarketEventType};
use shared::models::ContainerStatus;

/// DeleteContainer action
#[derive(Debug, Clone)]
pub struct DeleteContainerAction {
    pub container_id: String,
}

#[async_trait]
impl CommandHandler for DeleteContainerAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<MarketEvent>, MarketError> {
        let container = ctx.load_container(&self.container_id)?;
        ensure_actor(metadata, container.forwarder_id, || {
            format!("Container {} belongs to another forwarder", container.id)
        })?;
        if container.status != ContainerStatus::Scheduled {
            return Err(MarketError::InvalidState(format!(
                "Container {} is {}, only SCHEDULED containers can be deleted",
                container.id, container.status
            )));
        }
        if !ctx.ledger(&container)?.is_deletable(metadata.timestamp) {
            return Err(MarketError::InvalidState(format!(
                "Container {} still carries booked, resale or bidding volume",
                container.id
            )));
        }

        let offers = ctx.txn.offers_for_container(&container.id)?;
        let rows = ctx.txn.cargo_rows_for_container(&container.id)?;

        // Phase 1: detach resale links
        let mut detached_request_ids = Vec::new();
        for offer in &offers {
            for request_id in ctx.txn.resale_ids_for_source(offer.id)? {
                let mut request = ctx.load_request(request_id)?;
                request.source_offer_id = None;
                ctx.save_request(&request)?;
                detached_request_ids.push(request_id);
            }
        }

        // Phase 2: offers and loaded cargo
        for row in &rows {
            ctx.delete_container_cargo(row)?;
        }
        let mut deleted_offer_ids = Vec::with_capacity(offers.len());
        for offer in &offers {
            ctx.delete_offer(offer)?;
            deleted_offer_ids.push(offer.id);
        }

        // Phase 3: the container
        ctx.delete_container(&container.id)?;

        tracing::info!(
            container_id = %container.id,
            offers = deleted_offer_ids.len(),
            cargo_rows = rows.len(),
            detached = detached_request_ids.len(),
            "Container deleted"
        );

        let event = ctx.event(
            metadata,
            container.id.clone(),
            MarketEventType::ContainerDeleted,
            EventPayload::ContainerDeleted {
                container_id: container.id,
                deleted_offer_ids,
                detached_request_ids,
            },
        );
        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::actions::fixtures::*;
    use crate::market::storage::FreightStorage;
    use shared::models::{OfferStatus, RequestStatus};

    #[tokio::test]
    async fn test_delete_unused_container_with_history() {
        let storage = FreightStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let container = seed_container(&storage, &txn, FORWARDER_A, ContainerStatus::Scheduled);
        let other = seed_container(&storage, &txn, FORWARDER_B, ContainerStatus::Scheduled);
        let original = seed_request(&storage, &txn, SHIPPER, 10);
        let lost = seed_offer(&storage, &txn, &original, &container, OfferStatus::Rejected);
        // A resale that went through: the volume left with the new winner
        let resold = seed_offer(&storage, &txn, &original, &container, OfferStatus::Resold);
        let mut resale = seed_resale(&storage, &txn, &original, &resold);
        resale.status = RequestStatus::Closed;
        storage.put_request_txn(&txn, &resale).unwrap();
        let carrier = seed_offer(&storage, &txn, &resale, &other, OfferStatus::Accepted);
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let events = DeleteContainerAction {
            container_id: container.id.clone(),
        }
        .execute(&mut ctx, &metadata(FORWARDER_A))
        .await
        .unwrap();

        assert!(txn.get_container(&container.id).unwrap().is_none());
        assert!(txn.get_offer(lost.id).unwrap().is_none());
        assert!(txn.get_offer(resold.id).unwrap().is_none());
        assert!(txn.get_offer(carrier.id).unwrap().is_some());

        let survivor = txn.get_request(resale.id).unwrap().unwrap();
        assert_eq!(survivor.source_offer_id, None);
        assert!(txn.resale_for_source(resold.id).unwrap().is_none());

        match &events[0].payload {
            EventPayload::ContainerDeleted {
                deleted_offer_ids,
                detached_request_ids,
                ..
            } => {
                assert_eq!(deleted_offer_ids.len(), 2);
                assert_eq!(detached_request_ids, &vec![resale.id]);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_refused_while_volume_held() {
        let storage = FreightStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let container = seed_container(&storage, &txn, FORWARDER_A, ContainerStatus::Scheduled);
        let request = seed_request(&storage, &txn, SHIPPER, 3);
        seed_offer(&storage, &txn, &request, &container, OfferStatus::Pending);
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let result = DeleteContainerAction {
            container_id: container.id.clone(),
        }
        .execute(&mut ctx, &metadata(FORWARDER_A))
        .await;
        assert!(matches!(result, Err(MarketError::InvalidState(_))));

        let result = DeleteContainerAction {
            container_id: container.id.clone(),
        }
        .execute(&mut ctx, &metadata(FORWARDER_B))
        .await;
        assert!(matches!(result, Err(MarketError::Forbidden(_))));
        assert!(txn.get_container(&container.id).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_external_cargo_blocks_delete() {
        let storage = FreightStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let container = seed_container(&storage, &txn, FORWARDER_A, ContainerStatus::Scheduled);
        seed_external_row(&storage, &txn, &container, 2);
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let result = DeleteContainerAction {
            container_id: container.id.clone(),
        }
        .execute(&mut ctx, &metadata(FORWARDER_A))
        .await;
        assert!(matches!(result, Err(MarketError::InvalidState(_))));
    }
}
