//! ConfirmOffer / ConfirmBid command handler
//!
//! The request owner picks the winner. In one transaction:
//! 1. winner → ACCEPTED, every other PENDING sibling → REJECTED
//! 2. request → CLOSED
//! 3. for a resale request: source offer FOR_SALE → RESOLD and its
//!    loaded-cargo row is released
//! 4. a loaded-cargo row is created for the winner (once per offer)
//!
//! Confirming the winner that is already recorded is a no-op, so a retried
//! confirmation yields the same terminal state.

use async_trait::async_trait;

use super::ensure_actor;
use crate::market::storage::{CONTAINER_CARGO_ID_KEY, MarketReader};
use crate::market::traits::{CommandContext, CommandHandler, CommandMetadata, MarketError};
use shared::freight::{EventPayload, MarketEvent, MarketEventType, OfferOutcome};
use shared::models::{CargoSource, ContainerCargo, ContainerStatus, OfferStatus, RequestStatus};

/// ConfirmOffer action
#[derive(Debug, Clone)]
pub struct ConfirmOfferAction {
    pub request_id: i64,
    pub offer_id: i64,
    /// Only accept resale requests (ConfirmBid)
    pub resale_only: bool,
}

#[async_trait]
impl CommandHandler for ConfirmOfferAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<MarketEvent>, MarketError> {
        let now = metadata.timestamp;

        // 1. Ownership and request kind
        let mut request = ctx.load_request(self.request_id)?;
        ensure_actor(metadata, request.requester_id, || {
            format!("Only the owner may confirm offers on request {}", request.id)
        })?;
        if self.resale_only && !request.is_resale() {
            return Err(MarketError::InvalidState(format!(
                "Request {} is not a resale request",
                request.id
            )));
        }

        // 2. Locate the winner among the request's offers
        let offers = ctx.txn.offers_for_request(request.id)?;
        let Some(mut winner) = offers.iter().find(|o| o.id == self.offer_id).cloned() else {
            return match ctx.txn.get_offer(self.offer_id)? {
                Some(other) => Err(MarketError::InvalidState(format!(
                    "Offer {} belongs to request {}, not {}",
                    other.id, other.request_id, request.id
                ))),
                None => Err(MarketError::not_found("Offer", self.offer_id)),
            };
        };

        // 3. Request must still be OPEN (re-checked inside the transaction)
        if !request.is_open() {
            if winner.status.is_winning() {
                tracing::debug!(request_id = request.id, offer_id = winner.id, "Winner already confirmed");
                return Ok(vec![]);
            }
            return Err(MarketError::AlreadyClosed(request.id));
        }
        if winner.status != OfferStatus::Pending {
            return Err(MarketError::InvalidState(format!(
                "Offer {} is {}, only PENDING offers can win",
                winner.id, winner.status
            )));
        }

        // 4. Winner's volume must fit its container without its own hold
        let container = ctx.load_container(&winner.container_id)?;
        if container.status != ContainerStatus::Scheduled {
            return Err(MarketError::InvalidState(format!(
                "Container {} is {} and cannot take new cargo",
                container.id, container.status
            )));
        }
        let cargo = ctx.load_cargo(request.cargo_id)?;
        let available = ctx.ledger(&container)?.excluding(winner.id).available(now);
        if cargo.total_cbm > available {
            return Err(MarketError::CapacityExceeded {
                requested: cargo.total_cbm,
                available,
            });
        }

        // 5. Resale: the reseller's offer becomes a pass-through
        let resold_offer_id = match request.source_offer_id {
            Some(source_id) => {
                let mut source = ctx.load_offer(source_id)?;
                if source.status != OfferStatus::ForSale {
                    return Err(MarketError::InvalidState(format!(
                        "Source offer {} is {}, expected FOR_SALE",
                        source.id, source.status
                    )));
                }
                source.status = OfferStatus::Resold;
                ctx.save_offer(&source)?;
                if let Some(row) = ctx.txn.cargo_row_for_offer(source.id)? {
                    ctx.delete_container_cargo(&row)?;
                }
                Some(source.id)
            }
            None => None,
        };

        // 6. Winner accepted, siblings rejected
        let mut outcomes = Vec::with_capacity(offers.len());
        for offer in &offers {
            if offer.id == winner.id {
                continue;
            }
            if offer.status == OfferStatus::Pending {
                let mut rejected = offer.clone();
                rejected.status = OfferStatus::Rejected;
                ctx.save_offer(&rejected)?;
            }
            outcomes.push(OfferOutcome {
                offer_id: offer.id,
                forwarder_id: offer.forwarder_id,
                accepted: false,
            });
        }
        winner.status = OfferStatus::Accepted;
        ctx.save_offer(&winner)?;
        let winner_outcome = OfferOutcome {
            offer_id: winner.id,
            forwarder_id: winner.forwarder_id,
            accepted: true,
        };
        outcomes.insert(0, winner_outcome.clone());

        request.status = RequestStatus::Closed;
        ctx.save_request(&request)?;

        // 7. Book the volume on the winner's container
        if ctx.txn.cargo_row_for_offer(winner.id)?.is_none() {
            let row = ContainerCargo {
                id: ctx.next_id(CONTAINER_CARGO_ID_KEY)?,
                container_id: winner.container_id.clone(),
                source: CargoSource::Platform {
                    offer_id: winner.id,
                },
                cbm_loaded: cargo.total_cbm,
                freight_cost: Some(winner.price),
                freight_currency: Some(winner.currency.clone()),
                added_at: now,
            };
            ctx.save_container_cargo(&row)?;
        }

        tracing::info!(
            request_id = request.id,
            offer_id = winner.id,
            container_id = %winner.container_id,
            resold_offer_id = ?resold_offer_id,
            rejected = outcomes.len() - 1,
            "Offer confirmed"
        );

        let event = ctx.event(
            metadata,
            request.id.to_string(),
            MarketEventType::OfferConfirmed,
            EventPayload::OfferConfirmed {
                request_id: request.id,
                request_owner_id: request.requester_id,
                winner: winner_outcome,
                outcomes,
                resold_offer_id,
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
    use rust_decimal::Decimal;

    fn confirm(request_id: i64, offer_id: i64) -> ConfirmOfferAction {
        ConfirmOfferAction {
            request_id,
            offer_id,
            resale_only: false,
        }
    }

    #[tokio::test]
    async fn test_confirm_accepts_winner_and_rejects_siblings() {
        let storage = FreightStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let request = seed_request(&storage, &txn, SHIPPER, 10);
        let container_a = seed_container(&storage, &txn, FORWARDER_A, ContainerStatus::Scheduled);
        let container_b = seed_container(&storage, &txn, FORWARDER_B, ContainerStatus::Scheduled);
        let offer_a = seed_offer(&storage, &txn, &request, &container_a, OfferStatus::Pending);
        let offer_b = seed_offer(&storage, &txn, &request, &container_b, OfferStatus::Pending);
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let events = confirm(request.id, offer_a.id)
            .execute(&mut ctx, &metadata(SHIPPER))
            .await
            .unwrap();

        assert_eq!(txn.get_offer(offer_a.id).unwrap().unwrap().status, OfferStatus::Accepted);
        assert_eq!(txn.get_offer(offer_b.id).unwrap().unwrap().status, OfferStatus::Rejected);
        assert!(!txn.get_request(request.id).unwrap().unwrap().is_open());
        assert!(txn.cargo_row_for_offer(offer_a.id).unwrap().is_some());

        let ledger = ctx.ledger(&container_a).unwrap();
        assert_eq!(ledger.available(NOW), Decimal::from(16));
        assert!(ctx.ledger(&container_b).unwrap().is_deletable(NOW));

        match &events[0].payload {
            EventPayload::OfferConfirmed {
                winner, outcomes, ..
            } => {
                assert_eq!(winner.offer_id, offer_a.id);
                assert_eq!(outcomes.len(), 2);
                assert_eq!(outcomes.iter().filter(|o| o.accepted).count(), 1);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_only_owner_confirms() {
        let storage = FreightStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let request = seed_request(&storage, &txn, SHIPPER, 10);
        let container = seed_container(&storage, &txn, FORWARDER_A, ContainerStatus::Scheduled);
        let offer = seed_offer(&storage, &txn, &request, &container, OfferStatus::Pending);
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let result = confirm(request.id, offer.id)
            .execute(&mut ctx, &metadata(FORWARDER_A))
            .await;
        assert!(matches!(result, Err(MarketError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_retry_is_noop_and_loser_gets_already_closed() {
        let storage = FreightStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let request = seed_request(&storage, &txn, SHIPPER, 10);
        let container_a = seed_container(&storage, &txn, FORWARDER_A, ContainerStatus::Scheduled);
        let container_b = seed_container(&storage, &txn, FORWARDER_B, ContainerStatus::Scheduled);
        let offer_a = seed_offer(&storage, &txn, &request, &container_a, OfferStatus::Pending);
        let offer_b = seed_offer(&storage, &txn, &request, &container_b, OfferStatus::Pending);
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        confirm(request.id, offer_a.id)
            .execute(&mut ctx, &metadata(SHIPPER))
            .await
            .unwrap();

        let events = confirm(request.id, offer_a.id)
            .execute(&mut ctx, &metadata(SHIPPER))
            .await
            .unwrap();
        assert!(events.is_empty());
        assert_eq!(txn.cargo_rows_for_container(&container_a.id).unwrap().len(), 1);

        let result = confirm(request.id, offer_b.id)
            .execute(&mut ctx, &metadata(SHIPPER))
            .await;
        assert!(matches!(result, Err(MarketError::AlreadyClosed(_))));
    }

    #[tokio::test]
    async fn test_confirm_bid_resolves_source_and_moves_cargo() {
        let storage = FreightStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let original = seed_request(&storage, &txn, SHIPPER, 10);
        let container_a = seed_container(&storage, &txn, FORWARDER_A, ContainerStatus::Scheduled);
        let container_c = seed_container(&storage, &txn, FORWARDER_C, ContainerStatus::Scheduled);
        let offer_a = seed_offer(&storage, &txn, &original, &container_a, OfferStatus::ForSale);
        seed_platform_row(&storage, &txn, &offer_a, 10);
        let resale = seed_resale(&storage, &txn, &original, &offer_a);
        let offer_c = seed_offer(&storage, &txn, &resale, &container_c, OfferStatus::Pending);
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let action = ConfirmOfferAction {
            request_id: resale.id,
            offer_id: offer_c.id,
            resale_only: true,
        };
        action.execute(&mut ctx, &metadata(FORWARDER_A)).await.unwrap();

        assert_eq!(txn.get_offer(offer_a.id).unwrap().unwrap().status, OfferStatus::Resold);
        assert_eq!(txn.get_offer(offer_c.id).unwrap().unwrap().status, OfferStatus::Accepted);
        assert!(txn.cargo_row_for_offer(offer_a.id).unwrap().is_none());
        assert!(txn.cargo_row_for_offer(offer_c.id).unwrap().is_some());
        assert_eq!(ctx.ledger(&container_a).unwrap().available(NOW), Decimal::from(26));
        assert_eq!(ctx.ledger(&container_c).unwrap().available(NOW), Decimal::from(16));
    }

    #[tokio::test]
    async fn test_confirm_bid_rejects_original_request() {
        let storage = FreightStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let request = seed_request(&storage, &txn, SHIPPER, 10);
        let container = seed_container(&storage, &txn, FORWARDER_A, ContainerStatus::Scheduled);
        let offer = seed_offer(&storage, &txn, &request, &container, OfferStatus::Pending);
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let action = ConfirmOfferAction {
            request_id: request.id,
            offer_id: offer.id,
            resale_only: true,
        };
        let result = action.execute(&mut ctx, &metadata(SHIPPER)).await;
        assert!(matches!(result, Err(MarketError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_lapsed_winner_must_still_fit() {
        let storage = FreightStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let request = seed_request(&storage, &txn, SHIPPER, 10);
        let container = seed_container(&storage, &txn, FORWARDER_A, ContainerStatus::Scheduled);
        let offer = seed_offer(&storage, &txn, &request, &container, OfferStatus::Pending);
        // space taken by external cargo after the bid's hold lapsed
        seed_external_row(&storage, &txn, &container, 20);
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let result = confirm(request.id, offer.id)
            .execute(&mut ctx, &metadata(SHIPPER))
            .await;
        assert!(matches!(result, Err(MarketError::CapacityExceeded { .. })));
        assert_eq!(txn.get_offer(offer.id).unwrap().unwrap().status, OfferStatus::Pending);
    }
}
