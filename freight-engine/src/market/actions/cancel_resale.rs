//! CancelResale / ExpireResale command handler
//!
//! Withdraws an OPEN resale request: the source offer returns to ACCEPTED,
//! every bid received is rejected and the resale request is CLOSED.
//! The expiry sweep runs the same transition as the system actor once the
//! deadline has passed, skipping the ownership check.

use async_trait::async_trait;

use super::ensure_actor;
use crate::market::storage::MarketReader;
use crate::market::traits::{CommandContext, CommandHandler, CommandMetadata, MarketError};
use shared::freight::{EventPayload, MarketEvent, MarketEventType, OfferOutcome};
use shared::models::{OfferStatus, RequestStatus};

/// CancelResale action
#[derive(Debug, Clone)]
pub struct CancelResaleAction {
    pub request_id: i64,
    /// Triggered by the deadline sweep rather than the reseller
    pub expired: bool,
}

#[async_trait]
impl CommandHandler for CancelResaleAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<MarketEvent>, MarketError> {
        let mut request = ctx.load_request(self.request_id)?;
        let Some(source_offer_id) = request.source_offer_id else {
            return Err(MarketError::InvalidState(format!(
                "Request {} is not a resale request",
                request.id
            )));
        };
        if !self.expired {
            ensure_actor(metadata, request.requester_id, || {
                format!("Only the reseller may cancel request {}", request.id)
            })?;
        }

        // 事务内再次检查 OPEN：与确认/清扫竞争时后提交者失败
        if !request.is_open() {
            return Err(MarketError::AlreadyClosed(request.id));
        }
        if self.expired && !request.is_expired(metadata.timestamp) {
            return Err(MarketError::InvalidState(format!(
                "Resale request {} is still within its deadline",
                request.id
            )));
        }

        let mut source = ctx.load_offer(source_offer_id)?;
        if source.status != OfferStatus::ForSale {
            return Err(MarketError::InvalidState(format!(
                "Source offer {} is {}, expected FOR_SALE",
                source.id, source.status
            )));
        }
        source.status = OfferStatus::Accepted;
        ctx.save_offer(&source)?;

        let mut rejected = Vec::new();
        for mut offer in ctx.txn.offers_for_request(request.id)? {
            if offer.status == OfferStatus::Rejected {
                continue;
            }
            offer.status = OfferStatus::Rejected;
            ctx.save_offer(&offer)?;
            rejected.push(OfferOutcome {
                offer_id: offer.id,
                forwarder_id: offer.forwarder_id,
                accepted: false,
            });
        }

        request.status = RequestStatus::Closed;
        ctx.save_request(&request)?;

        tracing::info!(
            request_id = request.id,
            source_offer_id = source.id,
            rejected = rejected.len(),
            expired = self.expired,
            "Resale withdrawn"
        );

        let event = ctx.event(
            metadata,
            request.id.to_string(),
            MarketEventType::ResaleCancelled,
            EventPayload::ResaleCancelled {
                request_id: request.id,
                source_offer_id: source.id,
                rejected,
                expired: self.expired,
            },
        );
        Ok(vec![event])
    }
}
