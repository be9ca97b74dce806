//! Container milestone command handler
//!
//! SCHEDULED → CONFIRMED → SHIPPED → COMPLETED → SETTLED, one step at a time.
//! Each step moves the container's booked offers along with it:
//!
//! | Target | Offer cascade |
//! |--------|---------------|
//! | CONFIRMED | ACCEPTED → CONFIRMED |
//! | SHIPPED | CONFIRMED → SHIPPED |
//! | COMPLETED | SHIPPED → COMPLETED |
//! | SETTLED | none |
//!
//! The resulting event carries everyone with cargo in the container, found by
//! walking each platform booking back up its resale chain.

use std::collections::BTreeSet;

use async_trait::async_trait;

use super::ensure_actor;
use crate::market::resolver::upstream_requests;
use crate::market::storage::MarketReader;
use crate::market::traits::{CommandContext, CommandHandler, CommandMetadata, MarketError};
use shared::freight::{EventPayload, MarketEvent, MarketEventType};
use shared::models::{Container, ContainerStatus, OfferStatus};

/// AdvanceContainer action
#[derive(Debug, Clone)]
pub struct AdvanceContainerAction {
    pub container_id: String,
    pub target: ContainerStatus,
    /// Vessel IMO number, only recorded on confirmation
    pub imo_number: Option<String>,
}

impl AdvanceContainerAction {
    pub fn to(container_id: &str, target: ContainerStatus) -> Self {
        Self {
            container_id: container_id.to_string(),
            target,
            imo_number: None,
        }
    }
}

/// Offer status moved by a milestone, `(from, to)`
fn cascade_for(target: ContainerStatus) -> Option<(OfferStatus, OfferStatus)> {
    match target {
        ContainerStatus::Confirmed => Some((OfferStatus::Accepted, OfferStatus::Confirmed)),
        ContainerStatus::Shipped => Some((OfferStatus::Confirmed, OfferStatus::Shipped)),
        ContainerStatus::Completed => Some((OfferStatus::Shipped, OfferStatus::Completed)),
        ContainerStatus::Scheduled | ContainerStatus::Settled => None,
    }
}

fn milestone_message(container: &Container) -> String {
    match container.status {
        ContainerStatus::Scheduled => format!("Container {} is scheduled", container.id),
        ContainerStatus::Confirmed => format!("Container {} has been confirmed", container.id),
        ContainerStatus::Shipped => format!("Container {} has been loaded and shipped", container.id),
        ContainerStatus::Completed => format!("Transport of container {} is complete", container.id),
        ContainerStatus::Settled => format!("Container {} has been settled", container.id),
    }
}

/// Recipients and chat rooms touched by a milestone
struct Audience {
    recipients: BTreeSet<i64>,
    chat_offers: BTreeSet<i64>,
}

fn collect_audience(ctx: &CommandContext<'_>, container: &Container) -> Result<Audience, MarketError> {
    let mut audience = Audience {
        recipients: BTreeSet::new(),
        chat_offers: BTreeSet::new(),
    };

    for row in ctx.txn.cargo_rows_for_container(&container.id)? {
        let Some(offer_id) = row.offer_id() else {
            continue;
        };
        let Some(offer) = ctx.txn.get_offer(offer_id)? else {
            tracing::warn!(cargo_id = row.id, offer_id, "Cargo row references missing offer");
            continue;
        };
        audience.chat_offers.insert(offer.id);

        // 沿转售链向上：每一层请求的发起人都是利益相关方
        for request_id in upstream_requests(ctx.txn, offer.request_id, ctx.max_chain_depth())? {
            let Some(request) = ctx.txn.get_request(request_id)? else {
                continue;
            };
            audience.recipients.insert(request.requester_id);
            if let Some(source_id) = request.source_offer_id {
                audience.chat_offers.insert(source_id);
            }
            if let Some(cargo) = ctx.txn.get_cargo(request.cargo_id)? {
                audience.recipients.insert(cargo.owner_id);
            }
        }
    }

    audience.recipients.remove(&container.forwarder_id);
    Ok(audience)
}

#[async_trait]
impl CommandHandler for AdvanceContainerAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<MarketEvent>, MarketError> {
        let mut container = ctx.load_container(&self.container_id)?;
        ensure_actor(metadata, container.forwarder_id, || {
            format!("Container {} belongs to another forwarder", container.id)
        })?;
        if container.status.next() != Some(self.target) {
            return Err(MarketError::InvalidState(format!(
                "Container {} is {}, cannot move to {}",
                container.id, container.status, self.target
            )));
        }

        // 与 CapacitySummary.confirmable 同一判定
        if self.target == ContainerStatus::Confirmed
            && let Some(reason) = ctx.ledger(&container)?.confirm_blocker(container.status)
        {
            return Err(MarketError::InvalidState(format!(
                "Container {} {}",
                container.id, reason
            )));
        }

        let offers = ctx.txn.offers_for_container(&container.id)?;

        let mut cascaded_offer_ids = Vec::new();
        if let Some((from, to)) = cascade_for(self.target) {
            for mut offer in offers.into_iter().filter(|o| o.status == from) {
                offer.status = to;
                ctx.save_offer(&offer)?;
                cascaded_offer_ids.push(offer.id);
            }
        }

        container.status = self.target;
        if self.target == ContainerStatus::Confirmed {
            container.imo_number = self
                .imo_number
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
        }
        ctx.save_container(&container)?;

        let audience = collect_audience(ctx, &container)?;
        let closed_chat_offers = if container.status == ContainerStatus::Settled {
            audience.chat_offers.into_iter().collect()
        } else {
            Vec::new()
        };

        tracing::info!(
            container_id = %container.id,
            status = %container.status,
            cascaded = cascaded_offer_ids.len(),
            recipients = audience.recipients.len(),
            "Container milestone reached"
        );

        let event = ctx.event(
            metadata,
            container.id.clone(),
            MarketEventType::ContainerStatusChanged,
            EventPayload::ContainerStatusChanged {
                container_id: container.id.clone(),
                status: container.status,
                message: milestone_message(&container),
                cascaded_offer_ids,
                recipients: audience.recipients.into_iter().collect(),
                closed_chat_offers,
            },
        );
        Ok(vec![event])
    }
}
