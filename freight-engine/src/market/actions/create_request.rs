//! CreateRequest command handler
//!
//! Registers the shipper's cargo and opens an original request for it.

use async_trait::async_trait;

use crate::market::storage::{CARGO_ID_KEY, REQUEST_ID_KEY};
use crate::market::traits::{CommandContext, CommandHandler, CommandMetadata, MarketError};
use rust_decimal::Decimal;
use shared::freight::{EventPayload, MarketEvent, MarketEventType};
use shared::models::{Cargo, Request, RequestCreate, RequestStatus};

/// CreateRequest action
#[derive(Debug, Clone)]
pub struct CreateRequestAction {
    pub request: RequestCreate,
}

impl CreateRequestAction {
    fn validate(&self, now: i64) -> Result<(), MarketError> {
        let input = &self.request;
        if input.cargo.item_name.trim().is_empty() {
            return Err(MarketError::Validation("item name is required".to_string()));
        }
        if input.cargo.total_cbm <= Decimal::ZERO {
            return Err(MarketError::Validation(format!(
                "cargo volume must be positive, got {}",
                input.cargo.total_cbm
            )));
        }
        if input.route.departure_port.trim().is_empty() || input.route.arrival_port.trim().is_empty() {
            return Err(MarketError::Validation("both ports are required".to_string()));
        }
        if input.deadline <= now {
            return Err(MarketError::Validation(
                "bidding deadline must be in the future".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl CommandHandler for CreateRequestAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<MarketEvent>, MarketError> {
        self.validate(metadata.timestamp)?;
        let input = &self.request;

        let cargo = Cargo {
            id: ctx.next_id(CARGO_ID_KEY)?,
            owner_id: metadata.actor_id,
            item_name: input.cargo.item_name.trim().to_string(),
            incoterms: input.cargo.incoterms.clone(),
            total_cbm: input.cargo.total_cbm,
            is_dangerous: input.cargo.is_dangerous,
            created_at: metadata.timestamp,
        };
        ctx.save_cargo(&cargo)?;

        let request = Request {
            id: ctx.next_id(REQUEST_ID_KEY)?,
            cargo_id: cargo.id,
            requester_id: metadata.actor_id,
            route: input.route.clone(),
            deadline: input.deadline,
            desired_arrival_date: input.desired_arrival_date,
            trade_type: input.trade_type.clone(),
            transport_type: input.transport_type.clone(),
            status: RequestStatus::Open,
            source_offer_id: None,
            created_at: metadata.timestamp,
        };
        ctx.save_request(&request)?;

        tracing::info!(request_id = request.id, cargo_id = cargo.id, actor = metadata.actor_id, cbm = %cargo.total_cbm, "Request opened");

        let event = ctx.event(
            metadata,
            request.id.to_string(),
            MarketEventType::RequestCreated,
            EventPayload::RequestCreated {
                request_id: request.id,
                cargo_id: cargo.id,
                requester_id: request.requester_id,
                route: request.route.clone(),
                deadline: request.deadline,
            },
        );
        Ok(vec![event])
    }
}
