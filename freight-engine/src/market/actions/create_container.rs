//! CreateContainer command handler

use async_trait::async_trait;

use crate::market::storage::{MarketReader, CONTAINER_NO_KEY};
use crate::market::traits::{CommandContext, CommandHandler, CommandMetadata, MarketError};
use shared::freight::{EventPayload, MarketEvent, MarketEventType};
use shared::models::{Container, ContainerCreate, ContainerSize, ContainerStatus};
use shared::util::container_number;

/// CreateContainer action
#[derive(Debug, Clone)]
pub struct CreateContainerAction {
    pub container: ContainerCreate,
}

#[async_trait]
impl CommandHandler for CreateContainerAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<MarketEvent>, MarketError> {
        let input = &self.container;
        let size = ContainerSize::parse(&input.size).ok_or_else(|| {
            MarketError::Validation(format!("unknown container size '{}'", input.size))
        })?;
        if input.route.departure_port.trim().is_empty() || input.route.arrival_port.trim().is_empty() {
            return Err(MarketError::Validation("both ports are required".to_string()));
        }
        if input.eta < input.etd {
            return Err(MarketError::Validation(format!(
                "arrival {} is before departure {}",
                input.eta, input.etd
            )));
        }

        let seq = ctx.next_id(CONTAINER_NO_KEY)?;
        let container = Container {
            id: container_number(seq as u64),
            forwarder_id: metadata.actor_id,
            route: input.route.clone(),
            etd: input.etd,
            eta: input.eta,
            size,
            capacity_cbm: size.capacity_cbm(),
            imo_number: None,
            status: ContainerStatus::Scheduled,
            created_at: metadata.timestamp,
        };
        // 序号回绕后可能撞号
        if ctx.txn.get_container(&container.id)?.is_some() {
            return Err(MarketError::InvalidState(format!(
                "Container number {} is already taken",
                container.id
            )));
        }
        ctx.save_container(&container)?;

        tracing::info!(container_id = %container.id, forwarder = metadata.actor_id, size = size.label(), "Container registered");

        let event = ctx.event(
            metadata,
            container.id.clone(),
            MarketEventType::ContainerCreated,
            EventPayload::ContainerCreated {
                container_id: container.id.clone(),
                forwarder_id: container.forwarder_id,
                route: container.route.clone(),
                capacity_cbm: container.capacity_cbm,
            },
        );
        Ok(vec![event])
    }
}
