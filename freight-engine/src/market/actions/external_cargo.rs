//! External cargo command handlers
//!
//! Forwarders may load cargo booked outside the marketplace. External rows
//! count as confirmed volume on the container ledger.

use async_trait::async_trait;

use super::ensure_actor;
use crate::market::storage::CONTAINER_CARGO_ID_KEY;
use crate::market::traits::{CommandContext, CommandHandler, CommandMetadata, MarketError};
use rust_decimal::Decimal;
use shared::freight::{EventPayload, MarketEvent, MarketEventType};
use shared::models::{
    CargoSource, Container, ContainerCargo, ContainerStatus, ExternalCargoCreate,
};

/// External cargo can be edited until the container ships
fn ensure_loadable(container: &Container) -> Result<(), MarketError> {
    match container.status {
        ContainerStatus::Scheduled | ContainerStatus::Confirmed => Ok(()),
        status => Err(MarketError::InvalidState(format!(
            "Container {} is {}, its load is frozen",
            container.id, status
        ))),
    }
}

/// AddExternalCargo action
#[derive(Debug, Clone)]
pub struct AddExternalCargoAction {
    pub container_id: String,
    pub cargo: ExternalCargoCreate,
}

#[async_trait]
impl CommandHandler for AddExternalCargoAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<MarketEvent>, MarketError> {
        let input = &self.cargo;
        if input.name.trim().is_empty() {
            return Err(MarketError::Validation("cargo name is required".to_string()));
        }
        if input.cbm <= Decimal::ZERO {
            return Err(MarketError::Validation(format!(
                "cargo volume must be positive, got {}",
                input.cbm
            )));
        }

        let container = ctx.load_container(&self.container_id)?;
        ensure_actor(metadata, container.forwarder_id, || {
            format!("Container {} belongs to another forwarder", container.id)
        })?;
        ensure_loadable(&container)?;

        let available = ctx.ledger(&container)?.available(metadata.timestamp);
        if input.cbm > available {
            return Err(MarketError::CapacityExceeded {
                requested: input.cbm,
                available,
            });
        }

        let row = ContainerCargo {
            id: ctx.next_id(CONTAINER_CARGO_ID_KEY)?,
            container_id: container.id.clone(),
            source: CargoSource::External {
                name: input.name.trim().to_string(),
            },
            cbm_loaded: input.cbm,
            freight_cost: Some(input.freight_cost),
            freight_currency: Some(input.currency.clone()),
            added_at: metadata.timestamp,
        };
        ctx.save_container_cargo(&row)?;

        tracing::info!(container_id = %container.id, cargo_id = row.id, cbm = %row.cbm_loaded, "External cargo loaded");

        let event = ctx.event(
            metadata,
            container.id.clone(),
            MarketEventType::ExternalCargoAdded,
            EventPayload::ExternalCargoAdded {
                container_id: container.id,
                cargo_id: row.id,
                name: input.name.trim().to_string(),
                cbm: row.cbm_loaded,
            },
        );
        Ok(vec![event])
    }
}

/// RemoveExternalCargo action
#[derive(Debug, Clone)]
pub struct RemoveExternalCargoAction {
    pub cargo_id: i64,
}

#[async_trait]
impl CommandHandler for RemoveExternalCargoAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<MarketEvent>, MarketError> {
        let row = ctx.load_container_cargo(self.cargo_id)?;
        let container = ctx.load_container(&row.container_id)?;
        ensure_actor(metadata, container.forwarder_id, || {
            format!("Container {} belongs to another forwarder", container.id)
        })?;
        if !row.is_external() {
            return Err(MarketError::InvalidState(format!(
                "Cargo row {} was booked through an offer",
                row.id
            )));
        }
        ensure_loadable(&container)?;

        ctx.delete_container_cargo(&row)?;
        tracing::info!(container_id = %container.id, cargo_id = row.id, "External cargo removed");

        let event = ctx.event(
            metadata,
            container.id.clone(),
            MarketEventType::ExternalCargoRemoved,
            EventPayload::ExternalCargoRemoved {
                container_id: container.id,
                cargo_id: row.id,
            },
        );
        Ok(vec![event])
    }
}
