//! Command action implementations
//!
//! Each action implements the `CommandHandler` trait and handles
//! one specific marketplace operation.

use async_trait::async_trait;

use crate::market::traits::{CommandContext, CommandHandler, CommandMetadata, MarketError};
use shared::freight::{FreightCommand, FreightCommandPayload, MarketEvent};
use shared::models::ContainerStatus;

mod cancel_offer;
mod cancel_resale;
mod confirm_offer;
mod container_milestone;
mod create_container;
mod create_offer;
mod create_request;
mod delete_container;
mod external_cargo;
mod resell;
mod update_offer_price;

#[cfg(test)]
pub(crate) mod fixtures;

pub use cancel_offer::CancelOfferAction;
pub use cancel_resale::CancelResaleAction;
pub use confirm_offer::ConfirmOfferAction;
pub use container_milestone::AdvanceContainerAction;
pub use create_container::CreateContainerAction;
pub use create_offer::CreateOfferAction;
pub use create_request::CreateRequestAction;
pub use delete_container::DeleteContainerAction;
pub use external_cargo::{AddExternalCargoAction, RemoveExternalCargoAction};
pub use resell::ResellAction;
pub use update_offer_price::UpdateOfferPriceAction;

/// CommandAction enum - dispatches to concrete action implementations
pub enum CommandAction {
    CreateRequest(CreateRequestAction),
    CreateOffer(CreateOfferAction),
    ConfirmOffer(ConfirmOfferAction),
    Resell(ResellAction),
    CancelResale(CancelResaleAction),
    UpdateOfferPrice(UpdateOfferPriceAction),
    CancelOffer(CancelOfferAction),
    CreateContainer(CreateContainerAction),
    AddExternalCargo(AddExternalCargoAction),
    RemoveExternalCargo(RemoveExternalCargoAction),
    AdvanceContainer(AdvanceContainerAction),
    DeleteContainer(DeleteContainerAction),
}

#[async_trait]
impl CommandHandler for CommandAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<MarketEvent>, MarketError> {
        match self {
            CommandAction::CreateRequest(action) => action.execute(ctx, metadata).await,
            CommandAction::CreateOffer(action) => action.execute(ctx, metadata).await,
            CommandAction::ConfirmOffer(action) => action.execute(ctx, metadata).await,
            CommandAction::Resell(action) => action.execute(ctx, metadata).await,
            CommandAction::CancelResale(action) => action.execute(ctx, metadata).await,
            CommandAction::UpdateOfferPrice(action) => action.execute(ctx, metadata).await,
            CommandAction::CancelOffer(action) => action.execute(ctx, metadata).await,
            CommandAction::CreateContainer(action) => action.execute(ctx, metadata).await,
            CommandAction::AddExternalCargo(action) => action.execute(ctx, metadata).await,
            CommandAction::RemoveExternalCargo(action) => action.execute(ctx, metadata).await,
            CommandAction::AdvanceContainer(action) => action.execute(ctx, metadata).await,
            CommandAction::DeleteContainer(action) => action.execute(ctx, metadata).await,
        }
    }
}

/// Convert FreightCommand to CommandAction
///
/// This is the ONLY place with a match on FreightCommandPayload.
impl From<&FreightCommand> for CommandAction {
    fn from(cmd: &FreightCommand) -> Self {
        match &cmd.payload {
            FreightCommandPayload::CreateRequest { request } => {
                CommandAction::CreateRequest(CreateRequestAction {
                    request: request.clone(),
                })
            }
            FreightCommandPayload::ConfirmOffer {
                request_id,
                offer_id,
            } => CommandAction::ConfirmOffer(ConfirmOfferAction {
                request_id: *request_id,
                offer_id: *offer_id,
                resale_only: false,
            }),
            FreightCommandPayload::ConfirmBid {
                request_id,
                offer_id,
            } => CommandAction::ConfirmOffer(ConfirmOfferAction {
                request_id: *request_id,
                offer_id: *offer_id,
                resale_only: true,
            }),
            FreightCommandPayload::Resell { offer_id } => {
                CommandAction::Resell(ResellAction {
                    offer_id: *offer_id,
                })
            }
            FreightCommandPayload::CancelResale { request_id } => {
                CommandAction::CancelResale(CancelResaleAction {
                    request_id: *request_id,
                    expired: false,
                })
            }
            FreightCommandPayload::ExpireResale { request_id } => {
                CommandAction::CancelResale(CancelResaleAction {
                    request_id: *request_id,
                    expired: true,
                })
            }
            FreightCommandPayload::CreateOffer {
                request_id,
                container_id,
                price,
                currency,
            } => CommandAction::CreateOffer(CreateOfferAction {
                request_id: *request_id,
                container_id: container_id.clone(),
                price: *price,
                currency: currency.clone(),
            }),
            FreightCommandPayload::UpdateOfferPrice {
                offer_id,
                price,
                currency,
            } => CommandAction::UpdateOfferPrice(UpdateOfferPriceAction {
                offer_id: *offer_id,
                price: *price,
                currency: currency.clone(),
            }),
            FreightCommandPayload::CancelOffer { offer_id } => {
                CommandAction::CancelOffer(CancelOfferAction {
                    offer_id: *offer_id,
                })
            }
            FreightCommandPayload::CreateContainer { container } => {
                CommandAction::CreateContainer(CreateContainerAction {
                    container: container.clone(),
                })
            }
            FreightCommandPayload::AddExternalCargo {
                container_id,
                cargo,
            } => CommandAction::AddExternalCargo(AddExternalCargoAction {
                container_id: container_id.clone(),
                cargo: cargo.clone(),
            }),
            FreightCommandPayload::RemoveExternalCargo { cargo_id } => {
                CommandAction::RemoveExternalCargo(RemoveExternalCargoAction {
                    cargo_id: *cargo_id,
                })
            }
            FreightCommandPayload::ConfirmContainer {
                container_id,
                imo_number,
            } => CommandAction::AdvanceContainer(AdvanceContainerAction {
                container_id: container_id.clone(),
                target: ContainerStatus::Confirmed,
                imo_number: imo_number.clone(),
            }),
            FreightCommandPayload::ShipContainer { container_id } => {
                CommandAction::AdvanceContainer(AdvanceContainerAction::to(
                    container_id,
                    ContainerStatus::Shipped,
                ))
            }
            FreightCommandPayload::CompleteShipment { container_id } => {
                CommandAction::AdvanceContainer(AdvanceContainerAction::to(
                    container_id,
                    ContainerStatus::Completed,
                ))
            }
            FreightCommandPayload::SettleContainer { container_id } => {
                CommandAction::AdvanceContainer(AdvanceContainerAction::to(
                    container_id,
                    ContainerStatus::Settled,
                ))
            }
            FreightCommandPayload::DeleteContainer { container_id } => {
                CommandAction::DeleteContainer(DeleteContainerAction {
                    container_id: container_id.clone(),
                })
            }
        }
    }
}

/// Reject callers other than `owner_id`
pub(crate) fn ensure_actor(
    metadata: &CommandMetadata,
    owner_id: i64,
    what: impl FnOnce() -> String,
) -> Result<(), MarketError> {
    if metadata.actor_id == owner_id {
        Ok(())
    } else {
        Err(MarketError::Forbidden(what()))
    }
}
