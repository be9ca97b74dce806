//! FreightManager - Core command processing and event generation
//!
//! This module handles:
//! - Command validation and processing
//! - Event generation with global sequence numbers
//! - Persistence to redb (transactional)
//! - Event broadcasting after commit
//! - Read-side queries (capacity, resale chains, operator metrics)
//!
//! # Command Flow
//!
//! ```text
//! execute_command(cmd)
//!     ├─ 1. Idempotency check (command_id)
//!     ├─ 2. Begin write transaction (single writer = serializable)
//!     ├─ 3. Create CommandContext
//!     ├─ 4. Convert command to action and execute
//!     ├─ 5. Persist events
//!     ├─ 6. Mark command processed
//!     ├─ 7. Commit transaction
//!     ├─ 8. Broadcast event(s)
//!     └─ 9. Return response
//! ```

mod error;
pub use error::*;

use super::actions::CommandAction;
use super::ledger::{CapacityLedger, CapacitySummary};
use super::resolver::find_final_offer;
use super::storage::{FreightStorage, MarketReader, StorageStats};
use super::traits::{CommandContext, CommandHandler, CommandMetadata, MarketError};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::freight::{
    CommandResponse, EventPayload, FreightCommand, FreightCommandPayload, MarketEvent,
};
use shared::models::{
    Cargo, Container, ContainerCreate, ContainerStatus, ExternalCargoCreate, Offer, Request,
    RequestCreate,
};
use std::path::Path;
use tokio::sync::broadcast;

/// Actor recorded on commands issued by the engine itself
pub const SYSTEM_ACTOR_ID: i64 = 0;

/// Outcome of one expiry sweep
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExpiryReport {
    /// Resales reverted to their source offer
    pub reverted: usize,
    /// Resales closed by someone else first
    pub skipped: usize,
    pub failed: usize,
    /// Original requests past deadline with no bids (left OPEN)
    pub stale_originals: usize,
}

/// A forwarder's container that can take a given request
#[derive(Debug, Clone, Serialize)]
pub struct AvailableContainer {
    pub container: Container,
    pub available: Decimal,
}

/// FreightManager for command processing
#[derive(Clone)]
pub struct FreightManager {
    storage: FreightStorage,
    event_tx: broadcast::Sender<MarketEvent>,
    max_chain_depth: usize,
}

impl std::fmt::Debug for FreightManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FreightManager")
            .field("storage", &"<FreightStorage>")
            .field("event_tx", &"<broadcast::Sender>")
            .field("max_chain_depth", &self.max_chain_depth)
            .finish()
    }
}

impl FreightManager {
    /// Create a new FreightManager with the given database path
    pub fn new(
        db_path: impl AsRef<Path>,
        event_capacity: usize,
        max_chain_depth: usize,
    ) -> ManagerResult<Self> {
        let storage = FreightStorage::open(db_path)?;
        let (event_tx, _) = broadcast::channel(event_capacity.max(1));
        let sequence = storage.get_current_sequence()?;
        tracing::info!(sequence, max_chain_depth, "FreightManager started");
        Ok(Self {
            storage,
            event_tx,
            max_chain_depth,
        })
    }

    /// Create a FreightManager with existing storage (for testing)
    #[cfg(test)]
    pub fn with_storage(storage: FreightStorage) -> Self {
        let (event_tx, _) = broadcast::channel(1024);
        Self {
            storage,
            event_tx,
            max_chain_depth: super::resolver::DEFAULT_MAX_CHAIN_DEPTH,
        }
    }

    /// Subscribe to event broadcasts
    pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
        self.event_tx.subscribe()
    }

    /// Get the underlying storage
    pub fn storage(&self) -> &FreightStorage {
        &self.storage
    }

    /// Execute a command and return the response
    pub fn execute_command(&self, cmd: FreightCommand) -> CommandResponse {
        let command_id = cmd.command_id.clone();
        match self.dispatch(cmd) {
            Ok(response) => response,
            Err(err) => CommandResponse::error(command_id, err.into()),
        }
    }

    /// Process, then broadcast committed events
    fn dispatch(&self, cmd: FreightCommand) -> ManagerResult<CommandResponse> {
        let command_id = cmd.command_id.clone();
        let name = cmd.payload.name();
        match self.process_command(cmd) {
            Ok((response, events)) => {
                self.broadcast(events);
                Ok(response)
            }
            Err(err) => {
                tracing::warn!(command_id = %command_id, command = name, error = %err, "Command rejected");
                Err(err)
            }
        }
    }

    fn broadcast(&self, events: Vec<MarketEvent>) {
        for event in events {
            if self.event_tx.send(event).is_err() {
                tracing::warn!("Event broadcast failed: no active receivers");
                break;
            }
        }
    }

    /// Process command and return response with events
    fn process_command(
        &self,
        cmd: FreightCommand,
    ) -> ManagerResult<(CommandResponse, Vec<MarketEvent>)> {
        tracing::debug!(command_id = %cmd.command_id, actor = cmd.actor_id, payload = ?cmd.payload, "Processing command");

        // 1. Idempotency check (before transaction)
        if self.storage.is_command_processed(&cmd.command_id)? {
            tracing::warn!(command_id = %cmd.command_id, "Duplicate command");
            return Ok((CommandResponse::duplicate(cmd.command_id), vec![]));
        }

        // 2. Begin write transaction
        let txn = self.storage.begin_write()?;

        // Double-check idempotency within transaction
        if self
            .storage
            .is_command_processed_txn(&txn, &cmd.command_id)?
        {
            return Ok((CommandResponse::duplicate(cmd.command_id), vec![]));
        }

        // 3. Create context and metadata
        let current_sequence = self.storage.current_sequence_txn(&txn)?;
        let mut ctx = CommandContext::new(&txn, &self.storage, current_sequence)
            .with_max_chain_depth(self.max_chain_depth);
        let metadata = CommandMetadata {
            command_id: cmd.command_id.clone(),
            actor_id: cmd.actor_id,
            timestamp: cmd.timestamp,
        };

        // 4. Convert to action and execute
        let action = CommandAction::from(&cmd);
        let events = futures::executor::block_on(action.execute(&mut ctx, &metadata))?;
        let last_sequence = ctx.current_sequence();

        // 5. Persist events
        for event in &events {
            self.storage.store_event(&txn, event)?;
        }
        if last_sequence != current_sequence {
            self.storage.set_sequence(&txn, last_sequence)?;
        }

        // 6. Mark command processed
        self.storage.mark_command_processed(&txn, &cmd.command_id)?;

        // 7. Commit
        txn.commit().map_err(super::storage::StorageError::from)?;

        let resource_id = resource_id(&events);
        tracing::debug!(command_id = %cmd.command_id, events = events.len(), sequence = last_sequence, "Command committed");
        Ok((CommandResponse::success(cmd.command_id, resource_id), events))
    }

    /// Run a command built by a typed method
    fn submit(&self, actor_id: i64, payload: FreightCommandPayload) -> ManagerResult<Option<String>> {
        self.submit_command(FreightCommand::new(actor_id, payload))
    }

    /// Run a prepared command, returning the ID of what it created or touched
    pub fn submit_command(&self, cmd: FreightCommand) -> ManagerResult<Option<String>> {
        Ok(self.dispatch(cmd)?.resource_id)
    }

    // ========== Requests ==========

    /// Post cargo and open an original request, returning the request ID
    pub fn create_request(&self, actor_id: i64, request: RequestCreate) -> ManagerResult<i64> {
        let id = self.submit(actor_id, FreightCommandPayload::CreateRequest { request })?;
        parse_id(id)
    }

    pub fn confirm_offer(&self, actor_id: i64, request_id: i64, offer_id: i64) -> ManagerResult<()> {
        self.submit(
            actor_id,
            FreightCommandPayload::ConfirmOffer {
                request_id,
                offer_id,
            },
        )?;
        Ok(())
    }

    pub fn confirm_bid(&self, actor_id: i64, request_id: i64, offer_id: i64) -> ManagerResult<()> {
        self.submit(
            actor_id,
            FreightCommandPayload::ConfirmBid {
                request_id,
                offer_id,
            },
        )?;
        Ok(())
    }

    /// Relist a won offer, returning the new resale request ID
    pub fn resell(&self, actor_id: i64, offer_id: i64) -> ManagerResult<i64> {
        let id = self.submit(actor_id, FreightCommandPayload::Resell { offer_id })?;
        parse_id(id)
    }

    pub fn cancel_resale(&self, actor_id: i64, request_id: i64) -> ManagerResult<()> {
        self.submit(actor_id, FreightCommandPayload::CancelResale { request_id })?;
        Ok(())
    }

    // ========== Offers ==========

    /// Bid on a request, returning the offer ID
    pub fn create_offer(
        &self,
        actor_id: i64,
        request_id: i64,
        container_id: &str,
        price: Decimal,
        currency: &str,
    ) -> ManagerResult<i64> {
        let id = self.submit(
            actor_id,
            FreightCommandPayload::CreateOffer {
                request_id,
                container_id: container_id.to_string(),
                price,
                currency: currency.to_string(),
            },
        )?;
        parse_id(id)
    }

    pub fn update_offer_price(
        &self,
        actor_id: i64,
        offer_id: i64,
        price: Decimal,
        currency: &str,
    ) -> ManagerResult<()> {
        self.submit(
            actor_id,
            FreightCommandPayload::UpdateOfferPrice {
                offer_id,
                price,
                currency: currency.to_string(),
            },
        )?;
        Ok(())
    }

    pub fn cancel_offer(&self, actor_id: i64, offer_id: i64) -> ManagerResult<()> {
        self.submit(actor_id, FreightCommandPayload::CancelOffer { offer_id })?;
        Ok(())
    }

    // ========== Containers ==========

    /// Register a container, returning its container number
    pub fn create_container(&self, actor_id: i64, container: ContainerCreate) -> ManagerResult<String> {
        self.submit(actor_id, FreightCommandPayload::CreateContainer { container })?
            .ok_or_else(|| ManagerError::Internal("container number missing".to_string()))
    }

    /// Load external cargo, returning the cargo row ID
    pub fn add_external_cargo(
        &self,
        actor_id: i64,
        container_id: &str,
        cargo: ExternalCargoCreate,
    ) -> ManagerResult<i64> {
        let id = self.submit(
            actor_id,
            FreightCommandPayload::AddExternalCargo {
                container_id: container_id.to_string(),
                cargo,
            },
        )?;
        parse_id(id)
    }

    pub fn remove_external_cargo(&self, actor_id: i64, cargo_id: i64) -> ManagerResult<()> {
        self.submit(actor_id, FreightCommandPayload::RemoveExternalCargo { cargo_id })?;
        Ok(())
    }

    pub fn confirm_container(
        &self,
        actor_id: i64,
        container_id: &str,
        imo_number: Option<String>,
    ) -> ManagerResult<()> {
        self.submit(
            actor_id,
            FreightCommandPayload::ConfirmContainer {
                container_id: container_id.to_string(),
                imo_number,
            },
        )?;
        Ok(())
    }

    pub fn ship_container(&self, actor_id: i64, container_id: &str) -> ManagerResult<()> {
        self.submit(
            actor_id,
            FreightCommandPayload::ShipContainer {
                container_id: container_id.to_string(),
            },
        )?;
        Ok(())
    }

    pub fn complete_shipment(&self, actor_id: i64, container_id: &str) -> ManagerResult<()> {
        self.submit(
            actor_id,
            FreightCommandPayload::CompleteShipment {
                container_id: container_id.to_string(),
            },
        )?;
        Ok(())
    }

    pub fn settle_container(&self, actor_id: i64, container_id: &str) -> ManagerResult<()> {
        self.submit(
            actor_id,
            FreightCommandPayload::SettleContainer {
                container_id: container_id.to_string(),
            },
        )?;
        Ok(())
    }

    pub fn delete_container(&self, actor_id: i64, container_id: &str) -> ManagerResult<()> {
        self.submit(
            actor_id,
            FreightCommandPayload::DeleteContainer {
                container_id: container_id.to_string(),
            },
        )?;
        Ok(())
    }

    // ========== Expiry ==========

    /// Revert every OPEN resale whose deadline has passed at `now`
    ///
    /// Each resale is reverted in its own transaction. One that was confirmed
    /// or cancelled in the meantime fails with AlreadyClosed and is skipped.
    pub fn expire_resales(&self, now: i64) -> ManagerResult<ExpiryReport> {
        let expired: Vec<i64> = {
            let txn = self.storage.begin_read()?;
            let mut ids = Vec::new();
            for request_id in txn.open_request_ids()? {
                if let Some(request) = txn.get_request(request_id)?
                    && request.is_resale()
                    && request.is_expired(now)
                {
                    ids.push(request.id);
                }
            }
            ids
        };

        let mut report = ExpiryReport::default();
        for request_id in expired {
            let cmd = FreightCommand {
                command_id: format!("expire-resale-{request_id}"),
                actor_id: SYSTEM_ACTOR_ID,
                timestamp: now,
                payload: FreightCommandPayload::ExpireResale { request_id },
            };
            match self.process_command(cmd) {
                Ok((_, events)) if events.is_empty() => report.skipped += 1,
                Ok((_, events)) => {
                    self.broadcast(events);
                    report.reverted += 1;
                }
                Err(ManagerError::Market(MarketError::AlreadyClosed(_))) => {
                    tracing::debug!(request_id, "Resale closed before expiry");
                    report.skipped += 1;
                }
                Err(err) => {
                    tracing::error!(request_id, error = %err, "Failed to expire resale");
                    report.failed += 1;
                }
            }
        }

        report.stale_originals = self.stale_original_requests(now)?.len();
        if report.reverted > 0 || report.failed > 0 {
            tracing::info!(
                reverted = report.reverted,
                skipped = report.skipped,
                failed = report.failed,
                stale_originals = report.stale_originals,
                "Resale expiry sweep finished"
            );
        }
        Ok(report)
    }

    // ========== Queries ==========

    pub fn get_request(&self, request_id: i64) -> ManagerResult<Option<Request>> {
        Ok(self.storage.begin_read()?.get_request(request_id)?)
    }

    pub fn get_offer(&self, offer_id: i64) -> ManagerResult<Option<Offer>> {
        Ok(self.storage.begin_read()?.get_offer(offer_id)?)
    }

    pub fn get_container(&self, container_id: &str) -> ManagerResult<Option<Container>> {
        Ok(self.storage.begin_read()?.get_container(container_id)?)
    }

    pub fn get_cargo(&self, cargo_id: i64) -> ManagerResult<Option<Cargo>> {
        Ok(self.storage.begin_read()?.get_cargo(cargo_id)?)
    }

    /// Bids on a request, visible only to the request's owner
    pub fn offers_for_request(&self, request_id: i64, actor_id: i64) -> ManagerResult<Vec<Offer>> {
        let txn = self.storage.begin_read()?;
        let request = txn
            .get_request(request_id)?
            .ok_or_else(|| MarketError::not_found("Request", request_id))?;
        if request.requester_id != actor_id {
            return Err(MarketError::Forbidden(format!(
                "Only the owner may list offers on request {request_id}"
            ))
            .into());
        }
        Ok(txn.offers_for_request(request_id)?)
    }

    /// Ledger figures of a container at `now`
    pub fn container_capacity(&self, container_id: &str, now: i64) -> ManagerResult<CapacitySummary> {
        let txn = self.storage.begin_read()?;
        let container = txn
            .get_container(container_id)?
            .ok_or_else(|| MarketError::not_found("Container", container_id))?;
        let ledger = CapacityLedger::load(&txn, &container)?;
        Ok(ledger.summary(&container, now))
    }

    /// The forwarder's SCHEDULED containers on the request's route with their
    /// free volume at `now`
    pub fn available_containers(
        &self,
        request_id: i64,
        forwarder_id: i64,
        now: i64,
    ) -> ManagerResult<Vec<AvailableContainer>> {
        let txn = self.storage.begin_read()?;
        let request = txn
            .get_request(request_id)?
            .ok_or_else(|| MarketError::not_found("Request", request_id))?;

        let mut result = Vec::new();
        for container in txn.all_containers()? {
            if container.forwarder_id != forwarder_id
                || container.status != ContainerStatus::Scheduled
                || !container.route.matches(&request.route)
            {
                continue;
            }
            let available = CapacityLedger::load(&txn, &container)?.available(now);
            result.push(AvailableContainer {
                container,
                available,
            });
        }
        Ok(result)
    }

    /// The offer currently carrying the request's cargo, following resales
    pub fn find_final_offer(&self, request_id: i64) -> ManagerResult<Option<Offer>> {
        let txn = self.storage.begin_read()?;
        if txn.get_request(request_id)?.is_none() {
            return Err(MarketError::not_found("Request", request_id).into());
        }
        Ok(find_final_offer(&txn, request_id, self.max_chain_depth)?)
    }

    /// OPEN original requests past their deadline that never got a bid
    pub fn stale_original_requests(&self, now: i64) -> ManagerResult<Vec<Request>> {
        let txn = self.storage.begin_read()?;
        let mut stale = Vec::new();
        for request_id in txn.open_request_ids()? {
            let Some(request) = txn.get_request(request_id)? else {
                continue;
            };
            if request.is_resale() || !request.is_expired(now) {
                continue;
            }
            if txn.offers_for_request(request.id)?.is_empty() {
                stale.push(request);
            }
        }
        Ok(stale)
    }

    /// Get events since a given sequence (for catch-up)
    pub fn get_events_since(&self, since_sequence: u64) -> ManagerResult<Vec<MarketEvent>> {
        Ok(self.storage.get_events_since(since_sequence)?)
    }

    pub fn stats(&self) -> ManagerResult<StorageStats> {
        Ok(self.storage.get_stats()?)
    }
}

/// ID of the entity a command created or acted on
fn resource_id(events: &[MarketEvent]) -> Option<String> {
    let event = events.first()?;
    match &event.payload {
        EventPayload::ExternalCargoAdded { cargo_id, .. }
        | EventPayload::ExternalCargoRemoved { cargo_id, .. } => Some(cargo_id.to_string()),
        _ => Some(event.aggregate_id.clone()),
    }
}

fn parse_id(resource_id: Option<String>) -> ManagerResult<i64> {
    let raw = resource_id.ok_or_else(|| ManagerError::Internal("resource id missing".to_string()))?;
    raw.parse()
        .map_err(|_| ManagerError::Internal(format!("invalid resource id: {raw}")))
}

#[cfg(test)]
mod tests;
