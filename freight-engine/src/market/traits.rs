//! Command handling seams
//!
//! - [`CommandHandler`]: one implementation per marketplace operation
//! - [`CommandContext`]: the write transaction an action runs in, with typed
//!   loaders that turn missing rows into [`MarketError::NotFound`]
//! - [`MarketError`]: the domain failure taxonomy

use super::ledger::CapacityLedger;
use super::resolver::DEFAULT_MAX_CHAIN_DEPTH;
use super::storage::{FreightStorage, MarketReader, StorageError};
use async_trait::async_trait;
use redb::WriteTransaction;
use rust_decimal::Decimal;
use shared::freight::{EventPayload, MarketEvent, MarketEventType};
use shared::models::{Cargo, Container, ContainerCargo, Offer, Request};
use thiserror::Error;

/// Domain errors raised by actions
///
/// Every variant except `ChainCorrupted` and `Storage` is an expected,
/// caller-recoverable condition.
#[derive(Debug, Error)]
pub enum MarketError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The request left OPEN before this command committed
    #[error("Request {0} is already closed")]
    AlreadyClosed(i64),

    #[error("Capacity exceeded: requested {requested} CBM, available {available} CBM")]
    CapacityExceeded {
        requested: Decimal,
        available: Decimal,
    },

    #[error("Forwarder {forwarder_id} already has an offer on request {request_id}")]
    DuplicateBid { request_id: i64, forwarder_id: i64 },

    #[error("Resale chain of request {request_id} is corrupted (depth {depth})")]
    ChainCorrupted { request_id: i64, depth: usize },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl MarketError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Command metadata shared by every action
#[derive(Debug, Clone)]
pub struct CommandMetadata {
    pub command_id: String,
    /// Caller identity
    pub actor_id: i64,
    /// Command time; deadlines are evaluated against it
    pub timestamp: i64,
}

/// Execution context of one command
pub struct CommandContext<'a> {
    pub txn: &'a WriteTransaction,
    pub storage: &'a FreightStorage,
    sequence: u64,
    max_chain_depth: usize,
}

impl<'a> CommandContext<'a> {
    pub fn new(txn: &'a WriteTransaction, storage: &'a FreightStorage, current_sequence: u64) -> Self {
        Self {
            txn,
            storage,
            sequence: current_sequence,
            max_chain_depth: DEFAULT_MAX_CHAIN_DEPTH,
        }
    }

    pub fn with_max_chain_depth(mut self, max_chain_depth: usize) -> Self {
        self.max_chain_depth = max_chain_depth;
        self
    }

    pub fn max_chain_depth(&self) -> usize {
        self.max_chain_depth
    }

    /// Allocate the next event sequence number
    pub fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    /// Last allocated sequence number
    pub fn current_sequence(&self) -> u64 {
        self.sequence
    }

    /// Build an event stamped with the next sequence number
    pub fn event(
        &mut self,
        metadata: &CommandMetadata,
        aggregate_id: impl Into<String>,
        event_type: MarketEventType,
        payload: EventPayload,
    ) -> MarketEvent {
        let seq = self.next_sequence();
        MarketEvent::new(
            seq,
            aggregate_id,
            metadata.actor_id,
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            event_type,
            payload,
        )
    }

    pub fn next_id(&self, counter: &str) -> Result<i64, MarketError> {
        Ok(self.storage.next_id(self.txn, counter)?)
    }

    // ========== Loaders ==========

    pub fn load_cargo(&self, cargo_id: i64) -> Result<Cargo, MarketError> {
        self.txn
            .get_cargo(cargo_id)?
            .ok_or_else(|| MarketError::not_found("Cargo", cargo_id))
    }

    pub fn load_request(&self, request_id: i64) -> Result<Request, MarketError> {
        self.txn
            .get_request(request_id)?
            .ok_or_else(|| MarketError::not_found("Request", request_id))
    }

    pub fn load_offer(&self, offer_id: i64) -> Result<Offer, MarketError> {
        self.txn
            .get_offer(offer_id)?
            .ok_or_else(|| MarketError::not_found("Offer", offer_id))
    }

    pub fn load_container(&self, container_id: &str) -> Result<Container, MarketError> {
        self.txn
            .get_container(container_id)?
            .ok_or_else(|| MarketError::not_found("Container", container_id))
    }

    pub fn load_container_cargo(&self, row_id: i64) -> Result<ContainerCargo, MarketError> {
        self.txn
            .get_container_cargo(row_id)?
            .ok_or_else(|| MarketError::not_found("ContainerCargo", row_id))
    }

    /// Ledger of a container as of this transaction
    pub fn ledger(&self, container: &Container) -> Result<CapacityLedger, MarketError> {
        Ok(CapacityLedger::load(self.txn, container)?)
    }

    // ========== Writers ==========

    pub fn save_cargo(&self, cargo: &Cargo) -> Result<(), MarketError> {
        Ok(self.storage.put_cargo_txn(self.txn, cargo)?)
    }

    pub fn save_request(&self, request: &Request) -> Result<(), MarketError> {
        Ok(self.storage.put_request_txn(self.txn, request)?)
    }

    pub fn save_offer(&self, offer: &Offer) -> Result<(), MarketError> {
        Ok(self.storage.put_offer_txn(self.txn, offer)?)
    }

    pub fn delete_offer(&self, offer: &Offer) -> Result<(), MarketError> {
        Ok(self.storage.delete_offer_txn(self.txn, offer)?)
    }

    pub fn save_container(&self, container: &Container) -> Result<(), MarketError> {
        Ok(self.storage.put_container_txn(self.txn, container)?)
    }

    pub fn delete_container(&self, container_id: &str) -> Result<(), MarketError> {
        Ok(self.storage.delete_container_txn(self.txn, container_id)?)
    }

    pub fn save_container_cargo(&self, row: &ContainerCargo) -> Result<(), MarketError> {
        Ok(self.storage.put_container_cargo_txn(self.txn, row)?)
    }

    pub fn delete_container_cargo(&self, row: &ContainerCargo) -> Result<(), MarketError> {
        Ok(self.storage.delete_container_cargo_txn(self.txn, row)?)
    }
}

/// Command handler trait - one implementation per operation
///
/// Actions must re-check every precondition against `ctx.txn`; nothing read
/// before the transaction began may be trusted.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<MarketEvent>, MarketError>;
}
