//! redb-based storage layer for the freight market
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `cargos` | `cargo_id` | `Cargo` | Cargo rows (immutable) |
//! | `requests` | `request_id` | `Request` | Original and resale requests |
//! | `offers` | `offer_id` | `Offer` | Bids |
//! | `containers` | `container_no` | `Container` | Forwarder capacity |
//! | `container_cargo` | `row_id` | `ContainerCargo` | Loaded-cargo rows |
//! | `offers_by_request` | `(request_id, offer_id)` | `()` | Sibling lookup |
//! | `offers_by_container` | `(container_no, offer_id)` | `()` | Ledger / cascade lookup |
//! | `cargo_by_container` | `(container_no, row_id)` | `()` | Ledger lookup |
//! | `cargo_by_offer` | `offer_id` | `row_id` | At most one row per offer |
//! | `resales_by_source` | `(source_offer_id, request_id)` | `()` | Resale chain links |
//! | `open_requests` | `request_id` | `()` | Expiry sweep / stale metric |
//! | `events` | `sequence` | `MarketEvent` | Audit log (append-only) |
//! | `processed_commands` | `command_id` | `()` | Idempotency check |
//! | `sequence_counter` | name | `u64` | Event sequence and id counters |
//!
//! Indices are maintained by the `put_*_txn` / `delete_*_txn` writers; callers
//! never touch them directly.
//!
//! # Isolation
//!
//! redb has a single writer at a time, so every check-then-write performed
//! inside one write transaction is serializable. Reads outside commands go
//! through [`FreightStorage::begin_read`] and see a consistent snapshot.

use redb::{
    AccessGuard, Database, ReadTransaction, ReadableDatabase, ReadableTable,
    ReadableTableMetadata, TableDefinition, WriteTransaction,
};
use serde::de::DeserializeOwned;
use shared::freight::MarketEvent;
use shared::models::{Cargo, Container, ContainerCargo, Offer, Request};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Cargo rows: key = cargo_id, value = JSON-serialized Cargo
const CARGOS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("cargos");

/// Requests: key = request_id, value = JSON-serialized Request
const REQUESTS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("requests");

/// Offers: key = offer_id, value = JSON-serialized Offer
const OFFERS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("offers");

/// Containers: key = container number, value = JSON-serialized Container
const CONTAINERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("containers");

/// Loaded-cargo rows: key = row_id, value = JSON-serialized ContainerCargo
const CONTAINER_CARGO_TABLE: TableDefinition<i64, &[u8]> =
    TableDefinition::new("container_cargo");

const OFFERS_BY_REQUEST_TABLE: TableDefinition<(i64, i64), ()> =
    TableDefinition::new("offers_by_request");

const OFFERS_BY_CONTAINER_TABLE: TableDefinition<(&str, i64), ()> =
    TableDefinition::new("offers_by_container");

const CARGO_BY_CONTAINER_TABLE: TableDefinition<(&str, i64), ()> =
    TableDefinition::new("cargo_by_container");

const CARGO_BY_OFFER_TABLE: TableDefinition<i64, i64> = TableDefinition::new("cargo_by_offer");

/// Resale links: key = (source offer, spawned request). Closed resales stay indexed as history.
const RESALES_BY_SOURCE_TABLE: TableDefinition<(i64, i64), ()> =
    TableDefinition::new("resales_by_source");

const OPEN_REQUESTS_TABLE: TableDefinition<i64, ()> = TableDefinition::new("open_requests");

/// Event log: key = global sequence, value = JSON-serialized MarketEvent
const EVENTS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("events");

const PROCESSED_COMMANDS_TABLE: TableDefinition<&str, ()> =
    TableDefinition::new("processed_commands");

/// Counters: key = counter name, value = last issued value
const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

const SEQUENCE_KEY: &str = "seq";
pub const CARGO_ID_KEY: &str = "cargo_id";
pub const REQUEST_ID_KEY: &str = "request_id";
pub const OFFER_ID_KEY: &str = "offer_id";
pub const CONTAINER_NO_KEY: &str = "container_no";
pub const CONTAINER_CARGO_ID_KEY: &str = "container_cargo_id";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Counter overflow: {0}")]
    CounterOverflow(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

fn decode<T: DeserializeOwned>(guard: Option<AccessGuard<'_, &'static [u8]>>) -> StorageResult<Option<T>> {
    match guard {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

/// Read access shared by write transactions (inside commands) and read
/// transactions (queries).
///
/// Every method opens and drops its tables before returning, so callers may
/// freely interleave reads with `FreightStorage::*_txn` writes on the same
/// write transaction.
pub trait MarketReader {
    fn get_cargo(&self, cargo_id: i64) -> StorageResult<Option<Cargo>>;

    fn get_request(&self, request_id: i64) -> StorageResult<Option<Request>>;

    fn get_offer(&self, offer_id: i64) -> StorageResult<Option<Offer>>;

    fn get_container(&self, container_id: &str) -> StorageResult<Option<Container>>;

    fn get_container_cargo(&self, row_id: i64) -> StorageResult<Option<ContainerCargo>>;

    /// All offers on a request, in creation order
    fn offers_for_request(&self, request_id: i64) -> StorageResult<Vec<Offer>>;

    /// All offers backed by a container, in creation order
    fn offers_for_container(&self, container_id: &str) -> StorageResult<Vec<Offer>>;

    /// Loaded-cargo rows of a container (platform and external)
    fn cargo_rows_for_container(&self, container_id: &str) -> StorageResult<Vec<ContainerCargo>>;

    /// Loaded-cargo row created for an offer, if any
    fn cargo_row_for_offer(&self, offer_id: i64) -> StorageResult<Option<ContainerCargo>>;

    /// IDs of every request ever spawned from a source offer, oldest first
    fn resale_ids_for_source(&self, source_offer_id: i64) -> StorageResult<Vec<i64>>;

    /// IDs of requests currently OPEN (original and resale)
    fn open_request_ids(&self) -> StorageResult<Vec<i64>>;

    fn all_containers(&self) -> StorageResult<Vec<Container>>;

    /// Events with sequence greater than `since`
    fn events_since(&self, since: u64) -> StorageResult<Vec<MarketEvent>>;

    /// Latest request spawned from a source offer
    fn resale_for_source(&self, source_offer_id: i64) -> StorageResult<Option<Request>> {
        match self.resale_ids_for_source(source_offer_id)?.last() {
            Some(request_id) => self.get_request(*request_id),
            None => Ok(None),
        }
    }
}

macro_rules! impl_market_reader {
    ($txn:ty) => {
        impl MarketReader for $txn {
            fn get_cargo(&self, cargo_id: i64) -> StorageResult<Option<Cargo>> {
                let table = self.open_table(CARGOS_TABLE)?;
                decode(table.get(cargo_id)?)
            }

            fn get_request(&self, request_id: i64) -> StorageResult<Option<Request>> {
                let table = self.open_table(REQUESTS_TABLE)?;
                decode(table.get(request_id)?)
            }

            fn get_offer(&self, offer_id: i64) -> StorageResult<Option<Offer>> {
                let table = self.open_table(OFFERS_TABLE)?;
                decode(table.get(offer_id)?)
            }

            fn get_container(&self, container_id: &str) -> StorageResult<Option<Container>> {
                let table = self.open_table(CONTAINERS_TABLE)?;
                decode(table.get(container_id)?)
            }

            fn get_container_cargo(&self, row_id: i64) -> StorageResult<Option<ContainerCargo>> {
                let table = self.open_table(CONTAINER_CARGO_TABLE)?;
                decode(table.get(row_id)?)
            }

            fn offers_for_request(&self, request_id: i64) -> StorageResult<Vec<Offer>> {
                let index = self.open_table(OFFERS_BY_REQUEST_TABLE)?;
                let offers = self.open_table(OFFERS_TABLE)?;
                let mut result = Vec::new();
                for entry in index.range((request_id, i64::MIN)..=(request_id, i64::MAX))? {
                    let (key, _) = entry?;
                    let (_, offer_id) = key.value();
                    if let Some(offer) = decode(offers.get(offer_id)?)? {
                        result.push(offer);
                    }
                }
                Ok(result)
            }

            fn offers_for_container(&self, container_id: &str) -> StorageResult<Vec<Offer>> {
                let index = self.open_table(OFFERS_BY_CONTAINER_TABLE)?;
                let offers = self.open_table(OFFERS_TABLE)?;
                let mut result = Vec::new();
                for entry in index.range((container_id, i64::MIN)..=(container_id, i64::MAX))? {
                    let (key, _) = entry?;
                    let (_, offer_id) = key.value();
                    if let Some(offer) = decode(offers.get(offer_id)?)? {
                        result.push(offer);
                    }
                }
                Ok(result)
            }

            fn cargo_rows_for_container(
                &self,
                container_id: &str,
            ) -> StorageResult<Vec<ContainerCargo>> {
                let index = self.open_table(CARGO_BY_CONTAINER_TABLE)?;
                let rows = self.open_table(CONTAINER_CARGO_TABLE)?;
                let mut result = Vec::new();
                for entry in index.range((container_id, i64::MIN)..=(container_id, i64::MAX))? {
                    let (key, _) = entry?;
                    let (_, row_id) = key.value();
                    if let Some(row) = decode(rows.get(row_id)?)? {
                        result.push(row);
                    }
                }
                Ok(result)
            }

            fn cargo_row_for_offer(&self, offer_id: i64) -> StorageResult<Option<ContainerCargo>> {
                let index = self.open_table(CARGO_BY_OFFER_TABLE)?;
                let row_id = index.get(offer_id)?.map(|guard| guard.value());
                match row_id {
                    Some(row_id) => {
                        let rows = self.open_table(CONTAINER_CARGO_TABLE)?;
                        decode(rows.get(row_id)?)
                    }
                    None => Ok(None),
                }
            }

            fn resale_ids_for_source(&self, source_offer_id: i64) -> StorageResult<Vec<i64>> {
                let index = self.open_table(RESALES_BY_SOURCE_TABLE)?;
                let mut ids = Vec::new();
                for entry in
                    index.range((source_offer_id, i64::MIN)..=(source_offer_id, i64::MAX))?
                {
                    let (key, _) = entry?;
                    ids.push(key.value().1);
                }
                Ok(ids)
            }

            fn open_request_ids(&self) -> StorageResult<Vec<i64>> {
                let index = self.open_table(OPEN_REQUESTS_TABLE)?;
                let mut ids = Vec::new();
                for entry in index.iter()? {
                    let (key, _) = entry?;
                    ids.push(key.value());
                }
                Ok(ids)
            }

            fn all_containers(&self) -> StorageResult<Vec<Container>> {
                let table = self.open_table(CONTAINERS_TABLE)?;
                let mut containers = Vec::new();
                for entry in table.iter()? {
                    let (_, value) = entry?;
                    containers.push(serde_json::from_slice(value.value())?);
                }
                Ok(containers)
            }

            fn events_since(&self, since: u64) -> StorageResult<Vec<MarketEvent>> {
                let table = self.open_table(EVENTS_TABLE)?;
                let mut events = Vec::new();
                for entry in table.range((since + 1)..)? {
                    let (_, value) = entry?;
                    events.push(serde_json::from_slice(value.value())?);
                }
                Ok(events)
            }
        }
    };
}

impl_market_reader!(WriteTransaction);
impl_market_reader!(ReadTransaction);

/// Market storage backed by redb
#[derive(Clone)]
pub struct FreightStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for FreightStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FreightStorage").finish_non_exhaustive()
    }
}

impl FreightStorage {
    /// Open or create the database at the given path
    ///
    /// redb commits with `Durability::Immediate`: once `commit()` returns the
    /// transition is on disk, and a crash mid-command leaves no partial state.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            // Create all tables if they don't exist
            let _ = write_txn.open_table(CARGOS_TABLE)?;
            let _ = write_txn.open_table(REQUESTS_TABLE)?;
            let _ = write_txn.open_table(OFFERS_TABLE)?;
            let _ = write_txn.open_table(CONTAINERS_TABLE)?;
            let _ = write_txn.open_table(CONTAINER_CARGO_TABLE)?;
            let _ = write_txn.open_table(OFFERS_BY_REQUEST_TABLE)?;
            let _ = write_txn.open_table(OFFERS_BY_CONTAINER_TABLE)?;
            let _ = write_txn.open_table(CARGO_BY_CONTAINER_TABLE)?;
            let _ = write_txn.open_table(CARGO_BY_OFFER_TABLE)?;
            let _ = write_txn.open_table(RESALES_BY_SOURCE_TABLE)?;
            let _ = write_txn.open_table(OPEN_REQUESTS_TABLE)?;
            let _ = write_txn.open_table(EVENTS_TABLE)?;
            let _ = write_txn.open_table(PROCESSED_COMMANDS_TABLE)?;

            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            if seq_table.get(SEQUENCE_KEY)?.is_none() {
                seq_table.insert(SEQUENCE_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Begin a read transaction (snapshot for queries)
    pub fn begin_read(&self) -> StorageResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    // ========== Sequence Operations ==========

    /// Current event sequence as seen by this write transaction
    pub fn current_sequence_txn(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        let table = txn.open_table(SEQUENCE_TABLE)?;
        Ok(table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    /// Get current sequence (read-only)
    pub fn get_current_sequence(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SEQUENCE_TABLE)?;
        Ok(table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    /// Set sequence number after the command's events were generated
    pub fn set_sequence(&self, txn: &WriteTransaction, sequence: u64) -> StorageResult<()> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        table.insert(SEQUENCE_KEY, sequence)?;
        Ok(())
    }

    /// Issue the next value of a named id counter (starts at 1)
    pub fn next_id(&self, txn: &WriteTransaction, counter: &str) -> StorageResult<i64> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        let current = table.get(counter)?.map(|guard| guard.value()).unwrap_or(0);
        let next = current + 1;
        table.insert(counter, next)?;
        i64::try_from(next).map_err(|_| StorageError::CounterOverflow(counter.to_string()))
    }

    // ========== Command Idempotency ==========

    /// Check if a command has been processed
    pub fn is_command_processed(&self, command_id: &str) -> StorageResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        Ok(table.get(command_id)?.is_some())
    }

    /// Check if a command has been processed (within transaction)
    pub fn is_command_processed_txn(
        &self,
        txn: &WriteTransaction,
        command_id: &str,
    ) -> StorageResult<bool> {
        let table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        Ok(table.get(command_id)?.is_some())
    }

    /// Mark a command as processed
    pub fn mark_command_processed(
        &self,
        txn: &WriteTransaction,
        command_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        table.insert(command_id, ())?;
        Ok(())
    }

    // ========== Event Operations ==========

    /// Append an event to the audit log
    pub fn store_event(&self, txn: &WriteTransaction, event: &MarketEvent) -> StorageResult<()> {
        let mut table = txn.open_table(EVENTS_TABLE)?;
        let value = serde_json::to_vec(event)?;
        table.insert(event.sequence, value.as_slice())?;
        Ok(())
    }

    /// Get events since a given sequence
    pub fn get_events_since(&self, since_sequence: u64) -> StorageResult<Vec<MarketEvent>> {
        self.begin_read()?.events_since(since_sequence)
    }

    // ========== Entity Writers ==========

    pub fn put_cargo_txn(&self, txn: &WriteTransaction, cargo: &Cargo) -> StorageResult<()> {
        let mut table = txn.open_table(CARGOS_TABLE)?;
        let value = serde_json::to_vec(cargo)?;
        table.insert(cargo.id, value.as_slice())?;
        Ok(())
    }

    /// Insert or update a request, keeping `open_requests` and
    /// `resales_by_source` in step with its status and source link
    pub fn put_request_txn(&self, txn: &WriteTransaction, request: &Request) -> StorageResult<()> {
        let previous: Option<Request> = {
            let mut table = txn.open_table(REQUESTS_TABLE)?;
            let previous = decode(table.get(request.id)?)?;
            let value = serde_json::to_vec(request)?;
            table.insert(request.id, value.as_slice())?;
            previous
        };

        {
            let mut open = txn.open_table(OPEN_REQUESTS_TABLE)?;
            if request.is_open() {
                open.insert(request.id, ())?;
            } else {
                open.remove(request.id)?;
            }
        }

        let mut resales = txn.open_table(RESALES_BY_SOURCE_TABLE)?;
        if let Some(old_source) = previous.and_then(|r| r.source_offer_id)
            && request.source_offer_id != Some(old_source)
        {
            resales.remove((old_source, request.id))?;
        }
        if let Some(source) = request.source_offer_id {
            resales.insert((source, request.id), ())?;
        }
        Ok(())
    }

    /// Insert or update an offer (request and container never change)
    pub fn put_offer_txn(&self, txn: &WriteTransaction, offer: &Offer) -> StorageResult<()> {
        {
            let mut table = txn.open_table(OFFERS_TABLE)?;
            let value = serde_json::to_vec(offer)?;
            table.insert(offer.id, value.as_slice())?;
        }
        {
            let mut by_request = txn.open_table(OFFERS_BY_REQUEST_TABLE)?;
            by_request.insert((offer.request_id, offer.id), ())?;
        }
        let mut by_container = txn.open_table(OFFERS_BY_CONTAINER_TABLE)?;
        by_container.insert((offer.container_id.as_str(), offer.id), ())?;
        Ok(())
    }

    pub fn delete_offer_txn(&self, txn: &WriteTransaction, offer: &Offer) -> StorageResult<()> {
        {
            let mut table = txn.open_table(OFFERS_TABLE)?;
            table.remove(offer.id)?;
        }
        {
            let mut by_request = txn.open_table(OFFERS_BY_REQUEST_TABLE)?;
            by_request.remove((offer.request_id, offer.id))?;
        }
        let mut by_container = txn.open_table(OFFERS_BY_CONTAINER_TABLE)?;
        by_container.remove((offer.container_id.as_str(), offer.id))?;
        Ok(())
    }

    pub fn put_container_txn(
        &self,
        txn: &WriteTransaction,
        container: &Container,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(CONTAINERS_TABLE)?;
        let value = serde_json::to_vec(container)?;
        table.insert(container.id.as_str(), value.as_slice())?;
        Ok(())
    }

    pub fn delete_container_txn(
        &self,
        txn: &WriteTransaction,
        container_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(CONTAINERS_TABLE)?;
        table.remove(container_id)?;
        Ok(())
    }

    pub fn put_container_cargo_txn(
        &self,
        txn: &WriteTransaction,
        row: &ContainerCargo,
    ) -> StorageResult<()> {
        {
            let mut table = txn.open_table(CONTAINER_CARGO_TABLE)?;
            let value = serde_json::to_vec(row)?;
            table.insert(row.id, value.as_slice())?;
        }
        {
            let mut by_container = txn.open_table(CARGO_BY_CONTAINER_TABLE)?;
            by_container.insert((row.container_id.as_str(), row.id), ())?;
        }
        if let Some(offer_id) = row.offer_id() {
            let mut by_offer = txn.open_table(CARGO_BY_OFFER_TABLE)?;
            by_offer.insert(offer_id, row.id)?;
        }
        Ok(())
    }

    pub fn delete_container_cargo_txn(
        &self,
        txn: &WriteTransaction,
        row: &ContainerCargo,
    ) -> StorageResult<()> {
        {
            let mut table = txn.open_table(CONTAINER_CARGO_TABLE)?;
            table.remove(row.id)?;
        }
        {
            let mut by_container = txn.open_table(CARGO_BY_CONTAINER_TABLE)?;
            by_container.remove((row.container_id.as_str(), row.id))?;
        }
        if let Some(offer_id) = row.offer_id() {
            let mut by_offer = txn.open_table(CARGO_BY_OFFER_TABLE)?;
            by_offer.remove(offer_id)?;
        }
        Ok(())
    }

    // ========== Statistics ==========

    /// Get storage statistics
    pub fn get_stats(&self) -> StorageResult<StorageStats> {
        let read_txn = self.db.begin_read()?;

        let requests_table = read_txn.open_table(REQUESTS_TABLE)?;
        let offers_table = read_txn.open_table(OFFERS_TABLE)?;
        let containers_table = read_txn.open_table(CONTAINERS_TABLE)?;
        let open_table = read_txn.open_table(OPEN_REQUESTS_TABLE)?;
        let events_table = read_txn.open_table(EVENTS_TABLE)?;
        let commands_table = read_txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        let seq_table = read_txn.open_table(SEQUENCE_TABLE)?;

        Ok(StorageStats {
            request_count: requests_table.len()?,
            open_request_count: open_table.len()?,
            offer_count: offers_table.len()?,
            container_count: containers_table.len()?,
            event_count: events_table.len()?,
            processed_command_count: commands_table.len()?,
            current_sequence: seq_table
                .get(SEQUENCE_KEY)?
                .map(|guard| guard.value())
                .unwrap_or(0),
        })
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    pub request_count: u64,
    pub open_request_count: u64,
    pub offer_count: u64,
    pub container_count: u64,
    pub event_count: u64,
    pub processed_command_count: u64,
    pub current_sequence: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use shared::models::{
        CargoSource, ContainerSize, ContainerStatus, OfferStatus, RequestStatus, Route,
    };

    fn test_request(id: i64, source_offer_id: Option<i64>) -> Request {
        Request {
            id,
            cargo_id: 1,
            requester_id: 10,
            route: Route::new("Busan", "Rotterdam"),
            deadline: 1_000,
            desired_arrival_date: None,
            trade_type: "EXPORT".to_string(),
            transport_type: "FCL".to_string(),
            status: RequestStatus::Open,
            source_offer_id,
            created_at: 0,
        }
    }

    fn test_offer(id: i64, request_id: i64, container_id: &str) -> Offer {
        Offer {
            id,
            request_id,
            container_id: container_id.to_string(),
            forwarder_id: 20 + id,
            price: Decimal::from(100),
            currency: "USD".to_string(),
            status: OfferStatus::Pending,
            created_at: 0,
        }
    }

    fn test_container(id: &str) -> Container {
        Container {
            id: id.to_string(),
            forwarder_id: 20,
            route: Route::new("Busan", "Rotterdam"),
            etd: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            eta: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            size: ContainerSize::TwentyFoot,
            capacity_cbm: ContainerSize::TwentyFoot.capacity_cbm(),
            imo_number: None,
            status: ContainerStatus::Scheduled,
            created_at: 0,
        }
    }

    #[test]
    fn test_id_counters_are_independent() {
        let storage = FreightStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        assert_eq!(storage.next_id(&txn, REQUEST_ID_KEY).unwrap(), 1);
        assert_eq!(storage.next_id(&txn, REQUEST_ID_KEY).unwrap(), 2);
        assert_eq!(storage.next_id(&txn, OFFER_ID_KEY).unwrap(), 1);
        txn.commit().unwrap();

        let txn = storage.begin_write().unwrap();
        assert_eq!(storage.next_id(&txn, REQUEST_ID_KEY).unwrap(), 3);
    }

    #[test]
    fn test_command_idempotency() {
        let storage = FreightStorage::open_in_memory().unwrap();
        assert!(!storage.is_command_processed("cmd-1").unwrap());

        let txn = storage.begin_write().unwrap();
        storage.mark_command_processed(&txn, "cmd-1").unwrap();
        assert!(storage.is_command_processed_txn(&txn, "cmd-1").unwrap());
        txn.commit().unwrap();

        assert!(storage.is_command_processed("cmd-1").unwrap());
    }

    #[test]
    fn test_request_indices_follow_status_and_source() {
        let storage = FreightStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage.put_request_txn(&txn, &test_request(1, None)).unwrap();
        storage.put_request_txn(&txn, &test_request(2, Some(7))).unwrap();
        assert_eq!(txn.open_request_ids().unwrap(), vec![1, 2]);
        assert_eq!(txn.resale_ids_for_source(7).unwrap(), vec![2]);

        let mut closed = test_request(2, Some(7));
        closed.status = RequestStatus::Closed;
        storage.put_request_txn(&txn, &closed).unwrap();
        assert_eq!(txn.open_request_ids().unwrap(), vec![1]);
        // closed resales stay linked as chain history
        assert_eq!(txn.resale_ids_for_source(7).unwrap(), vec![2]);

        closed.source_offer_id = None;
        storage.put_request_txn(&txn, &closed).unwrap();
        assert!(txn.resale_ids_for_source(7).unwrap().is_empty());
        txn.commit().unwrap();

        let read = storage.begin_read().unwrap();
        assert!(read.get_request(2).unwrap().unwrap().source_offer_id.is_none());
    }

    #[test]
    fn test_offer_indices() {
        let storage = FreightStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage.put_container_txn(&txn, &test_container("SEAU0000001")).unwrap();
        storage.put_offer_txn(&txn, &test_offer(1, 5, "SEAU0000001")).unwrap();
        storage.put_offer_txn(&txn, &test_offer(2, 5, "SEAU0000002")).unwrap();
        storage.put_offer_txn(&txn, &test_offer(3, 6, "SEAU0000001")).unwrap();

        let ids: Vec<i64> = txn.offers_for_request(5).unwrap().iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![1, 2]);
        let ids: Vec<i64> = txn
            .offers_for_container("SEAU0000001")
            .unwrap()
            .iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(ids, vec![1, 3]);

        storage.delete_offer_txn(&txn, &test_offer(1, 5, "SEAU0000001")).unwrap();
        assert_eq!(txn.offers_for_request(5).unwrap().len(), 1);
        assert_eq!(txn.offers_for_container("SEAU0000001").unwrap().len(), 1);
    }

    #[test]
    fn test_container_cargo_indices() {
        let storage = FreightStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let platform = ContainerCargo {
            id: 1,
            container_id: "SEAU0000001".to_string(),
            source: CargoSource::Platform { offer_id: 9 },
            cbm_loaded: Decimal::from(10),
            freight_cost: None,
            freight_currency: None,
            added_at: 0,
        };
        let external = ContainerCargo {
            id: 2,
            container_id: "SEAU0000001".to_string(),
            source: CargoSource::External {
                name: "pallets".to_string(),
            },
            cbm_loaded: Decimal::from(3),
            freight_cost: Some(Decimal::from(50)),
            freight_currency: Some("EUR".to_string()),
            added_at: 0,
        };
        storage.put_container_cargo_txn(&txn, &platform).unwrap();
        storage.put_container_cargo_txn(&txn, &external).unwrap();

        assert_eq!(txn.cargo_rows_for_container("SEAU0000001").unwrap().len(), 2);
        assert_eq!(txn.cargo_row_for_offer(9).unwrap().map(|r| r.id), Some(1));

        storage.delete_container_cargo_txn(&txn, &platform).unwrap();
        assert!(txn.cargo_row_for_offer(9).unwrap().is_none());
        assert_eq!(txn.cargo_rows_for_container("SEAU0000001").unwrap().len(), 1);
    }

    #[test]
    fn test_stats() {
        let storage = FreightStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage.put_request_txn(&txn, &test_request(1, None)).unwrap();
        storage.set_sequence(&txn, 4).unwrap();
        txn.commit().unwrap();

        let stats = storage.get_stats().unwrap();
        assert_eq!(stats.request_count, 1);
        assert_eq!(stats.open_request_count, 1);
        assert_eq!(stats.current_sequence, 4);
        assert_eq!(storage.get_current_sequence().unwrap(), 4);
    }
}
