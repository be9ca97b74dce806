//! Freight capacity marketplace
//!
//! - **manager**: FreightManager, command processing and read-side queries
//! - **storage**: redb persistence for entities, indices and the event log
//! - **ledger**: per-container capacity arithmetic
//! - **resolver**: resale chain walking
//! - **actions**: one command handler per marketplace operation
//! - **expiry_scheduler**: periodic revert of lapsed resales
//!
//! # Architecture
//!
//! ```text
//! Command → FreightManager → Action (write txn) → Event → Storage (redb)
//!                 ↓
//!             Broadcast → EventRouter → NotificationWorker
//! ```

pub mod actions;
pub mod expiry_scheduler;
pub mod ledger;
pub mod manager;
pub mod resolver;
pub mod storage;
pub mod traits;

// Re-exports
pub use expiry_scheduler::ExpiryScheduler;
pub use ledger::{CapacityLedger, CapacitySummary};
pub use manager::{
    AvailableContainer, ExpiryReport, FreightManager, ManagerError, ManagerResult,
    SYSTEM_ACTOR_ID,
};
pub use resolver::{DEFAULT_MAX_CHAIN_DEPTH, find_final_offer};
pub use storage::{FreightStorage, MarketReader, StorageError, StorageStats};
pub use traits::MarketError;

// Re-export shared types for convenience
pub use shared::freight::{
    CommandError, CommandErrorCode, CommandResponse, EventPayload, FreightCommand,
    FreightCommandPayload, MarketEvent, MarketEventType,
};
