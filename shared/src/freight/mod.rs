//! Freight marketplace command/event types
//!
//! - Commands: requests from callers to change marketplace state
//! - Events: immutable facts recorded after command processing

pub mod command;
pub mod event;

// Re-exports
pub use command::{
    CommandError, CommandErrorCode, CommandResponse, FreightCommand, FreightCommandPayload,
};
pub use event::{EventPayload, MarketEvent, MarketEventType, OfferOutcome};
