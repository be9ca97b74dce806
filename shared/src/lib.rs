//! Shared types for the freight marketplace
//!
//! Common types used by the engine and by outer layers (HTTP, chat,
//! notifications): entity models, command/event envelopes, error codes.

pub mod error;
pub mod freight;
pub mod models;
pub mod util;

// Re-exports
pub use http;
pub use rust_decimal::Decimal;
pub use serde::{Deserialize, Serialize};

pub use error::{AppError, AppResult, ErrorCode};
pub use freight::{CommandResponse, FreightCommand, FreightCommandPayload, MarketEvent};
