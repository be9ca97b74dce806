//! Marketplace commands - requests from callers to change engine state

use crate::error::{AppError, ErrorCode};
use crate::models::{ContainerCreate, ExternalCargoCreate, RequestCreate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Marketplace command envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreightCommand {
    /// Unique command ID (idempotency key)
    pub command_id: String,
    /// Opaque identity of the caller, supplied by the auth layer
    pub actor_id: i64,
    /// Command time (Unix millis); deadlines are evaluated against it
    pub timestamp: i64,
    pub payload: FreightCommandPayload,
}

impl FreightCommand {
    /// Create a command stamped with a fresh ID and the current time
    pub fn new(actor_id: i64, payload: FreightCommandPayload) -> Self {
        Self {
            command_id: uuid::Uuid::new_v4().to_string(),
            actor_id,
            timestamp: crate::util::now_millis(),
            payload,
        }
    }

    /// Override the command time (scheduler sweeps, replays, tests)
    pub fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Command payload variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FreightCommandPayload {
    // ========== Requests ==========
    /// Shipper posts cargo and opens an original request for it
    CreateRequest { request: RequestCreate },
    /// Shipper picks the winner of an original request
    ConfirmOffer { request_id: i64, offer_id: i64 },
    /// Reseller picks the winner of a resale request
    ConfirmBid { request_id: i64, offer_id: i64 },
    /// Winning forwarder relists its won capacity
    Resell { offer_id: i64 },
    /// Reseller withdraws an open resale listing
    CancelResale { request_id: i64 },
    /// Scheduler reverts a resale listing whose deadline passed
    ExpireResale { request_id: i64 },

    // ========== Offers ==========
    CreateOffer {
        request_id: i64,
        container_id: String,
        price: Decimal,
        currency: String,
    },
    UpdateOfferPrice {
        offer_id: i64,
        price: Decimal,
        currency: String,
    },
    /// Forwarder withdraws a pending bid
    CancelOffer { offer_id: i64 },

    // ========== Containers ==========
    CreateContainer { container: ContainerCreate },
    AddExternalCargo {
        container_id: String,
        cargo: ExternalCargoCreate,
    },
    RemoveExternalCargo { cargo_id: i64 },
    ConfirmContainer {
        container_id: String,
        #[serde(default)]
        imo_number: Option<String>,
    },
    ShipContainer { container_id: String },
    CompleteShipment { container_id: String },
    SettleContainer { container_id: String },
    DeleteContainer { container_id: String },
}

impl FreightCommandPayload {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRequest { .. } => "CreateRequest",
            Self::ConfirmOffer { .. } => "ConfirmOffer",
            Self::ConfirmBid { .. } => "ConfirmBid",
            Self::Resell { .. } => "Resell",
            Self::CancelResale { .. } => "CancelResale",
            Self::ExpireResale { .. } => "ExpireResale",
            Self::CreateOffer { .. } => "CreateOffer",
            Self::UpdateOfferPrice { .. } => "UpdateOfferPrice",
            Self::CancelOffer { .. } => "CancelOffer",
            Self::CreateContainer { .. } => "CreateContainer",
            Self::AddExternalCargo { .. } => "AddExternalCargo",
            Self::RemoveExternalCargo { .. } => "RemoveExternalCargo",
            Self::ConfirmContainer { .. } => "ConfirmContainer",
            Self::ShipContainer { .. } => "ShipContainer",
            Self::CompleteShipment { .. } => "CompleteShipment",
            Self::SettleContainer { .. } => "SettleContainer",
            Self::DeleteContainer { .. } => "DeleteContainer",
        }
    }
}

/// Command response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    /// The command ID this responds to
    pub command_id: String,
    /// Whether the command succeeded
    pub success: bool,
    /// ID of the entity the command created or acted on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    /// Error details if failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandError>,
}

impl CommandResponse {
    pub fn success(command_id: String, resource_id: Option<String>) -> Self {
        Self {
            command_id,
            success: true,
            resource_id,
            error: None,
        }
    }

    pub fn error(command_id: String, error: CommandError) -> Self {
        Self {
            command_id,
            success: false,
            resource_id: None,
            error: Some(error),
        }
    }

    pub fn duplicate(command_id: String) -> Self {
        Self {
            command_id,
            success: true,
            resource_id: None,
            error: None,
        }
    }
}

/// Command error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandError {
    pub code: CommandErrorCode,
    pub message: String,
}

impl CommandError {
    pub fn new(code: CommandErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Command error codes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandErrorCode {
    RequestNotFound,
    OfferNotFound,
    ContainerNotFound,
    CargoNotFound,
    Forbidden,
    InvalidState,
    AlreadyClosed,
    CapacityExceeded,
    DuplicateBid,
    ValidationFailed,
    ChainCorrupted,
    InternalError,
    // Storage errors (maps to ErrorCode 94xx)
    StorageFull,
    OutOfMemory,
    StorageCorrupted,
    SystemBusy,
}

impl CommandErrorCode {
    /// Unified error code for the API layer
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::RequestNotFound => ErrorCode::RequestNotFound,
            Self::OfferNotFound => ErrorCode::OfferNotFound,
            Self::ContainerNotFound => ErrorCode::ContainerNotFound,
            Self::CargoNotFound => ErrorCode::CargoNotFound,
            Self::Forbidden => ErrorCode::NotResourceOwner,
            Self::InvalidState => ErrorCode::InvalidRequest,
            Self::AlreadyClosed => ErrorCode::RequestClosed,
            Self::CapacityExceeded => ErrorCode::CapacityExceeded,
            Self::DuplicateBid => ErrorCode::DuplicateBid,
            Self::ValidationFailed => ErrorCode::ValidationFailed,
            Self::ChainCorrupted => ErrorCode::ChainCorrupted,
            Self::InternalError => ErrorCode::InternalError,
            Self::StorageFull => ErrorCode::StorageFull,
            Self::OutOfMemory => ErrorCode::OutOfMemory,
            Self::StorageCorrupted => ErrorCode::StorageCorrupted,
            Self::SystemBusy => ErrorCode::SystemBusy,
        }
    }
}

impl From<CommandError> for AppError {
    fn from(err: CommandError) -> Self {
        AppError::with_message(err.code.error_code(), err.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_payload_tagging() {
        let payload = FreightCommandPayload::ConfirmOffer {
            request_id: 7,
            offer_id: 9,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "CONFIRM_OFFER");
        assert_eq!(json["request_id"], 7);
        assert_eq!(payload.name(), "ConfirmOffer");
    }

    #[test]
    fn test_command_new_assigns_unique_ids() {
        let a = FreightCommand::new(1, FreightCommandPayload::Resell { offer_id: 1 });
        let b = FreightCommand::new(1, FreightCommandPayload::Resell { offer_id: 1 });
        assert_ne!(a.command_id, b.command_id);
        assert_eq!(a.at(42).timestamp, 42);
    }

    #[test]
    fn test_command_error_into_app_error() {
        let err: AppError =
            CommandError::new(CommandErrorCode::AlreadyClosed, "Request 3 is CLOSED").into();
        assert_eq!(err.code, ErrorCode::RequestClosed);
        assert_eq!(err.http_status(), StatusCode::CONFLICT);

        let err: AppError = CommandError::new(CommandErrorCode::Forbidden, "nope").into();
        assert_eq!(err.http_status(), StatusCode::FORBIDDEN);
    }
}
