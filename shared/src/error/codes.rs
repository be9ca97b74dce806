//! Unified error codes for the freight marketplace
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 2xxx: Permission errors
//! - 4xxx: Request errors
//! - 5xxx: Offer errors
//! - 6xxx: Container errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Actor does not own the resource
    NotResourceOwner = 2002,

    // ==================== 4xxx: Request ====================
    /// Transport request not found
    RequestNotFound = 4001,
    /// Transport request is no longer open
    RequestClosed = 4002,
    /// Bidding deadline has passed
    RequestExpired = 4003,
    /// Operation requires a resale request
    NotResaleRequest = 4004,
    /// Operation requires an original request
    NotOriginalRequest = 4005,

    // ==================== 5xxx: Offer ====================
    /// Offer not found
    OfferNotFound = 5001,
    /// Offer status does not allow this operation
    InvalidOfferStatus = 5002,
    /// Forwarder already bid on this request
    DuplicateBid = 5003,
    /// Offer does not belong to the request
    OfferRequestMismatch = 5004,

    // ==================== 6xxx: Container ====================
    /// Container not found
    ContainerNotFound = 6001,
    /// Container capacity would be exceeded
    CapacityExceeded = 6002,
    /// Container status does not allow this operation
    InvalidContainerStatus = 6003,
    /// Container still carries cargo
    ContainerNotDeletable = 6004,
    /// Unsupported container size
    InvalidContainerSize = 6005,
    /// Loaded cargo row not found
    CargoNotFound = 6006,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9005,
    /// Resale chain cannot be resolved (corrupted history)
    ChainCorrupted = 9006,

    // Storage
    /// Storage is full
    StorageFull = 9401,
    /// Out of memory
    OutOfMemory = 9402,
    /// Storage corrupted
    StorageCorrupted = 9403,
    /// System busy, retry later
    SystemBusy = 9404,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::NotResourceOwner => "Only the owner may perform this operation",

            // Request
            ErrorCode::RequestNotFound => "Transport request not found",
            ErrorCode::RequestClosed => "Transport request is already closed",
            ErrorCode::RequestExpired => "Bidding deadline has passed",
            ErrorCode::NotResaleRequest => "Transport request is not a resale",
            ErrorCode::NotOriginalRequest => "Transport request is a resale",

            // Offer
            ErrorCode::OfferNotFound => "Offer not found",
            ErrorCode::InvalidOfferStatus => "Offer status does not allow this operation",
            ErrorCode::DuplicateBid => "An offer was already submitted for this request",
            ErrorCode::OfferRequestMismatch => "Offer does not belong to this request",

            // Container
            ErrorCode::ContainerNotFound => "Container not found",
            ErrorCode::CapacityExceeded => "Container capacity exceeded",
            ErrorCode::InvalidContainerStatus => "Container status does not allow this operation",
            ErrorCode::ContainerNotDeletable => "Container still carries cargo",
            ErrorCode::InvalidContainerSize => "Container size must be 20ft or 40ft",
            ErrorCode::CargoNotFound => "Loaded cargo not found",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::ChainCorrupted => "Resale chain could not be resolved",
            ErrorCode::StorageFull => "Storage is full",
            ErrorCode::OutOfMemory => "Out of memory",
            ErrorCode::StorageCorrupted => "Storage is corrupted",
            ErrorCode::SystemBusy => "System is busy, please retry",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an unknown u16 into an [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2002 => Ok(ErrorCode::NotResourceOwner),

            // Request
            4001 => Ok(ErrorCode::RequestNotFound),
            4002 => Ok(ErrorCode::RequestClosed),
            4003 => Ok(ErrorCode::RequestExpired),
            4004 => Ok(ErrorCode::NotResaleRequest),
            4005 => Ok(ErrorCode::NotOriginalRequest),

            // Offer
            5001 => Ok(ErrorCode::OfferNotFound),
            5002 => Ok(ErrorCode::InvalidOfferStatus),
            5003 => Ok(ErrorCode::DuplicateBid),
            5004 => Ok(ErrorCode::OfferRequestMismatch),

            // Container
            6001 => Ok(ErrorCode::ContainerNotFound),
            6002 => Ok(ErrorCode::CapacityExceeded),
            6003 => Ok(ErrorCode::InvalidContainerStatus),
            6004 => Ok(ErrorCode::ContainerNotDeletable),
            6005 => Ok(ErrorCode::InvalidContainerSize),
            6006 => Ok(ErrorCode::CargoNotFound),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9005 => Ok(ErrorCode::ConfigError),
            9006 => Ok(ErrorCode::ChainCorrupted),

            // Storage
            9401 => Ok(ErrorCode::StorageFull),
            9402 => Ok(ErrorCode::OutOfMemory),
            9403 => Ok(ErrorCode::StorageCorrupted),
            9404 => Ok(ErrorCode::SystemBusy),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
