//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound
            | Self::RequestNotFound
            | Self::OfferNotFound
            | Self::ContainerNotFound
            | Self::CargoNotFound => StatusCode::NOT_FOUND,

            // 403 Forbidden
            Self::PermissionDenied | Self::NotResourceOwner => StatusCode::FORBIDDEN,

            // 409 Conflict
            Self::AlreadyExists
            | Self::RequestClosed
            | Self::DuplicateBid
            | Self::InvalidOfferStatus
            | Self::InvalidContainerStatus
            | Self::ContainerNotDeletable => StatusCode::CONFLICT,

            // 422 Unprocessable Entity
            Self::CapacityExceeded | Self::RequestExpired => StatusCode::UNPROCESSABLE_ENTITY,

            // 503 Service Unavailable (transient, client can retry)
            Self::SystemBusy => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            Self::Unknown
            | Self::InternalError
            | Self::DatabaseError
            | Self::ConfigError
            | Self::ChainCorrupted
            | Self::StorageFull
            | Self::OutOfMemory
            | Self::StorageCorrupted => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request (default for validation errors)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_distinct_from_forbidden() {
        assert_eq!(ErrorCode::OfferNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::NotResourceOwner.http_status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_state_conflicts() {
        assert_eq!(ErrorCode::RequestClosed.http_status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::DuplicateBid.http_status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::CapacityExceeded.http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_system_errors() {
        assert_eq!(
            ErrorCode::ChainCorrupted.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCode::SystemBusy.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ErrorCode::ValidationFailed.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::NotResaleRequest.http_status(),
            StatusCode::BAD_REQUEST
        );
    }
}
