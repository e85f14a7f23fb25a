//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,

            Self::ValidationFailed => StatusCode::BAD_REQUEST,

            Self::NotFound => StatusCode::NOT_FOUND,

            Self::SyncAlreadyRunning | Self::AliasConflicted | Self::AuditAlreadyResolved => {
                StatusCode::CONFLICT
            }

            // Client is known but cannot be synced until configured
            Self::SyncConfigMissing
            | Self::StoreCredentialsMissing
            | Self::LocationNotMapped
            | Self::AliasMissing => StatusCode::UNPROCESSABLE_ENTITY,

            // Upstream answered but not usefully
            Self::PlatformServerError
            | Self::PlatformQueryFailed
            | Self::PlatformRejected
            | Self::PlatformInvalidResponse => StatusCode::BAD_GATEWAY,

            // Transient, caller can retry
            Self::PlatformRateLimited | Self::PlatformUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            Self::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_status() {
        assert_eq!(ErrorCode::NotFound.http_status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_conflict_status() {
        assert_eq!(
            ErrorCode::SyncAlreadyRunning.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ErrorCode::AuditAlreadyResolved.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ErrorCode::AliasConflicted.http_status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_configuration_status() {
        assert_eq!(
            ErrorCode::StoreCredentialsMissing.http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ErrorCode::AliasMissing.http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_platform_status() {
        assert_eq!(
            ErrorCode::PlatformRateLimited.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ErrorCode::PlatformQueryFailed.http_status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_internal_error_status() {
        assert_eq!(
            ErrorCode::DatabaseError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCode::ValidationFailed.http_status(),
            StatusCode::BAD_REQUEST
        );
    }
}
