//! Unified error codes for Tally
//!
//! Codes are shared by the sync service and anything rendering its API
//! responses. They are grouped by category:
//! - 0xxx: General errors
//! - 1xxx: Sync errors (configuration, runs, corrections, audit)
//! - 2xxx: Platform errors (external commerce API)
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Represented as u16 on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    Success = 0,
    /// Request parameters rejected
    ValidationFailed = 2,
    NotFound = 3,

    // ==================== 1xxx: Sync ====================
    /// A reconciliation pass for this client is already running
    SyncAlreadyRunning = 1001,
    /// Client has no store settings at all
    SyncConfigMissing = 1002,
    /// Store domain or access token missing
    StoreCredentialsMissing = 1003,
    /// Canonical stock location, or its platform id, not mapped
    LocationNotMapped = 1004,
    /// External item is claimed by more than one SKU
    AliasConflicted = 1005,
    /// SKU has no external item alias
    AliasMissing = 1007,
    AuditAlreadyResolved = 1009,

    // ==================== 2xxx: Platform ====================
    /// Rate limit ceiling reached
    PlatformRateLimited = 2001,
    /// Platform answered 5xx after retries
    PlatformServerError = 2002,
    /// GraphQL query rejected
    PlatformQueryFailed = 2003,
    /// Mutation returned user errors
    PlatformRejected = 2004,
    /// Platform unreachable after retries
    PlatformUnavailable = 2005,
    /// Response could not be decoded
    PlatformInvalidResponse = 2006,

    // ==================== 9xxx: System ====================
    DatabaseError = 9002,
}

impl ErrorCode {
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Default message shown when no more specific one is given
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",

            ErrorCode::SyncAlreadyRunning => "A sync run is already in progress for this client",
            ErrorCode::SyncConfigMissing => "Client has no store settings",
            ErrorCode::StoreCredentialsMissing => "Store credentials are missing",
            ErrorCode::LocationNotMapped => "Canonical stock location is not mapped",
            ErrorCode::AliasConflicted => "External item is shared by several SKUs",
            ErrorCode::AliasMissing => "SKU has no external inventory item",
            ErrorCode::AuditAlreadyResolved => "Audit entry is already resolved",

            ErrorCode::PlatformRateLimited => "Platform rate limit exceeded",
            ErrorCode::PlatformServerError => "Platform server error",
            ErrorCode::PlatformQueryFailed => "Platform query failed",
            ErrorCode::PlatformRejected => "Platform rejected the mutation",
            ErrorCode::PlatformUnavailable => "Platform unavailable",
            ErrorCode::PlatformInvalidResponse => "Invalid response from platform",

            ErrorCode::DatabaseError => "Database error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ErrorCode::Success),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),

            1001 => Ok(ErrorCode::SyncAlreadyRunning),
            1002 => Ok(ErrorCode::SyncConfigMissing),
            1003 => Ok(ErrorCode::StoreCredentialsMissing),
            1004 => Ok(ErrorCode::LocationNotMapped),
            1005 => Ok(ErrorCode::AliasConflicted),
            1007 => Ok(ErrorCode::AliasMissing),
            1009 => Ok(ErrorCode::AuditAlreadyResolved),

            2001 => Ok(ErrorCode::PlatformRateLimited),
            2002 => Ok(ErrorCode::PlatformServerError),
            2003 => Ok(ErrorCode::PlatformQueryFailed),
            2004 => Ok(ErrorCode::PlatformRejected),
            2005 => Ok(ErrorCode::PlatformUnavailable),
            2006 => Ok(ErrorCode::PlatformInvalidResponse),

            9002 => Ok(ErrorCode::DatabaseError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
