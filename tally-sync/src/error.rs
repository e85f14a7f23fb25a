//! Sync error type
//!
//! `SyncError` is what the engine, pusher and scheduler return. The admin API
//! converts it into `AppError`; storage and unexpected platform failures are
//! logged there and never shown to the caller verbatim.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};
use tally_client::ClientError;
use thiserror::Error;

use crate::store::StoreError;

/// Which store setting keeps a client from being synced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigGap {
    /// No store settings row at all
    Settings,
    /// Shop domain or access token
    Credentials,
    /// Canonical location or its platform id
    Location,
}

/// Why a single SKU cannot be pushed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    /// No external item alias
    Unmapped,
    /// Its external item is claimed by other SKUs too
    Conflicted,
}

#[derive(Debug, Error)]
pub enum SyncError {
    /// Client cannot be synced until its store settings are complete
    #[error("Configuration error: {message}")]
    Configuration { gap: ConfigGap, message: String },

    /// Platform call failed for the run as a whole
    #[error("Platform error: {0}")]
    Platform(#[from] ClientError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// A correction could not even be attempted
    #[error("Correction for SKU {sku_id} refused: {reason}")]
    Correction {
        sku_id: i64,
        refusal: Refusal,
        reason: String,
    },

    /// Another pass for this client holds the run lock
    #[error("Sync already running for client {0}")]
    AlreadyRunning(i64),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Audit entry {0} is already resolved")]
    AlreadyResolved(i64),
}

impl SyncError {
    pub fn configuration(gap: ConfigGap, message: impl Into<String>) -> Self {
        Self::Configuration {
            gap,
            message: message.into(),
        }
    }

    /// Structured payload stored on a failed sync log entry
    pub fn to_log_payload(&self) -> serde_json::Value {
        let kind = match self {
            Self::Configuration { .. } => "configuration",
            Self::Platform(_) => "platform",
            Self::Storage(_) => "storage",
            Self::Correction { .. } => "correction",
            Self::AlreadyRunning(_) => "already_running",
            Self::NotFound(_) => "not_found",
            Self::AlreadyResolved(_) => "already_resolved",
        };
        serde_json::json!({ "kind": kind, "message": self.to_string() })
    }
}

fn platform_code(err: &ClientError) -> ErrorCode {
    match err {
        ClientError::RateLimited { .. } => ErrorCode::PlatformRateLimited,
        ClientError::Server { .. } => ErrorCode::PlatformServerError,
        ClientError::GraphQl { .. } => ErrorCode::PlatformQueryFailed,
        ClientError::UserErrors(_) => ErrorCode::PlatformRejected,
        ClientError::Transport(_) => ErrorCode::PlatformUnavailable,
        ClientError::InvalidResponse(_) | ClientError::Serialization(_) => {
            ErrorCode::PlatformInvalidResponse
        }
    }
}

impl From<SyncError> for AppError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Configuration { gap, message } => {
                let code = match gap {
                    ConfigGap::Settings => ErrorCode::SyncConfigMissing,
                    ConfigGap::Credentials => ErrorCode::StoreCredentialsMissing,
                    ConfigGap::Location => ErrorCode::LocationNotMapped,
                };
                AppError::with_message(code, message)
            }
            SyncError::Platform(err) => {
                tracing::warn!(error = %err, "Platform error surfaced to API");
                AppError::new(platform_code(&err))
            }
            SyncError::Storage(err) => {
                tracing::error!(error = %err, "Sync storage error");
                AppError::new(ErrorCode::DatabaseError)
            }
            SyncError::Correction {
                sku_id,
                refusal,
                reason,
            } => {
                let code = match refusal {
                    Refusal::Unmapped => ErrorCode::AliasMissing,
                    Refusal::Conflicted => ErrorCode::AliasConflicted,
                };
                AppError::with_message(code, reason).with_detail("sku_id", sku_id)
            }
            SyncError::AlreadyRunning(client_id) => AppError::new(ErrorCode::SyncAlreadyRunning)
                .with_detail("client_id", client_id),
            SyncError::NotFound(what) => AppError::not_found(what),
            SyncError::AlreadyResolved(id) => {
                AppError::new(ErrorCode::AuditAlreadyResolved).with_detail("audit_id", id)
            }
        }
    }
}

impl IntoResponse for SyncError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
