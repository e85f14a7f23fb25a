//! Client error types

use crate::types::UserError;
use thiserror::Error;

/// Error code the platform attaches to "item not stocked at location" failures
pub const NOT_STOCKED_CODE: &str = "ITEM_NOT_STOCKED_AT_LOCATION";

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// 429 on every attempt
    #[error("Rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    /// 5xx on every attempt
    #[error("Server error {status} after {attempts} attempts")]
    Server { status: u16, attempts: u32 },

    /// Query rejected (GraphQL `errors` list or a non-retryable HTTP status)
    #[error("GraphQL error: {message} (query: {query_excerpt})")]
    GraphQl {
        message: String,
        code: Option<String>,
        query_excerpt: String,
    },

    /// Mutation accepted but returned `userErrors`
    #[error("User errors: {}", join_messages(.0))]
    UserErrors(Vec<UserError>),

    /// Request never got a response
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Worth retrying later with the same input
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Server { .. } | Self::Transport(_)
        )
    }

    /// The inventory item is not stocked at the target location
    pub fn is_not_stocked(&self) -> bool {
        match self {
            Self::UserErrors(errors) => errors.iter().any(UserError::is_not_stocked),
            Self::GraphQl { message, code, .. } => {
                code.as_deref() == Some(NOT_STOCKED_CODE) || mentions_not_stocked(message)
            }
            _ => false,
        }
    }
}

pub(crate) fn mentions_not_stocked(message: &str) -> bool {
    message.to_ascii_lowercase().contains("not stocked")
}

fn join_messages(errors: &[UserError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn user_error(message: &str, code: Option<&str>) -> UserError {
        UserError {
            field: Some(vec!["input".into(), "quantities".into(), "0".into()]),
            message: message.to_string(),
            code: code.map(str::to_string),
        }
    }

    #[test]
    fn transient_errors() {
        assert!(ClientError::RateLimited { attempts: 3 }.is_transient());
        assert!(ClientError::Server { status: 502, attempts: 3 }.is_transient());
        assert!(!ClientError::InvalidResponse("x".into()).is_transient());
        assert!(!ClientError::UserErrors(vec![]).is_transient());
    }

    #[test]
    fn not_stocked_by_code_or_message() {
        let by_code = ClientError::UserErrors(vec![user_error("nope", Some(NOT_STOCKED_CODE))]);
        assert!(by_code.is_not_stocked());

        let by_message = ClientError::UserErrors(vec![user_error(
            "The specified inventory item is not stocked at the location.",
            None,
        )]);
        assert!(by_message.is_not_stocked());

        let other = ClientError::UserErrors(vec![user_error("Quantity is invalid", Some("INVALID"))]);
        assert!(!other.is_not_stocked());
    }

    #[test]
    fn user_errors_display_joins_messages() {
        let err = ClientError::UserErrors(vec![user_error("a", None), user_error("b", None)]);
        assert_eq!(err.to_string(), "User errors: a; b");
    }
}
