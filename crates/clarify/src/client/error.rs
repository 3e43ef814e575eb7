use crate::decisions::{DecisionInputError, SuggestionError};
use crate::error::ErrorKind;

/// Failure of a client operation, tagged so callers can react by kind.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    #[error("network error: {message}")]
    Network { message: String },

    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("unexpected response: {message}")]
    UnexpectedResponse { message: String },

    /// Rejected input. `status` is `None` when the client refused to send it.
    #[error("{message}")]
    Validation {
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },

    #[error("{operation} is already in progress")]
    InFlight { operation: String },

    #[error("{message}")]
    Auth { message: String },

    #[error("{message}")]
    Domain { code: String, message: String },
}

impl ClientError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. }
            | Self::Timeout { .. }
            | Self::Server { .. }
            | Self::UnexpectedResponse { .. } => ErrorKind::Network,
            Self::Validation { .. } | Self::InFlight { .. } => ErrorKind::Validation,
            Self::Auth { .. } => ErrorKind::Auth,
            Self::Domain { .. } => ErrorKind::Domain,
        }
    }

    /// Whether repeating the same call later could succeed. The client never
    /// retries on its own.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Timeout { .. } | Self::Server { .. }
        )
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Validation { code, .. } => code.as_deref(),
            Self::Domain { code, .. } => Some(code),
            _ => None,
        }
    }

    pub(crate) fn local(code: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            status: None,
            code: Some(code.to_string()),
            message: message.into(),
        }
    }
}

impl From<DecisionInputError> for ClientError {
    fn from(value: DecisionInputError) -> Self {
        Self::local(value.code(), value.to_string())
    }
}

impl From<SuggestionError> for ClientError {
    fn from(value: SuggestionError) -> Self {
        match value {
            SuggestionError::NoOptions => Self::Domain {
                code: value.code().to_string(),
                message: value.to_string(),
            },
            other => Self::local(other.code(), other.to_string()),
        }
    }
}
