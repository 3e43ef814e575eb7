use crate::client::ClientError;
use crate::config::ConfigError;
use crate::decisions::{MatrixImportError, ScoringError};
use crate::telemetry::TelemetryError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Client(ClientError),
    Matrix(MatrixImportError),
    Scoring(ScoringError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Client(err) => write!(f, "client error: {}", err),
            AppError::Matrix(err) => write!(f, "matrix error: {}", err),
            AppError::Scoring(err) => write!(f, "scoring error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Client(err) => Some(err),
            AppError::Matrix(err) => Some(err),
            AppError::Scoring(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error = match self {
            AppError::Matrix(err) => ApiError::validation("invalid_matrix", err.to_string()),
            AppError::Scoring(err) => ApiError::domain(err.code(), err.to_string()),
            other => ApiError::internal(other.to_string()),
        };
        error.into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<ClientError> for AppError {
    fn from(value: ClientError) -> Self {
        Self::Client(value)
    }
}

impl From<ScoringError> for AppError {
    fn from(value: ScoringError) -> Self {
        Self::Scoring(value)
    }
}

impl From<MatrixImportError> for AppError {
    fn from(value: MatrixImportError) -> Self {
        Self::Matrix(value)
    }
}

/// Storage failures shared by the user and decision repositories.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Error classes a caller can act on differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Validation,
    Auth,
    Domain,
}

impl ErrorKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Validation => "validation",
            Self::Auth => "auth",
            Self::Domain => "domain",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// JSON error payload returned by every API route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// HTTP-facing error: a status plus the [`ErrorBody`] sent to the caller.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    fn new(
        status: StatusCode,
        kind: Option<ErrorKind>,
        code: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            body: ErrorBody {
                message: message.into(),
                kind,
                code: code.map(str::to_string),
            },
        }
    }

    pub fn validation(code: &str, message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            Some(ErrorKind::Validation),
            Some(code),
            message,
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            Some(ErrorKind::Validation),
            Some("not_found"),
            message,
        )
    }

    pub fn conflict(code: &str, message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::CONFLICT,
            Some(ErrorKind::Validation),
            Some(code),
            message,
        )
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            Some(ErrorKind::Auth),
            Some("unauthorized"),
            message,
        )
    }

    pub fn domain(code: &str, message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            Some(ErrorKind::Domain),
            Some(code),
            message,
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, None, None, message)
    }
}

impl From<RepositoryError> for ApiError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound => ApiError::not_found("record not found"),
            RepositoryError::Conflict => ApiError::conflict("conflict", value.to_string()),
            RepositoryError::Unavailable(_) => ApiError::internal(value.to_string()),
        }
    }
}

/// Malformed or mistyped request bodies are validation failures, not domain ones.
impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        ApiError::validation("invalid_body", value.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
