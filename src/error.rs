//! Unified application error model and mapping helpers.
//! Every façade, authorization and compiler path returns `AppError`; the REST boundary
//! (not part of this crate) maps it to HTTP via `http_status`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    #[error("{code}: {message}")]
    MalformedIdentity { code: String, message: String },
    #[error("{code}: {message}")]
    ValidationError { code: String, message: String },
    #[error("{code}: {message}")]
    Conflict { code: String, message: String },
    #[error("{code}: {message}")]
    NotFound { code: String, message: String },
    #[error("{code}: {message}")]
    Forbidden { code: String, message: String },
    #[error("{code}: {message}")]
    UnsupportedCategory { code: String, message: String },
    #[error("{code}: {message}")]
    BackendUnavailable { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::MalformedIdentity { code, .. }
            | AppError::ValidationError { code, .. }
            | AppError::Conflict { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Forbidden { code, .. }
            | AppError::UnsupportedCategory { code, .. }
            | AppError::BackendUnavailable { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::MalformedIdentity { message, .. }
            | AppError::ValidationError { message, .. }
            | AppError::Conflict { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Forbidden { message, .. }
            | AppError::UnsupportedCategory { message, .. }
            | AppError::BackendUnavailable { message, .. } => message.as_str(),
        }
    }

    pub fn malformed<S: Into<String>>(code: S, msg: S) -> Self { AppError::MalformedIdentity { code: code.into(), message: msg.into() } }
    pub fn validation<S: Into<String>>(code: S, msg: S) -> Self { AppError::ValidationError { code: code.into(), message: msg.into() } }
    pub fn conflict<S: Into<String>>(code: S, msg: S) -> Self { AppError::Conflict { code: code.into(), message: msg.into() } }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn forbidden<S: Into<String>>(code: S, msg: S) -> Self { AppError::Forbidden { code: code.into(), message: msg.into() } }
    pub fn unsupported<S: Into<String>>(code: S, msg: S) -> Self { AppError::UnsupportedCategory { code: code.into(), message: msg.into() } }
    pub fn unavailable<S: Into<String>>(code: S, msg: S) -> Self { AppError::BackendUnavailable { code: code.into(), message: msg.into() } }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::MalformedIdentity { .. } => 400,
            AppError::ValidationError { .. } => 400,
            AppError::Conflict { .. } => 409,
            AppError::NotFound { .. } => 404,
            AppError::Forbidden { .. } => 403,
            AppError::UnsupportedCategory { .. } => 400,
            AppError::BackendUnavailable { .. } => 503,
        }
    }

    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self, AppError::BackendUnavailable { .. })
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // Edge failures (snapshot IO, config files) surface as an unavailable backend
        AppError::BackendUnavailable { code: "backend_io".into(), message: format!("{:#}", err) }
    }
}
