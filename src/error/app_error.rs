use crate::models::notification::ErrorKind;
use thiserror::Error;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Authentication failed: {0}")]
    Authentication(String),
    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationErrors),
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Stored session is corrupt: {0}")]
    CorruptSession(String),
    #[error("Navigation to {0} failed")]
    Navigation(String),
    #[error("Configuration error: {message}")]
    ConfigurationError {
        message: String,
        #[source]
        source: Box<figment::Error>,
    },
}

impl AppError {
    pub fn storage(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Storage {
            message: message.into(),
            source,
        }
    }

    pub fn serialization(message: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            message: message.into(),
            source,
        }
    }

    pub fn corrupt_session(message: impl Into<String>) -> Self {
        Self::CorruptSession(message.into())
    }
}

impl From<&AppError> for ErrorKind {
    fn from(e: &AppError) -> Self {
        match e {
            AppError::InvalidCredentials => ErrorKind::Authentication,
            AppError::Authentication(_) => ErrorKind::Authentication,
            AppError::ValidationError(_) => ErrorKind::Validation,
            AppError::Storage { .. } => ErrorKind::Storage,
            AppError::Serialization { .. } => ErrorKind::Storage,
            AppError::CorruptSession(_) => ErrorKind::Session,
            AppError::Navigation(_) => ErrorKind::Navigation,
            AppError::ConfigurationError { .. } => ErrorKind::Configuration,
        }
    }
}

impl From<figment::Error> for AppError {
    fn from(e: figment::Error) -> Self {
        AppError::ConfigurationError {
            message: "Failed to read configuration".to_string(),
            source: Box::new(e),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::serialization("JSON (de)serialization failed", e)
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::storage("I/O failure", e)
    }
}
