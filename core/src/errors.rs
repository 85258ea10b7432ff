use std::time::Duration;
use thiserror::Error;

/// Errors raised while talking to the suggestion or feedback backends
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("Request Error: {0}")]
    RequestError(String),

    #[error("Parsing Error: {0}")]
    ParsingError(String),

    #[error("HTTP Error: {status_code} - {message}")]
    HttpError { status_code: u16, message: String },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

impl ChatError {
    /// True for failures of the exchange itself (network, status, malformed body, timeout).
    ///
    /// A backend that answered with `success: false` is not an error at all and
    /// never reaches this type.
    pub fn is_transport(&self) -> bool {
        !matches!(self, ChatError::ConfigError(_) | ChatError::IoError(_))
    }
}

/// Result type for client operations
pub type ChatResult<T> = Result<T, ChatError>;
