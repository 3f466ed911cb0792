//! Error types for the Convore client.

use crate::types::ApiError;
use thiserror::Error;

/// Error for invalid HTTP header configuration.
#[derive(Debug, Clone, Error)]
pub enum InvalidHeaderError {
    #[error("invalid header name: {0}")]
    InvalidName(String),
    #[error("invalid header value: {0}")]
    InvalidValue(String),
}

/// A parameter rejected before any request was made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    #[error("a valid {param} is required")]
    InvalidId { param: &'static str },

    #[error("the parameter `{param}` is empty, a value is required")]
    Empty { param: &'static str },
}

impl ParameterError {
    /// Name of the offending parameter.
    pub fn param(&self) -> &'static str {
        match self {
            ParameterError::InvalidId { param } | ParameterError::Empty { param } => param,
        }
    }
}

/// Main error type for client operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unauthorized: {0}")]
    Unauthorized(ApiError),

    #[error("request to {target} failed with status {status}")]
    HardFailure { status: u16, target: String },

    #[error("gave up on {target} after {redirects} redirects")]
    TooManyRedirects { target: String, redirects: u32 },

    #[error("invalid parameter: {0}")]
    Parameter(#[from] ParameterError),

    #[error("invalid request target: {0}")]
    InvalidTarget(String),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid header: {0}")]
    InvalidHeader(#[from] InvalidHeaderError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("timeout")]
    Timeout,

    #[error("json error: {0}")]
    Json(String),
}

impl Error {
    /// HTTP status code if applicable
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Unauthorized(err) => Some(err.code),
            Error::HardFailure { status, .. } => Some(*status),
            Error::Network(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the server rejected our credentials.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Unauthorized(_))
    }

    /// Whether the error was raised locally, before any network I/O.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Error::Parameter(_)
                | Error::InvalidTarget(_)
                | Error::InvalidUrl(_)
                | Error::InvalidHeader(_)
                | Error::Config(_)
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else {
            Error::Network(err)
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err.to_string())
    }
}
