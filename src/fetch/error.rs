//! Error types for state fetching.

use thiserror::Error;

/// Error type for HTTP operations.
///
/// Describes what went wrong at the transport level without dictating
/// recovery strategy.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Network connection failed.
    ///
    /// This includes DNS resolution failures, connection refused,
    /// and other network-level errors.
    #[error("Connection error: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// The provided URL is invalid.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// No observation could be made for an entity this time.
///
/// Every variant means the same thing to the monitor: skip the entity for
/// the current tick and leave its last known state untouched. The variants
/// only exist so the cause can be logged.
#[derive(Debug, Error)]
pub enum Unavailable {
    /// The request could not be delivered or the response could not be read.
    #[error("transport failure: {0}")]
    Transport(#[source] HttpError),

    /// The device did not answer within the per-call timeout.
    #[error("no response within the fetch timeout")]
    Timeout,

    /// The device answered with a non-success status code.
    #[error("device answered with status {0}")]
    Status(http::StatusCode),

    /// The response body did not carry a usable state value.
    #[error("malformed state payload: {0}")]
    Malformed(String),
}

impl From<HttpError> for Unavailable {
    fn from(error: HttpError) -> Self {
        match error {
            HttpError::Timeout => Self::Timeout,
            other => Self::Transport(other),
        }
    }
}
