use std::time::Duration;

use thiserror::Error;

/// Errors a single chat turn can be rejected with.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Unknown model {0}")]
    UnknownBackend(String),

    #[error("A request to {0} is already in flight")]
    Busy(String),
}

/// Failures of a remote model call. None of these are fatal to the session.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Authentication failed ({status}): {body}")]
    Auth { status: u16, body: String },

    #[error("Provider rejected the request ({status}): {body}")]
    Provider { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to parse provider response: {0}")]
    Decode(String),

    #[error("Provider returned no candidates")]
    EmptyResponse,

    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("No model client configured for {0}")]
    Unrouted(String),

    #[error("Invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

impl GatewayError {
    /// Classifies a non-success HTTP status.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::Auth { status, body },
            _ => Self::Provider { status, body },
        }
    }
}
