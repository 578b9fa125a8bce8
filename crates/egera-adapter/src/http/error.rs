/*
[INPUT]:  Error sources (HTTP, API, serialization, WebSocket, subscriptions)
[OUTPUT]: Structured error types with context and retry hints
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or improving error messages
*/

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for the Egera adapter
#[derive(Error, Debug)]
pub enum EgeraError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response
    #[error("API error (code {code}): {message}")]
    Api { code: i32, message: String },

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// No live connection to send on
    #[error("WebSocket not connected")]
    NotConnected,

    /// `connect` called on an adapter that already owns a connection
    #[error("WebSocket already connected")]
    AlreadyConnected,

    /// A private credential required by the request is not configured
    #[error("Missing credential: {0}")]
    MissingCredentials(&'static str),

    /// Unified symbol not present in the loaded markets
    #[error("Unknown symbol: {0}")]
    BadSymbol(String),

    /// Waiting for a message hash took too long
    #[error("Timed out after {duration}ms waiting for {message_hash}")]
    Timeout { message_hash: String, duration: u64 },

    /// The subscription was torn down while a caller was waiting on it
    #[error("Unsubscribed from {0}")]
    Unsubscribed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EgeraError {
    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EgeraError::Http(_)
                | EgeraError::Timeout { .. }
                | EgeraError::WebSocket(_)
                | EgeraError::NotConnected
        )
    }

    /// Create an API error from status code and message
    pub fn api_error(status: StatusCode, message: impl Into<String>) -> Self {
        EgeraError::Api {
            code: status.as_u16() as i32,
            message: message.into(),
        }
    }
}

/// Result type alias for Egera operations
pub type Result<T> = std::result::Result<T, EgeraError>;
