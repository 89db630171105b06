//! Error types for the queue client.
//!
//! Uses `thiserror` for typed errors that surface through every client
//! operation: HTTP transport, backend rejections, decoding, validation,
//! credential storage, and configuration.

/// Errors that can occur while talking to the queue backend.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never got a response (connection refused, timeout, TLS).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Server {
        /// HTTP status code.
        status: u16,
        /// Message from the backend's error body, if it sent one.
        message: Option<String>,
    },

    /// A success response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The request was rejected locally before being sent.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Reading or writing persisted credentials failed.
    #[error("credential store error: {0}")]
    Storage(String),

    /// Configuration is invalid.
    #[error("config error: {0}")]
    Config(String),
}

impl ClientError {
    /// The message the backend supplied with a rejection, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Server {
                message: Some(message),
                ..
            } => Some(message),
            _ => None,
        }
    }

    /// HTTP status of a backend rejection.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors that end one push-feed connection.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// The WebSocket handshake or stream failed.
    #[error("websocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    /// The gateway refused the namespace connection.
    #[error("gateway refused connection: {0}")]
    Refused(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(error))
    }
}
