use std::{mem::discriminant, sync::Arc};

use thiserror::Error;
use tokio_tungstenite::tungstenite;

use crate::{stream::ConnectionState, types::FeedResult};

/// Errors produced by the fetcher, the cursor scanner and the streaming connection.
///
/// Fetch failures surfaced on an [`EventSubscription`](crate::EventSubscription) are not terminal:
/// the scanner retries the same window on its next cycle. Streaming errors are handed to
/// [`EventHandler::on_error`](crate::stream::EventHandler::on_error).
#[derive(Error, Debug, Clone)]
pub enum FeedError {
    /// The HTTP client failed before a response body could be read.
    #[error("HTTP error: {0}")]
    Http(Arc<reqwest::Error>),

    /// A transport collaborator reported a failure (connection refused, reset, truncated body).
    #[error("transport error: {0}")]
    Transport(String),

    /// A request or handshake did not complete in time.
    #[error("Operation timed out")]
    Timeout,

    /// A response or frame could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// A request could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),

    /// The service answered with a non-success application code.
    #[error("error getting events: {message} (code {code})")]
    Api { code: i64, message: String },

    /// Every attempt failed with a retryable error; `source` is the last one observed.
    #[error("request failed after {attempts} attempts: {source}")]
    RetriesExhausted { attempts: usize, source: Box<FeedError> },

    /// A streaming frame carried an unknown tag or lacked a required field.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The streaming service reported a failure through an `error` frame.
    #[error("server error: {0}")]
    Server(String),

    /// The underlying websocket failed.
    #[error("WebSocket error: {0}")]
    WebSocket(Arc<tungstenite::Error>),

    /// The peer closed the streaming connection with an unexpected close code.
    #[error("connection closed unexpectedly (code {code:?}): {reason}")]
    ConnectionClosed { code: Option<u16>, reason: String },

    /// A send was attempted on a connection that is not in the `Connected` state.
    #[error("websocket not connected")]
    NotConnected,

    /// A lifecycle operation was attempted from the wrong connection state.
    #[error("invalid connection state: {0:?}")]
    InvalidState(ConnectionState),

    /// The flow-control counterpart was dropped.
    #[error("flow control channel closed")]
    FlowControlClosed,

    #[error("Page size must be greater than 0")]
    InvalidPageSize,

    #[error("Window span must be greater than 0")]
    InvalidWindowSpan,

    #[error("Poll interval must be greater than 0")]
    InvalidPollInterval,

    #[error("Max attempts must be greater than 0")]
    InvalidMaxAttempts,

    #[error("Buffer capacity must be greater than 0")]
    InvalidBufferCapacity,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for FeedError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() { FeedError::Timeout } else { FeedError::Http(Arc::new(error)) }
    }
}

impl From<tungstenite::Error> for FeedError {
    fn from(error: tungstenite::Error) -> Self {
        FeedError::WebSocket(Arc::new(error))
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(error: serde_json::Error) -> Self {
        FeedError::Decode(error.to_string())
    }
}

impl<T> PartialEq<FeedError> for FeedResult<T> {
    fn eq(&self, other: &FeedError) -> bool {
        match self {
            Ok(_) => false,
            Err(err) => discriminant(err) == discriminant(other),
        }
    }
}
