//! Error handling for the SSE client.

use std::time::Duration;

use thiserror::Error;

/// The result type used throughout the crate.
pub type SseResult<T> = Result<T, SseError>;

/// Errors surfaced by an SSE connection.
///
/// Malformed bytes and malformed fields never show up here: the decoder
/// repairs the former and the frame parser drops the latter.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SseError {
    /// HTTP client errors (connection refused, TLS, broken body, ...).
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Error reported by a custom [`SseTransport`](crate::transport::SseTransport).
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// The server answered with a status outside the success range.
    #[error("Invalid SSE response status: {status}")]
    InvalidStatus { status: http::StatusCode },

    /// The server answered `204 No Content`: it has nothing to stream.
    #[error("SSE endpoint returned 204 No Content")]
    NoContent,

    /// The server answered with a body that is not an event stream.
    #[error("Invalid SSE content type: {content_type}")]
    InvalidContentType { content_type: String },

    /// The server closed the stream.
    #[error("SSE stream ended")]
    StreamEnded,

    /// No bytes were received within the configured idle timeout.
    #[error("No data received for {duration:?}")]
    IdleTimeout { duration: Duration },

    /// The response head did not arrive within the connect timeout.
    #[error("Connection timed out after {duration:?}")]
    ConnectTimeout { duration: Duration },

    /// Configuration errors.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The background connection task has already shut down.
    #[error("SSE connection closed")]
    Closed,
}

impl SseError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create an error for an unexpected response status.
    pub fn invalid_status(status: http::StatusCode) -> Self {
        Self::InvalidStatus { status }
    }

    /// Create an error for an unexpected `Content-Type`.
    pub fn invalid_content_type(content_type: impl Into<String>) -> Self {
        Self::InvalidContentType {
            content_type: content_type.into(),
        }
    }

    /// Create an idle timeout error.
    pub fn idle_timeout(duration: Duration) -> Self {
        Self::IdleTimeout { duration }
    }

    /// Create a connect timeout error.
    pub fn connect_timeout(duration: Duration) -> Self {
        Self::ConnectTimeout { duration }
    }

    /// The HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<http::StatusCode> {
        match self {
            Self::InvalidStatus { status } => Some(*status),
            Self::NoContent => Some(http::StatusCode::NO_CONTENT),
            #[cfg(feature = "http")]
            Self::Http(e) => e.status(),
            _ => None,
        }
    }
}
