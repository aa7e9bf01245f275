//! Core type definitions for SSE event handling.

use std::{fmt, time::Duration};

use serde::de::DeserializeOwned;

/// A dispatched SSE event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    /// The event type field (`"message"` when the frame did not name one).
    pub event: String,
    /// The data payload, `data:` lines joined with `\n`.
    pub data: String,
    /// The last event ID in effect when the event was dispatched (may be
    /// empty).
    pub id: String,
    /// Retry interval carried by this frame, if any.
    pub retry: Option<Duration>,
}

impl Event {
    /// Deserialize the data payload as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.data)
    }
}

/// Connection state of an [`EventSource`](super::EventSource).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadyState {
    /// Created but never started.
    Raw,
    /// A request is in flight.
    Connecting,
    /// The response was accepted and events are flowing.
    Open,
    /// The last connection ended; a reconnect is scheduled.
    Closed,
    /// Terminal: stopped or told not to retry.
    Shutdown,
}

impl ReadyState {
    /// Returns `true` if events are flowing.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns `true` if the source will never connect again.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::Shutdown)
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => write!(f, "Raw"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Open => write!(f, "Open"),
            Self::Closed => write!(f, "Closed"),
            Self::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// What to do after an error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Disposition {
    /// Keep reconnecting.
    #[default]
    Proceed,
    /// Stop for good.
    Shutdown,
}
