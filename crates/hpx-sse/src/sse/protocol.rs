//! Event sink trait for SSE connections.

use async_trait::async_trait;

use crate::{
    error::SseError,
    sse::types::{Disposition, Event},
};

/// Receives everything an [`EventSource`](super::EventSource) produces.
///
/// All callbacks run on the connection's background task, one at a time and
/// in stream order. While a callback is pending the stream is not read, which
/// is how a slow consumer applies backpressure.
///
/// A pending callback is dropped when `stop()` or `reconnect()` arrives, so
/// callbacks must be cancel safe.
#[async_trait]
pub trait SseEventHandler: Send + Sync + 'static {
    /// Called for every dispatched event.
    async fn on_event(&self, event: Event);

    /// Called when a response has been accepted and events start flowing.
    ///
    /// Default implementation does nothing.
    async fn on_open(&self) {}

    /// Called when an open connection ends, before any reconnect is scheduled.
    ///
    /// Default implementation does nothing.
    async fn on_closed(&self) {}

    /// Called for transport errors the configured classifier did not already
    /// turn into a shutdown. Returning [`Disposition::Shutdown`] stops the
    /// source.
    ///
    /// Default implementation keeps reconnecting.
    async fn on_error(&self, _error: &SseError) -> Disposition {
        Disposition::Proceed
    }
}
