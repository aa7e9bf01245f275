//! Channel-backed SSE event handler.
//!
//! [`ChannelHandler`] forwards every callback as an [`SseMessage`] into a
//! bounded channel; the receiving half is the [`SseStream`].

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use async_trait::async_trait;
use futures_core::Stream;
use tokio::sync::mpsc;
use tracing::debug;

use crate::{
    error::SseError,
    sse::{
        protocol::SseEventHandler,
        types::{Disposition, Event},
    },
};

/// Everything an event source reports, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum SseMessage {
    /// A connection was opened.
    Open,
    /// An event was dispatched.
    Event(Event),
    /// An open connection ended.
    Closed,
    /// A connection attempt or stream failed (rendered error message).
    Error(String),
}

impl SseMessage {
    /// Returns the event if this is an [`SseMessage::Event`].
    pub fn into_event(self) -> Option<Event> {
        match self {
            Self::Event(event) => Some(event),
            _ => None,
        }
    }

    /// Returns true if this is an event.
    pub fn is_event(&self) -> bool {
        matches!(self, Self::Event(_))
    }
}

/// Handler that forwards to a bounded channel.
///
/// A full channel blocks the connection task until the consumer catches up.
/// Errors never shut the source down; pair it with a classifier for that.
#[derive(Clone, Debug)]
pub struct ChannelHandler {
    tx: mpsc::Sender<SseMessage>,
}

impl ChannelHandler {
    /// Create a handler and the stream receiving its messages.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, SseStream) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, SseStream { rx })
    }

    async fn forward(&self, message: SseMessage) {
        if self.tx.send(message).await.is_err() {
            debug!("SSE consumer dropped, message discarded");
        }
    }
}

#[async_trait]
impl SseEventHandler for ChannelHandler {
    async fn on_event(&self, event: Event) {
        self.forward(SseMessage::Event(event)).await;
    }

    async fn on_open(&self) {
        self.forward(SseMessage::Open).await;
    }

    async fn on_closed(&self) {
        self.forward(SseMessage::Closed).await;
    }

    async fn on_error(&self, error: &SseError) -> Disposition {
        self.forward(SseMessage::Error(error.to_string())).await;
        Disposition::Proceed
    }
}

/// Stream of [`SseMessage`]s from a [`ChannelHandler`].
///
/// Implements [`Stream`] for use with `StreamExt` combinators. Ends once the
/// event source has shut down and every message was received.
#[derive(Debug)]
pub struct SseStream {
    rx: mpsc::Receiver<SseMessage>,
}

impl SseStream {
    /// Receive the next message.
    pub async fn next_message(&mut self) -> Option<SseMessage> {
        self.rx.recv().await
    }

    /// Receive the next event, skipping lifecycle and error messages.
    pub async fn next_event(&mut self) -> Option<Event> {
        while let Some(message) = self.rx.recv().await {
            if let SseMessage::Event(event) = message {
                return Some(event);
            }
        }
        None
    }
}

impl Stream for SseStream {
    type Item = SseMessage;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        Pin::new(&mut this.rx).poll_recv(cx)
    }
}
