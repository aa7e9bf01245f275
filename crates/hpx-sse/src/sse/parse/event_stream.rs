//! [`Stream`] that converts a stream of byte chunks into [`Event`]s.

use std::{
    collections::VecDeque,
    pin::Pin,
    task::{Context, Poll, ready},
    time::Duration,
};

use futures_core::Stream;

use super::{frame::EventParser, line::LineDecoder};
use crate::sse::types::Event;

pin_project_lite::pin_project! {
    /// A [`Stream`] that parses a single SSE response body.
    ///
    /// This is the parsing half of [`EventSource`](crate::sse::EventSource)
    /// without any reconnection: it ends when the underlying stream ends and
    /// yields transport errors as they come.
    #[derive(Debug)]
    pub struct EventStream<S> {
        #[pin]
        stream: S,
        decoder: LineDecoder,
        parser: EventParser,
        pending: VecDeque<Event>,
        terminated: bool,
    }
}

impl<S> EventStream<S> {
    /// Create a new [`EventStream`] from an underlying byte stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            decoder: LineDecoder::new(),
            parser: EventParser::new(Duration::ZERO, None),
            pending: VecDeque::new(),
            terminated: false,
        }
    }

    /// Set the last event ID (useful for resumability). Call before polling.
    #[must_use]
    pub fn with_last_event_id(mut self, id: impl Into<String>) -> Self {
        self.parser = EventParser::new(Duration::ZERO, Some(id.into()));
        self
    }

    /// The last event ID seen on this stream.
    pub fn last_event_id(&self) -> Option<&str> {
        self.parser.last_event_id()
    }

    /// The reconnection time most recently advertised by the server, if any.
    pub fn retry(&self) -> Option<Duration> {
        self.parser.advertised_retry()
    }
}

impl<S, E, B> Stream for EventStream<S>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    type Item = Result<Event, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(event) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(event)));
            }
            if *this.terminated {
                return Poll::Ready(None);
            }

            match ready!(this.stream.as_mut().poll_next(cx)) {
                Some(Ok(bytes)) => {
                    for line in this.decoder.append(bytes.as_ref()) {
                        if let Some(event) = this.parser.parse(&line) {
                            this.pending.push_back(event);
                        }
                    }
                }
                Some(Err(e)) => return Poll::Ready(Some(Err(e))),
                None => *this.terminated = true,
            }
        }
    }
}
