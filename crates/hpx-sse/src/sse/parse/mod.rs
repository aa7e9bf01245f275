//! SSE parsing: bytes to lines, lines to events.
//!
//! [`LineDecoder`] and [`EventParser`] are the two stages the
//! [`EventSource`](crate::sse::EventSource) driver feeds every chunk through;
//! [`EventStream`] chains them over a single response body.

pub(crate) mod constants;
pub mod event_stream;
pub mod frame;
pub mod line;

pub use event_stream::EventStream;
pub use frame::EventParser;
pub use line::LineDecoder;
