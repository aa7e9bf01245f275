//! # hpx-sse
//!
//! Reconnecting Server-Sent Events client for the hpx stack.
//!
//! A long-lived streaming HTTP response is decoded into discrete events;
//! disconnects are recovered transparently with jittered exponential backoff
//! and `Last-Event-ID` resumption, until the source is stopped or an error is
//! classified as fatal.
//!
//! ## Features
//!
//! - `http` (default): [`HttpTransport`](transport::HttpTransport), a
//!   `reqwest` backed transport, and [`SseConnection::connect`](sse::SseConnection::connect)
//!
//! See the [`sse`] module for the architecture and a quick start.

pub mod backoff;
pub mod error;
pub mod sse;
pub mod transport;

// Re-export commonly used types
pub use backoff::Backoff;
pub use error::{SseError, SseResult};
pub use sse::{
    Disposition, Event, EventSource, ReadyState, SseConfig, SseConnection, SseEventHandler,
    SseMessage,
};
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use transport::{SseRequest, SseResponse, SseTransport};
