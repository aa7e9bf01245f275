//! Reconnecting Server-Sent Events (SSE) client.
//!
//! This module provides:
//!
//! - **Parsing**: byte chunks are split into lines by [`LineDecoder`] (any
//!   chunk boundary, any line ending, lossy UTF-8) and assembled into
//!   [`Event`]s by [`EventParser`].
//! - **Auto-Reconnection**: exponential backoff with jitter, reset after a
//!   stable connection, and `Last-Event-ID` resumption.
//! - **Pluggable collaborators**: the HTTP side is an
//!   [`SseTransport`](crate::transport::SseTransport), the consumer side an
//!   [`SseEventHandler`], errors go through a configurable classifier.
//! - **Handle/Task Split**: a background task owns all connection state; the
//!   clone-able [`EventSource`] handle only sends it commands.
//!
//! # Architecture
//!
//! ```text
//! EventSource::new(config, transport, handler)
//!   └─ spawns background task ──► tokio::spawn(SseDriver::run)
//!        │                              │
//!        ├── EventSource ──► mpsc ──────┤  (commands: Start, Stop, Reconnect)
//!        │                              │
//!        └── watch ◄── ReadyState ◄─────┤
//!                                       │
//!              SseTransport ── bytes ──►├─► LineDecoder ─► EventParser ─► SseEventHandler
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use hpx_sse::sse::{SseConfig, SseConnection, SseMessage};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SseConfig::new("https://api.example.com/v1/stream")
//!     .reconnect_max_delay(Duration::from_secs(10));
//!
//! let (handle, mut stream) = SseConnection::connect(config).await?.split();
//!
//! while let Some(message) = stream.next_message().await {
//!     if let SseMessage::Event(event) = message {
//!         println!("type={} data={}", event.event, event.data);
//!     }
//! }
//! handle.stop().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Module Index
//!
//! | Module | Description |
//! |--------|-------------|
//! | `config` | [`SseConfig`] builder for connection settings |
//! | [`connection`] | [`EventSource`], [`SseConnection`] |
//! | `protocol` | [`SseEventHandler`] trait |
//! | `types` | [`Event`], [`ReadyState`], [`Disposition`] |
//! | [`parse`] | [`LineDecoder`], [`EventParser`], [`EventStream`] |
//! | [`handlers`] | Ready-to-use handlers ([`ChannelHandler`](handlers::ChannelHandler)) |

mod config;
pub mod connection;
pub mod handlers;
pub mod parse;
mod protocol;
mod types;

// Re-export config types
pub use config::{
    ErrorClassifier, HeaderTransform, LAST_EVENT_ID, SseConfig, default_classifier,
};
// Re-export connection types
pub use connection::{EventSource, SseCommand, SseConnection};
pub use handlers::{SseMessage, SseStream};
// Re-export parser types
pub use parse::{EventParser, EventStream, LineDecoder};
// Re-export protocol types
pub use protocol::SseEventHandler;
// Re-export core types
pub use types::{Disposition, Event, ReadyState};
