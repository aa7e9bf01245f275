//! Ready-to-use [`SseEventHandler`](super::SseEventHandler) implementations.
//!
//! - [`ChannelHandler`]: forwards everything into a bounded channel

mod channel;

pub use channel::{ChannelHandler, SseMessage, SseStream};
