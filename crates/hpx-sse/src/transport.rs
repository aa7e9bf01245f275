//! Streaming HTTP transport abstraction.
//!
//! An [`SseTransport`] issues one request and hands back the response head and
//! body stream; everything else (framing, reconnects, timeouts) is driven by
//! the [`EventSource`](crate::sse::EventSource).

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use http::{HeaderMap, Method, StatusCode};

use crate::error::SseResult;

/// Response body as a stream of raw chunks.
pub type ByteStream = BoxStream<'static, SseResult<Bytes>>;

/// A single SSE request, rebuilt for every connection attempt.
#[derive(Clone, Debug)]
pub struct SseRequest {
    /// Target URL.
    pub url: String,
    /// HTTP method.
    pub method: Method,
    /// Request headers, already merged and transformed.
    pub headers: HeaderMap,
    /// Optional request body.
    pub body: Option<Bytes>,
    /// Maximum silence between two chunks.
    pub idle_timeout: Duration,
}

/// Response head plus body stream.
pub struct SseResponse {
    /// Response status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Body chunks; ends when the server closes the stream.
    pub body: ByteStream,
}

impl std::fmt::Debug for SseResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SseResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Issues streaming HTTP requests.
///
/// Dropping the returned [`SseResponse`] (or the future returned by
/// [`open`](Self::open)) must cancel the underlying request.
#[async_trait]
pub trait SseTransport: Send + Sync + 'static {
    /// Send `request` and return once the response head has arrived.
    async fn open(&self, request: SseRequest) -> SseResult<SseResponse>;
}

#[cfg(feature = "http")]
pub use self::http_transport::HttpTransport;

#[cfg(feature = "http")]
mod http_transport {
    use futures_util::StreamExt;
    use http::{HeaderValue, header};

    use super::*;
    use crate::error::SseError;

    /// [`SseTransport`] backed by a [`reqwest::Client`].
    #[derive(Clone, Debug, Default)]
    pub struct HttpTransport {
        client: reqwest::Client,
    }

    impl HttpTransport {
        /// Create a transport with a default client.
        ///
        /// # Errors
        ///
        /// Returns an error if the HTTP client cannot be built.
        pub fn new() -> SseResult<Self> {
            let client = reqwest::Client::builder()
                .build()
                .map_err(|e| SseError::config(format!("Failed to build HTTP client: {e}")))?;
            Ok(Self { client })
        }

        /// Use an existing client (shared connection pool, proxies, TLS
        /// settings, ...).
        pub fn with_client(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    #[async_trait]
    impl SseTransport for HttpTransport {
        async fn open(&self, request: SseRequest) -> SseResult<SseResponse> {
            let SseRequest {
                url,
                method,
                mut headers,
                body,
                ..
            } = request;

            headers
                .entry(header::ACCEPT)
                .or_insert(HeaderValue::from_static("text/event-stream"));
            headers
                .entry(header::CACHE_CONTROL)
                .or_insert(HeaderValue::from_static("no-cache"));

            let mut req = self.client.request(method, url).headers(headers);
            if let Some(body) = body {
                req = req.body(body);
            }

            let resp = req.send().await?;
            let status = resp.status();
            let headers = resp.headers().clone();
            let body = resp
                .bytes_stream()
                .map(|chunk| chunk.map_err(SseError::from))
                .boxed();

            Ok(SseResponse {
                status,
                headers,
                body,
            })
        }
    }
}
