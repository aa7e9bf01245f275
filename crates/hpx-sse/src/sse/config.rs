//! SSE connection configuration.

use std::{fmt, sync::Arc, time::Duration};

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, header::HeaderName};

use crate::{error::SseError, sse::types::Disposition};

/// Rewrites the request headers right before every connection attempt.
pub type HeaderTransform = Arc<dyn Fn(HeaderMap) -> HeaderMap + Send + Sync>;

/// Decides whether an error should stop the event source for good.
pub type ErrorClassifier = Arc<dyn Fn(&SseError) -> Disposition + Send + Sync>;

/// `Last-Event-ID` request header.
pub const LAST_EVENT_ID: HeaderName = HeaderName::from_static("last-event-id");

/// Default error classification: `204 No Content` means "stop", everything
/// else is retried.
pub fn default_classifier(error: &SseError) -> Disposition {
    match error {
        SseError::NoContent => Disposition::Shutdown,
        _ => Disposition::Proceed,
    }
}

/// Configuration for an [`EventSource`](super::EventSource).
///
/// Built with chainable setters on top of sensible defaults; immutable once
/// the event source is created.
#[derive(Clone)]
pub struct SseConfig {
    /// SSE endpoint URL.
    pub url: String,
    /// HTTP method (usually GET, some APIs use POST).
    pub method: http::Method,
    /// Optional request body (for POST-based SSE).
    pub body: Option<Bytes>,
    /// Headers supplied by the surrounding client.
    pub base_headers: HeaderMap,
    /// Headers for this stream; they replace base headers of the same name.
    pub headers: HeaderMap,
    /// Applied to the merged headers on every connection attempt.
    pub header_transform: Option<HeaderTransform>,
    /// Base reconnect delay, also the initial retry interval.
    pub reconnect_min_delay: Duration,
    /// Upper bound for any reconnect delay.
    pub reconnect_max_delay: Duration,
    /// A connection open at least this long resets the backoff.
    pub backoff_reset_threshold: Duration,
    /// Maximum time without receiving any bytes before the stream is dropped.
    pub idle_timeout: Duration,
    /// Maximum time to wait for the response head.
    pub connect_timeout: Duration,
    /// `Last-Event-ID` to send on the first connection.
    pub last_event_id: Option<String>,
    /// Treat a non `text/event-stream` response as an error.
    pub validate_content_type: bool,
    /// Classifies transport errors.
    pub error_classifier: ErrorClassifier,
    /// Capacity of the event channel used by [`SseConnection`](super::SseConnection).
    pub event_channel_capacity: usize,
    /// Capacity of the command channel.
    pub command_channel_capacity: usize,
}

impl Default for SseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: http::Method::GET,
            body: None,
            base_headers: HeaderMap::new(),
            headers: HeaderMap::new(),
            header_transform: None,
            reconnect_min_delay: Duration::from_secs(1),
            reconnect_max_delay: Duration::from_secs(30),
            backoff_reset_threshold: Duration::from_secs(60),
            idle_timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(10),
            last_event_id: None,
            validate_content_type: true,
            error_classifier: Arc::new(default_classifier),
            event_channel_capacity: 256,
            command_channel_capacity: 64,
        }
    }
}

impl fmt::Debug for SseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SseConfig")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("body_len", &self.body.as_ref().map(Bytes::len))
            .field("base_headers", &self.base_headers)
            .field("headers", &self.headers)
            .field("header_transform", &self.header_transform.is_some())
            .field("reconnect_min_delay", &self.reconnect_min_delay)
            .field("reconnect_max_delay", &self.reconnect_max_delay)
            .field("backoff_reset_threshold", &self.backoff_reset_threshold)
            .field("idle_timeout", &self.idle_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("last_event_id", &self.last_event_id)
            .field("validate_content_type", &self.validate_content_type)
            .field("event_channel_capacity", &self.event_channel_capacity)
            .field("command_channel_capacity", &self.command_channel_capacity)
            .finish_non_exhaustive()
    }
}

impl SseConfig {
    /// Create a new SSE configuration with the given URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the HTTP method (e.g., `POST` for POST-based SSE).
    #[must_use]
    pub fn method(mut self, method: http::Method) -> Self {
        self.method = method;
        self
    }

    /// Set the request body (for POST-based SSE).
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the base headers inherited from the surrounding client.
    #[must_use]
    pub fn base_headers(mut self, headers: HeaderMap) -> Self {
        self.base_headers = headers;
        self
    }

    /// Set the stream's own headers.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Set a function applied to the headers on every connection attempt,
    /// e.g. to attach a freshly signed token.
    #[must_use]
    pub fn header_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(HeaderMap) -> HeaderMap + Send + Sync + 'static,
    {
        self.header_transform = Some(Arc::new(transform));
        self
    }

    /// Set the base reconnect delay.
    #[must_use]
    pub fn reconnect_min_delay(mut self, delay: Duration) -> Self {
        self.reconnect_min_delay = delay;
        self
    }

    /// Set the maximum reconnect delay.
    #[must_use]
    pub fn reconnect_max_delay(mut self, delay: Duration) -> Self {
        self.reconnect_max_delay = delay;
        self
    }

    /// Set how long a connection must stay open to reset the backoff.
    #[must_use]
    pub fn backoff_reset_threshold(mut self, threshold: Duration) -> Self {
        self.backoff_reset_threshold = threshold;
        self
    }

    /// Set the idle timeout.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the `Last-Event-ID` for the first connection.
    #[must_use]
    pub fn last_event_id(mut self, id: impl Into<String>) -> Self {
        self.last_event_id = Some(id.into());
        self
    }

    /// Set whether the response `Content-Type` is checked.
    #[must_use]
    pub fn validate_content_type(mut self, validate: bool) -> Self {
        self.validate_content_type = validate;
        self
    }

    /// Set the error classifier.
    #[must_use]
    pub fn error_classifier<F>(mut self, classifier: F) -> Self
    where
        F: Fn(&SseError) -> Disposition + Send + Sync + 'static,
    {
        self.error_classifier = Arc::new(classifier);
        self
    }

    /// Set the event channel capacity.
    #[must_use]
    pub fn event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    /// Set the command channel capacity.
    #[must_use]
    pub fn command_channel_capacity(mut self, capacity: usize) -> Self {
        self.command_channel_capacity = capacity;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error message string if any field has an invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.url.is_empty() {
            return Err("URL cannot be empty".to_string());
        }
        if self.reconnect_max_delay.is_zero() {
            return Err("Max reconnect delay must be > 0".to_string());
        }
        if self.reconnect_max_delay < self.reconnect_min_delay {
            return Err("Max reconnect delay must be >= min reconnect delay".to_string());
        }
        if self.idle_timeout.is_zero() {
            return Err("Idle timeout must be > 0".to_string());
        }
        if self.connect_timeout.is_zero() {
            return Err("Connect timeout must be > 0".to_string());
        }
        if self.event_channel_capacity == 0 {
            return Err("Event channel capacity must be > 0".to_string());
        }
        if self.command_channel_capacity == 0 {
            return Err("Command channel capacity must be > 0".to_string());
        }
        Ok(())
    }

    /// Headers for one connection attempt.
    ///
    /// Base headers, overridden by the configured ones, passed through the
    /// transform, plus `Last-Event-ID` when one is known.
    pub fn request_headers(&self, last_event_id: Option<&str>) -> HeaderMap {
        let mut headers = self.base_headers.clone();
        for name in self.headers.keys() {
            headers.remove(name);
        }
        for (name, value) in &self.headers {
            headers.append(name.clone(), value.clone());
        }

        if let Some(transform) = &self.header_transform {
            headers = transform(headers);
        }

        if let Some(id) = last_event_id.filter(|id| !id.is_empty()) {
            // Non-ASCII ids are sent as raw UTF-8 (obs-text).
            match HeaderValue::from_bytes(id.as_bytes()) {
                Ok(value) => {
                    headers.insert(LAST_EVENT_ID, value);
                }
                Err(_) => tracing::warn!(id, "Last-Event-ID is not a valid header value"),
            }
        }

        headers
    }
}
