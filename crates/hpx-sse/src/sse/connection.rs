//! SSE connection driver implementation.
//!
//! Provides [`EventSource`], the control handle of a background task that
//! owns the transport stream, the parser and the backoff timer, and
//! [`SseConnection`], an event source already wired to a channel.

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use futures_util::{Stream, StreamExt};
use tokio::{
    sync::{mpsc, watch},
    time::{Instant, timeout},
};
use tracing::{debug, error, info, warn};

use super::{
    config::SseConfig,
    handlers::{ChannelHandler, SseMessage, SseStream},
    parse::{EventParser, LineDecoder},
    protocol::SseEventHandler,
    types::{Disposition, ReadyState},
};
use crate::{
    backoff::Backoff,
    error::{SseError, SseResult},
    transport::{SseRequest, SseResponse, SseTransport},
};

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Control commands sent from [`EventSource`] to the background task.
#[derive(Debug)]
pub enum SseCommand {
    /// Leave the `Raw` state and connect.
    Start,
    /// Shut down for good.
    Stop,
    /// Drop the current stream and go through the reconnect path.
    Reconnect {
        /// Human-readable reason for the reconnection request.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Public API: EventSource
// ---------------------------------------------------------------------------

/// Clone-able handle to a reconnecting SSE connection.
///
/// The connection itself lives on a background task; every method here just
/// queues a command for it, so calls are applied one at a time in the order
/// they were made. Dropping every handle stops the connection.
#[derive(Clone, Debug)]
pub struct EventSource {
    cmd_tx: mpsc::Sender<SseCommand>,
    state_rx: watch::Receiver<ReadyState>,
}

impl EventSource {
    /// Create an event source in the [`ReadyState::Raw`] state.
    ///
    /// Must be called from within a Tokio runtime. Nothing is sent until
    /// [`start()`](Self::start).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails.
    pub fn new<T, H>(config: SseConfig, transport: T, handler: H) -> SseResult<Self>
    where
        T: SseTransport,
        H: SseEventHandler,
    {
        config.validate().map_err(SseError::config)?;

        let config = Arc::new(config);
        let (cmd_tx, cmd_rx) = mpsc::channel(config.command_channel_capacity);
        let (state_tx, state_rx) = watch::channel(ReadyState::Raw);

        let driver = SseDriver {
            parser: EventParser::new(config.reconnect_min_delay, config.last_event_id.clone()),
            backoff: Backoff::new(config.reconnect_max_delay, config.backoff_reset_threshold),
            config,
            transport,
            handler,
            cmd_rx,
            state_tx,
        };
        tokio::spawn(driver.run());

        Ok(Self { cmd_tx, state_rx })
    }

    /// Start connecting. A no-op unless the source is still `Raw`.
    pub async fn start(&self) {
        if self.cmd_tx.send(SseCommand::Start).await.is_err() {
            debug!("start() ignored: SSE event source already shut down");
        }
    }

    /// Stop the source: cancels any in-flight request, open stream or pending
    /// reconnect. A no-op once shut down.
    pub async fn stop(&self) {
        if self.cmd_tx.send(SseCommand::Stop).await.is_err() {
            debug!("stop() ignored: SSE event source already shut down");
        }
    }

    /// Request a reconnection.
    ///
    /// # Errors
    ///
    /// Returns an error if the background task has already shut down.
    pub async fn reconnect(&self, reason: &str) -> SseResult<()> {
        self.cmd_tx
            .send(SseCommand::Reconnect {
                reason: reason.to_string(),
            })
            .await
            .map_err(|_| SseError::Closed)
    }

    /// Current connection state.
    pub fn state(&self) -> ReadyState {
        *self.state_rx.borrow()
    }

    /// Wait until the state satisfies `predicate` and return it.
    pub async fn wait_for_state(&self, predicate: impl FnMut(&ReadyState) -> bool) -> ReadyState {
        let mut rx = self.state_rx.clone();
        if let Ok(state) = rx.wait_for(predicate).await {
            return *state;
        }
        // The driver is gone; its last published state is final.
        *rx.borrow()
    }

    /// Wait until the source has shut down.
    pub async fn closed(&self) {
        self.wait_for_state(ReadyState::is_shutdown).await;
    }
}

// ---------------------------------------------------------------------------
// Public API: SseConnection
// ---------------------------------------------------------------------------

/// An already started [`EventSource`] paired with the [`SseStream`] of a
/// [`ChannelHandler`].
///
/// Call [`split()`](SseConnection::split) to control and consume it from
/// different tasks.
#[derive(Debug)]
pub struct SseConnection {
    source: EventSource,
    stream: SseStream,
}

impl SseConnection {
    /// Connect over HTTP with the default [`HttpTransport`](crate::transport::HttpTransport).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails or the HTTP client
    /// cannot be built.
    #[cfg(feature = "http")]
    pub async fn connect(config: SseConfig) -> SseResult<Self> {
        let transport = crate::transport::HttpTransport::new()?;
        Self::connect_with_transport(config, transport).await
    }

    /// Connect using a custom transport.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails.
    pub async fn connect_with_transport<T: SseTransport>(
        config: SseConfig,
        transport: T,
    ) -> SseResult<Self> {
        config.validate().map_err(SseError::config)?;

        let (handler, stream) = ChannelHandler::new(config.event_channel_capacity);
        let source = EventSource::new(config, transport, handler)?;
        source.start().await;

        Ok(Self { source, stream })
    }

    /// Split the connection into a control handle and message stream.
    pub fn split(self) -> (EventSource, SseStream) {
        (self.source, self.stream)
    }

    /// Get a reference to the control handle.
    pub fn handle(&self) -> &EventSource {
        &self.source
    }
}

impl Stream for SseConnection {
    type Item = SseMessage;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        Pin::new(&mut this.stream).poll_next(cx)
    }
}

// ---------------------------------------------------------------------------
// Internal: background driver
// ---------------------------------------------------------------------------

/// How long `on_closed` may take once `stop()` has been received.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Why the driver left a connection attempt.
enum Outcome {
    Stopped,
    ReconnectRequested(String),
    Failed(SseError),
}

/// A command that cut an await point short.
enum Interrupt {
    Stop,
    Reconnect(String),
}

impl From<Interrupt> for Outcome {
    fn from(interrupt: Interrupt) -> Self {
        match interrupt {
            Interrupt::Stop => Self::Stopped,
            Interrupt::Reconnect(reason) => Self::ReconnectRequested(reason),
        }
    }
}

/// Await `fut` unless a command interrupts it first.
///
/// `Start` is already satisfied and is swallowed; `Stop`, a dropped handle,
/// or `Reconnect` win over `fut`, which is then dropped.
async fn interruptible<F: Future>(
    cmd_rx: &mut mpsc::Receiver<SseCommand>,
    fut: F,
) -> Result<F::Output, Interrupt> {
    tokio::pin!(fut);
    loop {
        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => match cmd {
                Some(SseCommand::Start) => debug!("start() ignored: already started"),
                Some(SseCommand::Reconnect { reason }) => return Err(Interrupt::Reconnect(reason)),
                Some(SseCommand::Stop) | None => return Err(Interrupt::Stop),
            },

            output = &mut fut => return Ok(output),
        }
    }
}

/// The long-lived background task behind an [`EventSource`].
///
/// The parser (last event id, retry interval) and the backoff timer outlive
/// individual connections; the line decoder is created per connection.
struct SseDriver<T, H> {
    config: Arc<SseConfig>,
    transport: T,
    handler: H,
    cmd_rx: mpsc::Receiver<SseCommand>,
    state_tx: watch::Sender<ReadyState>,
    parser: EventParser,
    backoff: Backoff,
}

impl<T: SseTransport, H: SseEventHandler> SseDriver<T, H> {
    async fn run(mut self) {
        // --- Raw: wait for start ---
        loop {
            match self.cmd_rx.recv().await {
                Some(SseCommand::Start) => break,
                Some(SseCommand::Reconnect { .. }) => debug!("reconnect ignored: not started"),
                Some(SseCommand::Stop) | None => {
                    self.set_state(ReadyState::Shutdown);
                    return;
                }
            }
        }

        loop {
            let mut outcome = self.connect_and_stream().await;

            // Closing an open connection is reported before anything else.
            if self.state() == ReadyState::Open {
                if matches!(outcome, Outcome::Stopped) {
                    // No command is left to interrupt it, so bound it in time.
                    if timeout(SHUTDOWN_GRACE, self.handler.on_closed()).await.is_err() {
                        debug!("on_closed abandoned after stop");
                    }
                } else if let Err(Interrupt::Stop) =
                    interruptible(&mut self.cmd_rx, self.handler.on_closed()).await
                {
                    outcome = Outcome::Stopped;
                }
            }

            match outcome {
                Outcome::Stopped => {
                    info!(url = %self.config.url, "SSE event source stopped");
                    break;
                }
                Outcome::ReconnectRequested(reason) => {
                    warn!(reason = %reason, "SSE reconnect requested");
                    self.set_state(ReadyState::Closed);
                }
                Outcome::Failed(err) => {
                    self.set_state(ReadyState::Closed);
                    if matches!(err, SseError::StreamEnded) {
                        warn!(url = %self.config.url, "SSE stream ended");
                    } else {
                        error!(url = %self.config.url, error = %err, "SSE connection failed");
                    }
                    match self.classify(&err).await {
                        Some(Disposition::Proceed) => {}
                        Some(Disposition::Shutdown) => {
                            warn!(error = %err, "SSE error classified as fatal, shutting down");
                            break;
                        }
                        None => {
                            info!(url = %self.config.url, "SSE event source stopped");
                            break;
                        }
                    }
                }
            }

            let retry = self.parser.reset();
            let delay = self.backoff.reconnect_delay(retry);
            warn!(
                attempt = self.backoff.attempt(),
                delay_ms = delay.as_millis() as u64,
                "SSE reconnecting after backoff"
            );

            match interruptible(&mut self.cmd_rx, tokio::time::sleep(delay)).await {
                Ok(()) => {}
                Err(Interrupt::Reconnect(reason)) => {
                    debug!(reason = %reason, "SSE backoff skipped");
                }
                Err(Interrupt::Stop) => {
                    info!(url = %self.config.url, "SSE event source stopped during backoff");
                    break;
                }
            }
        }

        self.set_state(ReadyState::Shutdown);
    }

    /// One connection attempt: open the request, then pump the body through
    /// the decoder and parser until something ends it.
    async fn connect_and_stream(&mut self) -> Outcome {
        self.set_state(ReadyState::Connecting);

        let last_event_id = self.parser.last_event_id();
        let request = SseRequest {
            url: self.config.url.clone(),
            method: self.config.method.clone(),
            headers: self.config.request_headers(last_event_id),
            body: self.config.body.clone(),
            idle_timeout: self.config.idle_timeout,
        };
        info!(url = %self.config.url, last_event_id = ?last_event_id, "SSE connecting");

        let connect_timeout = self.config.connect_timeout;
        let open = timeout(connect_timeout, self.transport.open(request));
        let response = match interruptible(&mut self.cmd_rx, open).await {
            Ok(Ok(Ok(response))) => response,
            Ok(Ok(Err(err))) => return Outcome::Failed(err),
            Ok(Err(_elapsed)) => return Outcome::Failed(SseError::connect_timeout(connect_timeout)),
            Err(interrupt) => return interrupt.into(),
        };

        if let Err(err) = self.check_response(&response) {
            return Outcome::Failed(err);
        }

        info!(url = %self.config.url, status = %response.status, "SSE connection established");
        self.set_state(ReadyState::Open);
        self.backoff.set_connected_time(Instant::now());
        if let Err(interrupt) = interruptible(&mut self.cmd_rx, self.handler.on_open()).await {
            return interrupt.into();
        }

        let idle_timeout = self.config.idle_timeout;
        let mut body = response.body;
        let mut decoder = LineDecoder::new();

        loop {
            let chunk = match interruptible(&mut self.cmd_rx, timeout(idle_timeout, body.next())).await {
                Ok(Ok(Some(Ok(chunk)))) => chunk,
                Ok(Ok(Some(Err(err)))) => return Outcome::Failed(err),
                Ok(Ok(None)) => return Outcome::Failed(SseError::StreamEnded),
                Ok(Err(_elapsed)) => return Outcome::Failed(SseError::idle_timeout(idle_timeout)),
                Err(interrupt) => return interrupt.into(),
            };

            for line in decoder.append(&chunk) {
                if let Some(event) = self.parser.parse(&line) {
                    debug!(event_type = %event.event, id = %event.id, "SSE event received");
                    let deliver = self.handler.on_event(event);
                    if let Err(interrupt) = interruptible(&mut self.cmd_rx, deliver).await {
                        return interrupt.into();
                    }
                }
            }
        }
    }

    /// Validate status and `Content-Type` of a response head.
    fn check_response(&self, response: &SseResponse) -> SseResult<()> {
        let status = response.status;
        if status == http::StatusCode::NO_CONTENT {
            return Err(SseError::NoContent);
        }
        if !status.is_success() {
            return Err(SseError::invalid_status(status));
        }

        if self.config.validate_content_type
            && let Some(ct) = response.headers.get(http::header::CONTENT_TYPE)
        {
            let ct_str = ct.to_str().unwrap_or("");
            if !ct_str.to_ascii_lowercase().contains("text/event-stream") {
                return Err(SseError::invalid_content_type(ct_str));
            }
        }

        Ok(())
    }

    /// The configured classifier has the first word; the handler may still
    /// escalate a `Proceed` to `Shutdown`.
    ///
    /// `None` means `stop()` arrived while the handler was busy.
    async fn classify(&mut self, err: &SseError) -> Option<Disposition> {
        match (self.config.error_classifier)(err) {
            Disposition::Shutdown => Some(Disposition::Shutdown),
            Disposition::Proceed => {
                match interruptible(&mut self.cmd_rx, self.handler.on_error(err)).await {
                    Ok(disposition) => Some(disposition),
                    Err(Interrupt::Reconnect(reason)) => {
                        debug!(reason = %reason, "SSE reconnect requested while reporting error");
                        Some(Disposition::Proceed)
                    }
                    Err(Interrupt::Stop) => None,
                }
            }
        }
    }

    fn state(&self) -> ReadyState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, state: ReadyState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "SSE state transition");
        }
    }
}
