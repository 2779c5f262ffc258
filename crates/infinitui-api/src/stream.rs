//! WebSocket status stream with auto-reconnect.
//!
//! Connects to the daemon's `/api/ws` endpoint and broadcasts parsed
//! status messages through a [`tokio::sync::broadcast`] channel, in
//! arrival order. Reconnection is an explicit state machine
//! (`Disconnected → Connecting → Connected`, `Reconnecting` between
//! failed attempts) observable via a `watch` channel, with exponential
//! backoff + jitter and an optional retry cap.
//!
//! # Example
//!
//! ```rust,ignore
//! use infinitui_api::stream::{ReconnectConfig, StreamEvent, StreamHandle};
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! let cancel = CancellationToken::new();
//! let url = Url::parse("ws://thermostat.local:8080/api/ws")?;
//!
//! let handle = StreamHandle::connect(url, ReconnectConfig::default(), cancel.clone());
//! let mut rx = handle.subscribe();
//!
//! while let Ok(event) = rx.recv().await {
//!     if let StreamEvent::Status(msg) = &*event {
//!         println!("{}: {}", msg.source, msg.data);
//!     }
//! }
//!
//! handle.shutdown();
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;

// ── Broadcast channel capacity ───────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 256;

// ── StatusMessage ────────────────────────────────────────────────────

/// A parsed message from the daemon's status stream.
///
/// Every frame is a flat envelope `{ "source": "...", "data": {...} }`.
/// `data` stays a raw JSON value here; the consumer decides which
/// sources it understands and how to type them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusMessage {
    /// Which subsystem this update pertains to: `"tstat"`, `"blower"`,
    /// `"heatpump"`, or another source the daemon publishes.
    pub source: String,

    /// The subsystem's full current state, replacing anything previous.
    pub data: serde_json::Value,
}

/// One event on the stream channel.
///
/// Malformed frames are surfaced here rather than swallowed, so the
/// consumer can show a diagnostic; they never terminate the stream.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// A well-formed status message, in arrival order.
    Status(StatusMessage),
    /// A frame that could not be parsed as a status message.
    Malformed(Arc<Error>),
}

// ── StreamState ──────────────────────────────────────────────────────

/// Connection state of the stream listener.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StreamState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Waiting out the backoff delay before attempt `attempt + 1`.
    Reconnecting { attempt: u32 },
    /// The retry cap was reached; the listener gave up.
    Failed,
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for stream reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever (the default, matching the original
    /// panel's reconnect-on-abnormal-close behavior).
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── StreamHandle ─────────────────────────────────────────────────────

/// Handle to a running status stream.
///
/// Consumers subscribe to the broadcast channel; the background task
/// and its broadcast sender survive individual connections, so a
/// reconnect never requires resubscribing.
pub struct StreamHandle {
    event_rx: broadcast::Receiver<Arc<StreamEvent>>,
    state_rx: watch::Receiver<StreamState>,
    cancel: CancellationToken,
}

impl StreamHandle {
    /// Spawn the reconnection loop against `ws_url`.
    ///
    /// Returns immediately; the first connection attempt happens
    /// asynchronously. Subscribe to the event receiver to start
    /// consuming messages — frames that arrive before a subscription
    /// exists are dropped, per the no-replay contract.
    pub fn connect(ws_url: Url, reconnect: ReconnectConfig, cancel: CancellationToken) -> Self {
        let (event_tx, event_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(StreamState::Disconnected);

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            stream_loop(ws_url, event_tx, state_tx, reconnect, task_cancel).await;
        });

        Self {
            event_rx,
            state_rx,
            cancel,
        }
    }

    /// Get a new broadcast receiver for the stream.
    ///
    /// Multiple consumers can subscribe concurrently. A consumer that
    /// falls behind receives [`broadcast::error::RecvError::Lagged`];
    /// there is no buffering or replay beyond the channel capacity.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<StreamEvent>> {
        self.event_rx.resubscribe()
    }

    /// Observe connection state transitions.
    pub fn state(&self) -> watch::Receiver<StreamState> {
        self.state_rx.clone()
    }

    /// Signal the background task to shut down gracefully.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → read → on error, backoff → reconnect.
async fn stream_loop(
    ws_url: Url,
    event_tx: broadcast::Sender<Arc<StreamEvent>>,
    state_tx: watch::Sender<StreamState>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        let _ = state_tx.send(StreamState::Connecting);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = connect_and_read(&ws_url, &event_tx, &state_tx, &cancel) => {
                match result {
                    // Clean disconnect (server close frame or stream ended).
                    // Reset the attempt counter and reconnect immediately.
                    Ok(()) => {
                        if cancel.is_cancelled() {
                            break;
                        }
                        tracing::info!("stream disconnected cleanly, reconnecting");
                        attempt = 0;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, attempt, "stream error");

                        if let Some(max) = reconnect.max_retries {
                            if attempt >= max {
                                tracing::error!(
                                    max_retries = max,
                                    "stream reconnection limit reached, giving up"
                                );
                                let _ = state_tx.send(StreamState::Failed);
                                return;
                            }
                        }

                        let delay = calculate_backoff(attempt, &reconnect);
                        tracing::info!(
                            delay_ms = delay.as_millis() as u64,
                            attempt,
                            "waiting before reconnect"
                        );
                        let _ = state_tx.send(StreamState::Reconnecting { attempt });

                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(delay) => {}
                        }

                        attempt += 1;
                    }
                }
            }
        }
    }

    let _ = state_tx.send(StreamState::Disconnected);
    tracing::debug!("stream loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish a single WebSocket connection, read frames until it drops.
async fn connect_and_read(
    url: &Url,
    event_tx: &broadcast::Sender<Arc<StreamEvent>>,
    state_tx: &watch::Sender<StreamState>,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    tracing::info!(url = %url, "connecting to status stream");

    let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    tracing::info!("status stream connected");
    let _ = state_tx.send(StreamState::Connected);

    let (_write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        let event = parse_frame(&text);
                        // Send errors just mean no active subscribers
                        let _ = event_tx.send(Arc::new(event));
                    }
                    Some(Ok(tungstenite::Message::Ping(_))) => {
                        // tungstenite answers with a pong automatically
                        tracing::trace!("stream ping");
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            tracing::info!(
                                code = %cf.code,
                                reason = %cf.reason,
                                "stream close frame received"
                            );
                        } else {
                            tracing::info!("stream close frame received (no payload)");
                        }
                        return Ok(());
                    }
                    Some(Err(e)) => {
                        return Err(Error::WebSocketConnect(e.to_string()));
                    }
                    None => {
                        // Stream ended without a close frame
                        tracing::info!("status stream ended");
                        return Ok(());
                    }
                    _ => {
                        // Binary, Pong, Frame -- not part of the protocol
                    }
                }
            }
        }
    }
}

// ── Frame parsing ────────────────────────────────────────────────────

/// Parse one text frame into a [`StreamEvent`].
///
/// A malformed frame becomes [`StreamEvent::Malformed`] so the consumer
/// can surface it; the connection keeps reading either way.
fn parse_frame(text: &str) -> StreamEvent {
    match serde_json::from_str::<StatusMessage>(text) {
        Ok(msg) => StreamEvent::Status(msg),
        Err(e) => {
            tracing::warn!(error = %e, "malformed stream frame");
            StreamEvent::Malformed(Arc::new(Error::Parse {
                message: e.to_string(),
                frame: text.to_owned(),
            }))
        }
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`
///
/// Jitter is +-25% to spread reconnects from multiple panels.
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(attempt as i32);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic "jitter" seeded from the attempt number.
    // Not cryptographically random, but good enough for backoff spread.
    let jitter_factor = 1.0 + 0.25 * ((attempt as f64 * 7.3).sin());
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_reconnect_config_retries_forever() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert!(config.max_retries.is_none());
    }

    #[test]
    fn backoff_increases_exponentially() {
        let config = ReconnectConfig::default();

        let d0 = calculate_backoff(0, &config);
        let d1 = calculate_backoff(1, &config);
        let d2 = calculate_backoff(2, &config);

        // Each step should roughly double (within jitter bounds)
        assert!(d1 > d0, "d1 ({d1:?}) should be greater than d0 ({d0:?})");
        assert!(d2 > d1, "d2 ({d2:?}) should be greater than d1 ({d1:?})");
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_retries: None,
        };

        let d10 = calculate_backoff(10, &config);
        // With jitter factor up to 1.25, max effective is 12.5s
        assert!(
            d10 <= Duration::from_secs(13),
            "delay at attempt 10 ({d10:?}) should be capped near max_delay"
        );
    }

    #[test]
    fn parse_valid_status_frame() {
        let frame = r#"{"source":"tstat","data":{"mode":"cool","zones":[]}}"#;

        match parse_frame(frame) {
            StreamEvent::Status(msg) => {
                assert_eq!(msg.source, "tstat");
                assert_eq!(msg.data["mode"], "cool");
            }
            StreamEvent::Malformed(e) => panic!("expected status, got {e}"),
        }
    }

    #[test]
    fn parse_preserves_unknown_sources() {
        // Sources the panel doesn't display still parse; routing happens
        // downstream.
        let frame = r#"{"source":"damperpos","data":{"damperPosition":[15,15,0,0,0,0,0,0]}}"#;

        match parse_frame(frame) {
            StreamEvent::Status(msg) => assert_eq!(msg.source, "damperpos"),
            StreamEvent::Malformed(e) => panic!("expected status, got {e}"),
        }
    }

    #[test]
    fn parse_malformed_frame_is_surfaced_not_dropped() {
        match parse_frame("not json at all") {
            StreamEvent::Malformed(e) => {
                assert!(matches!(&*e, Error::Parse { frame, .. } if frame == "not json at all"));
            }
            StreamEvent::Status(msg) => panic!("expected malformed, got {msg:?}"),
        }
    }

    #[tokio::test]
    async fn retry_cap_moves_state_to_failed_without_breaking_subscription() {
        // Nothing listens on port 9; every connect attempt fails fast.
        let url = Url::parse("ws://127.0.0.1:9/api/ws").expect("valid url");
        let config = ReconnectConfig {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(20),
            max_retries: Some(1),
        };

        let handle = StreamHandle::connect(url, config, CancellationToken::new());
        let mut state = handle.state();

        tokio::time::timeout(
            Duration::from_secs(5),
            state.wait_for(|s| *s == StreamState::Failed),
        )
        .await
        .expect("state change within timeout")
        .expect("state channel alive");

        // The broadcast sender outlives the connection attempts, so
        // subscribing is still valid after failure.
        let _rx = handle.subscribe();
    }

    #[test]
    fn parse_frame_missing_source_is_malformed() {
        match parse_frame(r#"{"data":{"mode":"heat"}}"#) {
            StreamEvent::Malformed(_) => {}
            StreamEvent::Status(msg) => panic!("expected malformed, got {msg:?}"),
        }
    }
}
