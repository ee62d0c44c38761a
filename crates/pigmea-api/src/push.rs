//! Push notification stream with auto-reconnect.
//!
//! Connects to the backend's WebSocket endpoint and fans parsed frames out
//! through a [`tokio::sync::broadcast`] channel. Reconnects with
//! exponential backoff + jitter.
//!
//! Frames are JSON, either `{"event": "pedido-updated", "data": {...}}` or
//! the array form `["pedido-updated", {...}]`. This module only splits the
//! envelope; decoding the payload into records is the consumer's job.
//!
//! # Example
//!
//! ```rust,ignore
//! use pigmea_api::push::{PushHandle, ReconnectConfig};
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! let cancel = CancellationToken::new();
//! let url = Url::parse("ws://localhost:8080/ws")?;
//!
//! let handle = PushHandle::spawn(url, Vec::new(), ReconnectConfig::default(), cancel.clone());
//! let mut rx = handle.subscribe();
//!
//! while let Ok(frame) = rx.recv().await {
//!     println!("{}", frame.event);
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;

const FRAME_CHANNEL_CAPACITY: usize = 1024;

// ── PushFrame ────────────────────────────────────────────────────────

/// One push notification: an event name and its raw JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushFrame {
    /// Event name, e.g. `"cliente-created"`.
    pub event: String,

    /// Event payload, untouched.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl PushFrame {
    /// Parse a text frame in either the object or the array form.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        use serde::de::Error as _;

        match serde_json::from_str::<serde_json::Value>(text)? {
            serde_json::Value::Array(mut parts) if !parts.is_empty() => {
                let data = if parts.len() > 1 {
                    parts.swap_remove(1)
                } else {
                    serde_json::Value::Null
                };
                match parts.swap_remove(0) {
                    serde_json::Value::String(event) => Ok(Self { event, data }),
                    _ => Err(serde_json::Error::custom("event name must be a string")),
                }
            }
            value @ serde_json::Value::Object(_) => serde_json::from_value(value),
            _ => Err(serde_json::Error::custom("expected an object or [event, data] array")),
        }
    }
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
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

// ── PushHandle ───────────────────────────────────────────────────────

/// Handle to a running push stream.
///
/// Call [`shutdown`](Self::shutdown) (or cancel the token passed to
/// [`spawn`](Self::spawn)) to tear down the background task.
pub struct PushHandle {
    frame_rx: broadcast::Receiver<Arc<PushFrame>>,
    cancel: CancellationToken,
}

impl PushHandle {
    /// Spawn the connect/reconnect loop and return immediately.
    ///
    /// `headers` are sent on every upgrade request (identity, bearer token).
    pub fn spawn(
        url: Url,
        headers: Vec<(String, String)>,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
    ) -> Self {
        let (frame_tx, frame_rx) = broadcast::channel(FRAME_CHANNEL_CAPACITY);

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            ws_loop(url, headers, frame_tx, reconnect, task_cancel).await;
        });

        Self { frame_rx, cancel }
    }

    /// A new receiver for the frame stream.
    ///
    /// A consumer that falls behind receives
    /// [`broadcast::error::RecvError::Lagged`].
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<PushFrame>> {
        self.frame_rx.resubscribe()
    }

    /// Signal the background task to stop.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

async fn ws_loop(
    url: Url,
    headers: Vec<(String, String)>,
    frame_tx: broadcast::Sender<Arc<PushFrame>>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_read(&url, &headers, &frame_tx, &cancel) => {
                match result {
                    Ok(()) => {
                        if cancel.is_cancelled() {
                            break;
                        }
                        tracing::info!("push stream disconnected cleanly, reconnecting");
                        attempt = 0;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, attempt, "push stream error");

                        if reconnect.max_retries.is_some_and(|max| attempt >= max) {
                            tracing::error!(attempt, "push reconnection limit reached, giving up");
                            break;
                        }

                        let delay = calculate_backoff(attempt, &reconnect);
                        tracing::info!(delay = ?delay, attempt, "waiting before reconnect");

                        tokio::select! {
                            biased;
                            () = cancel.cancelled() => break,
                            () = tokio::time::sleep(delay) => {}
                        }

                        attempt = attempt.saturating_add(1);
                    }
                }
            }
        }
    }

    tracing::debug!("push loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

async fn connect_and_read(
    url: &Url,
    headers: &[(String, String)],
    frame_tx: &broadcast::Sender<Arc<PushFrame>>,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    tracing::info!(url = %url, "connecting push stream");

    let uri: tungstenite::http::Uri = url
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()))?;

    let mut request = ClientRequestBuilder::new(uri);
    for (name, value) in headers {
        request = request.with_header(name.clone(), value.clone());
    }

    let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    tracing::info!("push stream connected");

    let (_write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            message = read.next() => {
                match message {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        parse_and_broadcast(text.as_str(), frame_tx);
                    }
                    Some(Ok(tungstenite::Message::Close(close))) => {
                        if let Some(cf) = close {
                            tracing::info!(code = %cf.code, reason = %cf.reason, "push close frame");
                        } else {
                            tracing::info!("push close frame (no payload)");
                        }
                        return Ok(());
                    }
                    Some(Err(e)) => {
                        return Err(Error::WebSocketConnect(e.to_string()));
                    }
                    None => {
                        tracing::info!("push stream ended");
                        return Ok(());
                    }
                    Some(Ok(_)) => {
                        // ping/pong are answered by tungstenite; binary is unused
                    }
                }
            }
        }
    }
}

// ── Frame parsing ────────────────────────────────────────────────────

fn parse_and_broadcast(text: &str, frame_tx: &broadcast::Sender<Arc<PushFrame>>) {
    match PushFrame::parse(text) {
        Ok(frame) => {
            tracing::trace!(event = %frame.event, "push frame");
            // no receivers is fine
            let _ = frame_tx.send(Arc::new(frame));
        }
        Err(e) => {
            tracing::debug!(error = %e, "ignoring malformed push frame");
        }
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) * (1 +- 0.25)`
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt.min(30)).unwrap_or(30);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic spread seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();

    Duration::from_secs_f64((capped * jitter_factor).max(0.0))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert!(config.max_retries.is_none());
    }

    #[test]
    fn backoff_increases_then_caps() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_retries: None,
        };

        let d0 = calculate_backoff(0, &config);
        let d2 = calculate_backoff(2, &config);
        assert!(d2 > d0, "d2 ({d2:?}) should exceed d0 ({d0:?})");

        let d20 = calculate_backoff(20, &config);
        assert!(d20 <= Duration::from_millis(12_500), "{d20:?} not capped");
    }

    #[test]
    fn parses_object_frame() {
        let frame = PushFrame::parse(
            r#"{"event":"cliente-created","data":{"record":{"id":"1"}},"timestamp":"2026-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(frame.event, "cliente-created");
        assert_eq!(frame.data["record"]["id"], "1");
    }

    #[test]
    fn parses_array_frame() {
        let frame = PushFrame::parse(r#"["pedido-deleted",{"pedidoId":"9"}]"#).unwrap();
        assert_eq!(frame.event, "pedido-deleted");
        assert_eq!(frame.data["pedidoId"], "9");
    }

    #[test]
    fn broadcasts_valid_frames_and_skips_garbage() {
        let (tx, mut rx) = broadcast::channel(16);

        parse_and_broadcast("not json at all", &tx);
        assert!(rx.try_recv().is_err());

        parse_and_broadcast(r#"{"event":"vendedor-updated","data":{}}"#, &tx);
        let frame = rx.try_recv().unwrap();
        assert_eq!(frame.event, "vendedor-updated");
    }
}
