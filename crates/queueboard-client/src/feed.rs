//! Push-event feed from the queue gateway.
//!
//! [`EventFeed`] keeps one WebSocket connection to the gateway, speaks the
//! Socket.IO framing in [`crate::socketio`], and forwards what it sees as
//! [`FeedEvent`]s on an `mpsc` channel:
//!
//! ```text
//! gateway --ws--> EventFeed --mpsc--> Connected | Queue(event) | Disconnected
//! ```
//!
//! When the connection drops the feed reports `Disconnected` and reconnects
//! with the same backoff a Socket.IO browser client uses. That is the only
//! retry anywhere in the client. The feed stops when the receiving side of
//! the channel is dropped.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use queueboard_types::QueueEvent;
use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::FeedError;
use crate::socketio::Packet;

/// Path and query of the Socket.IO WebSocket endpoint.
const SOCKET_IO_PATH: &str = "/socket.io/?EIO=4&transport=websocket";

/// Silence tolerated before the open handshake tells us the real window.
const DEFAULT_LIVENESS_WINDOW: Duration = Duration::from_secs(45);

/// Something the feed observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// The gateway accepted the namespace connection.
    Connected,
    /// The connection was lost; a reconnect is pending.
    Disconnected,
    /// A decoded push event.
    Queue(QueueEvent),
}

// ---------------------------------------------------------------------------
// Backoff
// ---------------------------------------------------------------------------

/// Exponential reconnect backoff with jitter.
///
/// Defaults match the Socket.IO client: 1 s first delay, doubling up to
/// 5 s, randomized by ±50 %.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    /// Delay before the first reconnect attempt.
    pub initial: Duration,
    /// Upper bound for the un-jittered delay.
    pub max: Duration,
    /// Jitter as a fraction of the delay, between 0 and 1.
    pub randomization: f64,
    attempts: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(5), 0.5)
    }
}

impl Backoff {
    /// A backoff with explicit bounds.
    pub fn new(initial: Duration, max: Duration, randomization: f64) -> Self {
        Self {
            initial,
            max,
            randomization: randomization.clamp(0.0, 1.0),
            attempts: 0,
        }
    }

    /// Delay before the next attempt.
    pub fn next_delay<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Duration {
        let factor = 2_u32.saturating_pow(self.attempts);
        self.attempts = self.attempts.saturating_add(1);

        let base = self.initial.saturating_mul(factor).min(self.max);
        if self.randomization <= 0.0 {
            return base;
        }
        let spread = rng.random_range(-self.randomization..=self.randomization);
        base.mul_f64((1.0 + spread).max(0.0))
    }

    /// Start over after a successful connection.
    pub const fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Attempts since the last reset.
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }
}

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

/// How one connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// The consumer went away; stop for good.
    ConsumerGone,
    /// The connection dropped; reconnect.
    Dropped,
}

/// Connection manager for the gateway's push events.
#[derive(Debug, Clone)]
pub struct EventFeed {
    url: String,
    backoff: Backoff,
}

impl EventFeed {
    /// A feed for the gateway at `ws_base_url` (e.g. `ws://localhost:3000`).
    pub fn new(ws_base_url: &str) -> Self {
        Self {
            url: format!("{}{SOCKET_IO_PATH}", ws_base_url.trim_end_matches('/')),
            backoff: Backoff::default(),
        }
    }

    /// Replace the reconnect backoff.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Full WebSocket URL the feed connects to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Run the feed on its own task.
    pub fn spawn(self, tx: mpsc::Sender<FeedEvent>) -> JoinHandle<()> {
        tokio::spawn(self.run(tx))
    }

    /// Connect, forward events, and reconnect until `tx` is closed.
    pub async fn run(mut self, tx: mpsc::Sender<FeedEvent>) {
        info!(url = self.url, "event feed starting");

        loop {
            let mut connected = false;
            let outcome = self.session(&tx, &mut connected).await;

            if connected {
                self.backoff.reset();
                if tx.send(FeedEvent::Disconnected).await.is_err() {
                    break;
                }
            }

            match outcome {
                Ok(SessionEnd::ConsumerGone) => break,
                Ok(SessionEnd::Dropped) => info!(url = self.url, "event feed disconnected"),
                Err(e) => warn!(url = self.url, error = %e, "event feed connection failed"),
            }

            let delay = self.backoff.next_delay(&mut rand::rng());
            debug!(
                delay_ms = delay.as_millis(),
                attempt = self.backoff.attempts(),
                "event feed reconnecting"
            );
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = tx.closed() => break,
            }
        }

        info!(url = self.url, "event feed stopped");
    }

    /// One connection, from handshake to drop.
    async fn session(
        &self,
        tx: &mpsc::Sender<FeedEvent>,
        connected: &mut bool,
    ) -> Result<SessionEnd, FeedError> {
        let (socket, _) = tokio::select! {
            result = tokio_tungstenite::connect_async(self.url.as_str()) => result?,
            () = tx.closed() => return Ok(SessionEnd::ConsumerGone),
        };
        debug!(url = self.url, "websocket open");
        let (mut sink, mut stream) = socket.split();
        let mut window = DEFAULT_LIVENESS_WINDOW;

        loop {
            let frame = tokio::select! {
                frame = tokio::time::timeout(window, stream.next()) => frame,
                () = tx.closed() => {
                    let _ = sink.send(Message::text(Packet::Disconnect.encode())).await;
                    let _ = sink.close().await;
                    return Ok(SessionEnd::ConsumerGone);
                }
            };

            let text = match frame {
                Err(_) => {
                    warn!(window_ms = window.as_millis(), "gateway heartbeat timed out");
                    return Ok(SessionEnd::Dropped);
                }
                Ok(None | Some(Ok(Message::Close(_)))) => return Ok(SessionEnd::Dropped),
                Ok(Some(Err(e))) => return Err(e.into()),
                Ok(Some(Ok(Message::Text(text)))) => text,
                Ok(Some(Ok(_))) => continue,
            };

            let packet = match Packet::decode(text.as_str()) {
                Ok(packet) => packet,
                Err(e) => {
                    debug!(error = %e, "skipping undecodable frame");
                    continue;
                }
            };

            let forward = match packet {
                Packet::Open(handshake) => {
                    window = handshake.liveness_window();
                    sink.send(Message::text(Packet::Connect.encode())).await?;
                    None
                }
                Packet::Connect => {
                    *connected = true;
                    info!("event feed connected");
                    Some(FeedEvent::Connected)
                }
                Packet::Ping => {
                    sink.send(Message::text(Packet::Pong.encode())).await?;
                    None
                }
                Packet::Event { name, data } => match QueueEvent::from_parts(&name, data) {
                    Ok(event) => {
                        debug!(event = %event.kind(), "push event received");
                        Some(FeedEvent::Queue(event))
                    }
                    Err(e) => {
                        debug!(event = name, error = %e, "skipping unrecognized push event");
                        None
                    }
                },
                Packet::ConnectError(message) => return Err(FeedError::Refused(message)),
                Packet::Disconnect | Packet::Close => return Ok(SessionEnd::Dropped),
                Packet::Pong | Packet::Other(_) => None,
            };

            if let Some(event) = forward {
                if tx.send(event).await.is_err() {
                    return Ok(SessionEnd::ConsumerGone);
                }
            }
        }
    }
}
