//! Socket.IO v4 text framing over a raw WebSocket.
//!
//! The queue gateway is a Socket.IO server. Over the `websocket` transport
//! every frame is an engine.io packet whose first character is the packet
//! type; `4` (message) frames carry a Socket.IO packet whose next character
//! is the Socket.IO type. Only the text subset the gateway uses is decoded:
//!
//! | frame      | packet |
//! |------------|--------|
//! | `0{...}`   | [`Packet::Open`] |
//! | `1`        | [`Packet::Close`] |
//! | `2` / `3`  | [`Packet::Ping`] / [`Packet::Pong`] |
//! | `40...`    | [`Packet::Connect`] |
//! | `41`       | [`Packet::Disconnect`] |
//! | `42[...]`  | [`Packet::Event`] |
//! | `44{...}`  | [`Packet::ConnectError`] |

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Handshake sent by the server in the engine.io open packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    /// Engine.io session id.
    pub sid: String,
    /// Interval between server pings, in milliseconds.
    pub ping_interval: u64,
    /// Grace period after a missed ping, in milliseconds.
    pub ping_timeout: u64,
}

impl OpenHandshake {
    /// How long the connection may stay silent before it is considered dead.
    pub const fn liveness_window(&self) -> Duration {
        Duration::from_millis(self.ping_interval.saturating_add(self.ping_timeout))
    }
}

/// One decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Engine.io open handshake.
    Open(OpenHandshake),
    /// Engine.io close.
    Close,
    /// Heartbeat from the server.
    Ping,
    /// Heartbeat reply.
    Pong,
    /// Namespace connect (client request, or server acknowledgement).
    Connect,
    /// Namespace disconnect.
    Disconnect,
    /// A named event with its first argument (`null` when absent).
    Event {
        /// Event name.
        name: String,
        /// First event argument.
        data: serde_json::Value,
    },
    /// The server refused the namespace connection.
    ConnectError(String),
    /// A frame this client does not act on (acks, binary, upgrade, noop).
    Other(String),
}

/// A frame that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed socket.io frame {frame:?}: {reason}")]
pub struct FrameError {
    /// The offending frame, truncated for logging.
    pub frame: String,
    /// What was wrong with it.
    pub reason: String,
}

impl FrameError {
    fn new(frame: &str, reason: impl Into<String>) -> Self {
        Self {
            frame: frame.chars().take(80).collect(),
            reason: reason.into(),
        }
    }
}

impl Packet {
    /// Decode one text frame.
    pub fn decode(frame: &str) -> Result<Self, FrameError> {
        let mut chars = frame.chars();
        let engine_type = chars.next().ok_or_else(|| FrameError::new(frame, "empty frame"))?;
        let rest = chars.as_str();

        match engine_type {
            '0' => serde_json::from_str(rest)
                .map(Self::Open)
                .map_err(|e| FrameError::new(frame, format!("bad open handshake: {e}"))),
            '1' => Ok(Self::Close),
            '2' => Ok(Self::Ping),
            '3' => Ok(Self::Pong),
            '4' => decode_socket_packet(frame, rest),
            '5' | '6' => Ok(Self::Other(frame.to_owned())),
            other => Err(FrameError::new(frame, format!("unknown engine.io type {other:?}"))),
        }
    }

    /// Encode a packet as a text frame.
    pub fn encode(&self) -> String {
        match self {
            Self::Open(handshake) => {
                format!("0{}", serde_json::to_string(handshake).unwrap_or_default())
            }
            Self::Close => "1".to_owned(),
            Self::Ping => "2".to_owned(),
            Self::Pong => "3".to_owned(),
            Self::Connect => "40".to_owned(),
            Self::Disconnect => "41".to_owned(),
            Self::Event { name, data } => {
                let args = serde_json::Value::Array(vec![
                    serde_json::Value::String(name.clone()),
                    data.clone(),
                ]);
                format!("42{args}")
            }
            Self::ConnectError(message) => {
                format!("44{}", serde_json::json!({ "message": message }))
            }
            Self::Other(raw) => raw.clone(),
        }
    }
}

/// Decode the Socket.IO packet inside an engine.io message.
fn decode_socket_packet(frame: &str, body: &str) -> Result<Packet, FrameError> {
    let mut chars = body.chars();
    let socket_type = chars
        .next()
        .ok_or_else(|| FrameError::new(frame, "message without socket.io type"))?;
    let payload = strip_namespace(chars.as_str());

    match socket_type {
        '0' => Ok(Packet::Connect),
        '1' => Ok(Packet::Disconnect),
        '2' => decode_event(frame, payload),
        '4' => {
            let message = serde_json::from_str::<serde_json::Value>(payload)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(ToOwned::to_owned))
                .unwrap_or_else(|| payload.to_owned());
            Ok(Packet::ConnectError(message))
        }
        '3' | '5' | '6' => Ok(Packet::Other(frame.to_owned())),
        other => Err(FrameError::new(frame, format!("unknown socket.io type {other:?}"))),
    }
}

/// Drop a leading `/namespace,` if present.
fn strip_namespace(payload: &str) -> &str {
    if payload.starts_with('/') {
        payload.split_once(',').map_or("", |(_, rest)| rest)
    } else {
        payload
    }
}

/// Decode `[name, arg, ...]`, skipping an optional ack id before the array.
fn decode_event(frame: &str, payload: &str) -> Result<Packet, FrameError> {
    let array = payload.trim_start_matches(|c: char| c.is_ascii_digit());
    let args: Vec<serde_json::Value> = serde_json::from_str(array)
        .map_err(|e| FrameError::new(frame, format!("event arguments are not a JSON array: {e}")))?;

    let mut args = args.into_iter();
    let name = match args.next() {
        Some(serde_json::Value::String(name)) => name,
        _ => return Err(FrameError::new(frame, "event name missing")),
    };
    let data = args.next().unwrap_or(serde_json::Value::Null);
    Ok(Packet::Event { name, data })
}
