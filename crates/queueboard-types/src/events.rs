//! Push events emitted by the backend's queue gateway.
//!
//! Clients treat the event name as a trigger: lifecycle events mean "the
//! aggregate state changed, fetch it again". The payload is carried along
//! for logging only and is never merged into local state.

use core::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::structs::Ticket;

/// A push event: its kind plus the raw payload.
///
/// Serialized as `{"event": "<name>", "data": <payload>}`. The payload is
/// kept as received. It is never required to match a full [`Ticket`], so a
/// partial or empty payload still delivers the trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct QueueEvent {
    #[serde(rename = "event")]
    kind: EventKind,
    #[serde(default)]
    data: serde_json::Value,
}

/// An event name the gateway is not known to emit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown queue event `{0}`")]
pub struct UnknownEventError(pub String);

/// Payload-free discriminant of [`QueueEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum EventKind {
    /// `queueCreated`
    #[serde(rename = "queueCreated")]
    Created,
    /// `queueCalled`
    #[serde(rename = "queueCalled")]
    Called,
    /// `queueFinished`
    #[serde(rename = "queueFinished")]
    Finished,
    /// `queueUpdated`
    #[serde(rename = "queueUpdated")]
    Updated,
    /// `allQueues`
    #[serde(rename = "allQueues")]
    AllQueues,
}

impl EventKind {
    /// Every event the gateway emits.
    pub const ALL: [Self; 5] = [
        Self::Created,
        Self::Called,
        Self::Finished,
        Self::Updated,
        Self::AllQueues,
    ];

    /// Gateway event name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Created => "queueCreated",
            Self::Called => "queueCalled",
            Self::Finished => "queueFinished",
            Self::Updated => "queueUpdated",
            Self::AllQueues => "allQueues",
        }
    }

    /// Look up an event by its gateway name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Whether this event means the aggregate display state changed.
    pub const fn triggers_refetch(self) -> bool {
        !matches!(self, Self::AllQueues)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl QueueEvent {
    /// An event of `kind` carrying `data`.
    pub const fn new(kind: EventKind, data: serde_json::Value) -> Self {
        Self { kind, data }
    }

    /// Decode an event from its gateway name and JSON payload.
    ///
    /// Only the name is checked; the payload is kept whatever its shape.
    pub fn from_parts(name: &str, data: serde_json::Value) -> Result<Self, UnknownEventError> {
        EventKind::from_name(name)
            .map(|kind| Self::new(kind, data))
            .ok_or_else(|| UnknownEventError(name.to_owned()))
    }

    /// The event's discriminant.
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    /// Raw payload.
    pub const fn data(&self) -> &serde_json::Value {
        &self.data
    }

    /// The payload as a ticket, when it is one.
    pub fn ticket(&self) -> Option<Ticket> {
        match self.kind {
            EventKind::AllQueues => None,
            _ => serde_json::from_value(self.data.clone()).ok(),
        }
    }

    /// The `allQueues` payload as a ticket list, when it is one.
    pub fn tickets(&self) -> Option<Vec<Ticket>> {
        match self.kind {
            EventKind::AllQueues => serde_json::from_value(self.data.clone()).ok(),
            _ => None,
        }
    }

    /// Whether this event means the aggregate display state changed.
    pub const fn triggers_refetch(&self) -> bool {
        self.kind.triggers_refetch()
    }
}
