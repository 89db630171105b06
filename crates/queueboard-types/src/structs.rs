//! Ticket records and the aggregate display state.
//!
//! The backend owns every ticket. Clients hold read-only copies
//! ([`Ticket`]) or, when all they have is the aggregate snapshot, a
//! best-effort [`ServingProjection`] that deliberately carries no
//! timestamps or status of its own.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{CounterType, TicketStatus};
use crate::ids::TicketId;

// ---------------------------------------------------------------------------
// Ticket
// ---------------------------------------------------------------------------

/// A full ticket record as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Ticket {
    /// Ticket number.
    pub id: TicketId,
    /// Counter the ticket queues for.
    pub counter_type: CounterType,
    /// Lifecycle status.
    pub status: TicketStatus,
    /// When the ticket was issued.
    pub created_at: DateTime<Utc>,
    /// When the ticket last changed status.
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Aggregate display state
// ---------------------------------------------------------------------------

/// Tickets currently being served at one counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct CounterStatus {
    /// The counter.
    pub counter_type: CounterType,
    /// Ticket numbers being served, usually zero or one.
    #[serde(default)]
    pub serving: Vec<TicketId>,
}

/// Aggregate state returned by `GET /queue`.
///
/// The backend recomputes this on every lifecycle event. Clients replace
/// their copy wholesale and never merge deltas into it.
///
/// Backends have been seen reporting the waiting line either as a list of
/// ticket numbers (`waiting`) or as a bare count (`waitingCount`). Both
/// fields are kept as received; [`DisplayState::waiting`] exposes whichever
/// one is present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct DisplayState {
    /// Per-counter serving lists.
    #[serde(default)]
    pub services: Vec<CounterStatus>,
    /// Waiting ticket numbers, when the backend lists them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub waiting: Option<Vec<TicketId>>,
    /// Number of waiting tickets, when the backend only counts them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub waiting_count: Option<u32>,
    /// When the backend last recomputed the state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// The waiting line as reported in a [`DisplayState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waiting<'a> {
    /// The backend listed the waiting ticket numbers.
    Tickets(&'a [TicketId]),
    /// The backend reported only a count.
    Count(u32),
    /// The backend reported neither field.
    Unreported,
}

impl Waiting<'_> {
    /// Number of waiting tickets (zero when unreported).
    pub fn count(&self) -> usize {
        match self {
            Self::Tickets(ids) => ids.len(),
            Self::Count(n) => usize::try_from(*n).unwrap_or(usize::MAX),
            Self::Unreported => 0,
        }
    }
}

impl DisplayState {
    /// The waiting line in whichever shape the backend sent.
    ///
    /// A listed line wins when a backend sends both fields.
    pub fn waiting(&self) -> Waiting<'_> {
        match (&self.waiting, self.waiting_count) {
            (Some(ids), _) => Waiting::Tickets(ids),
            (None, Some(n)) => Waiting::Count(n),
            (None, None) => Waiting::Unreported,
        }
    }

    /// Serving status for one counter, if the snapshot mentions it.
    pub fn counter(&self, counter: CounterType) -> Option<&CounterStatus> {
        self.services.iter().find(|s| s.counter_type == counter)
    }

    /// Best-effort "currently serving" entry for every counter that has one.
    ///
    /// Takes the first ticket in each counter's serving list.
    pub fn projections(&self) -> BTreeMap<CounterType, ServingProjection> {
        self.services
            .iter()
            .filter_map(|service| {
                service.serving.first().map(|id| {
                    (
                        service.counter_type,
                        ServingProjection {
                            id: id.clone(),
                            counter_type: service.counter_type,
                        },
                    )
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Console view of a counter
// ---------------------------------------------------------------------------

/// A ticket inferred from the aggregate snapshot rather than fetched.
///
/// The snapshot only carries ticket numbers, so this is all that can be
/// known without another round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ServingProjection {
    /// Ticket number.
    pub id: TicketId,
    /// Counter the ticket is being served at.
    pub counter_type: CounterType,
}

/// What the staff console holds as the active ticket for a counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum CurrentTicket {
    /// Full record returned by a call-next command.
    Confirmed(Ticket),
    /// Inferred from the display snapshot at start-up.
    Projected(ServingProjection),
}

impl CurrentTicket {
    /// Ticket number.
    pub const fn id(&self) -> &TicketId {
        match self {
            Self::Confirmed(ticket) => &ticket.id,
            Self::Projected(projection) => &projection.id,
        }
    }

    /// Counter the ticket is being served at.
    pub const fn counter_type(&self) -> CounterType {
        match self {
            Self::Confirmed(ticket) => ticket.counter_type,
            Self::Projected(projection) => projection.counter_type,
        }
    }

    /// Status, known only for confirmed records.
    pub const fn status(&self) -> Option<TicketStatus> {
        match self {
            Self::Confirmed(ticket) => Some(ticket.status),
            Self::Projected(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &serde_json::Value) -> DisplayState {
        serde_json::from_value(json.clone()).unwrap_or_default()
    }

    #[test]
    fn snapshot_with_waiting_list() {
        let state = parse(&serde_json::json!({
            "services": [{"counterType": "LAB", "serving": ["L001"]}],
            "waiting": ["B010", "B011"],
            "updatedAt": "2025-03-01T08:00:00Z"
        }));

        assert_eq!(state.waiting().count(), 2);
        let lab = state.counter(CounterType::Lab);
        assert_eq!(
            lab.and_then(|s| s.serving.first()).map(TicketId::as_str),
            Some("L001")
        );
        assert!(state.updated_at.is_some());
    }

    #[test]
    fn snapshot_with_waiting_count() {
        let state = parse(&serde_json::json!({
            "services": [],
            "waitingCount": 7
        }));
        assert_eq!(state.waiting(), Waiting::Count(7));
        assert_eq!(state.waiting().count(), 7);
    }

    #[test]
    fn snapshot_without_waiting_fields() {
        let state = parse(&serde_json::json!({"services": []}));
        assert_eq!(state.waiting(), Waiting::Unreported);
        assert_eq!(state.waiting().count(), 0);
    }

    #[test]
    fn projections_take_first_serving_ticket() {
        let state = parse(&serde_json::json!({
            "services": [
                {"counterType": "BILLING", "serving": ["B003", "B004"]},
                {"counterType": "LAB", "serving": []},
                {"counterType": "CASHIER", "serving": ["C009"]}
            ],
            "waiting": []
        }));

        let projections = state.projections();
        assert_eq!(projections.len(), 2);
        assert_eq!(
            projections.get(&CounterType::Billing).map(|p| p.id.as_str()),
            Some("B003")
        );
        assert!(!projections.contains_key(&CounterType::Lab));
        assert_eq!(
            projections.get(&CounterType::Cashier).map(|p| p.counter_type),
            Some(CounterType::Cashier)
        );
    }

    #[test]
    fn ticket_uses_camel_case_fields() {
        let json = serde_json::json!({
            "id": "B012",
            "counterType": "BILLING",
            "status": "SERVING",
            "createdAt": "2025-03-01T08:00:00Z",
            "updatedAt": "2025-03-01T08:05:00Z"
        });
        let ticket: Result<Ticket, _> = serde_json::from_value(json);
        let ticket = ticket.ok();
        assert_eq!(ticket.as_ref().map(|t| t.id.as_str()), Some("B012"));
        assert_eq!(ticket.map(|t| t.status), Some(TicketStatus::Serving));
    }

    #[test]
    fn projected_ticket_has_no_status() {
        let current = CurrentTicket::Projected(ServingProjection {
            id: TicketId::new("L001"),
            counter_type: CounterType::Lab,
        });
        assert_eq!(current.status(), None);
        assert_eq!(current.id().as_str(), "L001");
        assert_eq!(current.counter_type(), CounterType::Lab);
    }
}
