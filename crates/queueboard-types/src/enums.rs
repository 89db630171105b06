//! Enumeration types for the queue contract.
//!
//! Both enums travel as upper-case strings (`"BILLING"`, `"SERVING"`), the
//! casing the backend uses in JSON bodies and in the `counterType` query
//! parameter.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// A service counter patients queue for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum CounterType {
    /// Billing and insurance desk.
    Billing,
    /// Laboratory specimen collection.
    Lab,
    /// Payment window.
    Cashier,
}

impl CounterType {
    /// Every counter, in the order the board and console list them.
    pub const ALL: [Self; 3] = [Self::Billing, Self::Lab, Self::Cashier];

    /// Wire label, also used when announcing a ticket.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Billing => "BILLING",
            Self::Lab => "LAB",
            Self::Cashier => "CASHIER",
        }
    }
}

impl fmt::Display for CounterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Returned when a string names no known counter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown counter type: {0} (expected BILLING, LAB or CASHIER)")]
pub struct ParseCounterTypeError(pub String);

impl FromStr for CounterType {
    type Err = ParseCounterTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|counter| counter.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseCounterTypeError(s.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Ticket lifecycle
// ---------------------------------------------------------------------------

/// Where a ticket is in its lifecycle.
///
/// Tickets only move forward: `Waiting` -> `Serving` -> `Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum TicketStatus {
    /// Issued and waiting to be called.
    Waiting,
    /// Called to a counter.
    Serving,
    /// Served and closed.
    Finished,
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Waiting => "WAITING",
            Self::Serving => "SERVING",
            Self::Finished => "FINISHED",
        })
    }
}
