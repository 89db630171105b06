//! Shared type definitions for the Queueboard queue display.
//!
//! This crate is the single source of truth for the wire contract between
//! the queue backend and its clients. Types defined here flow downstream to
//! `TypeScript` via `ts-rs` for the web display.
//!
//! # Modules
//!
//! - [`ids`] -- String-backed identifier wrappers for tickets and users
//! - [`enums`] -- Counter types and ticket statuses
//! - [`structs`] -- Tickets, per-counter status, and the aggregate display state
//! - [`events`] -- Push events emitted by the backend gateway
//! - [`auth`] -- Login payloads and the authenticated user record

pub mod auth;
pub mod enums;
pub mod events;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use auth::{ApiErrorBody, ErrorMessage, LoginRequest, LoginResponse, User};
pub use enums::{CounterType, ParseCounterTypeError, TicketStatus};
pub use events::{EventKind, QueueEvent, UnknownEventError};
pub use ids::{TicketId, UserId};
pub use structs::{CounterStatus, CurrentTicket, DisplayState, ServingProjection, Ticket, Waiting};
