//! Queue backend client for Queueboard.
//!
//! This crate covers everything that crosses the network or touches disk:
//!
//! - **REST** ([`api`]): aggregate display state, call-next, finish, and
//!   login, behind the [`QueueApi`] trait the sync layer is generic over
//! - **Push events** ([`feed`]): a Socket.IO-over-WebSocket connection to
//!   the queue gateway with the browser client's reconnect backoff
//! - **Sessions** ([`auth`], [`store`]): login/logout with the `token` and
//!   `user` keys persisted in a local credential file
//! - **Configuration** ([`config`]): environment-driven settings
//!
//! # Credentials
//!
//! There is no shared default header. Each [`QueueClient`] carries its own
//! optional bearer token; [`auth::Session::client`] derives an
//! authenticated client from an anonymous one.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod feed;
pub mod socketio;
pub mod store;

// Re-export primary types for convenience.
pub use api::{QueueApi, QueueClient};
pub use auth::Session;
pub use config::{ClientConfig, SpeechConfig};
pub use error::{ClientError, FeedError};
pub use feed::{Backoff, EventFeed, FeedEvent};
pub use store::CredentialStore;
