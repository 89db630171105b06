//! Login payloads, the staff user record, and the backend's error body.

use core::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use validator::Validate;

use crate::enums::CounterType;
use crate::ids::UserId;

/// A logged-in staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct User {
    /// Account id.
    pub id: UserId,
    /// Login email.
    pub email: String,
    /// Counter the account is assigned to, if any.
    #[serde(default)]
    pub counter_type: Option<CounterType>,
}

/// Body of `POST /auth/login`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Validate, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LoginRequest {
    /// Login email.
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    /// Plain-text password, sent once over TLS.
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub password: String,
}

impl LoginRequest {
    /// Build a login request.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Successful response of `POST /auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LoginResponse {
    /// Bearer token for subsequent requests.
    pub access_token: String,
    /// The authenticated user.
    pub user: User,
}

/// Error body the backend sends with non-2xx responses.
///
/// Only `message` is read. Validation failures carry a list of messages,
/// everything else a single string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ApiErrorBody {
    /// Human-readable reason.
    #[serde(default)]
    pub message: Option<ErrorMessage>,
}

/// The `message` field of an [`ApiErrorBody`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export, export_to = "bindings/")]
pub enum ErrorMessage {
    /// One message.
    Single(String),
    /// Several messages (request validation).
    Many(Vec<String>),
}

impl ApiErrorBody {
    /// The message as one line, or `None` when the backend gave none.
    pub fn text(&self) -> Option<String> {
        let text = match self.message.as_ref()? {
            ErrorMessage::Single(message) => message.trim().to_owned(),
            ErrorMessage::Many(messages) => messages.join(", "),
        };
        (!text.is_empty()).then_some(text)
    }
}
