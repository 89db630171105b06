//! REST client for the queue backend.
//!
//! [`QueueApi`] is the seam the sync layer depends on; [`QueueClient`] is
//! the `reqwest` implementation. A client carries its own bearer token, so
//! there is no process-wide credential: build one client per session and an
//! anonymous one for the public display.

use std::future::Future;

use queueboard_types::{
    ApiErrorBody, CounterType, DisplayState, LoginRequest, LoginResponse, Ticket, TicketId,
};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ClientError;

/// Queue operations used by the display and the staff console.
///
/// Methods return `Send` futures so callers can drive them from spawned
/// tasks. Async methods are not dyn-compatible, so consumers take the API
/// as a generic parameter.
pub trait QueueApi: Send + Sync + 'static {
    /// `GET /queue`: the aggregate display state.
    fn display_state(&self) -> impl Future<Output = Result<DisplayState, ClientError>> + Send;

    /// `GET /queue/next?counterType=<T>`: call the next waiting ticket.
    fn call_next(
        &self,
        counter: CounterType,
    ) -> impl Future<Output = Result<Ticket, ClientError>> + Send;

    /// `PATCH /queue/:id/finish`: mark a ticket finished.
    fn finish(&self, id: &TicketId) -> impl Future<Output = Result<(), ClientError>> + Send;
}

/// HTTP client for one backend and, optionally, one session.
#[derive(Clone)]
pub struct QueueClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl QueueClient {
    /// Create an anonymous client from configuration.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_owned(),
            token: None,
        })
    }

    /// Create an anonymous client with default HTTP settings.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            token: None,
        }
    }

    /// A copy of this client that sends `token` as its bearer credential.
    #[must_use]
    pub fn authenticated(&self, token: impl Into<String>) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            token: Some(token.into()),
        }
    }

    /// A copy of this client with no credential.
    #[must_use]
    pub fn anonymous(&self) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            token: None,
        }
    }

    /// Whether requests carry a bearer token.
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Backend base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /auth/login`.
    ///
    /// The request is validated locally first and never sent when invalid.
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ClientError> {
        validator::Validate::validate(request)
            .map_err(|e| ClientError::Validation(e.to_string()))?;
        let response = self
            .request(Method::POST, "/auth/login")
            .json(request)
            .send()
            .await?;
        decode_json(response).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        debug!(%method, url = url, authenticated = self.token.is_some(), "queue API request");
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

impl QueueApi for QueueClient {
    async fn display_state(&self) -> Result<DisplayState, ClientError> {
        let response = self.request(Method::GET, "/queue").send().await?;
        decode_json(response).await
    }

    async fn call_next(&self, counter: CounterType) -> Result<Ticket, ClientError> {
        let response = self
            .request(Method::GET, "/queue/next")
            .query(&[("counterType", counter.label())])
            .send()
            .await?;
        decode_json(response).await
    }

    async fn finish(&self, id: &TicketId) -> Result<(), ClientError> {
        let path = format!("/queue/{id}/finish");
        let response = self.request(Method::PATCH, &path).send().await?;
        check_status(response).await.map(drop)
    }
}

impl std::fmt::Debug for QueueClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

/// Turn a non-success response into [`ClientError::Server`].
async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(|b| b.text());
    Err(ClientError::Server {
        status: status.as_u16(),
        message,
    })
}

/// Check the status, then decode a JSON body.
async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let response = check_status(response).await?;
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let client = QueueClient::with_base_url("http://localhost:3000/");
        assert_eq!(client.base_url(), "http://localhost:3000");
    }

    #[test]
    fn authenticated_and_anonymous_copies() {
        let client = QueueClient::with_base_url("http://localhost:3000");
        assert!(!client.is_authenticated());

        let staff = client.authenticated("jwt-abc");
        assert!(staff.is_authenticated());
        assert!(!staff.anonymous().is_authenticated());
        assert!(!client.is_authenticated(), "original client is untouched");
    }

    #[test]
    fn debug_hides_token() {
        let client = QueueClient::with_base_url("http://localhost:3000").authenticated("jwt-abc");
        let debug = format!("{client:?}");
        assert!(!debug.contains("jwt-abc"));
        assert!(debug.contains("authenticated: true"));
    }
}
