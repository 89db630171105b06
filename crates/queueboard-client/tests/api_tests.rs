//! Integration tests for the REST client and session handling.
//!
//! Each test stands up a `mockito` server playing the queue backend, so
//! request shape (paths, query, bearer header) and response handling are
//! checked over real HTTP.

#![allow(clippy::unwrap_used)]

use mockito::Matcher;
use queueboard_client::auth;
use queueboard_client::store::{TOKEN_KEY, USER_KEY};
use queueboard_client::{ClientError, CredentialStore, QueueApi, QueueClient};
use queueboard_types::{CounterType, TicketId, TicketStatus};

const TICKET_B012: &str = r#"{
    "id": "B012",
    "counterType": "BILLING",
    "status": "SERVING",
    "createdAt": "2025-03-01T08:00:00.000Z",
    "updatedAt": "2025-03-01T08:14:00.000Z"
}"#;

const LOGIN_OK: &str = r#"{
    "access_token": "jwt-abc",
    "user": {"id": "u-7", "email": "billing@acemc.test", "counterType": "BILLING"}
}"#;

fn temp_store() -> (tempfile::TempDir, CredentialStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::new(dir.path().join("credentials.json"));
    (dir, store)
}

#[tokio::test]
async fn display_state_is_fetched_anonymously() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/queue")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"services":[{"counterType":"LAB","serving":["L001"]}],"waiting":["B010","B011"],"updatedAt":"2025-03-01T08:00:00Z"}"#)
        .create_async()
        .await;

    let client = QueueClient::with_base_url(server.url());
    let state = client.display_state().await.unwrap();

    mock.assert_async().await;
    assert_eq!(state.waiting().count(), 2);
    assert_eq!(
        state.projections().get(&CounterType::Lab).map(|p| p.id.as_str()),
        Some("L001")
    );
}

#[tokio::test]
async fn call_next_sends_counter_and_bearer_token() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/queue/next")
        .match_query(Matcher::UrlEncoded("counterType".into(), "BILLING".into()))
        .match_header("authorization", "Bearer jwt-abc")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(TICKET_B012)
        .create_async()
        .await;

    let client = QueueClient::with_base_url(server.url()).authenticated("jwt-abc");
    let ticket = client.call_next(CounterType::Billing).await.unwrap();

    mock.assert_async().await;
    assert_eq!(ticket.id, TicketId::new("B012"));
    assert_eq!(ticket.counter_type, CounterType::Billing);
    assert_eq!(ticket.status, TicketStatus::Serving);
}

#[tokio::test]
async fn call_next_rejection_carries_server_message() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/queue/next")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(r#"{"statusCode":404,"message":"No waiting queue for LAB","error":"Not Found"}"#)
        .create_async()
        .await;

    let client = QueueClient::with_base_url(server.url());
    let err = client.call_next(CounterType::Lab).await.unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert_eq!(err.server_message(), Some("No waiting queue for LAB"));
}

#[tokio::test]
async fn rejection_without_body_has_no_message() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/queue/next")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let client = QueueClient::with_base_url(server.url());
    let err = client.call_next(CounterType::Cashier).await.unwrap_err();

    assert!(matches!(err, ClientError::Server { status: 500, message: None }));
}

#[tokio::test]
async fn finish_patches_ticket() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PATCH", "/queue/B012/finish")
        .with_status(200)
        .create_async()
        .await;

    let client = QueueClient::with_base_url(server.url()).authenticated("jwt-abc");
    client.finish(&TicketId::new("B012")).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn malformed_success_body_is_a_decode_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/queue")
        .with_status(200)
        .with_body("<html>gateway timeout</html>")
        .create_async()
        .await;

    let client = QueueClient::with_base_url(server.url());
    let err = client.display_state().await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
}

#[tokio::test]
async fn invalid_login_is_never_sent() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/auth/login")
        .expect(0)
        .create_async()
        .await;

    let (_dir, store) = temp_store();
    let client = QueueClient::with_base_url(server.url());
    let err = auth::login(&client, &store, "not-an-email", "secret")
        .await
        .unwrap_err();

    mock.assert_async().await;
    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
}

#[tokio::test]
async fn failed_login_stores_nothing() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/auth/login")
        .with_status(401)
        .with_body(r#"{"message":"Invalid credentials"}"#)
        .create_async()
        .await;

    let (_dir, store) = temp_store();
    let client = QueueClient::with_base_url(server.url());
    let err = auth::login(&client, &store, "billing@acemc.test", "wrong")
        .await
        .unwrap_err();

    assert_eq!(err.server_message(), Some("Invalid credentials"));
    assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
    assert_eq!(store.get(USER_KEY).unwrap(), None);
}

#[tokio::test]
async fn login_then_logout_leaves_requests_unauthenticated() {
    let mut server = mockito::Server::new_async().await;
    let login = server
        .mock("POST", "/auth/login")
        .match_body(Matcher::Json(serde_json::json!({
            "email": "billing@acemc.test",
            "password": "secret"
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(LOGIN_OK)
        .create_async()
        .await;

    let (_dir, store) = temp_store();
    let anonymous = QueueClient::with_base_url(server.url());

    let session = auth::login(&anonymous, &store, "billing@acemc.test", "secret")
        .await
        .unwrap();
    login.assert_async().await;
    assert_eq!(session.home_counter(), CounterType::Billing);
    assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("jwt-abc"));
    assert!(store.get(USER_KEY).unwrap().is_some());
    assert_eq!(auth::restore(&store).unwrap(), Some(session.clone()));

    let authed = server
        .mock("PATCH", "/queue/B012/finish")
        .match_header("authorization", "Bearer jwt-abc")
        .with_status(200)
        .create_async()
        .await;
    session.client(&anonymous).finish(&TicketId::new("B012")).await.unwrap();
    authed.assert_async().await;

    auth::logout(&store).unwrap();
    assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
    assert_eq!(store.get(USER_KEY).unwrap(), None);

    // Whatever the binary builds after logout is anonymous.
    let restored = auth::restore(&store).unwrap();
    assert_eq!(restored, None);
    let after = restored.map_or_else(|| anonymous.clone(), |s| s.client(&anonymous));

    let unauthenticated = server
        .mock("PATCH", "/queue/B013/finish")
        .match_header("authorization", Matcher::Missing)
        .with_status(401)
        .with_body(r#"{"message":"Unauthorized"}"#)
        .create_async()
        .await;
    let err = after.finish(&TicketId::new("B013")).await.unwrap_err();
    unauthenticated.assert_async().await;
    assert_eq!(err.status(), Some(401));
}
