//! Staff login, logout, and session restore.
//!
//! A [`Session`] is the token plus the user record returned at login. It is
//! persisted through the [`CredentialStore`] and turned into an
//! authenticated [`QueueClient`] with [`Session::client`]. Logging out
//! removes both stored keys, so any client built afterwards is anonymous.

use queueboard_types::{CounterType, LoginRequest, User};
use tracing::{info, warn};

use crate::api::QueueClient;
use crate::error::ClientError;
use crate::store::{CredentialStore, TOKEN_KEY, USER_KEY};

/// An authenticated staff session.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// Bearer token.
    pub token: String,
    /// The logged-in user.
    pub user: User,
}

impl Session {
    /// An authenticated copy of `client` for this session.
    pub fn client(&self, client: &QueueClient) -> QueueClient {
        client.authenticated(self.token.clone())
    }

    /// Counter the console opens on: the user's own, else CASHIER.
    pub fn home_counter(&self) -> CounterType {
        self.user.counter_type.unwrap_or(CounterType::Cashier)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

/// Log in and persist the session.
///
/// Nothing is stored when the backend rejects the credentials.
pub async fn login(
    client: &QueueClient,
    store: &CredentialStore,
    email: &str,
    password: &str,
) -> Result<Session, ClientError> {
    let response = client.login(&LoginRequest::new(email, password)).await?;

    let user_json = serde_json::to_string(&response.user)
        .map_err(|e| ClientError::Storage(format!("failed to serialize user: {e}")))?;
    store.set_many(&[(TOKEN_KEY, &response.access_token), (USER_KEY, &user_json)])?;

    info!(
        user = %response.user.id,
        email = response.user.email,
        counter = ?response.user.counter_type,
        "logged in"
    );

    Ok(Session {
        token: response.access_token,
        user: response.user,
    })
}

/// Forget the persisted session.
pub fn logout(store: &CredentialStore) -> Result<(), ClientError> {
    store.remove(&[TOKEN_KEY, USER_KEY])?;
    info!("logged out");
    Ok(())
}

/// Load the persisted session, if both keys are present and readable.
///
/// A user record that no longer parses is treated as logged out.
pub fn restore(store: &CredentialStore) -> Result<Option<Session>, ClientError> {
    let (Some(token), Some(user_json)) = (store.get(TOKEN_KEY)?, store.get(USER_KEY)?) else {
        return Ok(None);
    };

    match serde_json::from_str::<User>(&user_json) {
        Ok(user) => Ok(Some(Session { token, user })),
        Err(e) => {
            warn!(error = %e, "stored user record is unreadable, ignoring session");
            Ok(None)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use queueboard_types::UserId;

    use super::*;

    fn session(counter: Option<CounterType>) -> Session {
        Session {
            token: "jwt-abc".to_owned(),
            user: User {
                id: UserId::new("u-1"),
                email: "staff@acemc.test".to_owned(),
                counter_type: counter,
            },
        }
    }

    #[test]
    fn home_counter_falls_back_to_cashier() {
        assert_eq!(session(Some(CounterType::Lab)).home_counter(), CounterType::Lab);
        assert_eq!(session(None).home_counter(), CounterType::Cashier);
    }

    #[test]
    fn session_client_is_authenticated() {
        let anonymous = QueueClient::with_base_url("http://localhost:3000");
        assert!(session(None).client(&anonymous).is_authenticated());
    }

    #[test]
    fn restore_needs_both_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("credentials.json"));

        assert!(store.set(TOKEN_KEY, "jwt-abc").is_ok());
        assert_eq!(restore(&store).ok(), Some(None));

        let user = serde_json::to_string(&session(Some(CounterType::Billing)).user)
            .unwrap_or_default();
        assert!(store.set(USER_KEY, &user).is_ok());
        let restored = restore(&store).ok().flatten();
        assert_eq!(restored, Some(session(Some(CounterType::Billing))));
    }

    #[test]
    fn unreadable_user_is_treated_as_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("credentials.json"));
        assert!(store.set_many(&[(TOKEN_KEY, "jwt-abc"), (USER_KEY, "{broken")]).is_ok());
        assert_eq!(restore(&store).ok(), Some(None));
    }

    #[test]
    fn debug_hides_token() {
        let debug = format!("{:?}", session(None));
        assert!(!debug.contains("jwt-abc"));
    }
}
