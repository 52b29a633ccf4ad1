//! Session state and its transitions.
//!
//! The session manager is the process-wide holder of the authenticated
//! state. It is mutated only by explicit login/logout calls and by the
//! refresh coordinator; every mutation swaps the whole snapshot in one
//! assignment, never a partial field update.

use std::sync::{Arc, RwLock};

use log::{debug, warn};
use tokio::sync::watch;

use crate::auth::jwt;
use crate::auth::store::{
    CredentialStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, TOKEN_EXPIRATION_KEY, USER_KEY,
};
use crate::auth::types::{now_ms, SessionSnapshot, TokenPair, UserProfile};

/// Observable session state backed by a credential store
pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    state: RwLock<SessionSnapshot>,
    auth_tx: watch::Sender<bool>,
    persist: bool,
}

impl SessionManager {
    /// Create a session manager, restoring a prior session from the store
    /// when a stored access token exists and has not already expired.
    pub fn from_store(store: Arc<dyn CredentialStore>, persist: bool) -> Self {
        let restored = restore_snapshot(store.as_ref());
        let (auth_tx, _) = watch::channel(restored.is_authenticated);
        if restored.is_authenticated {
            debug!("restored authenticated session from credential store");
        }
        Self {
            store,
            state: RwLock::new(restored),
            auth_tx,
            persist,
        }
    }

    /// Current immutable view of the state, for synchronous reads
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.read().unwrap().clone()
    }

    /// Whether the session currently believes itself authenticated
    pub fn is_authenticated(&self) -> bool {
        self.state.read().unwrap().is_authenticated
    }

    /// Observe authentication changes. The receiver yields the current
    /// value immediately and on every transition thereafter.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.auth_tx.subscribe()
    }

    /// Install a freshly issued token pair and user profile.
    ///
    /// Persists all four credential keys, swaps the in-memory snapshot
    /// atomically and marks the session authenticated. Never fails.
    pub fn set_auth(
        &self,
        access_token: &str,
        refresh_token: &str,
        expires_in_secs: i64,
        user: Option<UserProfile>,
    ) {
        let tokens = TokenPair::new(
            access_token.to_string(),
            refresh_token.to_string(),
            expires_in_secs,
        );

        if self.persist {
            self.store.set(ACCESS_TOKEN_KEY, access_token);
            self.store.set(REFRESH_TOKEN_KEY, refresh_token);
            self.store
                .set(TOKEN_EXPIRATION_KEY, &tokens.expires_at_ms.to_string());
            match &user {
                Some(user) => match serde_json::to_string(user) {
                    Ok(json) => self.store.set(USER_KEY, &json),
                    Err(err) => warn!("failed to serialize user profile: {}", err),
                },
                None => self.store.remove(USER_KEY),
            }
        }

        let mut state = self.state.write().unwrap();
        *state = SessionSnapshot {
            is_authenticated: true,
            tokens: Some(tokens),
            user,
        };
        drop(state);

        let _ = self.auth_tx.send(true);
        debug!("session authenticated, expires in {}s", expires_in_secs);
    }

    /// Clear all persisted credentials and reset to logged-out. Idempotent.
    pub fn logout(&self) {
        self.store.remove(ACCESS_TOKEN_KEY);
        self.store.remove(REFRESH_TOKEN_KEY);
        self.store.remove(TOKEN_EXPIRATION_KEY);
        self.store.remove(USER_KEY);

        let mut state = self.state.write().unwrap();
        let was_authenticated = state.is_authenticated;
        *state = SessionSnapshot::default();
        drop(state);

        let _ = self.auth_tx.send(false);
        if was_authenticated {
            debug!("session ended");
        }
    }
}

fn restore_snapshot(store: &dyn CredentialStore) -> SessionSnapshot {
    let access_token = match store.get(ACCESS_TOKEN_KEY) {
        Some(token) => token,
        None => return SessionSnapshot::default(),
    };

    // A stored token past its true expiry cannot be trusted at boot; the
    // refresh path needs a live refresh token anyway, which is also gone
    // once the access token is stale beyond its pair.
    if jwt::is_expired(&access_token, 0) {
        debug!("stored access token is expired, starting logged out");
        return SessionSnapshot::default();
    }

    let refresh_token = store.get(REFRESH_TOKEN_KEY).unwrap_or_default();
    let expires_at_ms = store
        .get(TOKEN_EXPIRATION_KEY)
        .and_then(|raw| raw.parse::<i64>().ok())
        .unwrap_or_else(|| now_ms() + jwt::time_until_expiry_ms(&access_token));
    let user = store
        .get(USER_KEY)
        .and_then(|raw| serde_json::from_str::<UserProfile>(&raw).ok());

    SessionSnapshot {
        is_authenticated: true,
        tokens: Some(TokenPair {
            access_token,
            refresh_token,
            expires_at_ms,
        }),
        user,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::MemoryStore;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use serde_json::json;

    fn token_with_exp(exp: i64) -> String {
        let payload = URL_SAFE_NO_PAD.encode(json!({ "exp": exp }).to_string().as_bytes());
        format!("h.{}.s", payload)
    }

    fn test_user() -> UserProfile {
        UserProfile {
            id: "u1".to_string(),
            email: "admin@example.com".to_string(),
            name: Some("Admin".to_string()),
            roles: vec!["ADMIN".to_string()],
        }
    }

    #[test]
    fn set_auth_persists_all_keys_and_flips_state() {
        let store = Arc::new(MemoryStore::new());
        let session = SessionManager::from_store(store.clone(), true);
        assert!(!session.is_authenticated());

        session.set_auth("A1", "R1", 3600, Some(test_user()));

        let snapshot = session.snapshot();
        assert!(snapshot.is_authenticated);
        let tokens = snapshot.tokens.unwrap();
        assert_eq!(tokens.access_token, "A1");
        assert_eq!(tokens.refresh_token, "R1");
        assert!(tokens.expires_at_ms > now_ms());

        assert_eq!(store.get(ACCESS_TOKEN_KEY).as_deref(), Some("A1"));
        assert_eq!(store.get(REFRESH_TOKEN_KEY).as_deref(), Some("R1"));
        assert_eq!(
            store.get(TOKEN_EXPIRATION_KEY).as_deref(),
            Some(tokens.expires_at_ms.to_string().as_str())
        );
        assert!(store.get(USER_KEY).is_some());
    }

    #[test]
    fn logout_is_idempotent_and_clears_storage() {
        let store = Arc::new(MemoryStore::new());
        let session = SessionManager::from_store(store.clone(), true);
        session.set_auth("A1", "R1", 3600, Some(test_user()));

        session.logout();
        session.logout();

        let snapshot = session.snapshot();
        assert!(!snapshot.is_authenticated);
        assert!(snapshot.tokens.is_none());
        assert!(snapshot.user.is_none());
        assert_eq!(store.get(ACCESS_TOKEN_KEY), None);
        assert_eq!(store.get(REFRESH_TOKEN_KEY), None);
        assert_eq!(store.get(TOKEN_EXPIRATION_KEY), None);
        assert_eq!(store.get(USER_KEY), None);
    }

    #[test]
    fn restores_prior_session_from_store() {
        let store = Arc::new(MemoryStore::new());
        let token = token_with_exp(crate::auth::types::now_secs() + 3600);
        store.set(ACCESS_TOKEN_KEY, &token);
        store.set(REFRESH_TOKEN_KEY, "R1");
        store.set(TOKEN_EXPIRATION_KEY, "9999999999999");
        store.set(USER_KEY, &serde_json::to_string(&test_user()).unwrap());

        let session = SessionManager::from_store(store, true);
        let snapshot = session.snapshot();
        assert!(snapshot.is_authenticated);
        assert_eq!(snapshot.tokens.unwrap().refresh_token, "R1");
        assert_eq!(snapshot.user.unwrap().id, "u1");
    }

    #[test]
    fn expired_stored_token_starts_logged_out() {
        let store = Arc::new(MemoryStore::new());
        store.set(
            ACCESS_TOKEN_KEY,
            &token_with_exp(crate::auth::types::now_secs() - 10),
        );
        store.set(REFRESH_TOKEN_KEY, "R1");

        let session = SessionManager::from_store(store, true);
        assert!(!session.is_authenticated());
    }

    #[test]
    fn missing_access_token_means_logged_out_despite_other_keys() {
        let store = Arc::new(MemoryStore::new());
        store.set(REFRESH_TOKEN_KEY, "R1");
        store.set(TOKEN_EXPIRATION_KEY, "9999999999999");

        let session = SessionManager::from_store(store, true);
        assert!(!session.is_authenticated());
        assert!(session.snapshot().tokens.is_none());
    }

    #[test]
    fn subscribers_observe_transitions() {
        tokio_test::block_on(async {
            let session = SessionManager::from_store(Arc::new(MemoryStore::new()), true);
            let mut rx = session.subscribe();
            assert!(!*rx.borrow());

            session.set_auth("A1", "R1", 3600, None);
            rx.changed().await.unwrap();
            assert!(*rx.borrow());

            session.logout();
            rx.changed().await.unwrap();
            assert!(!*rx.borrow());
        });
    }
}
