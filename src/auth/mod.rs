//! Authentication and session lifecycle for the OrderMS backend

mod coordinator;
mod jwt;
mod session;
mod store;
mod types;
mod validator;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::ClientOptions;
use crate::error::Error;
use crate::fetch::Fetch;

pub use coordinator::{AuthApi, RefreshCoordinator};
pub use jwt::{decode, is_expired, needs_refresh, time_until_expiry_ms, Claims};
pub use session::SessionManager;
pub use store::{
    CredentialStore, MemoryStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, TOKEN_EXPIRATION_KEY,
    USER_KEY,
};
pub use types::{
    LoginRequest, RefreshTokenRequest, SessionSnapshot, TokenPair, TokenResponse, UserProfile,
    ValidationResponse,
};
pub use validator::PeriodicValidator;

/// Client for OrderMS authentication
pub struct Auth {
    /// The base URL of the backend
    base_url: String,

    /// HTTP client used for requests
    client: Client,

    /// Client options
    options: ClientOptions,

    /// The session this client drives
    session: Arc<SessionManager>,

    /// Coordinator shared by direct calls and the background validator
    coordinator: Arc<RefreshCoordinator>,
}

impl Auth {
    /// Create a new Auth client
    pub(crate) fn new(
        base_url: &str,
        client: Client,
        options: ClientOptions,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        let session = Arc::new(SessionManager::from_store(store, options.persist_session));
        let api = Arc::new(HttpAuthApi {
            base_url: base_url.to_string(),
            client: client.clone(),
        });
        let coordinator = Arc::new(RefreshCoordinator::new(
            session.clone(),
            api,
            options.refresh_buffer_minutes,
            options.validate_interval,
        ));

        Self {
            base_url: base_url.to_string(),
            client,
            options,
            session,
            coordinator,
        }
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/api/auth{}", self.base_url, path)
    }

    /// Sign in with email and password.
    ///
    /// On success the returned token pair and user profile are installed in
    /// the session and persisted in the credential store.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SessionSnapshot, Error> {
        let url = self.auth_url("/login");

        let response: TokenResponse = Fetch::post(&self.client, &url)
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })?
            .execute()
            .await?;

        self.session.set_auth(
            &response.access_token,
            &response.refresh_token,
            response.expires_in,
            response.user,
        );

        Ok(self.session.snapshot())
    }

    /// Sign out. Clears the credential store and the session state; the
    /// backend keeps no server-side session to tear down.
    pub fn sign_out(&self) {
        self.session.logout();
    }

    /// Validate the current session once, refreshing the token pair if it
    /// is close to expiry. Concurrent calls share a single round trip.
    pub async fn validate_once(&self) -> bool {
        self.coordinator.validate_once().await
    }

    /// Start background validation on the configured interval. The first
    /// validation runs immediately; dropping the returned handle stops it.
    pub fn start_auto_validate(&self) -> PeriodicValidator {
        PeriodicValidator::spawn(self.coordinator.clone(), self.options.validate_interval)
    }

    /// The session state holder
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Whether the session currently believes itself authenticated
    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// The current access token, for authenticated API calls
    pub fn access_token(&self) -> Option<String> {
        self.session
            .snapshot()
            .tokens
            .map(|tokens| tokens.access_token)
    }
}

/// HTTP transport for the refresh and validate endpoints
struct HttpAuthApi {
    base_url: String,
    client: Client,
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, Error> {
        let url = format!("{}/api/auth/refresh", self.base_url);
        Fetch::post(&self.client, &url)
            .json(&RefreshTokenRequest {
                refresh_token: refresh_token.to_string(),
            })?
            .execute()
            .await
    }

    async fn validate(&self, access_token: &str) -> Result<ValidationResponse, Error> {
        let url = format!("{}/api/auth/validate", self.base_url);
        Fetch::get(&self.client, &url)
            .bearer_auth(access_token)
            .execute()
            .await
    }
}
