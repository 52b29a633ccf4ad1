//! Types for authentication and session management

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Profile of the signed-in user, as returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Token payload returned by the login and refresh endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub user: Option<UserProfile>,
}

/// Response of the server-side token validation endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    pub valid: bool,
    pub email: Option<String>,
}

/// Request body for the refresh endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Request body for the login endpoint
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The current access/refresh token pair with its absolute expiry.
///
/// `expires_at_ms` is computed from `expires_in` at the moment the pair is
/// issued and stored independently of the token payload; the two must agree
/// for refresh scheduling to be correct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at_ms: i64,
}

impl TokenPair {
    /// Create a pair from freshly issued tokens
    pub fn new(access_token: String, refresh_token: String, expires_in_secs: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at_ms: now_ms() + expires_in_secs * 1000,
        }
    }
}

/// Immutable view of the session state for synchronous reads
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub is_authenticated: bool,
    pub tokens: Option<TokenPair>,
    pub user: Option<UserProfile>,
}

/// Milliseconds since the Unix epoch
pub(crate) fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as i64
}

/// Seconds since the Unix epoch
pub(crate) fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs() as i64
}
