//! Durable credential storage.
//!
//! Mirrors the key/value layout the dashboard keeps in browser storage.
//! Absence of the access token key is the canonical logged-out state; the
//! remaining keys are stale and ignored without it.

use std::collections::HashMap;
use std::sync::RwLock;

/// Storage key for the access token
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Storage key for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
/// Storage key for the absolute expiry timestamp, decimal epoch milliseconds
pub const TOKEN_EXPIRATION_KEY: &str = "tokenExpiration";
/// Storage key for the JSON-serialized user profile
pub const USER_KEY: &str = "user";

/// Key/value store for session credentials.
///
/// Implementations must survive a process restart to restore a prior
/// session; the in-memory default does not and is meant for tests and
/// short-lived clients.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory credential store
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.values.write().unwrap().remove(key);
    }
}
