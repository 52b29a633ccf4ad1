//! OrderMS Rust Client Library
//!
//! A Rust client for the InForm OrderMS REST API: authentication with
//! automatic token refresh and background session validation, plus typed
//! access to the product catalog and order endpoints.
//!
//! ```no_run
//! use orderms_client::Orderms;
//!
//! # async fn example() -> Result<(), orderms_client::error::Error> {
//! let orderms = Orderms::new("http://localhost:8080");
//! orderms.auth().sign_in("admin@example.com", "secret").await?;
//!
//! // keep the session alive while the client runs
//! let _validator = orderms.auth().start_auto_validate();
//!
//! let products = orderms.products().list(Default::default()).await?;
//! println!("{} products", products.total_elements);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod fetch;
pub mod orders;
pub mod products;

use std::sync::Arc;

use reqwest::Client;

use crate::auth::{Auth, CredentialStore, MemoryStore, PeriodicValidator};
use crate::config::ClientOptions;
use crate::error::Error;
use crate::fetch::Fetch;
use crate::orders::OrdersClient;
use crate::products::ProductsClient;

/// The main entry point for the OrderMS client
pub struct Orderms {
    /// The base URL of the backend
    pub base_url: String,
    /// HTTP client used for requests
    pub http_client: Client,
    /// Auth client for sign-in and session lifecycle
    pub auth: Auth,
    /// Client options
    pub options: ClientOptions,

    /// Background validator when `auto_validate` is set; stops with the client
    validator: Option<PeriodicValidator>,
}

impl Orderms {
    /// Create a new client with default options and an in-memory
    /// credential store
    pub fn new(base_url: &str) -> Self {
        Self::new_with_options(base_url, ClientOptions::default())
    }

    /// Create a new client with custom options
    pub fn new_with_options(base_url: &str, options: ClientOptions) -> Self {
        Self::new_with_store(base_url, options, Arc::new(MemoryStore::new()))
    }

    /// Create a new client with a custom credential store, restoring any
    /// session the store still holds
    pub fn new_with_store(
        base_url: &str,
        options: ClientOptions,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut builder = Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build().unwrap_or_default();

        let auth = Auth::new(&base_url, http_client.clone(), options.clone(), store);
        let validator = options.auto_validate.then(|| auth.start_auto_validate());

        Self {
            base_url,
            http_client,
            auth,
            options,
            validator,
        }
    }

    /// Whether the background validator is running
    pub fn auto_validating(&self) -> bool {
        self.validator
            .as_ref()
            .map(|validator| !validator.is_finished())
            .unwrap_or(false)
    }

    /// The auth client
    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    /// Client for the product catalog endpoints
    pub fn products(&self) -> ProductsClient {
        ProductsClient::new(
            &self.base_url,
            self.http_client.clone(),
            self.auth.session().clone(),
        )
    }

    /// Client for the order endpoints
    pub fn orders(&self) -> OrdersClient {
        OrdersClient::new(
            &self.base_url,
            self.http_client.clone(),
            self.auth.session().clone(),
        )
    }

    /// Health probe against the backend
    pub async fn ping(&self) -> Result<String, Error> {
        let url = format!("{}/api/ping", self.base_url);
        let response: serde_json::Value = Fetch::get(&self.http_client, &url).execute().await?;
        Ok(response
            .get("message")
            .and_then(|message| message.as_str())
            .unwrap_or_default()
            .to_string())
    }
}
