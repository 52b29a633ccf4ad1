//! Order and cart operations

use std::sync::Arc;

use chrono::NaiveDateTime;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::SessionManager;
use crate::error::Error;
use crate::fetch::Fetch;
use crate::products::PageResponse;

/// One line of an order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: f64,
    pub quantity: i32,
    pub item_total: f64,
}

/// Summary of an order as shown in the admin grid
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: Uuid,
    pub created_at: NaiveDateTime,
    pub total_price: f64,
    pub total_items: i32,
    pub order_items: Vec<OrderItem>,
}

/// One cart entry for order creation and cart calculation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: Uuid,
    pub quantity: u32,
}

/// Cart payload accepted by the create and calculate endpoints
#[derive(Debug, Clone, Serialize)]
pub struct CartRequest {
    pub items: Vec<CartItem>,
}

/// Priced cart line with availability, from the calculate endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: String,
    pub product_name: String,
    pub unit_price: f64,
    pub quantity: i32,
    pub item_total: f64,
    pub available: bool,
    pub available_stock: i32,
}

/// Result of a cart calculation
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartCalculation {
    pub items: Vec<CartLine>,
    pub total_price: f64,
    pub total_items: i32,
}

/// Client for order endpoints
pub struct OrdersClient {
    base_url: String,
    client: Client,
    session: Arc<SessionManager>,
}

impl OrdersClient {
    pub(crate) fn new(base_url: &str, client: Client, session: Arc<SessionManager>) -> Self {
        Self {
            base_url: base_url.to_string(),
            client,
            session,
        }
    }

    fn bearer(&self) -> Result<String, Error> {
        self.session
            .snapshot()
            .tokens
            .map(|tokens| tokens.access_token)
            .ok_or_else(|| Error::auth("Not logged in"))
    }

    /// List orders, newest first by default, paginated
    pub async fn list(&self, page: i32, size: i32) -> Result<PageResponse<OrderSummary>, Error> {
        let url = format!("{}/api/orders", self.base_url);
        let token = self.bearer()?;

        Fetch::get(&self.client, &url)
            .bearer_auth(&token)
            .query("page", &page.to_string())
            .query("size", &size.to_string())
            .execute()
            .await
    }

    /// Fetch a single order by id
    pub async fn get(&self, id: Uuid) -> Result<OrderSummary, Error> {
        let url = format!("{}/api/orders/{}", self.base_url, id);
        let token = self.bearer()?;

        Fetch::get(&self.client, &url)
            .bearer_auth(&token)
            .execute()
            .await
    }

    /// Create an order from cart items. The server prices the cart and
    /// rejects it when stock is insufficient.
    pub async fn create(&self, cart: &CartRequest) -> Result<OrderSummary, Error> {
        let url = format!("{}/api/orders", self.base_url);
        let token = self.bearer()?;

        Fetch::post(&self.client, &url)
            .bearer_auth(&token)
            .json(cart)?
            .execute()
            .await
    }

    /// Price a cart and check stock without creating an order
    pub async fn calculate(&self, cart: &CartRequest) -> Result<CartCalculation, Error> {
        let url = format!("{}/api/orders/calculate", self.base_url);
        let token = self.bearer()?;

        Fetch::post(&self.client, &url)
            .bearer_auth(&token)
            .json(cart)?
            .execute()
            .await
    }
}
