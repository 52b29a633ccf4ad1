//! Product catalog operations

use std::sync::Arc;

use chrono::NaiveDateTime;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::SessionManager;
use crate::error::Error;
use crate::fetch::Fetch;

/// A catalog product
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub stock: i32,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

/// Request body for creating a product
#[derive(Debug, Clone, Serialize)]
pub struct ProductCreateRequest {
    pub name: String,
    pub price: f64,
    pub stock: i32,
}

/// One page of a paginated listing
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub content: Vec<T>,
    pub page: i32,
    pub size: i32,
    pub total_elements: i64,
    pub total_pages: i32,
    pub first: bool,
    pub last: bool,
}

/// Filters and paging for the product listing
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub name: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_stock: Option<i32>,
    pub max_stock: Option<i32>,
    pub page: Option<i32>,
    pub size: Option<i32>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
}

impl ProductQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Free-text search over name and price
    pub fn with_search(mut self, value: &str) -> Self {
        self.search = Some(value.to_string());
        self
    }

    /// Select the page, 0-based
    pub fn with_page(mut self, page: i32, size: i32) -> Self {
        self.page = Some(page);
        self.size = Some(size);
        self
    }

    /// Sort by a field, direction `asc` or `desc`
    pub fn with_sort(mut self, field: &str, direction: &str) -> Self {
        self.sort_by = Some(field.to_string());
        self.sort_dir = Some(direction.to_string());
        self
    }

    /// Filter by price range
    pub fn with_price_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    /// Filter by stock range
    pub fn with_stock_range(mut self, min: Option<i32>, max: Option<i32>) -> Self {
        self.min_stock = min;
        self.max_stock = max;
        self
    }
}

/// Client for product catalog endpoints
pub struct ProductsClient {
    base_url: String,
    client: Client,
    session: Arc<SessionManager>,
}

impl ProductsClient {
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

    /// List products with optional filters, paginated
    pub async fn list(&self, query: ProductQuery) -> Result<PageResponse<Product>, Error> {
        let url = format!("{}/api/products", self.base_url);
        let token = self.bearer()?;

        Fetch::get(&self.client, &url)
            .bearer_auth(&token)
            .query_opt("search", query.search)
            .query_opt("name", query.name)
            .query_opt("minPrice", query.min_price)
            .query_opt("maxPrice", query.max_price)
            .query_opt("minStock", query.min_stock)
            .query_opt("maxStock", query.max_stock)
            .query_opt("page", query.page)
            .query_opt("size", query.size)
            .query_opt("sortBy", query.sort_by)
            .query_opt("sortDir", query.sort_dir)
            .execute()
            .await
    }

    /// Fetch a single product by id
    pub async fn get(&self, id: Uuid) -> Result<Product, Error> {
        let url = format!("{}/api/products/{}", self.base_url, id);
        let token = self.bearer()?;

        Fetch::get(&self.client, &url)
            .bearer_auth(&token)
            .execute()
            .await
    }

    /// Create a new product
    pub async fn create(&self, request: &ProductCreateRequest) -> Result<Product, Error> {
        let url = format!("{}/api/products", self.base_url);
        let token = self.bearer()?;

        Fetch::post(&self.client, &url)
            .bearer_auth(&token)
            .json(request)?
            .execute()
            .await
    }

    /// Update an existing product
    pub async fn update(&self, id: Uuid, request: &ProductCreateRequest) -> Result<Product, Error> {
        let url = format!("{}/api/products/{}", self.base_url, id);
        let token = self.bearer()?;

        Fetch::put(&self.client, &url)
            .bearer_auth(&token)
            .json(request)?
            .execute()
            .await
    }

    /// Delete a product by id
    pub async fn delete(&self, id: Uuid) -> Result<(), Error> {
        let url = format!("{}/api/products/{}", self.base_url, id);
        let token = self.bearer()?;

        Fetch::delete(&self.client, &url)
            .bearer_auth(&token)
            .execute_raw()
            .await?;

        Ok(())
    }
}
