//! Marketplace search client.

use crate::product::{normalize_listing, ProductItem};
use crate::{CatalogError, CatalogResult};
use reqwest::Client;
use serde_json::Value;
use storefront_auth::detail_message;
use storefront_config_and_utils::{build_url_with_base, Config};
use tracing::{debug, info, warn};
use url::Url;

const PRODUCTS_PATH: &str = "/api/products";
const SEARCH_FALLBACK: &str = "search error";

/// Client for the public product search endpoint.
pub struct CatalogClient {
    http: Client,
    base_url: Url,
}

impl CatalogClient {
    pub fn new(base_url: &str) -> CatalogResult<Self> {
        Ok(Self {
            http: Client::new(),
            base_url: Url::parse(base_url.trim())?,
        })
    }

    pub fn from_config(config: &Config) -> CatalogResult<Self> {
        let http = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self {
            http,
            base_url: config.api_base_url()?,
        })
    }

    /// Search products across marketplaces.
    ///
    /// A blank query returns no products without contacting the service.
    pub async fn search_products(&self, query: &str) -> CatalogResult<Vec<ProductItem>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut url = build_url_with_base(self.base_url.as_str(), PRODUCTS_PATH)?;
        url.query_pairs_mut().append_pair("q", query);
        debug!(query = %query, "Searching products");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| CatalogError::Unreachable {
                message: SEARCH_FALLBACK.to_string(),
                source,
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|source| CatalogError::Unreachable {
            message: SEARCH_FALLBACK.to_string(),
            source,
        })?;

        if !status.is_success() {
            warn!(status = %status, query = %query, "Product search rejected");
            return Err(CatalogError::Rejected {
                status: status.as_u16(),
                message: detail_message(&text).unwrap_or_else(|| SEARCH_FALLBACK.to_string()),
            });
        }

        let body: Value = serde_json::from_str(&text)?;
        let items = normalize_listing(&body);
        info!(query = %query, count = items.len(), "Product search finished");
        Ok(items)
    }
}
