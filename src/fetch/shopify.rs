//! Shopify `products.json` page source

use super::error::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error};

/// A paginated source of raw product objects
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetches one 1-based page. An empty vector marks the end of the catalogue.
    async fn fetch_page(&self, page: u32) -> Result<Vec<Value>, FetchError>;
}

#[derive(Debug, Deserialize)]
struct ProductsPage {
    #[serde(default)]
    products: Vec<Value>,
}

/// Page source backed by a store's public `products.json` endpoint
#[derive(Clone)]
pub struct ShopifySource {
    endpoint: String,
    page_limit: u32,
    timeout: Duration,
    http_client: Client,
}

impl ShopifySource {
    pub fn new(endpoint: impl Into<String>, page_limit: u32, timeout: Duration) -> Result<Self, FetchError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("{}/{}", crate::NAME, crate::VERSION))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.into(),
            page_limit,
            timeout,
            http_client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_send_error(&self, page: u32, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            error!("Request to {} timed out after {:?}", self.endpoint, self.timeout);
            FetchError::Timeout {
                page,
                seconds: self.timeout.as_secs(),
            }
        } else {
            error!("Request to {} failed: {}", self.endpoint, e);
            FetchError::Network {
                page,
                message: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl PageSource for ShopifySource {
    async fn fetch_page(&self, page: u32) -> Result<Vec<Value>, FetchError> {
        debug!(endpoint = %self.endpoint, page, limit = self.page_limit, "Requesting page");

        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&[("limit", self.page_limit), ("page", page)])
            .send()
            .await
            .map_err(|e| self.map_send_error(page, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(200).collect();
            return Err(FetchError::Status {
                page,
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ProductsPage = response.json().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    page,
                    seconds: self.timeout.as_secs(),
                }
            } else {
                FetchError::InvalidResponse {
                    page,
                    message: e.to_string(),
                }
            }
        })?;

        Ok(parsed.products)
    }
}

impl fmt::Debug for ShopifySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShopifySource")
            .field("endpoint", &self.endpoint)
            .field("page_limit", &self.page_limit)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_products_page_defaults_to_empty() {
        let page: ProductsPage = serde_json::from_str("{}").unwrap();
        assert!(page.products.is_empty());
    }

    #[test]
    fn test_products_page_keeps_raw_objects() {
        let page: ProductsPage =
            serde_json::from_str(r#"{"products":[{"id":1,"title":"GAN 12"},{"id":2}]}"#).unwrap();
        assert_eq!(page.products.len(), 2);
        assert_eq!(page.products[0]["title"], "GAN 12");
    }

    #[test]
    fn test_source_debug_hides_client() {
        let source =
            ShopifySource::new("https://kewbz.co.uk/products.json", 250, Duration::from_secs(15))
                .unwrap();
        let debug = format!("{:?}", source);
        assert!(debug.contains("kewbz.co.uk"));
        assert!(!debug.contains("http_client"));
    }
}
