//! External catalog lookup client.
//!
//! Queries the configured bibliographic search API for metadata by ISBN.
//! Only consulted the first time an ISBN is referenced and its metadata is
//! not yet cached locally.

use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    config::CatalogConfig,
    error::{AppError, AppResult},
    models::TitleMetadata,
};

/// Bibliographic metadata source, keyed by external identifier
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    /// `Ok(None)` means the catalog has no record for this identifier
    async fn find(&self, isbn: &str) -> AppResult<Option<TitleMetadata>>;
}

/// Search API response envelope
#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    items: Vec<TitleMetadata>,
}

/// HTTP client for the external book-search API
#[derive(Clone)]
pub struct HttpCatalogClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
}

impl HttpCatalogClient {
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        }
    }
}

#[async_trait]
impl MetadataLookup for HttpCatalogClient {
    async fn find(&self, isbn: &str) -> AppResult<Option<TitleMetadata>> {
        tracing::debug!(isbn, "catalog lookup");

        let response = self
            .http
            .get(&self.base_url)
            .query(&[("d_isbn", isbn)])
            .header("X-Catalog-Client-Id", &self.client_id)
            .header("X-Catalog-Client-Secret", &self.client_secret)
            .send()
            .await
            .map_err(|e| AppError::Catalog(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(AppError::Catalog(format!(
                "lookup for {} failed with status {}",
                isbn,
                response.status()
            )));
        }

        let body: LookupResponse = response
            .json()
            .await
            .map_err(|e| AppError::Catalog(e.to_string()))?;

        Ok(body.items.into_iter().next())
    }
}
