//! Title catalog service

use std::sync::Arc;

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{Title, TitleCorrections},
    services::lookup::MetadataLookup,
    store::TitleStore,
};

/// Deduplicated bibliographic records, backed by the title store and the
/// external catalog lookup for first-time references.
#[derive(Clone)]
pub struct CatalogService {
    titles: Arc<dyn TitleStore>,
    lookup: Arc<dyn MetadataLookup>,
}

impl CatalogService {
    pub fn new(titles: Arc<dyn TitleStore>, lookup: Arc<dyn MetadataLookup>) -> Self {
        Self { titles, lookup }
    }

    pub async fn get_title(&self, isbn: &str) -> AppResult<Title> {
        self.titles
            .get(isbn)
            .await?
            .ok_or_else(|| AppError::TitleNotFound(isbn.to_string()))
    }

    /// Return the cached record for an ISBN, fetching and caching metadata
    /// from the external catalog on first reference.
    pub async fn ensure_title(&self, isbn: &str) -> AppResult<Title> {
        if let Some(title) = self.titles.get(isbn).await? {
            return Ok(title);
        }

        let metadata = self
            .lookup
            .find(isbn)
            .await?
            .ok_or_else(|| AppError::TitleNotFound(isbn.to_string()))?;
        let title = metadata.into_title(isbn, Utc::now());

        match self.titles.insert(&title).await {
            Ok(()) => {
                tracing::info!(isbn, "title cataloged");
                Ok(title)
            }
            // Another caller cataloged the same ISBN first; theirs wins.
            Err(AppError::DuplicateTitle(_)) => self.get_title(isbn).await,
            Err(e) => Err(e),
        }
    }

    /// Administrative correction of descriptive fields. The ISBN itself is
    /// immutable.
    pub async fn correct_title(&self, isbn: &str, corrections: &TitleCorrections) -> AppResult<Title> {
        let current = self.get_title(isbn).await?;
        let corrected = corrections.apply(current);
        self.titles.update(&corrected).await?;
        tracing::info!(isbn, "title corrected");
        Ok(corrected)
    }

    pub async fn remove_title(&self, isbn: &str) -> AppResult<()> {
        self.titles.delete(isbn).await?;
        tracing::info!(isbn, "title record removed");
        Ok(())
    }
}
