//! Shared test fixtures: services wired over the in-memory store

use std::sync::Arc;

use async_trait::async_trait;

use liberon_core::{
    config::{LendingConfig, SweepConfig},
    error::AppResult,
    models::TitleMetadata,
    services::{lookup::MetadataLookup, Services},
    store::memory::MemoryStore,
};

/// Lookup stub: every ISBN resolves unless it starts with "missing"
pub struct StubLookup;

#[async_trait]
impl MetadataLookup for StubLookup {
    async fn find(&self, isbn: &str) -> AppResult<Option<TitleMetadata>> {
        if isbn.starts_with("missing") {
            return Ok(None);
        }
        Ok(Some(TitleMetadata {
            title: format!("Title {}", isbn),
            author: Some("Test Author".to_string()),
            publisher: None,
            image_url: None,
            description: None,
            published_at: None,
        }))
    }
}

pub fn services() -> (Arc<MemoryStore>, Services) {
    services_with(&LendingConfig::default())
}

pub fn services_with(lending: &LendingConfig) -> (Arc<MemoryStore>, Services) {
    let store = Arc::new(MemoryStore::new());
    let services = Services::from_stores(
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(StubLookup),
        lending,
        SweepConfig::default(),
    );
    (store, services)
}
