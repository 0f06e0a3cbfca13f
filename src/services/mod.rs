//! Business logic services

pub mod catalog;
pub mod inventory;
pub mod lending;
pub mod lookup;
pub mod overdue;

use std::sync::Arc;

use crate::{
    config::{LendingConfig, SweepConfig},
    repository::Repository,
    services::lookup::MetadataLookup,
    store::{InventoryStore, LoanStore, TitleStore},
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub lending: lending::LendingEngine,
    pub overdue: overdue::OverdueSweeper,
}

impl Services {
    /// Create all services over the Postgres repositories
    pub fn new(
        repository: Repository,
        lookup: Arc<dyn MetadataLookup>,
        lending_config: &LendingConfig,
        sweep_config: SweepConfig,
    ) -> Self {
        Self::from_stores(
            Arc::new(repository.titles.clone()),
            Arc::new(repository.inventory.clone()),
            Arc::new(repository.loans.clone()),
            lookup,
            lending_config,
            sweep_config,
        )
    }

    /// Create all services over arbitrary store backends (tests and
    /// embedded deployments use the in-memory store here).
    pub fn from_stores(
        titles: Arc<dyn TitleStore>,
        inventory: Arc<dyn InventoryStore>,
        loans: Arc<dyn LoanStore>,
        lookup: Arc<dyn MetadataLookup>,
        lending_config: &LendingConfig,
        sweep_config: SweepConfig,
    ) -> Self {
        let policy = lending_config.policy();
        let ledger = inventory::InventoryLedger::new(inventory, lending_config.reserve_max_attempts);
        let catalog = catalog::CatalogService::new(titles, lookup);
        let lending = lending::LendingEngine::new(ledger.clone(), loans.clone(), catalog.clone(), policy);
        let overdue = overdue::OverdueSweeper::new(loans, ledger, policy, sweep_config);

        Self {
            catalog,
            lending,
            overdue,
        }
    }
}
