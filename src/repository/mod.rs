//! Repository layer for database operations

pub mod inventory;
pub mod loans;
pub mod titles;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub titles: titles::TitlesRepository,
    pub inventory: inventory::InventoryRepository,
    pub loans: loans::LoansRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            titles: titles::TitlesRepository::new(pool.clone()),
            inventory: inventory::InventoryRepository::new(pool.clone()),
            loans: loans::LoansRepository::new(pool.clone()),
            pool,
        }
    }
}
