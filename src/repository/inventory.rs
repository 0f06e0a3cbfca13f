//! Inventory repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::InventoryItem,
    store::InventoryStore,
};

#[derive(Clone)]
pub struct InventoryRepository {
    pool: Pool<Postgres>,
}

impl InventoryRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InventoryStore for InventoryRepository {
    async fn get(&self, isbn: &str) -> AppResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>("SELECT * FROM inventory_items WHERE isbn = $1")
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    async fn insert(&self, isbn: &str, total_copies: i32) -> AppResult<InventoryItem> {
        let item = sqlx::query_as::<_, InventoryItem>(
            r#"
            INSERT INTO inventory_items (isbn, total_copies, loanable_copies, revision)
            VALUES ($1, $2, $2, 1)
            RETURNING *
            "#,
        )
        .bind(isbn)
        .bind(total_copies)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::DuplicateTitle(isbn.to_string())
            }
            other => AppError::Database(other),
        })?;
        Ok(item)
    }

    async fn update_guarded(&self, item: &InventoryItem) -> AppResult<bool> {
        // Single conditional UPDATE: the row-level revision check is what
        // linearizes concurrent mutations of the same title.
        let result = sqlx::query(
            r#"
            UPDATE inventory_items
            SET total_copies = $2, loanable_copies = $3, revision = revision + 1
            WHERE isbn = $1 AND revision = $4
            "#,
        )
        .bind(&item.isbn)
        .bind(item.total_copies)
        .bind(item.loanable_copies)
        .bind(item.revision)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // Distinguish a lost race from a vanished row.
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM inventory_items WHERE isbn = $1)")
                .bind(&item.isbn)
                .fetch_one(&self.pool)
                .await?;
        if exists {
            Ok(false)
        } else {
            Err(AppError::TitleNotFound(item.isbn.clone()))
        }
    }

    async fn delete(&self, isbn: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM inventory_items WHERE isbn = $1")
            .bind(isbn)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
