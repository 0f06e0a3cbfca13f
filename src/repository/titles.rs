//! Titles repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::Title,
    store::TitleStore,
};

#[derive(Clone)]
pub struct TitlesRepository {
    pool: Pool<Postgres>,
}

impl TitlesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TitleStore for TitlesRepository {
    async fn get(&self, isbn: &str) -> AppResult<Option<Title>> {
        let title = sqlx::query_as::<_, Title>("SELECT * FROM titles WHERE isbn = $1")
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await?;
        Ok(title)
    }

    async fn insert(&self, title: &Title) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO titles (isbn, title, author, publisher, image_url, description, published_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (isbn) DO NOTHING
            "#,
        )
        .bind(&title.isbn)
        .bind(&title.title)
        .bind(&title.author)
        .bind(&title.publisher)
        .bind(&title.image_url)
        .bind(&title.description)
        .bind(title.published_at)
        .bind(title.created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::DuplicateTitle(title.isbn.clone()));
        }
        Ok(())
    }

    async fn update(&self, title: &Title) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE titles
            SET title = $2, author = $3, publisher = $4, image_url = $5,
                description = $6, published_at = $7
            WHERE isbn = $1
            "#,
        )
        .bind(&title.isbn)
        .bind(&title.title)
        .bind(&title.author)
        .bind(&title.publisher)
        .bind(&title.image_url)
        .bind(&title.description)
        .bind(title.published_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::TitleNotFound(title.isbn.clone()));
        }
        Ok(())
    }

    async fn delete(&self, isbn: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM titles WHERE isbn = $1")
            .bind(isbn)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
