//! Loans repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::LoanRecord,
    store::LoanStore,
};

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn get_required(&self, loan_id: i64) -> AppResult<LoanRecord> {
        LoanStore::get(self, loan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("loan {}", loan_id)))
    }
}

#[async_trait]
impl LoanStore for LoansRepository {
    async fn get(&self, loan_id: i64) -> AppResult<Option<LoanRecord>> {
        let record = sqlx::query_as::<_, LoanRecord>("SELECT * FROM loan_records WHERE id = $1")
            .bind(loan_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn find_active(&self, member_id: i64, isbn: &str) -> AppResult<Option<LoanRecord>> {
        let record = sqlx::query_as::<_, LoanRecord>(
            "SELECT * FROM loan_records WHERE member_id = $1 AND isbn = $2 AND returned_at IS NULL",
        )
        .bind(member_id)
        .bind(isbn)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn count_active(&self, member_id: i64) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loan_records WHERE member_id = $1 AND returned_at IS NULL",
        )
        .bind(member_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn open(&self, member_id: i64, isbn: &str, issued_at: DateTime<Utc>) -> AppResult<LoanRecord> {
        // The partial unique index on (member_id, isbn) WHERE returned_at IS
        // NULL is the final arbiter even when the engine's pre-check raced.
        let record = sqlx::query_as::<_, LoanRecord>(
            r#"
            INSERT INTO loan_records (member_id, isbn, issued_at, renewed)
            VALUES ($1, $2, $3, FALSE)
            RETURNING *
            "#,
        )
        .bind(member_id)
        .bind(isbn)
        .bind(issued_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => AppError::DuplicateLoan {
                member_id,
                isbn: isbn.to_string(),
            },
            other => AppError::Database(other),
        })?;
        Ok(record)
    }

    async fn renew(&self, loan_id: i64) -> AppResult<LoanRecord> {
        let record = sqlx::query_as::<_, LoanRecord>(
            r#"
            UPDATE loan_records
            SET renewed = TRUE
            WHERE id = $1 AND returned_at IS NULL AND NOT renewed
            RETURNING *
            "#,
        )
        .bind(loan_id)
        .fetch_optional(&self.pool)
        .await?;

        match record {
            Some(record) => Ok(record),
            // Conditional update matched nothing: re-read to name the reason.
            None => {
                let current = self.get_required(loan_id).await?;
                if current.returned_at.is_some() {
                    Err(AppError::AlreadyReturned(loan_id))
                } else {
                    Err(AppError::AlreadyRenewed(loan_id))
                }
            }
        }
    }

    async fn close(&self, loan_id: i64, at: DateTime<Utc>) -> AppResult<LoanRecord> {
        let record = sqlx::query_as::<_, LoanRecord>(
            r#"
            UPDATE loan_records
            SET returned_at = $2
            WHERE id = $1 AND returned_at IS NULL
            RETURNING *
            "#,
        )
        .bind(loan_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        match record {
            Some(record) => Ok(record),
            None => {
                self.get_required(loan_id).await?;
                Err(AppError::AlreadyReturned(loan_id))
            }
        }
    }

    async fn find_overdue(
        &self,
        as_of: DateTime<Utc>,
        loan_window_days: u32,
        renewal_window_days: u32,
    ) -> AppResult<Vec<LoanRecord>> {
        let plain_cutoff = as_of - Duration::days(loan_window_days as i64);
        let renewed_cutoff = plain_cutoff - Duration::days(renewal_window_days as i64);

        let records = sqlx::query_as::<_, LoanRecord>(
            r#"
            SELECT * FROM loan_records
            WHERE returned_at IS NULL
              AND ((NOT renewed AND issued_at < $1) OR (renewed AND issued_at < $2))
            ORDER BY issued_at
            "#,
        )
        .bind(plain_cutoff)
        .bind(renewed_cutoff)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn history_for_member(&self, member_id: i64) -> AppResult<Vec<LoanRecord>> {
        let records = sqlx::query_as::<_, LoanRecord>(
            "SELECT * FROM loan_records WHERE member_id = $1 ORDER BY issued_at DESC",
        )
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn has_history(&self, isbn: &str) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM loan_records WHERE isbn = $1)")
                .bind(isbn)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }
}
