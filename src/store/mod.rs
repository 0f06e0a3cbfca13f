//! Narrow interfaces over the persistent record store.
//!
//! The lending engine only ever talks to these traits. Production wires the
//! Postgres repositories (see [`crate::repository`]); the test suite and
//! embedded deployments use the [`memory::MemoryStore`] backend.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppResult,
    models::{InventoryItem, LoanRecord, Title},
};

/// Deduplicated bibliographic records, keyed by ISBN
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TitleStore: Send + Sync {
    async fn get(&self, isbn: &str) -> AppResult<Option<Title>>;

    /// Fails with `DuplicateTitle` if the ISBN is already cataloged
    async fn insert(&self, title: &Title) -> AppResult<()>;

    /// Overwrite descriptive fields; identity (ISBN) is immutable
    async fn update(&self, title: &Title) -> AppResult<()>;

    async fn delete(&self, isbn: &str) -> AppResult<()>;
}

/// Per-title stock rows with revision-guarded writes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn get(&self, isbn: &str) -> AppResult<Option<InventoryItem>>;

    /// Create a stock row with `loanable_copies == total_copies`.
    /// Fails with `DuplicateTitle` if the title already has inventory.
    async fn insert(&self, isbn: &str, total_copies: i32) -> AppResult<InventoryItem>;

    /// Conditional write: lands only if the stored revision still equals
    /// `item.revision`, bumping it by one. `Ok(false)` means another writer
    /// got there first and the caller must re-read and retry.
    async fn update_guarded(&self, item: &InventoryItem) -> AppResult<bool>;

    async fn delete(&self, isbn: &str) -> AppResult<()>;
}

/// Append-mostly log of individual loan events
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoanStore: Send + Sync {
    async fn get(&self, loan_id: i64) -> AppResult<Option<LoanRecord>>;

    async fn find_active(&self, member_id: i64, isbn: &str) -> AppResult<Option<LoanRecord>>;

    async fn count_active(&self, member_id: i64) -> AppResult<i64>;

    /// Create a new active record. `(member_id, isbn, active)` is logically
    /// unique; the store rejects a duplicate with `DuplicateLoan` even if
    /// the engine's pre-check raced.
    async fn open(&self, member_id: i64, isbn: &str, issued_at: DateTime<Utc>) -> AppResult<LoanRecord>;

    /// Fails with `NotFound`, `AlreadyReturned` or `AlreadyRenewed`
    async fn renew(&self, loan_id: i64) -> AppResult<LoanRecord>;

    /// Fails with `NotFound` or `AlreadyReturned`
    async fn close(&self, loan_id: i64, at: DateTime<Utc>) -> AppResult<LoanRecord>;

    /// Point-in-time snapshot of active records past their due window.
    /// Cutoffs are measured from the original issue date; renewal extends
    /// the window by `renewal_window_days` without restarting the clock.
    async fn find_overdue(
        &self,
        as_of: DateTime<Utc>,
        loan_window_days: u32,
        renewal_window_days: u32,
    ) -> AppResult<Vec<LoanRecord>>;

    /// Full loan history for a member, newest first
    async fn history_for_member(&self, member_id: i64) -> AppResult<Vec<LoanRecord>>;

    /// Whether any loan record (active or closed) references the title
    async fn has_history(&self, isbn: &str) -> AppResult<bool>;
}
