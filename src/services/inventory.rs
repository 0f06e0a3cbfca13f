//! Inventory ledger service.
//!
//! Owns a title's copy counts and enforces the count invariants under
//! concurrent mutation. Every mutation is a read-modify-write committed with
//! a single revision-guarded store update; on a lost race the whole
//! read-modify-write is retried up to a bounded number of attempts.

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::InventoryItem,
    store::InventoryStore,
};

#[derive(Clone)]
pub struct InventoryLedger {
    store: Arc<dyn InventoryStore>,
    max_attempts: u32,
}

impl InventoryLedger {
    pub fn new(store: Arc<dyn InventoryStore>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    pub async fn get(&self, isbn: &str) -> AppResult<Option<InventoryItem>> {
        self.store.get(isbn).await
    }

    async fn get_required(&self, isbn: &str) -> AppResult<InventoryItem> {
        self.store
            .get(isbn)
            .await?
            .ok_or_else(|| AppError::TitleNotFound(isbn.to_string()))
    }

    /// Create inventory for a title, all copies loanable
    pub async fn add_title(&self, isbn: &str, total_copies: i32) -> AppResult<InventoryItem> {
        if total_copies < 0 {
            return Err(AppError::InvalidAdjustment(format!(
                "total copies must not be negative, got {}",
                total_copies
            )));
        }
        let item = self.store.insert(isbn, total_copies).await?;
        tracing::info!(isbn, total_copies, "inventory created");
        Ok(item)
    }

    /// Change a title's total copy count, carrying the delta into the
    /// loanable count. Rejected when the new total is below the number of
    /// copies currently on loan, or when nothing would change.
    pub async fn adjust_stock(&self, isbn: &str, new_total: i32) -> AppResult<InventoryItem> {
        for _ in 0..self.max_attempts {
            let mut item = self.get_required(isbn).await?;
            if new_total == item.total_copies {
                return Err(AppError::InvalidAdjustment(format!(
                    "quantity of {} is already {}",
                    isbn, new_total
                )));
            }
            if new_total < item.on_loan() {
                return Err(AppError::InvalidAdjustment(format!(
                    "{} copies of {} are on loan, cannot reduce total to {}",
                    item.on_loan(),
                    isbn,
                    new_total
                )));
            }
            item.loanable_copies += new_total - item.total_copies;
            item.total_copies = new_total;
            if self.store.update_guarded(&item).await? {
                tracing::info!(isbn, new_total, "stock adjusted");
                return Ok(item);
            }
            tracing::debug!(isbn, "adjust_stock lost a revision race, retrying");
        }
        Err(AppError::ConcurrentUpdateExceeded(isbn.to_string()))
    }

    /// Take one loanable copy off the shelf. Exactly one of two concurrent
    /// reservations of the last copy succeeds; the other sees `OutOfStock`
    /// after its retry re-reads the drained row.
    pub async fn reserve(&self, isbn: &str) -> AppResult<()> {
        for _ in 0..self.max_attempts {
            let mut item = self.get_required(isbn).await?;
            if item.loanable_copies < 1 {
                return Err(AppError::OutOfStock(isbn.to_string()));
            }
            item.loanable_copies -= 1;
            if self.store.update_guarded(&item).await? {
                return Ok(());
            }
            tracing::debug!(isbn, "reserve lost a revision race, retrying");
        }
        Err(AppError::ConcurrentUpdateExceeded(isbn.to_string()))
    }

    /// Put one copy back on the shelf. Exceeding the total means the
    /// bookkeeping is broken upstream; that is surfaced, never corrected.
    pub async fn release(&self, isbn: &str) -> AppResult<()> {
        for _ in 0..self.max_attempts {
            let mut item = self.get_required(isbn).await?;
            if item.loanable_copies + 1 > item.total_copies {
                tracing::error!(
                    isbn,
                    loanable = item.loanable_copies,
                    total = item.total_copies,
                    "release would exceed total copies"
                );
                return Err(AppError::InvariantViolation(format!(
                    "release of {} would exceed total of {}",
                    isbn, item.total_copies
                )));
            }
            item.loanable_copies += 1;
            if self.store.update_guarded(&item).await? {
                return Ok(());
            }
            tracing::debug!(isbn, "release lost a revision race, retrying");
        }
        Err(AppError::ConcurrentUpdateExceeded(isbn.to_string()))
    }

    /// Delete a title's inventory. Only allowed once every copy is back.
    pub async fn remove_title(&self, isbn: &str) -> AppResult<()> {
        let item = self.get_required(isbn).await?;
        if !item.is_fully_stocked() {
            return Err(AppError::TitleInUse(isbn.to_string()));
        }
        self.store.delete(isbn).await?;
        tracing::info!(isbn, "inventory removed");
        Ok(())
    }
}
