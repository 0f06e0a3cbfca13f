//! Lending engine.
//!
//! Orchestrates the inventory ledger and the loan record store for every
//! caller-facing lending operation, enforcing the cross-entity rules:
//! borrow limit, duplicate-loan prevention, single renewal, and the
//! reserve-then-open compensation ordering that keeps copy counts honest
//! when an open fails after its reservation succeeded.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{InventoryItem, LoanRecord},
    services::{catalog::CatalogService, inventory::InventoryLedger},
    store::LoanStore,
};

/// Lending policy, fixed at construction
#[derive(Debug, Clone, Copy)]
pub struct LendingPolicy {
    pub loan_window_days: u32,
    pub renewal_window_days: u32,
    pub borrow_limit: u32,
}

impl Default for LendingPolicy {
    fn default() -> Self {
        Self {
            loan_window_days: 7,
            renewal_window_days: 7,
            borrow_limit: 3,
        }
    }
}

#[derive(Clone)]
pub struct LendingEngine {
    inventory: InventoryLedger,
    loans: Arc<dyn LoanStore>,
    catalog: CatalogService,
    policy: LendingPolicy,
}

impl LendingEngine {
    pub fn new(
        inventory: InventoryLedger,
        loans: Arc<dyn LoanStore>,
        catalog: CatalogService,
        policy: LendingPolicy,
    ) -> Self {
        Self {
            inventory,
            loans,
            catalog,
            policy,
        }
    }

    pub fn policy(&self) -> LendingPolicy {
        self.policy
    }

    pub fn inventory(&self) -> &InventoryLedger {
        &self.inventory
    }

    /// Add a title to the collection: resolve its bibliographic record
    /// (cached or via external lookup), then create its inventory.
    pub async fn add_title(&self, isbn: &str, total_copies: i32) -> AppResult<InventoryItem> {
        self.catalog.ensure_title(isbn).await?;
        let item = self.inventory.add_title(isbn, total_copies).await?;
        tracing::info!(isbn, total_copies, "title added to collection");
        Ok(item)
    }

    /// Issue a loan of one copy to a member.
    pub async fn issue_loan(&self, member_id: i64, isbn: &str) -> AppResult<LoanRecord> {
        if self.inventory.get(isbn).await?.is_none() {
            return Err(AppError::TitleNotFound(isbn.to_string()));
        }
        if self.loans.find_active(member_id, isbn).await?.is_some() {
            return Err(AppError::DuplicateLoan {
                member_id,
                isbn: isbn.to_string(),
            });
        }
        let current = self.loans.count_active(member_id).await?;
        if current >= self.policy.borrow_limit as i64 {
            return Err(AppError::BorrowLimitExceeded {
                current,
                limit: self.policy.borrow_limit,
            });
        }

        self.inventory.reserve(isbn).await?;

        match self.loans.open(member_id, isbn, Utc::now()).await {
            Ok(record) => {
                tracing::info!(member_id, isbn, loan_id = record.id, "loan issued");
                Ok(record)
            }
            Err(e) => {
                // The copy was reserved but no record exists for it; put it
                // back before reporting, or the copy leaks forever.
                if let Err(release_err) = self.inventory.release(isbn).await {
                    tracing::error!(
                        isbn,
                        %release_err,
                        "failed to release reservation after open failure"
                    );
                }
                Err(e)
            }
        }
    }

    /// Return a member's active loan for a title.
    ///
    /// The record is closed before the copy is released: a crash in between
    /// under-counts availability, which is safe, instead of over-counting,
    /// which would allow over-issuing.
    pub async fn return_loan(&self, member_id: i64, isbn: &str, at: DateTime<Utc>) -> AppResult<LoanRecord> {
        let active = self
            .loans
            .find_active(member_id, isbn)
            .await?
            .ok_or_else(|| AppError::NoActiveLoan {
                member_id,
                isbn: isbn.to_string(),
            })?;

        let closed = self.loans.close(active.id, at).await?;
        self.inventory.release(isbn).await?;
        tracing::info!(member_id, isbn, loan_id = closed.id, "loan returned");
        Ok(closed)
    }

    /// Extend a loan once. No inventory effect.
    pub async fn renew_loan(&self, loan_id: i64) -> AppResult<LoanRecord> {
        let record = self.loans.renew(loan_id).await?;
        tracing::info!(loan_id, "loan renewed");
        Ok(record)
    }

    /// Administrative stock adjustment; validation failures are surfaced to
    /// the caller, never retried.
    pub async fn adjust_quantity(&self, isbn: &str, new_total: i32) -> AppResult<InventoryItem> {
        self.inventory.adjust_stock(isbn, new_total).await
    }

    /// Remove a title from the collection. Refused while copies are out.
    /// The bibliographic record is kept when loan history references it.
    pub async fn retire_title(&self, isbn: &str) -> AppResult<()> {
        self.inventory.remove_title(isbn).await?;
        if !self.loans.has_history(isbn).await? {
            self.catalog.remove_title(isbn).await?;
        }
        tracing::info!(isbn, "title retired");
        Ok(())
    }

    pub async fn count_active(&self, member_id: i64) -> AppResult<i64> {
        self.loans.count_active(member_id).await
    }

    pub async fn has_active_loan(&self, member_id: i64, isbn: &str) -> AppResult<bool> {
        Ok(self.loans.find_active(member_id, isbn).await?.is_some())
    }

    /// Full loan history for a member, newest first
    pub async fn loan_history(&self, member_id: i64) -> AppResult<Vec<LoanRecord>> {
        self.loans.history_for_member(member_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::lookup::MockMetadataLookup;
    use crate::store::{memory::MemoryStore, InventoryStore, MockLoanStore};

    #[tokio::test]
    async fn failed_open_releases_its_reservation() {
        let store = Arc::new(MemoryStore::new());
        let ledger = InventoryLedger::new(store.clone(), 5);
        ledger.add_title("isbn-1", 1).await.unwrap();

        // Pre-checks pass, the reservation lands, then the store rejects
        // the open (a racing writer beat us to the unique index).
        let mut loans = MockLoanStore::new();
        loans.expect_find_active().returning(|_, _| Ok(None));
        loans.expect_count_active().returning(|_| Ok(0));
        loans.expect_open().returning(|member_id, isbn, _| {
            Err(AppError::DuplicateLoan {
                member_id,
                isbn: isbn.to_string(),
            })
        });

        let catalog = CatalogService::new(store.clone(), Arc::new(MockMetadataLookup::new()));
        let engine = LendingEngine::new(ledger, Arc::new(loans), catalog, LendingPolicy::default());

        let err = engine.issue_loan(1, "isbn-1").await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateLoan { .. }));

        // The compensating release put the copy back; nothing leaked.
        let item = InventoryStore::get(store.as_ref(), "isbn-1").await.unwrap().unwrap();
        assert_eq!(item.loanable_copies, 1);
    }
}
