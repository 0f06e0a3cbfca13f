//! In-process map-backed store.
//!
//! Backs the test suite and embedded single-process deployments. Each trait
//! method takes the mutex once, so every operation is atomic on its own and
//! `update_guarded` gives the same lost-update protection as the Postgres
//! conditional UPDATE: a writer that read revision N loses if another
//! writer committed N+1 in between.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{InventoryItem, LoanRecord, Title},
    store::{InventoryStore, LoanStore, TitleStore},
};

#[derive(Default)]
struct Inner {
    titles: HashMap<String, Title>,
    inventory: HashMap<String, InventoryItem>,
    loans: BTreeMap<i64, LoanRecord>,
    next_inventory_id: i64,
    next_loan_id: i64,
}

/// Map-backed implementation of all three store traits
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock means a panic mid-mutation; tests want the panic
        // propagated rather than masked.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl TitleStore for MemoryStore {
    async fn get(&self, isbn: &str) -> AppResult<Option<Title>> {
        Ok(self.lock().titles.get(isbn).cloned())
    }

    async fn insert(&self, title: &Title) -> AppResult<()> {
        let mut inner = self.lock();
        if inner.titles.contains_key(&title.isbn) {
            return Err(AppError::DuplicateTitle(title.isbn.clone()));
        }
        inner.titles.insert(title.isbn.clone(), title.clone());
        Ok(())
    }

    async fn update(&self, title: &Title) -> AppResult<()> {
        let mut inner = self.lock();
        if !inner.titles.contains_key(&title.isbn) {
            return Err(AppError::TitleNotFound(title.isbn.clone()));
        }
        inner.titles.insert(title.isbn.clone(), title.clone());
        Ok(())
    }

    async fn delete(&self, isbn: &str) -> AppResult<()> {
        self.lock().titles.remove(isbn);
        Ok(())
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn get(&self, isbn: &str) -> AppResult<Option<InventoryItem>> {
        Ok(self.lock().inventory.get(isbn).cloned())
    }

    async fn insert(&self, isbn: &str, total_copies: i32) -> AppResult<InventoryItem> {
        let mut inner = self.lock();
        if inner.inventory.contains_key(isbn) {
            return Err(AppError::DuplicateTitle(isbn.to_string()));
        }
        inner.next_inventory_id += 1;
        let item = InventoryItem {
            id: inner.next_inventory_id,
            isbn: isbn.to_string(),
            total_copies,
            loanable_copies: total_copies,
            revision: 1,
            created_at: Utc::now(),
        };
        inner.inventory.insert(isbn.to_string(), item.clone());
        Ok(item)
    }

    async fn update_guarded(&self, item: &InventoryItem) -> AppResult<bool> {
        let mut inner = self.lock();
        match inner.inventory.get_mut(&item.isbn) {
            Some(stored) if stored.revision == item.revision => {
                let mut next = item.clone();
                next.revision += 1;
                *stored = next;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(AppError::TitleNotFound(item.isbn.clone())),
        }
    }

    async fn delete(&self, isbn: &str) -> AppResult<()> {
        self.lock().inventory.remove(isbn);
        Ok(())
    }
}

#[async_trait]
impl LoanStore for MemoryStore {
    async fn get(&self, loan_id: i64) -> AppResult<Option<LoanRecord>> {
        Ok(self.lock().loans.get(&loan_id).cloned())
    }

    async fn find_active(&self, member_id: i64, isbn: &str) -> AppResult<Option<LoanRecord>> {
        Ok(self
            .lock()
            .loans
            .values()
            .find(|l| l.member_id == member_id && l.isbn == isbn && l.is_active())
            .cloned())
    }

    async fn count_active(&self, member_id: i64) -> AppResult<i64> {
        Ok(self
            .lock()
            .loans
            .values()
            .filter(|l| l.member_id == member_id && l.is_active())
            .count() as i64)
    }

    async fn open(&self, member_id: i64, isbn: &str, issued_at: DateTime<Utc>) -> AppResult<LoanRecord> {
        let mut inner = self.lock();
        let duplicate = inner
            .loans
            .values()
            .any(|l| l.member_id == member_id && l.isbn == isbn && l.is_active());
        if duplicate {
            return Err(AppError::DuplicateLoan {
                member_id,
                isbn: isbn.to_string(),
            });
        }
        inner.next_loan_id += 1;
        let record = LoanRecord {
            id: inner.next_loan_id,
            member_id,
            isbn: isbn.to_string(),
            issued_at,
            returned_at: None,
            renewed: false,
        };
        inner.loans.insert(record.id, record.clone());
        Ok(record)
    }

    async fn renew(&self, loan_id: i64) -> AppResult<LoanRecord> {
        let mut inner = self.lock();
        let record = inner
            .loans
            .get_mut(&loan_id)
            .ok_or_else(|| AppError::NotFound(format!("loan {}", loan_id)))?;
        if record.returned_at.is_some() {
            return Err(AppError::AlreadyReturned(loan_id));
        }
        if record.renewed {
            return Err(AppError::AlreadyRenewed(loan_id));
        }
        record.renewed = true;
        Ok(record.clone())
    }

    async fn close(&self, loan_id: i64, at: DateTime<Utc>) -> AppResult<LoanRecord> {
        let mut inner = self.lock();
        let record = inner
            .loans
            .get_mut(&loan_id)
            .ok_or_else(|| AppError::NotFound(format!("loan {}", loan_id)))?;
        if record.returned_at.is_some() {
            return Err(AppError::AlreadyReturned(loan_id));
        }
        record.returned_at = Some(at);
        Ok(record.clone())
    }

    async fn find_overdue(
        &self,
        as_of: DateTime<Utc>,
        loan_window_days: u32,
        renewal_window_days: u32,
    ) -> AppResult<Vec<LoanRecord>> {
        Ok(self
            .lock()
            .loans
            .values()
            .filter(|l| l.is_overdue(as_of, loan_window_days, renewal_window_days))
            .cloned()
            .collect())
    }

    async fn history_for_member(&self, member_id: i64) -> AppResult<Vec<LoanRecord>> {
        let mut records: Vec<LoanRecord> = self
            .lock()
            .loans
            .values()
            .filter(|l| l.member_id == member_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(records)
    }

    async fn has_history(&self, isbn: &str) -> AppResult<bool> {
        Ok(self.lock().loans.values().any(|l| l.isbn == isbn))
    }
}
