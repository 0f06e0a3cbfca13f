//! Inventory (stock) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Stock record for one title: total copies owned vs copies currently
/// loanable. `revision` guards every mutation (compare-and-swap); a write
/// only lands if the stored revision still matches the one that was read.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InventoryItem {
    pub id: i64,
    pub isbn: String,
    pub total_copies: i32,
    pub loanable_copies: i32,
    pub revision: i64,
    pub created_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Copies currently out on loan
    pub fn on_loan(&self) -> i32 {
        self.total_copies - self.loanable_copies
    }

    /// An item can only be removed when every copy is back on the shelf
    pub fn is_fully_stocked(&self) -> bool {
        self.loanable_copies == self.total_copies
    }
}
