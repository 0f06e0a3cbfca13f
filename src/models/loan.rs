//! Loan (borrow) model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One borrowing event by one member for one title.
///
/// A record is active while `returned_at` is null. `returned_at` is set
/// exactly once and never cleared; `renewed` flips false -> true exactly
/// once, and only while the loan is active. Records are never deleted: the
/// full history is the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LoanRecord {
    pub id: i64,
    pub member_id: i64,
    pub isbn: String,
    pub issued_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub renewed: bool,
}

impl LoanRecord {
    pub fn is_active(&self) -> bool {
        self.returned_at.is_none()
    }

    /// Overdue cutoff measured from the original issue date; a renewal
    /// extends it by the renewal window but does not restart the clock.
    pub fn is_overdue(&self, as_of: DateTime<Utc>, loan_window_days: u32, renewal_window_days: u32) -> bool {
        if !self.is_active() {
            return false;
        }
        let mut window = Duration::days(loan_window_days as i64);
        if self.renewed {
            window = window + Duration::days(renewal_window_days as i64);
        }
        as_of - self.issued_at > window
    }
}
