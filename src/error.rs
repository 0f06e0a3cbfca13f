//! Error types for the Liberon lending engine

use thiserror::Error;

/// Main application error type.
///
/// Variants fall into three families: validation failures returned to the
/// caller, contention failures (`OutOfStock`, `ConcurrentUpdateExceeded`),
/// and integrity failures (`InvariantViolation`) that indicate a bookkeeping
/// bug and are logged at error severity before being surfaced.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Title not found: {0}")]
    TitleNotFound(String),

    #[error("Title already has inventory: {0}")]
    DuplicateTitle(String),

    #[error("Invalid stock adjustment: {0}")]
    InvalidAdjustment(String),

    #[error("No active loan for member {member_id} on title {isbn}")]
    NoActiveLoan { member_id: i64, isbn: String },

    #[error("Member {member_id} already has an active loan for title {isbn}")]
    DuplicateLoan { member_id: i64, isbn: String },

    #[error("Borrow limit reached ({current}/{limit})")]
    BorrowLimitExceeded { current: i64, limit: u32 },

    #[error("Loan {0} has already been renewed")]
    AlreadyRenewed(i64),

    #[error("Loan {0} has already been returned")]
    AlreadyReturned(i64),

    #[error("Title still has copies on loan: {0}")]
    TitleInUse(String),

    #[error("No loanable copies left for title {0}")]
    OutOfStock(String),

    #[error("Concurrent update retries exhausted for title {0}")]
    ConcurrentUpdateExceeded(String),

    #[error("Inventory invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Catalog lookup error: {0}")]
    Catalog(String),
}

impl AppError {
    /// Integrity-kind failures signal a bug rather than a caller mistake.
    pub fn is_integrity(&self) -> bool {
        matches!(self, AppError::InvariantViolation(_))
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
