//! Domain error types
//!
//! These errors are framework-agnostic and represent business-level failures.
//! Store errors are translated here so callers never see SQLite messages for
//! rule violations the engine knows about.

use sea_orm::{DbErr, SqlErr};

use crate::models::{BookStatus, LoanStatus, PatronStatus};

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// Referenced entity is absent
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i32 },

    /// Shelf is at full capacity
    #[error("shelf {shelf_id} is at full capacity ({capacity})")]
    CapacityExceeded { shelf_id: i32, capacity: i32 },

    /// Release requested on an empty shelf; means the cached count drifted
    #[error("shelf {shelf_id} occupancy is already zero")]
    OccupancyUnderflow { shelf_id: i32 },

    /// Book type and shelf reference do not agree
    #[error("invalid placement: {0}")]
    InvalidPlacement(String),

    #[error("book {book_id} already has an open loan")]
    DuplicateActiveLoan { book_id: i32 },

    #[error("book {book_id} is not available for loan (status: {status})")]
    BookUnavailable { book_id: i32, status: BookStatus },

    #[error("patron {patron_id} is not active (status: {status})")]
    PatronInactive { patron_id: i32, status: PatronStatus },

    #[error("patron {patron_id} has reached the maximum of {limit} open loans")]
    LoanLimitExceeded { patron_id: i32, limit: u32 },

    #[error("invalid date range: {0}")]
    InvalidDateRange(String),

    /// Direct status edit attempted while a loan is open
    #[error("book {book_id} has an open loan")]
    BookOnLoan { book_id: i32 },

    /// Loan is in a state that does not allow the requested transition
    #[error("loan {loan_id} cannot go from {from} to {to}")]
    InvalidTransition {
        loan_id: i32,
        from: LoanStatus,
        to: LoanStatus,
    },

    /// Uniqueness violation on a natural key
    #[error("already exists: {0}")]
    Duplicate(String),

    /// Input rejected before reaching the store
    #[error("validation error: {0}")]
    Validation(String),

    /// Concurrent modification or lock timeout; safe to retry
    #[error("conflict: {0}")]
    Conflict(String),

    /// Database/persistence error
    #[error("database error: {0}")]
    Database(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: i32) -> Self {
        DomainError::NotFound { entity, id }
    }

    /// Only conflicts are worth retrying; every other kind is deterministic.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::Conflict(_))
    }
}

/// True when the error is the partial unique index on open loans firing.
pub fn is_open_loan_violation(e: &DbErr) -> bool {
    matches!(
        e.sql_err(),
        Some(SqlErr::UniqueConstraintViolation(msg)) if msg.contains("loans.book_id")
    )
}

fn is_lock_error(message: &str) -> bool {
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("(code: 5)")
        || message.contains("(code: 517)")
}

impl From<DbErr> for DomainError {
    fn from(e: DbErr) -> Self {
        if let DbErr::ConnectionAcquire(reason) = &e {
            return DomainError::Conflict(format!("could not acquire a connection: {reason}"));
        }

        match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(msg)) => {
                return DomainError::Duplicate(msg);
            }
            Some(SqlErr::ForeignKeyConstraintViolation(msg)) => {
                return DomainError::Validation(msg);
            }
            _ => {}
        }

        let message = e.to_string();
        if is_lock_error(&message) {
            DomainError::Conflict(message)
        } else if message.contains("CHECK constraint failed") {
            DomainError::Validation(message)
        } else {
            DomainError::Database(message)
        }
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut => {
                DomainError::Conflict("timed out waiting for a connection".to_string())
            }
            other => DomainError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_conflict_is_retryable() {
        assert!(DomainError::Conflict("busy".into()).is_retryable());
        assert!(!DomainError::CapacityExceeded { shelf_id: 1, capacity: 3 }.is_retryable());
        assert!(!DomainError::not_found("shelf", 9).is_retryable());
    }

    #[test]
    fn lock_messages_become_conflicts() {
        let err = DomainError::from(DbErr::Custom(
            "error returned from database: (code: 5) database is locked".to_string(),
        ));
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn check_failures_become_validation() {
        let err = DomainError::from(DbErr::Custom(
            "CHECK constraint failed: chk_shelf_count_within_capacity".to_string(),
        ));
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn other_store_errors_pass_through() {
        let err = DomainError::from(DbErr::Custom("disk I/O error".to_string()));
        assert!(matches!(err, DomainError::Database(_)));
    }

    #[test]
    fn messages_name_the_entity() {
        assert_eq!(
            DomainError::not_found("loan", 42).to_string(),
            "loan 42 not found"
        );
        assert_eq!(
            DomainError::BookUnavailable {
                book_id: 3,
                status: BookStatus::Maintenance
            }
            .to_string(),
            "book 3 is not available for loan (status: maintenance)"
        );
    }
}
