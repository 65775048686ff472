//! Repository trait definitions
//!
//! Read-side contract of the entity store. Every write that touches shelf
//! occupancy, book status or loan state goes through `crate::services`; these
//! traits only look records up.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::DomainError;
use crate::models::{book, loan, patron, shelf, BookStatus};

/// Repository trait for Shelf entity
#[async_trait]
pub trait ShelfRepository: Send + Sync {
    /// Find all shelves ordered by location code
    async fn find_all(&self) -> Result<Vec<shelf::Model>, DomainError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<shelf::Model>, DomainError>;

    async fn find_by_location_code(&self, code: &str) -> Result<Option<shelf::Model>, DomainError>;

    /// Shelves with at least `min_free` free slots, emptiest first
    async fn find_with_free_space(&self, min_free: i32) -> Result<Vec<shelf::Model>, DomainError>;
}

/// Repository trait for Book entity
#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> Result<Option<book::Model>, DomainError>;

    async fn find_by_isbn(&self, isbn: &str) -> Result<Option<book::Model>, DomainError>;

    /// Physical books currently assigned to a shelf
    async fn find_by_shelf(&self, shelf_id: i32) -> Result<Vec<book::Model>, DomainError>;

    async fn find_by_status(&self, status: BookStatus) -> Result<Vec<book::Model>, DomainError>;
}

/// Repository trait for Patron entity
#[async_trait]
pub trait PatronRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> Result<Option<patron::Model>, DomainError>;

    async fn find_by_number(&self, number: &str) -> Result<Option<patron::Model>, DomainError>;
}

/// Repository trait for Loan entity
#[async_trait]
pub trait LoanRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> Result<Option<loan::Model>, DomainError>;

    /// The open (active or overdue) loan of a book, if any
    async fn find_open_for_book(&self, book_id: i32) -> Result<Option<loan::Model>, DomainError>;

    /// Open loans of a patron, soonest due first
    async fn find_open_for_patron(&self, patron_id: i32) -> Result<Vec<loan::Model>, DomainError>;

    /// Every loan ever made for a book, newest first
    async fn history_for_book(&self, book_id: i32) -> Result<Vec<loan::Model>, DomainError>;

    /// Open loans whose estimated return date is before `as_of`
    async fn find_late(&self, as_of: NaiveDate) -> Result<Vec<loan::Model>, DomainError>;
}
