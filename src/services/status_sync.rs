//! Status Synchronizer - mirrors loan transitions onto `books.status`
//!
//! While a loan is open this module is the only writer of a book's status.
//! Inventory edits (maintenance, found, lost on shelf) are accepted only when
//! the book has no open loan.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::*;

use crate::domain::DomainError;
use crate::models::book::{self, Entity as Book};
use crate::models::loan::{self, Entity as Loan};
use crate::models::{BookStatus, LoanStatus};

/// A loan state change that has just been written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanTransition {
    /// New loan created in `active`
    Opened,
    /// `active` -> `overdue`
    Overdue,
    /// open -> `returned`
    Returned,
    /// open -> `lost`
    Lost,
    /// `returned` -> open again
    Reactivated,
}

impl LoanTransition {
    /// Loan status after the transition
    pub fn loan_status(self) -> LoanStatus {
        match self {
            LoanTransition::Opened | LoanTransition::Reactivated => LoanStatus::Active,
            LoanTransition::Overdue => LoanStatus::Overdue,
            LoanTransition::Returned => LoanStatus::Returned,
            LoanTransition::Lost => LoanStatus::Lost,
        }
    }
}

/// Book status implied by a loan transition.
pub fn book_status_for(transition: LoanTransition) -> BookStatus {
    match transition {
        LoanTransition::Opened | LoanTransition::Overdue | LoanTransition::Reactivated => {
            BookStatus::Loaned
        }
        LoanTransition::Returned => BookStatus::Available,
        LoanTransition::Lost => BookStatus::Lost,
    }
}

/// Write the book status for `transition`. Called once per loan transition,
/// in the same transaction as the loan row change.
pub async fn apply<C: ConnectionTrait>(
    conn: &C,
    book_id: i32,
    transition: LoanTransition,
) -> Result<BookStatus, DomainError> {
    let status = book_status_for(transition);

    let mut update = Book::update_many()
        .col_expr(book::Column::Status, Expr::value(status))
        .col_expr(book::Column::UpdatedAt, Expr::value(Utc::now().to_rfc3339()))
        .filter(book::Column::Id.eq(book_id));

    // Opening a loan only succeeds on a book that is still available
    if transition == LoanTransition::Opened {
        update = update.filter(book::Column::Status.eq(BookStatus::Available));
    }

    let result = update.exec(conn).await?;
    if result.rows_affected == 0 {
        let exists = Book::find_by_id(book_id).one(conn).await?.is_some();
        return Err(if exists {
            DomainError::Conflict(format!("book {book_id} changed status concurrently"))
        } else {
            DomainError::not_found("book", book_id)
        });
    }

    tracing::debug!(
        "Book {} status -> {} ({:?})",
        book_id,
        status,
        transition
    );
    Ok(status)
}

/// The open (active or overdue) loan of a book, if any
pub async fn find_open_loan<C: ConnectionTrait>(
    conn: &C,
    book_id: i32,
) -> Result<Option<loan::Model>, DomainError> {
    let open = Loan::find()
        .filter(loan::Column::BookId.eq(book_id))
        .filter(loan::Column::Status.is_in(LoanStatus::OPEN))
        .one(conn)
        .await?;
    Ok(open)
}

pub async fn ensure_no_open_loan<C: ConnectionTrait>(
    conn: &C,
    book_id: i32,
) -> Result<(), DomainError> {
    match find_open_loan(conn, book_id).await? {
        Some(loan) => {
            tracing::debug!("Book {} is held by open loan {}", book_id, loan.id);
            Err(DomainError::BookOnLoan { book_id })
        }
        None => Ok(()),
    }
}

/// Direct inventory status edit. `loaned` is reserved for loan transitions.
pub async fn set_inventory_status<C: ConnectionTrait>(
    conn: &C,
    book_id: i32,
    status: BookStatus,
) -> Result<book::Model, DomainError> {
    if status == BookStatus::Loaned {
        return Err(DomainError::Validation(
            "book status 'loaned' is set by opening a loan".to_string(),
        ));
    }

    let book = Book::find_by_id(book_id)
        .one(conn)
        .await?
        .ok_or(DomainError::not_found("book", book_id))?;

    ensure_no_open_loan(conn, book_id).await?;

    if book.status == status {
        return Ok(book);
    }

    let now = Utc::now().to_rfc3339();
    let result = Book::update_many()
        .col_expr(book::Column::Status, Expr::value(status))
        .col_expr(book::Column::UpdatedAt, Expr::value(now.clone()))
        .filter(book::Column::Id.eq(book_id))
        .filter(book::Column::Status.eq(book.status))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(DomainError::Conflict(format!(
            "book {book_id} changed status concurrently"
        )));
    }

    tracing::info!("Book {} inventory status {} -> {}", book_id, book.status, status);
    Ok(book::Model {
        status,
        updated_at: now,
        ..book
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_map_to_book_status() {
        assert_eq!(book_status_for(LoanTransition::Opened), BookStatus::Loaned);
        assert_eq!(book_status_for(LoanTransition::Overdue), BookStatus::Loaned);
        assert_eq!(book_status_for(LoanTransition::Returned), BookStatus::Available);
        assert_eq!(book_status_for(LoanTransition::Lost), BookStatus::Lost);
        assert_eq!(book_status_for(LoanTransition::Reactivated), BookStatus::Loaned);
    }

    #[test]
    fn open_transitions_leave_the_loan_open() {
        for transition in [
            LoanTransition::Opened,
            LoanTransition::Overdue,
            LoanTransition::Reactivated,
        ] {
            assert!(transition.loan_status().is_open());
            assert_eq!(book_status_for(transition), BookStatus::Loaned);
        }
        assert!(LoanTransition::Returned.loan_status().is_terminal());
        assert!(LoanTransition::Lost.loan_status().is_terminal());
    }
}
