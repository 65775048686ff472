//! Loan Service - the loan state machine
//!
//! ```text
//!             create            sweep
//!   (none) ----------> active --------> overdue
//!                        |  \             |   \
//!                 return |   \ mark_lost  |    \ mark_lost
//!                        v    v           v     v
//!                    returned  lost <-- return / lost
//! ```
//!
//! `returned` and `lost` are terminal. Every transition writes the loan row and
//! calls the status synchronizer once, inside one transaction.

use chrono::{Local, NaiveDate, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::*;

use crate::domain::errors::is_open_loan_violation;
use crate::domain::DomainError;
use crate::infrastructure::config::LoanPolicy;
use crate::models::book::Entity as Book;
use crate::models::loan::{self, Entity as Loan, LoanRequest};
use crate::models::patron::Entity as Patron;
use crate::models::{BookStatus, BookType, LoanStatus, PatronStatus};
use crate::services::status_sync::{self, LoanTransition};

/// Resolve and validate the estimated return date of a new loan.
pub fn resolve_return_date(
    policy: &LoanPolicy,
    book_type: BookType,
    loan_date: NaiveDate,
    requested: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<NaiveDate, DomainError> {
    if loan_date > today {
        return Err(DomainError::InvalidDateRange(format!(
            "loan date {loan_date} is in the future"
        )));
    }

    let estimated = match requested {
        Some(date) => date,
        None => policy
            .default_return_date(book_type, loan_date)
            .ok_or_else(|| DomainError::InvalidDateRange(format!("loan date {loan_date} is out of range")))?,
    };

    check_return_window(policy, loan_date, estimated)?;
    Ok(estimated)
}

fn check_return_window(
    policy: &LoanPolicy,
    loan_date: NaiveDate,
    estimated: NaiveDate,
) -> Result<(), DomainError> {
    if estimated <= loan_date {
        return Err(DomainError::InvalidDateRange(format!(
            "estimated return date {estimated} must be after loan date {loan_date}"
        )));
    }

    match policy.latest_return_date(loan_date) {
        Some(latest) if estimated <= latest => Ok(()),
        _ => Err(DomainError::InvalidDateRange(format!(
            "loan period cannot exceed {} days",
            policy.effective_max_loan_days()
        ))),
    }
}

/// Open a new loan in its own transaction.
pub async fn create_loan(
    db: &DatabaseConnection,
    policy: &LoanPolicy,
    request: LoanRequest,
) -> Result<loan::Model, DomainError> {
    let today = Local::now().date_naive();

    let txn = db.begin().await?;
    let loan = open_loan(&txn, policy, request, today).await?;
    txn.commit().await?;

    tracing::info!(
        "Loan {} opened: book {} -> patron {}, due {}",
        loan.id,
        loan.book_id,
        loan.patron_id,
        loan.estimated_return_date
    );
    Ok(loan)
}

/// Validate and insert a loan inside the caller's transaction.
///
/// Checks run in this order and the first failure is returned: book exists,
/// book has no open loan, book is available, patron exists and is active,
/// patron is under the open-loan limit, dates are valid.
pub async fn open_loan<C: ConnectionTrait>(
    conn: &C,
    policy: &LoanPolicy,
    request: LoanRequest,
    today: NaiveDate,
) -> Result<loan::Model, DomainError> {
    let book = Book::find_by_id(request.book_id)
        .one(conn)
        .await?
        .ok_or(DomainError::not_found("book", request.book_id))?;

    if status_sync::find_open_loan(conn, book.id).await?.is_some() {
        return Err(DomainError::DuplicateActiveLoan { book_id: book.id });
    }

    if book.status != BookStatus::Available {
        return Err(DomainError::BookUnavailable {
            book_id: book.id,
            status: book.status,
        });
    }

    let patron = Patron::find_by_id(request.patron_id)
        .one(conn)
        .await?
        .ok_or(DomainError::not_found("patron", request.patron_id))?;

    if patron.status != PatronStatus::Active {
        return Err(DomainError::PatronInactive {
            patron_id: patron.id,
            status: patron.status,
        });
    }

    let open_loans = Loan::find()
        .filter(loan::Column::PatronId.eq(patron.id))
        .filter(loan::Column::Status.is_in(LoanStatus::OPEN))
        .count(conn)
        .await?;

    if open_loans >= u64::from(policy.max_open_loans) {
        return Err(DomainError::LoanLimitExceeded {
            patron_id: patron.id,
            limit: policy.max_open_loans,
        });
    }

    let estimated_return_date = resolve_return_date(
        policy,
        book.book_type,
        request.loan_date,
        request.estimated_return_date,
        today,
    )?;

    let now = Utc::now().to_rfc3339();
    let new_loan = loan::ActiveModel {
        book_id: Set(book.id),
        patron_id: Set(patron.id),
        loan_date: Set(request.loan_date),
        estimated_return_date: Set(estimated_return_date),
        actual_return_date: Set(None),
        status: Set(LoanStatus::Active),
        renewal_count: Set(0),
        notes: Set(request.notes),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    let saved = new_loan.insert(conn).await.map_err(|e| {
        if is_open_loan_violation(&e) {
            DomainError::DuplicateActiveLoan { book_id: book.id }
        } else {
            DomainError::from(e)
        }
    })?;

    status_sync::apply(conn, book.id, LoanTransition::Opened).await?;

    Ok(saved)
}

/// Close an open loan as returned on `actual_return_date`.
pub async fn return_loan(
    db: &DatabaseConnection,
    loan_id: i32,
    actual_return_date: NaiveDate,
) -> Result<loan::Model, DomainError> {
    let txn = db.begin().await?;

    let loan = find_loan(&txn, loan_id).await?;

    if !loan.is_open() {
        return Err(DomainError::InvalidTransition {
            loan_id,
            from: loan.status,
            to: LoanStatus::Returned,
        });
    }

    if actual_return_date < loan.loan_date {
        return Err(DomainError::InvalidDateRange(format!(
            "return date {actual_return_date} is before loan date {}",
            loan.loan_date
        )));
    }

    let updated = close_loan(&txn, loan, LoanTransition::Returned, Some(actual_return_date)).await?;
    txn.commit().await?;

    tracing::info!(
        "Loan {} returned on {} (book {})",
        updated.id,
        actual_return_date,
        updated.book_id
    );
    Ok(updated)
}

/// Operator action: the book on an open loan is gone.
pub async fn mark_lost(db: &DatabaseConnection, loan_id: i32) -> Result<loan::Model, DomainError> {
    let txn = db.begin().await?;

    let loan = find_loan(&txn, loan_id).await?;

    if !loan.is_open() {
        return Err(DomainError::InvalidTransition {
            loan_id,
            from: loan.status,
            to: LoanStatus::Lost,
        });
    }

    let updated = close_loan(&txn, loan, LoanTransition::Lost, None).await?;
    txn.commit().await?;

    tracing::info!("Loan {} marked lost (book {})", updated.id, updated.book_id);
    Ok(updated)
}

async fn find_loan<C: ConnectionTrait>(conn: &C, loan_id: i32) -> Result<loan::Model, DomainError> {
    Loan::find_by_id(loan_id)
        .one(conn)
        .await?
        .ok_or(DomainError::not_found("loan", loan_id))
}

async fn close_loan<C: ConnectionTrait>(
    conn: &C,
    loan: loan::Model,
    transition: LoanTransition,
    actual_return_date: Option<NaiveDate>,
) -> Result<loan::Model, DomainError> {
    let status = transition.loan_status();
    let now = Utc::now().to_rfc3339();

    let result = Loan::update_many()
        .col_expr(loan::Column::Status, Expr::value(status))
        .col_expr(loan::Column::ActualReturnDate, Expr::value(actual_return_date))
        .col_expr(loan::Column::UpdatedAt, Expr::value(now.clone()))
        .filter(loan::Column::Id.eq(loan.id))
        .filter(loan::Column::Status.eq(loan.status))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(DomainError::Conflict(format!(
            "loan {} changed state concurrently",
            loan.id
        )));
    }

    status_sync::apply(conn, loan.book_id, transition).await?;

    Ok(loan::Model {
        status,
        actual_return_date,
        updated_at: now,
        ..loan
    })
}

/// Move every late active loan to `overdue`. Returns how many loans changed.
///
/// Each loan is transitioned in its own short transaction so returns arriving
/// during a long sweep are not blocked. Running it again with nothing new to
/// flag returns 0.
pub async fn sweep_overdue(db: &DatabaseConnection, as_of: NaiveDate) -> Result<u64, DomainError> {
    let candidates = Loan::find()
        .filter(loan::Column::Status.eq(LoanStatus::Active))
        .filter(loan::Column::ActualReturnDate.is_null())
        .filter(loan::Column::EstimatedReturnDate.lt(as_of))
        .order_by_asc(loan::Column::EstimatedReturnDate)
        .all(db)
        .await?;

    let mut transitioned = 0;
    for candidate in candidates {
        let txn = db.begin().await?;

        // Re-check under the transaction: the loan may have been returned meanwhile
        let result = Loan::update_many()
            .col_expr(loan::Column::Status, Expr::value(LoanStatus::Overdue))
            .col_expr(loan::Column::UpdatedAt, Expr::value(Utc::now().to_rfc3339()))
            .filter(loan::Column::Id.eq(candidate.id))
            .filter(loan::Column::Status.eq(LoanStatus::Active))
            .filter(loan::Column::ActualReturnDate.is_null())
            .filter(loan::Column::EstimatedReturnDate.lt(as_of))
            .exec(&txn)
            .await?;

        if result.rows_affected == 1 {
            status_sync::apply(&txn, candidate.book_id, LoanTransition::Overdue).await?;
            transitioned += 1;
        }

        txn.commit().await?;
    }

    tracing::info!("Overdue sweep as of {}: {} loans flagged", as_of, transitioned);
    Ok(transitioned)
}

/// `sweep_overdue` against the local calendar date
pub async fn sweep_overdue_today(db: &DatabaseConnection) -> Result<u64, DomainError> {
    sweep_overdue(db, Local::now().date_naive()).await
}

/// Push the estimated return date of an active loan further out.
pub async fn renew_loan(
    db: &DatabaseConnection,
    policy: &LoanPolicy,
    loan_id: i32,
    new_return_date: NaiveDate,
) -> Result<loan::Model, DomainError> {
    let txn = db.begin().await?;

    let loan = find_loan(&txn, loan_id).await?;

    if loan.status != LoanStatus::Active {
        return Err(DomainError::InvalidTransition {
            loan_id,
            from: loan.status,
            to: LoanStatus::Active,
        });
    }

    if new_return_date <= loan.estimated_return_date {
        return Err(DomainError::InvalidDateRange(format!(
            "renewal date {new_return_date} must be after current due date {}",
            loan.estimated_return_date
        )));
    }
    check_return_window(policy, loan.loan_date, new_return_date)?;

    let now = Utc::now().to_rfc3339();
    let result = Loan::update_many()
        .col_expr(loan::Column::EstimatedReturnDate, Expr::value(new_return_date))
        .col_expr(
            loan::Column::RenewalCount,
            Expr::col(loan::Column::RenewalCount).add(1),
        )
        .col_expr(loan::Column::UpdatedAt, Expr::value(now.clone()))
        .filter(loan::Column::Id.eq(loan_id))
        .filter(loan::Column::Status.eq(LoanStatus::Active))
        .exec(&txn)
        .await?;

    if result.rows_affected == 0 {
        return Err(DomainError::Conflict(format!(
            "loan {loan_id} changed state concurrently"
        )));
    }

    txn.commit().await?;

    tracing::info!(
        "Loan {} renewed: due {} -> {}",
        loan_id,
        loan.estimated_return_date,
        new_return_date
    );

    Ok(loan::Model {
        estimated_return_date: new_return_date,
        renewal_count: loan.renewal_count + 1,
        updated_at: now,
        ..loan
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn default_due_date_follows_book_type() {
        let policy = LoanPolicy::default();
        let today = date(2024, 12, 1);
        assert_eq!(
            resolve_return_date(&policy, BookType::Physical, date(2024, 11, 1), None, today).unwrap(),
            date(2024, 11, 15)
        );
        assert_eq!(
            resolve_return_date(&policy, BookType::Digital, date(2024, 11, 1), None, today).unwrap(),
            date(2024, 11, 8)
        );
    }

    #[test]
    fn explicit_due_date_must_fit_the_window() {
        let policy = LoanPolicy::default();
        let loan_date = date(2024, 1, 10);
        let today = date(2024, 2, 1);

        let same_day = resolve_return_date(&policy, BookType::Physical, loan_date, Some(loan_date), today);
        assert!(matches!(same_day, Err(DomainError::InvalidDateRange(_))));

        let last_allowed = date(2025, 1, 9);
        assert_eq!(
            resolve_return_date(&policy, BookType::Physical, loan_date, Some(last_allowed), today).unwrap(),
            last_allowed
        );

        let too_far = date(2025, 1, 11);
        assert!(matches!(
            resolve_return_date(&policy, BookType::Physical, loan_date, Some(too_far), today),
            Err(DomainError::InvalidDateRange(_))
        ));
    }

    #[test]
    fn future_loan_date_is_rejected() {
        let policy = LoanPolicy::default();
        let today = date(2024, 5, 1);
        assert!(matches!(
            resolve_return_date(&policy, BookType::Physical, date(2024, 5, 2), None, today),
            Err(DomainError::InvalidDateRange(_))
        ));
    }
}
