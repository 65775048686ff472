//! Placement Manager - assigns physical books to shelves
//!
//! Every change of a book's shelf reference or type passes through here so
//! the capacity ledger sees the matching release/reserve pair in the same
//! transaction.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::*;

use crate::domain::DomainError;
use crate::models::book::{self, Entity as Book};
use crate::models::BookType;
use crate::services::capacity_ledger;

/// Physical books need a shelf, digital books must not have one.
pub fn check_placement(book_type: BookType, shelf_id: Option<i32>) -> Result<(), DomainError> {
    match (book_type, shelf_id) {
        (BookType::Physical, None) => Err(DomainError::InvalidPlacement(
            "physical books must be assigned to a shelf".to_string(),
        )),
        (BookType::Digital, Some(shelf_id)) => Err(DomainError::InvalidPlacement(format!(
            "digital books cannot be placed on a shelf (requested shelf {shelf_id})"
        ))),
        _ => Ok(()),
    }
}

/// Place a book on `shelf_id` (or nowhere, for digital books) in its own transaction.
pub async fn place(
    db: &DatabaseConnection,
    book_id: i32,
    shelf_id: Option<i32>,
) -> Result<book::Model, DomainError> {
    let txn = db.begin().await?;
    let book = place_in(&txn, book_id, shelf_id).await?;
    txn.commit().await?;
    Ok(book)
}

/// Place a book inside the caller's transaction.
///
/// Moving from shelf A to shelf B releases A and reserves B; if B is full the
/// error propagates and the caller's rollback restores A.
pub async fn place_in<C: ConnectionTrait>(
    conn: &C,
    book_id: i32,
    shelf_id: Option<i32>,
) -> Result<book::Model, DomainError> {
    let book = Book::find_by_id(book_id)
        .one(conn)
        .await?
        .ok_or(DomainError::not_found("book", book_id))?;

    check_placement(book.book_type, shelf_id)?;

    let Some(target) = shelf_id else {
        // Digital book staying off-shelf
        return Ok(book);
    };

    if book.shelf_id == Some(target) {
        return Ok(book);
    }

    if let Some(current) = book.shelf_id {
        capacity_ledger::release(conn, current).await?;
    }
    capacity_ledger::reserve(conn, target).await?;

    let now = Utc::now().to_rfc3339();
    let mut update = Book::update_many()
        .col_expr(book::Column::ShelfId, Expr::value(Some(target)))
        .col_expr(book::Column::UpdatedAt, Expr::value(now.clone()))
        .filter(book::Column::Id.eq(book_id));
    update = match book.shelf_id {
        Some(current) => update.filter(book::Column::ShelfId.eq(current)),
        None => update.filter(book::Column::ShelfId.is_null()),
    };

    if update.exec(conn).await?.rows_affected == 0 {
        return Err(DomainError::Conflict(format!(
            "book {book_id} was moved concurrently"
        )));
    }

    tracing::info!(
        "Book {} placed on shelf {} (was {:?})",
        book_id,
        target,
        book.shelf_id
    );

    Ok(book::Model {
        shelf_id: Some(target),
        updated_at: now,
        ..book
    })
}

/// Switch a book between physical and digital.
///
/// Physical -> digital releases the old shelf; digital -> physical reserves
/// `shelf_id`. Same-type requests behave like `place`.
pub async fn change_book_type(
    db: &DatabaseConnection,
    book_id: i32,
    new_type: BookType,
    shelf_id: Option<i32>,
) -> Result<book::Model, DomainError> {
    let txn = db.begin().await?;

    let book = Book::find_by_id(book_id)
        .one(&txn)
        .await?
        .ok_or(DomainError::not_found("book", book_id))?;

    check_placement(new_type, shelf_id)?;

    if book.book_type == new_type {
        let placed = place_in(&txn, book_id, shelf_id).await?;
        txn.commit().await?;
        return Ok(placed);
    }

    match (book.shelf_id, shelf_id) {
        (Some(current), None) => {
            capacity_ledger::release(&txn, current).await?;
        }
        (None, Some(target)) => {
            capacity_ledger::reserve(&txn, target).await?;
        }
        // Mixed states are rejected by the schema; nothing to move
        _ => {}
    }

    let now = Utc::now().to_rfc3339();
    let result = Book::update_many()
        .col_expr(book::Column::BookType, Expr::value(new_type))
        .col_expr(book::Column::ShelfId, Expr::value(shelf_id))
        .col_expr(book::Column::UpdatedAt, Expr::value(now.clone()))
        .filter(book::Column::Id.eq(book_id))
        .filter(book::Column::BookType.eq(book.book_type))
        .exec(&txn)
        .await?;

    if result.rows_affected == 0 {
        return Err(DomainError::Conflict(format!(
            "book {book_id} changed type concurrently"
        )));
    }

    txn.commit().await?;

    tracing::info!(
        "Book {} converted {} -> {} (shelf {:?} -> {:?})",
        book_id,
        book.book_type,
        new_type,
        book.shelf_id,
        shelf_id
    );

    Ok(book::Model {
        book_type: new_type,
        shelf_id,
        updated_at: now,
        ..book
    })
}
