//! Capacity Ledger - sole writer of `shelves.current_book_count`
//!
//! `reserve` and `release` run inside the caller's transaction. The
//! capacity decision and the increment are a single guarded UPDATE, so two
//! concurrent reservations on a nearly full shelf cannot both pass.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use serde::Serialize;

use crate::domain::DomainError;
use crate::models::book::{self, Entity as Book};
use crate::models::shelf::{self, Entity as Shelf};
use crate::models::BookType;

/// Take one slot on a shelf.
pub async fn reserve<C: ConnectionTrait>(
    conn: &C,
    shelf_id: i32,
) -> Result<shelf::Model, DomainError> {
    let result = Shelf::update_many()
        .col_expr(
            shelf::Column::CurrentBookCount,
            Expr::col(shelf::Column::CurrentBookCount).add(1),
        )
        .col_expr(shelf::Column::UpdatedAt, Expr::value(Utc::now().to_rfc3339()))
        .filter(shelf::Column::Id.eq(shelf_id))
        .filter(
            Expr::col(shelf::Column::CurrentBookCount)
                .lt(Expr::col(shelf::Column::TotalCapacity)),
        )
        .exec(conn)
        .await?;

    let shelf = Shelf::find_by_id(shelf_id)
        .one(conn)
        .await?
        .ok_or(DomainError::not_found("shelf", shelf_id))?;

    if result.rows_affected == 0 {
        tracing::debug!(
            "Shelf {} ({}) is full: {}/{}",
            shelf.id,
            shelf.location_code,
            shelf.current_book_count,
            shelf.total_capacity
        );
        return Err(DomainError::CapacityExceeded {
            shelf_id,
            capacity: shelf.total_capacity,
        });
    }

    tracing::debug!(
        "Reserved slot on shelf {}: {}/{}",
        shelf.location_code,
        shelf.current_book_count,
        shelf.total_capacity
    );
    Ok(shelf)
}

/// Give one slot back to a shelf.
pub async fn release<C: ConnectionTrait>(
    conn: &C,
    shelf_id: i32,
) -> Result<shelf::Model, DomainError> {
    let result = Shelf::update_many()
        .col_expr(
            shelf::Column::CurrentBookCount,
            Expr::col(shelf::Column::CurrentBookCount).sub(1),
        )
        .col_expr(shelf::Column::UpdatedAt, Expr::value(Utc::now().to_rfc3339()))
        .filter(shelf::Column::Id.eq(shelf_id))
        .filter(shelf::Column::CurrentBookCount.gt(0))
        .exec(conn)
        .await?;

    let shelf = Shelf::find_by_id(shelf_id)
        .one(conn)
        .await?
        .ok_or(DomainError::not_found("shelf", shelf_id))?;

    if result.rows_affected == 0 {
        tracing::warn!(
            "Release on empty shelf {} ({}); occupancy counter has drifted",
            shelf.id,
            shelf.location_code
        );
        return Err(DomainError::OccupancyUnderflow { shelf_id });
    }

    tracing::debug!(
        "Released slot on shelf {}: {}/{}",
        shelf.location_code,
        shelf.current_book_count,
        shelf.total_capacity
    );
    Ok(shelf)
}

/// Result of reconciling a shelf's cached occupancy against its books
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShelfAudit {
    pub shelf_id: i32,
    pub location_code: String,
    pub total_capacity: i32,
    /// Value cached on the shelf row
    pub recorded_count: i32,
    /// Physical books actually assigned to the shelf
    pub expected_count: i32,
}

impl ShelfAudit {
    pub fn is_consistent(&self) -> bool {
        self.recorded_count == self.expected_count
    }

    /// Positive when the cache over-counts
    pub fn drift(&self) -> i32 {
        self.recorded_count - self.expected_count
    }
}

/// Recount the physical books on a shelf and compare with the cached value.
///
/// Mismatches are logged and returned, never corrected here: a drift means
/// some earlier write bypassed the ledger.
pub async fn audit<C: ConnectionTrait>(conn: &C, shelf_id: i32) -> Result<ShelfAudit, DomainError> {
    let shelf = Shelf::find_by_id(shelf_id)
        .one(conn)
        .await?
        .ok_or(DomainError::not_found("shelf", shelf_id))?;

    audit_shelf(conn, shelf).await
}

/// Reconcile every shelf, ordered by location code.
pub async fn audit_all<C: ConnectionTrait>(conn: &C) -> Result<Vec<ShelfAudit>, DomainError> {
    let shelves = Shelf::find()
        .order_by_asc(shelf::Column::LocationCode)
        .all(conn)
        .await?;

    let mut audits = Vec::with_capacity(shelves.len());
    for shelf in shelves {
        audits.push(audit_shelf(conn, shelf).await?);
    }

    let drifted = audits.iter().filter(|a| !a.is_consistent()).count();
    tracing::info!(
        "Audited {} shelves, {} with occupancy drift",
        audits.len(),
        drifted
    );
    Ok(audits)
}

async fn audit_shelf<C: ConnectionTrait>(
    conn: &C,
    shelf: shelf::Model,
) -> Result<ShelfAudit, DomainError> {
    let expected = Book::find()
        .filter(book::Column::ShelfId.eq(shelf.id))
        .filter(book::Column::BookType.eq(BookType::Physical))
        .count(conn)
        .await?;

    let audit = ShelfAudit {
        shelf_id: shelf.id,
        location_code: shelf.location_code,
        total_capacity: shelf.total_capacity,
        recorded_count: shelf.current_book_count,
        expected_count: i32::try_from(expected).unwrap_or(i32::MAX),
    };

    if !audit.is_consistent() {
        tracing::warn!(
            "Occupancy mismatch on shelf {} ({}): recorded {}, counted {}",
            audit.shelf_id,
            audit.location_code,
            audit.recorded_count,
            audit.expected_count
        );
    }

    Ok(audit)
}
