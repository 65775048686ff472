//! Inventory Service - registering shelves, books and patrons
//!
//! Records created here start in a consistent state: books reserve shelf
//! capacity in the same transaction as their insert, shelves start empty.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::*;

use crate::domain::DomainError;
use crate::models::book::{self, NewBook};
use crate::models::patron::{self, is_valid_email, is_valid_patron_number, NewPatron};
use crate::models::shelf::{self, is_valid_location_code, NewShelf, SHELF_MATERIALS};
use crate::models::{BookStatus, PatronStatus};
use crate::services::{capacity_ledger, placement_service, status_sync};

fn require_text(field: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Turn a uniqueness violation into a message naming the natural key.
fn duplicate_as(e: DbErr, what: String) -> DomainError {
    match DomainError::from(e) {
        DomainError::Duplicate(_) => DomainError::Duplicate(what),
        other => other,
    }
}

pub fn validate_shelf(input: &NewShelf) -> Result<(), DomainError> {
    if !is_valid_location_code(&input.location_code) {
        return Err(DomainError::Validation(format!(
            "location code '{}' must be one letter followed by 1-2 digits",
            input.location_code
        )));
    }
    require_text("section", &input.section)?;
    require_text("main topic", &input.main_topic)?;
    if let Some(material) = &input.material {
        if !SHELF_MATERIALS.contains(&material.as_str()) {
            return Err(DomainError::Validation(format!(
                "material must be one of {}",
                SHELF_MATERIALS.join(", ")
            )));
        }
    }
    if input.total_capacity <= 0 {
        return Err(DomainError::Validation(
            "total capacity must be positive".to_string(),
        ));
    }
    Ok(())
}

pub async fn create_shelf(
    db: &DatabaseConnection,
    input: NewShelf,
) -> Result<shelf::Model, DomainError> {
    validate_shelf(&input)?;

    let now = Utc::now().to_rfc3339();
    let code = input.location_code.clone();
    let new_shelf = shelf::ActiveModel {
        location_code: Set(input.location_code),
        section: Set(input.section.trim().to_string()),
        main_topic: Set(input.main_topic.trim().to_string()),
        material: Set(input.material),
        total_capacity: Set(input.total_capacity),
        current_book_count: Set(0),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    let shelf = new_shelf
        .insert(db)
        .await
        .map_err(|e| duplicate_as(e, format!("shelf with location code {code}")))?;

    tracing::info!(
        "Shelf {} created with capacity {}",
        shelf.location_code,
        shelf.total_capacity
    );
    Ok(shelf)
}

/// Change a shelf's capacity; never below the books it currently holds.
pub async fn resize_shelf(
    db: &DatabaseConnection,
    shelf_id: i32,
    new_capacity: i32,
) -> Result<shelf::Model, DomainError> {
    if new_capacity <= 0 {
        return Err(DomainError::Validation(
            "total capacity must be positive".to_string(),
        ));
    }

    let txn = db.begin().await?;

    let result = shelf::Entity::update_many()
        .col_expr(shelf::Column::TotalCapacity, Expr::value(new_capacity))
        .col_expr(shelf::Column::UpdatedAt, Expr::value(Utc::now().to_rfc3339()))
        .filter(shelf::Column::Id.eq(shelf_id))
        .filter(shelf::Column::CurrentBookCount.lte(new_capacity))
        .exec(&txn)
        .await?;

    let shelf = shelf::Entity::find_by_id(shelf_id)
        .one(&txn)
        .await?
        .ok_or(DomainError::not_found("shelf", shelf_id))?;

    if result.rows_affected == 0 {
        return Err(DomainError::Validation(format!(
            "shelf {} holds {} books, cannot shrink to {}",
            shelf.location_code, shelf.current_book_count, new_capacity
        )));
    }

    txn.commit().await?;
    tracing::info!("Shelf {} resized to {}", shelf.location_code, new_capacity);
    Ok(shelf)
}

/// Remove an empty shelf.
pub async fn delete_shelf(db: &DatabaseConnection, shelf_id: i32) -> Result<(), DomainError> {
    let txn = db.begin().await?;

    let result = shelf::Entity::delete_many()
        .filter(shelf::Column::Id.eq(shelf_id))
        .filter(shelf::Column::CurrentBookCount.eq(0))
        .exec(&txn)
        .await?;

    if result.rows_affected == 0 {
        let shelf = shelf::Entity::find_by_id(shelf_id)
            .one(&txn)
            .await?
            .ok_or(DomainError::not_found("shelf", shelf_id))?;
        return Err(DomainError::Validation(format!(
            "shelf {} still holds {} books",
            shelf.location_code, shelf.current_book_count
        )));
    }

    txn.commit().await?;
    tracing::info!("Shelf {} deleted", shelf_id);
    Ok(())
}

/// Register a book. Physical books take a slot on their shelf.
pub async fn create_book(db: &DatabaseConnection, input: NewBook) -> Result<book::Model, DomainError> {
    require_text("title", &input.title)?;
    require_text("author", &input.author)?;
    placement_service::check_placement(input.book_type, input.shelf_id)?;

    let txn = db.begin().await?;

    if let Some(shelf_id) = input.shelf_id {
        capacity_ledger::reserve(&txn, shelf_id).await?;
    }

    let now = Utc::now().to_rfc3339();
    let isbn = input.isbn.clone();
    let new_book = book::ActiveModel {
        isbn: Set(input.isbn),
        title: Set(input.title.trim().to_string()),
        author: Set(input.author.trim().to_string()),
        publisher: Set(input.publisher),
        publication_year: Set(input.publication_year),
        book_type: Set(input.book_type),
        shelf_id: Set(input.shelf_id),
        status: Set(BookStatus::Available),
        acquisition_date: Set(input.acquisition_date),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    let book = new_book.insert(&txn).await.map_err(|e| {
        duplicate_as(e, format!("book with ISBN {}", isbn.as_deref().unwrap_or("-")))
    })?;

    txn.commit().await?;

    tracing::info!(
        "Book {} '{}' registered ({}, shelf {:?})",
        book.id,
        book.title,
        book.book_type,
        book.shelf_id
    );
    Ok(book)
}

/// Staff status edit (maintenance, back in circulation, lost on shelf).
pub async fn set_book_status(
    db: &DatabaseConnection,
    book_id: i32,
    status: BookStatus,
) -> Result<book::Model, DomainError> {
    let txn = db.begin().await?;
    let book = status_sync::set_inventory_status(&txn, book_id, status).await?;
    txn.commit().await?;
    Ok(book)
}

pub fn validate_patron(input: &NewPatron) -> Result<(), DomainError> {
    if !is_valid_patron_number(&input.patron_number) {
        return Err(DomainError::Validation(format!(
            "patron number '{}' must be 4-20 digits",
            input.patron_number
        )));
    }
    require_text("first name", &input.first_name)?;
    require_text("last name", &input.last_name)?;
    if !is_valid_email(&input.email) {
        return Err(DomainError::Validation(format!(
            "'{}' is not a valid email address",
            input.email
        )));
    }
    Ok(())
}

pub async fn create_patron(
    db: &DatabaseConnection,
    input: NewPatron,
) -> Result<patron::Model, DomainError> {
    validate_patron(&input)?;

    let now = Utc::now().to_rfc3339();
    let number = input.patron_number.clone();
    let new_patron = patron::ActiveModel {
        patron_number: Set(input.patron_number),
        first_name: Set(input.first_name.trim().to_string()),
        last_name: Set(input.last_name.trim().to_string()),
        email: Set(input.email),
        phone: Set(input.phone),
        program: Set(input.program),
        status: Set(PatronStatus::Active),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    let patron = new_patron
        .insert(db)
        .await
        .map_err(|e| duplicate_as(e, format!("patron {number} or their email")))?;

    tracing::info!("Patron {} registered as {}", patron.id, patron.patron_number);
    Ok(patron)
}

pub async fn set_patron_status(
    db: &DatabaseConnection,
    patron_id: i32,
    status: PatronStatus,
) -> Result<patron::Model, DomainError> {
    let patron = patron::Entity::find_by_id(patron_id)
        .one(db)
        .await?
        .ok_or(DomainError::not_found("patron", patron_id))?;

    let previous = patron.status;
    let mut active: patron::ActiveModel = patron.into();
    active.status = Set(status);
    active.updated_at = Set(Utc::now().to_rfc3339());
    let patron = active.update(db).await?;

    tracing::info!("Patron {} status {} -> {}", patron_id, previous, status);
    Ok(patron)
}
