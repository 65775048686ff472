mod common;

use bibliocore::domain::DomainError;
use bibliocore::models::book::NewBook;
use bibliocore::models::shelf;
use bibliocore::models::BookType;
use bibliocore::services::{capacity_ledger, inventory_service, placement_service};
use common::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

#[tokio::test]
async fn test_shelf_fills_to_capacity() {
    let db = setup_test_db().await;
    let b12 = create_test_shelf(&db, "B12", 1).await;

    let first = create_physical_book(&db, "Física Universitaria", b12.id).await;
    assert_eq!(first.shelf_id, Some(b12.id));
    assert_eq!(reload_shelf(&db, b12.id).await.current_book_count, 1);

    let second = inventory_service::create_book(&db, NewBook::physical("Óptica", "Hecht", b12.id)).await;
    assert!(matches!(
        second,
        Err(DomainError::CapacityExceeded { shelf_id, capacity: 1 }) if shelf_id == b12.id
    ));

    // Rejected insert leaves nothing behind
    let shelf = reload_shelf(&db, b12.id).await;
    assert_eq!(shelf.current_book_count, 1);
    assert!(shelf.is_full());
    let audit = capacity_ledger::audit(&db, b12.id).await.unwrap();
    assert!(audit.is_consistent());
}

#[tokio::test]
async fn test_move_between_shelves_and_back() {
    let db = setup_test_db().await;
    let a = create_test_shelf(&db, "A1", 3).await;
    let b = create_test_shelf(&db, "B1", 3).await;
    let book = create_physical_book(&db, "Dune", a.id).await;

    let moved = placement_service::place(&db, book.id, Some(b.id)).await.unwrap();
    assert_eq!(moved.shelf_id, Some(b.id));
    assert_eq!(reload_shelf(&db, a.id).await.current_book_count, 0);
    assert_eq!(reload_shelf(&db, b.id).await.current_book_count, 1);

    placement_service::place(&db, book.id, Some(a.id)).await.unwrap();
    assert_eq!(reload_shelf(&db, a.id).await.current_book_count, 1);
    assert_eq!(reload_shelf(&db, b.id).await.current_book_count, 0);

    // Same shelf is a no-op
    placement_service::place(&db, book.id, Some(a.id)).await.unwrap();
    assert_eq!(reload_shelf(&db, a.id).await.current_book_count, 1);
}

#[tokio::test]
async fn test_move_to_full_shelf_rolls_back() {
    let db = setup_test_db().await;
    let a = create_test_shelf(&db, "A1", 2).await;
    let full = create_test_shelf(&db, "C3", 1).await;
    let book = create_physical_book(&db, "Dune", a.id).await;
    create_physical_book(&db, "Foundation", full.id).await;

    let result = placement_service::place(&db, book.id, Some(full.id)).await;
    assert!(matches!(result, Err(DomainError::CapacityExceeded { .. })));

    // The release on A was rolled back with the failed reserve
    assert_eq!(reload_shelf(&db, a.id).await.current_book_count, 1);
    assert_eq!(reload_shelf(&db, full.id).await.current_book_count, 1);
    assert_eq!(reload_book(&db, book.id).await.shelf_id, Some(a.id));
}

#[tokio::test]
async fn test_placement_rules_by_book_type() {
    let db = setup_test_db().await;
    let a = create_test_shelf(&db, "A1", 5).await;

    let shelfless = inventory_service::create_book(
        &db,
        NewBook {
            shelf_id: None,
            ..NewBook::physical("Dune", "Frank Herbert", a.id)
        },
    )
    .await;
    assert!(matches!(shelfless, Err(DomainError::InvalidPlacement(_))));

    let ebook = create_digital_book(&db, "SICP").await;
    assert_eq!(ebook.shelf_id, None);

    let shelved = placement_service::place(&db, ebook.id, Some(a.id)).await;
    assert!(matches!(shelved, Err(DomainError::InvalidPlacement(_))));
    assert_eq!(reload_shelf(&db, a.id).await.current_book_count, 0);

    let missing = placement_service::place(&db, 999, Some(a.id)).await;
    assert!(matches!(missing, Err(DomainError::NotFound { entity: "book", id: 999 })));
}

#[tokio::test]
async fn test_change_book_type_moves_capacity() {
    let db = setup_test_db().await;
    let a = create_test_shelf(&db, "A1", 1).await;
    let book = create_physical_book(&db, "Dune", a.id).await;

    let digital = placement_service::change_book_type(&db, book.id, BookType::Digital, None)
        .await
        .unwrap();
    assert_eq!(digital.book_type, BookType::Digital);
    assert_eq!(digital.shelf_id, None);
    assert_eq!(reload_shelf(&db, a.id).await.current_book_count, 0);

    let physical = placement_service::change_book_type(&db, book.id, BookType::Physical, Some(a.id))
        .await
        .unwrap();
    assert_eq!(physical.shelf_id, Some(a.id));
    assert_eq!(reload_shelf(&db, a.id).await.current_book_count, 1);

    // Shelf is full now; converting another e-book onto it fails cleanly
    let other = create_digital_book(&db, "SICP").await;
    let result = placement_service::change_book_type(&db, other.id, BookType::Physical, Some(a.id)).await;
    assert!(matches!(result, Err(DomainError::CapacityExceeded { .. })));
    assert_eq!(reload_book(&db, other.id).await.book_type, BookType::Digital);
}

#[tokio::test]
async fn test_audit_reports_drift() {
    let db = setup_test_db().await;
    let a = create_test_shelf(&db, "A1", 5).await;
    let b = create_test_shelf(&db, "B2", 5).await;
    create_physical_book(&db, "Dune", a.id).await;
    create_physical_book(&db, "Foundation", a.id).await;
    create_digital_book(&db, "SICP").await;

    let audits = capacity_ledger::audit_all(&db).await.unwrap();
    assert_eq!(audits.len(), 2);
    assert!(audits.iter().all(|a| a.is_consistent()));
    assert_eq!(audits[0].location_code, "A1");
    assert_eq!(audits[0].expected_count, 2);

    // Bypass the ledger to simulate an inconsistent store
    shelf::Entity::update_many()
        .col_expr(shelf::Column::CurrentBookCount, Expr::value(4))
        .filter(shelf::Column::Id.eq(a.id))
        .exec(&db)
        .await
        .unwrap();

    let audit = capacity_ledger::audit(&db, a.id).await.unwrap();
    assert!(!audit.is_consistent());
    assert_eq!(audit.recorded_count, 4);
    assert_eq!(audit.expected_count, 2);
    assert_eq!(audit.drift(), 2);
    assert!(capacity_ledger::audit(&db, b.id).await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_release_on_empty_counter_is_refused() {
    let db = setup_test_db().await;
    let a = create_test_shelf(&db, "A1", 5).await;
    let b = create_test_shelf(&db, "B2", 5).await;
    let book = create_physical_book(&db, "Dune", a.id).await;

    shelf::Entity::update_many()
        .col_expr(shelf::Column::CurrentBookCount, Expr::value(0))
        .filter(shelf::Column::Id.eq(a.id))
        .exec(&db)
        .await
        .unwrap();

    let result = placement_service::place(&db, book.id, Some(b.id)).await;
    assert!(matches!(result, Err(DomainError::OccupancyUnderflow { shelf_id }) if shelf_id == a.id));
    assert_eq!(reload_shelf(&db, b.id).await.current_book_count, 0);
    assert_eq!(reload_book(&db, book.id).await.shelf_id, Some(a.id));
}

#[tokio::test]
async fn test_resize_and_delete_shelf() {
    let db = setup_test_db().await;
    let a = create_test_shelf(&db, "A1", 3).await;
    create_physical_book(&db, "Dune", a.id).await;
    create_physical_book(&db, "Foundation", a.id).await;

    let shrink = inventory_service::resize_shelf(&db, a.id, 1).await;
    assert!(matches!(shrink, Err(DomainError::Validation(_))));

    let resized = inventory_service::resize_shelf(&db, a.id, 2).await.unwrap();
    assert_eq!(resized.total_capacity, 2);
    assert!(resized.is_full());

    let occupied = inventory_service::delete_shelf(&db, a.id).await;
    assert!(matches!(occupied, Err(DomainError::Validation(_))));

    let empty = create_test_shelf(&db, "Z9", 1).await;
    inventory_service::delete_shelf(&db, empty.id).await.unwrap();
    assert!(shelf::Entity::find_by_id(empty.id).one(&db).await.unwrap().is_none());

    let missing = inventory_service::delete_shelf(&db, empty.id).await;
    assert!(matches!(missing, Err(DomainError::NotFound { entity: "shelf", .. })));
}

#[tokio::test]
async fn test_duplicate_location_code() {
    let db = setup_test_db().await;
    create_test_shelf(&db, "A1", 3).await;

    let again = inventory_service::create_shelf(
        &db,
        bibliocore::models::shelf::NewShelf {
            location_code: "A1".to_string(),
            section: "Arts".to_string(),
            main_topic: "Music".to_string(),
            material: None,
            total_capacity: 10,
        },
    )
    .await;
    assert!(matches!(again, Err(DomainError::Duplicate(msg)) if msg.contains("A1")));
}
