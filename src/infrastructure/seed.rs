use sea_orm::*;

use crate::domain::DomainError;
use crate::models::book::NewBook;
use crate::models::patron::NewPatron;
use crate::models::shelf::{self, NewShelf};
use crate::services::inventory_service;

/// Populate an empty database with a few shelves, books and patrons.
///
/// Returns `false` without touching anything when shelves already exist.
pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<bool, DomainError> {
    if shelf::Entity::find().count(db).await? > 0 {
        tracing::info!("Database already holds shelves, skipping demo data");
        return Ok(false);
    }

    // 1. Shelves
    let shelves = vec![
        ("A1", "Humanities", "Literature", Some("Wood"), 40),
        ("B12", "Science", "Physics", Some("Metal"), 30),
        ("C3", "Engineering", "Computer Science", None, 2),
    ];

    let mut shelf_ids = Vec::new();
    for (code, section, topic, material, capacity) in shelves {
        let shelf = inventory_service::create_shelf(
            db,
            NewShelf {
                location_code: code.to_owned(),
                section: section.to_owned(),
                main_topic: topic.to_owned(),
                material: material.map(str::to_owned),
                total_capacity: capacity,
            },
        )
        .await?;
        shelf_ids.push(shelf.id);
    }

    // 2. Books
    let physical = vec![
        ("Cien años de soledad", "Gabriel García Márquez", Some("978-0307474728"), 0),
        ("Don Quijote de la Mancha", "Miguel de Cervantes", Some("978-8424922580"), 0),
        ("Física Universitaria", "Sears, Zemansky", None, 1),
        ("The Rust Programming Language", "Klabnik, Nichols", Some("978-1718503106"), 2),
    ];
    for (title, author, isbn, shelf_idx) in physical {
        let mut book = NewBook::physical(title, author, shelf_ids[shelf_idx]);
        book.isbn = isbn.map(str::to_owned);
        inventory_service::create_book(db, book).await?;
    }

    let sicp = NewBook::digital(
        "Structure and Interpretation of Computer Programs",
        "Abelson, Sussman",
    );
    inventory_service::create_book(db, sicp).await?;

    // 3. Patrons
    let patrons = vec![
        ("2024001", "Juan", "Pérez", "juan.perez@universidad.edu"),
        ("2024002", "María", "González", "maria.gonzalez@universidad.edu"),
        ("2023015", "Carlos", "Rodríguez", "carlos.rodriguez@universidad.edu"),
    ];
    for (number, first, last, email) in patrons {
        inventory_service::create_patron(db, NewPatron::new(number, first, last, email)).await?;
    }

    tracing::info!("Demo data seeded");
    Ok(true)
}
