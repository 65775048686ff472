#![allow(dead_code)]

use bibliocore::db;
use bibliocore::models::book::{self, NewBook};
use bibliocore::models::patron::{self, NewPatron};
use bibliocore::models::shelf::{self, NewShelf};
use bibliocore::services::inventory_service;
use chrono::NaiveDate;
use sea_orm::{DatabaseConnection, EntityTrait};

// Helper to create a test database
pub async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub async fn create_test_shelf(db: &DatabaseConnection, code: &str, capacity: i32) -> shelf::Model {
    inventory_service::create_shelf(
        db,
        NewShelf {
            location_code: code.to_string(),
            section: "Science".to_string(),
            main_topic: "Physics".to_string(),
            material: Some("Wood".to_string()),
            total_capacity: capacity,
        },
    )
    .await
    .expect("Failed to create shelf")
}

pub async fn create_physical_book(db: &DatabaseConnection, title: &str, shelf_id: i32) -> book::Model {
    inventory_service::create_book(db, NewBook::physical(title, "Test Author", shelf_id))
        .await
        .expect("Failed to create physical book")
}

pub async fn create_digital_book(db: &DatabaseConnection, title: &str) -> book::Model {
    inventory_service::create_book(db, NewBook::digital(title, "Test Author"))
        .await
        .expect("Failed to create digital book")
}

pub async fn create_test_patron(db: &DatabaseConnection, number: &str) -> patron::Model {
    let email = format!("patron{number}@universidad.edu");
    inventory_service::create_patron(db, NewPatron::new(number, "Juan", "Pérez", &email))
        .await
        .expect("Failed to create patron")
}

pub async fn reload_shelf(db: &DatabaseConnection, id: i32) -> shelf::Model {
    shelf::Entity::find_by_id(id)
        .one(db)
        .await
        .unwrap()
        .expect("shelf disappeared")
}

pub async fn reload_book(db: &DatabaseConnection, id: i32) -> book::Model {
    book::Entity::find_by_id(id)
        .one(db)
        .await
        .unwrap()
        .expect("book disappeared")
}
