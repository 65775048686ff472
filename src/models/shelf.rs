use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shelves")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub location_code: String,
    pub section: String,
    pub main_topic: String,
    pub material: Option<String>, // 'Wood', 'Metal', 'Plastic', 'Glass', 'Composite'
    pub total_capacity: i32,
    /// Cached count of physical books assigned to this shelf.
    /// Only the capacity ledger writes this column.
    pub current_book_count: i32,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::book::Entity")]
    Books,
}

impl Related<super::book::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Books.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn remaining_capacity(&self) -> i32 {
        self.total_capacity - self.current_book_count
    }

    pub fn is_full(&self) -> bool {
        self.current_book_count >= self.total_capacity
    }
}

/// Materials accepted for a shelf
pub const SHELF_MATERIALS: [&str; 5] = ["Wood", "Metal", "Plastic", "Glass", "Composite"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewShelf {
    pub location_code: String,
    pub section: String,
    pub main_topic: String,
    pub material: Option<String>,
    pub total_capacity: i32,
}

/// Location codes are one uppercase letter followed by one or two digits (e.g. `A1`, `C12`).
pub fn is_valid_location_code(code: &str) -> bool {
    let mut chars = code.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_uppercase() {
        return false;
    }
    let digits: Vec<char> = chars.collect();
    (1..=2).contains(&digits.len()) && digits.iter().all(|c| c.is_ascii_digit())
}
