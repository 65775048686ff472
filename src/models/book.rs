use std::fmt;

use chrono::NaiveDate;
use sea_orm::ActiveEnum;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum BookType {
    #[sea_orm(string_value = "physical")]
    Physical,
    #[sea_orm(string_value = "digital")]
    Digital,
}

/// Availability status of a book.
/// - `available`: can be loaned
/// - `loaned`: has an open loan (written only by the status synchronizer)
/// - `maintenance`: pulled from circulation by staff
/// - `lost`: missing, either from a lost loan or an inventory check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum BookStatus {
    #[sea_orm(string_value = "available")]
    Available,
    #[sea_orm(string_value = "loaned")]
    Loaned,
    #[sea_orm(string_value = "maintenance")]
    Maintenance,
    #[sea_orm(string_value = "lost")]
    Lost,
}

impl fmt::Display for BookType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_value())
    }
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_value())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "books")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub isbn: Option<String>,
    pub title: String,
    pub author: String,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub book_type: BookType,
    /// Required for physical books, always NULL for digital ones.
    pub shelf_id: Option<i32>,
    pub status: BookStatus,
    pub acquisition_date: Option<NaiveDate>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::shelf::Entity",
        from = "Column::ShelfId",
        to = "super::shelf::Column::Id",
        on_update = "Cascade",
        on_delete = "Restrict"
    )]
    Shelf,
    #[sea_orm(has_many = "super::loan::Entity")]
    Loans,
}

impl Related<super::shelf::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shelf.def()
    }
}

impl Related<super::loan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loans.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// Input for registering a book in the inventory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBook {
    pub isbn: Option<String>,
    pub title: String,
    pub author: String,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub book_type: BookType,
    pub shelf_id: Option<i32>,
    pub acquisition_date: Option<NaiveDate>,
}

impl NewBook {
    pub fn physical(title: &str, author: &str, shelf_id: i32) -> Self {
        Self {
            isbn: None,
            title: title.to_string(),
            author: author.to_string(),
            publisher: None,
            publication_year: None,
            book_type: BookType::Physical,
            shelf_id: Some(shelf_id),
            acquisition_date: None,
        }
    }

    pub fn digital(title: &str, author: &str) -> Self {
        Self {
            isbn: None,
            title: title.to_string(),
            author: author.to_string(),
            publisher: None,
            publication_year: None,
            book_type: BookType::Digital,
            shelf_id: None,
            acquisition_date: None,
        }
    }
}
