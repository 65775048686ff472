use std::fmt;

use chrono::NaiveDate;
use sea_orm::ActiveEnum;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "returned")]
    Returned,
    #[sea_orm(string_value = "overdue")]
    Overdue,
    #[sea_orm(string_value = "lost")]
    Lost,
}

impl LoanStatus {
    /// Statuses that count as an open loan
    pub const OPEN: [LoanStatus; 2] = [LoanStatus::Active, LoanStatus::Overdue];

    pub fn is_open(self) -> bool {
        matches!(self, LoanStatus::Active | LoanStatus::Overdue)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, LoanStatus::Returned | LoanStatus::Lost)
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_value())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub book_id: i32,
    pub patron_id: i32,
    pub loan_date: NaiveDate,
    pub estimated_return_date: NaiveDate,
    /// Set exactly when the loan is returned
    pub actual_return_date: Option<NaiveDate>,
    pub status: LoanStatus,
    pub renewal_count: i32,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::book::Entity",
        from = "Column::BookId",
        to = "super::book::Column::Id",
        on_update = "Cascade",
        on_delete = "Restrict"
    )]
    Book,
    #[sea_orm(
        belongs_to = "super::patron::Entity",
        from = "Column::PatronId",
        to = "super::patron::Column::Id",
        on_update = "Cascade",
        on_delete = "Restrict"
    )]
    Patron,
}

impl Related<super::book::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Book.def()
    }
}

impl Related<super::patron::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Patron.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// Days past the estimated return date as of `today`, zero when not late
    pub fn days_overdue(&self, today: NaiveDate) -> i64 {
        if !self.is_open() {
            return 0;
        }
        (today - self.estimated_return_date).num_days().max(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanRequest {
    pub book_id: i32,
    pub patron_id: i32,
    pub loan_date: NaiveDate,
    /// Computed from the loan policy when absent
    pub estimated_return_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl LoanRequest {
    pub fn new(book_id: i32, patron_id: i32, loan_date: NaiveDate) -> Self {
        Self {
            book_id,
            patron_id,
            loan_date,
            estimated_return_date: None,
            notes: None,
        }
    }

    pub fn due(mut self, estimated_return_date: NaiveDate) -> Self {
        self.estimated_return_date = Some(estimated_return_date);
        self
    }
}
