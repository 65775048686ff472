//! SeaORM implementation of LoanRepository

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use crate::domain::{DomainError, LoanRepository};
use crate::models::loan::{Column, Entity as LoanEntity, Model};
use crate::models::LoanStatus;

/// SeaORM-based implementation of LoanRepository
pub struct SeaOrmLoanRepository {
    db: DatabaseConnection,
}

impl SeaOrmLoanRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LoanRepository for SeaOrmLoanRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<Model>, DomainError> {
        Ok(LoanEntity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_open_for_book(&self, book_id: i32) -> Result<Option<Model>, DomainError> {
        let loan = LoanEntity::find()
            .filter(Column::BookId.eq(book_id))
            .filter(Column::Status.is_in(LoanStatus::OPEN))
            .one(&self.db)
            .await?;
        Ok(loan)
    }

    async fn find_open_for_patron(&self, patron_id: i32) -> Result<Vec<Model>, DomainError> {
        let loans = LoanEntity::find()
            .filter(Column::PatronId.eq(patron_id))
            .filter(Column::Status.is_in(LoanStatus::OPEN))
            .order_by_asc(Column::EstimatedReturnDate)
            .all(&self.db)
            .await?;
        Ok(loans)
    }

    async fn history_for_book(&self, book_id: i32) -> Result<Vec<Model>, DomainError> {
        let loans = LoanEntity::find()
            .filter(Column::BookId.eq(book_id))
            .order_by_desc(Column::LoanDate)
            .order_by_desc(Column::Id)
            .all(&self.db)
            .await?;
        Ok(loans)
    }

    async fn find_late(&self, as_of: NaiveDate) -> Result<Vec<Model>, DomainError> {
        let loans = LoanEntity::find()
            .filter(Column::Status.is_in(LoanStatus::OPEN))
            .filter(Column::EstimatedReturnDate.lt(as_of))
            .order_by_asc(Column::EstimatedReturnDate)
            .all(&self.db)
            .await?;
        Ok(loans)
    }
}
