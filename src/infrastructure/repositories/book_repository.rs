//! SeaORM implementation of BookRepository

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use crate::domain::{BookRepository, DomainError};
use crate::models::book::{Column, Entity as BookEntity, Model};
use crate::models::{BookStatus, BookType};

/// SeaORM-based implementation of BookRepository
pub struct SeaOrmBookRepository {
    db: DatabaseConnection,
}

impl SeaOrmBookRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BookRepository for SeaOrmBookRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<Model>, DomainError> {
        Ok(BookEntity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_by_isbn(&self, isbn: &str) -> Result<Option<Model>, DomainError> {
        let book = BookEntity::find()
            .filter(Column::Isbn.eq(isbn))
            .one(&self.db)
            .await?;
        Ok(book)
    }

    async fn find_by_shelf(&self, shelf_id: i32) -> Result<Vec<Model>, DomainError> {
        let books = BookEntity::find()
            .filter(Column::ShelfId.eq(shelf_id))
            .filter(Column::BookType.eq(BookType::Physical))
            .order_by_asc(Column::Title)
            .order_by_asc(Column::Author)
            .all(&self.db)
            .await?;
        Ok(books)
    }

    async fn find_by_status(&self, status: BookStatus) -> Result<Vec<Model>, DomainError> {
        let books = BookEntity::find()
            .filter(Column::Status.eq(status))
            .order_by_asc(Column::Title)
            .order_by_asc(Column::Author)
            .all(&self.db)
            .await?;
        Ok(books)
    }
}
