//! SeaORM implementation of ShelfRepository

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use crate::domain::{DomainError, ShelfRepository};
use crate::models::shelf::{Column, Entity as ShelfEntity, Model};

/// SeaORM-based implementation of ShelfRepository
pub struct SeaOrmShelfRepository {
    db: DatabaseConnection,
}

impl SeaOrmShelfRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ShelfRepository for SeaOrmShelfRepository {
    async fn find_all(&self) -> Result<Vec<Model>, DomainError> {
        let shelves = ShelfEntity::find()
            .order_by_asc(Column::LocationCode)
            .all(&self.db)
            .await?;
        Ok(shelves)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Model>, DomainError> {
        Ok(ShelfEntity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_by_location_code(&self, code: &str) -> Result<Option<Model>, DomainError> {
        let shelf = ShelfEntity::find()
            .filter(Column::LocationCode.eq(code))
            .one(&self.db)
            .await?;
        Ok(shelf)
    }

    async fn find_with_free_space(&self, min_free: i32) -> Result<Vec<Model>, DomainError> {
        let free = Expr::col(Column::TotalCapacity).sub(Expr::col(Column::CurrentBookCount));

        let shelves = ShelfEntity::find()
            .filter(Expr::expr(free.clone()).gte(min_free.max(1)))
            .order_by_desc(free)
            .order_by_asc(Column::LocationCode)
            .all(&self.db)
            .await?;
        Ok(shelves)
    }
}
