//! SeaORM implementation of PatronRepository

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::domain::{DomainError, PatronRepository};
use crate::models::patron::{Column, Entity as PatronEntity, Model};

/// SeaORM-based implementation of PatronRepository
pub struct SeaOrmPatronRepository {
    db: DatabaseConnection,
}

impl SeaOrmPatronRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PatronRepository for SeaOrmPatronRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<Model>, DomainError> {
        Ok(PatronEntity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_by_number(&self, number: &str) -> Result<Option<Model>, DomainError> {
        let patron = PatronEntity::find()
            .filter(Column::PatronNumber.eq(number))
            .one(&self.db)
            .await?;
        Ok(patron)
    }
}
