//! Application state containing repositories and shared resources

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::domain::{BookRepository, LoanRepository, PatronRepository, ShelfRepository};
use crate::infrastructure::config::LoanPolicy;
use crate::infrastructure::{
    SeaOrmBookRepository, SeaOrmLoanRepository, SeaOrmPatronRepository, SeaOrmShelfRepository,
};

/// Application state shared by every entry point
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    /// Circulation rules for loan creation and renewal
    pub policy: LoanPolicy,
    pub shelf_repo: Arc<dyn ShelfRepository>,
    pub book_repo: Arc<dyn BookRepository>,
    pub patron_repo: Arc<dyn PatronRepository>,
    pub loan_repo: Arc<dyn LoanRepository>,
}

impl AppState {
    /// Create a new AppState with all repositories initialized
    pub fn new(db: DatabaseConnection, policy: LoanPolicy) -> Self {
        let shelf_repo = Arc::new(SeaOrmShelfRepository::new(db.clone()));
        let book_repo = Arc::new(SeaOrmBookRepository::new(db.clone()));
        let patron_repo = Arc::new(SeaOrmPatronRepository::new(db.clone()));
        let loan_repo = Arc::new(SeaOrmLoanRepository::new(db.clone()));

        Self {
            db,
            policy,
            shelf_repo,
            book_repo,
            patron_repo,
            loan_repo,
        }
    }

    /// Connection handed to the write services
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl AsRef<DatabaseConnection> for AppState {
    fn as_ref(&self) -> &DatabaseConnection {
        &self.db
    }
}
