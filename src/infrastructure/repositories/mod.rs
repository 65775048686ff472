//! Repository implementations using SeaORM

pub mod book_repository;
pub mod loan_repository;
pub mod patron_repository;
pub mod shelf_repository;

pub use book_repository::SeaOrmBookRepository;
pub use loan_repository::SeaOrmLoanRepository;
pub use patron_repository::SeaOrmPatronRepository;
pub use shelf_repository::SeaOrmShelfRepository;
