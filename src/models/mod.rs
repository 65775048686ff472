pub mod book;
pub mod loan;
pub mod patron;
pub mod shelf;

pub use book::{BookStatus, BookType};
pub use loan::LoanStatus;
pub use patron::PatronStatus;
