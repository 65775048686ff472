//! Services Layer
//!
//! The consistency engine. Shelf occupancy is written only by
//! `capacity_ledger`, book status only by `status_sync`; the other services
//! reach those columns through them.

pub mod capacity_ledger;
pub mod inventory_service;
pub mod loan_service;
pub mod placement_service;
pub mod status_sync;

// Re-export for convenience
pub use capacity_ledger::{audit, audit_all, release, reserve, ShelfAudit};
pub use loan_service::{create_loan, mark_lost, renew_loan, return_loan, sweep_overdue};
pub use placement_service::{change_book_type, place};
pub use status_sync::{book_status_for, LoanTransition};
