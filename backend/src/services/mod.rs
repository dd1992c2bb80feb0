//! Business logic services for the Medical Supply Inventory platform

pub mod assignment;
pub mod batch;
pub mod cabinet;
pub mod department;
pub mod ledger;
pub mod reconciler;

pub use assignment::AssignmentService;
pub use batch::BatchService;
pub use cabinet::CabinetService;
pub use ledger::LedgerService;
pub use reconciler::ReconcilerService;
