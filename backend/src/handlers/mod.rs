//! HTTP handlers for the Medical Supply Inventory API

pub mod bill;
pub mod cabinet;
pub mod health;
pub mod ledger;
pub mod mapping;
pub mod stock;

pub use bill::*;
pub use cabinet::*;
pub use health::*;
pub use ledger::*;
pub use mapping::*;
pub use stock::*;
