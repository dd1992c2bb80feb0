//! Domain models for the Medical Supply Inventory platform

mod batch;
mod bill;
mod cabinet;
mod department;
mod mapping;
mod returns;
mod stock;
mod supply;

pub use batch::*;
pub use bill::*;
pub use cabinet::*;
pub use department::*;
pub use mapping::*;
pub use returns::*;
pub use stock::*;
pub use supply::*;
