//! Shared types and domain rules for the Medical Supply Inventory platform
//!
//! Everything in this crate is free of I/O: the backend loads rows, asks these
//! types whether a change is allowed, and then persists the outcome.

pub mod error;
pub mod models;
pub mod types;
pub mod validation;

pub use error::*;
pub use models::*;
pub use types::*;
pub use validation::*;
