//! Shared types and domain logic for the Warehouse Sales service
//!
//! This crate contains the pure parts of the system: models, the pricing
//! calculator and purchase planning. It performs no I/O and is shared between
//! the backend and the browser (via WASM).

pub mod models;
pub mod pricing;
pub mod purchase;
pub mod types;
pub mod validation;

pub use models::*;
pub use pricing::*;
pub use purchase::*;
pub use types::*;
pub use validation::*;
