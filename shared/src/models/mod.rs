//! Domain models for the Warehouse Sales service

mod analytics;
mod inventory;
mod product;
mod purchase;
mod warehouse;

pub use analytics::*;
pub use inventory::*;
pub use product::*;
pub use purchase::*;
pub use warehouse::*;
