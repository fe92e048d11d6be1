//! HTTP request handlers

pub mod analytics;
pub mod health;
pub mod inventory;
pub mod product;
pub mod purchase;
pub mod warehouse;

pub use analytics::*;
pub use health::*;
pub use inventory::*;
pub use product::*;
pub use purchase::*;
pub use warehouse::*;
