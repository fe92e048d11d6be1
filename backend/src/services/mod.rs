//! Business logic services for the Warehouse Sales service

pub mod analytics;
pub mod catalog;
pub mod ledger;
pub mod purchase;

pub use analytics::AnalyticsService;
pub use catalog::CatalogService;
pub use ledger::LedgerService;
pub use purchase::PurchaseService;
