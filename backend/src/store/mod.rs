//! Storage layer
//!
//! [`Store`] is the explicitly owned handle every service receives at
//! construction. Purchases run inside a [`StockTransaction`]: row locks taken
//! by [`StockTransaction::lock_inventory`] are held until commit or rollback,
//! and nothing written through the transaction is visible to other callers
//! before commit. Dropping a transaction without committing rolls it back.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::{
    AnalyticsRecord, InventoryRecord, InventoryWithProduct, Pagination, Product, StockKey,
    Warehouse, WarehouseAnalytics,
};
use uuid::Uuid;

use crate::error::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Shared handle to whichever backend is configured
pub type DynStore = Arc<dyn Store>;

/// Persistent state of warehouses, products, stock and sales analytics
#[async_trait]
pub trait Store: Send + Sync {
    // Catalog

    async fn create_warehouse(&self, warehouse: Warehouse) -> AppResult<Warehouse>;

    /// All warehouses ordered by address
    async fn list_warehouses(&self) -> AppResult<Vec<Warehouse>>;

    async fn get_warehouse(&self, id: Uuid) -> AppResult<Option<Warehouse>>;

    async fn create_product(&self, product: Product) -> AppResult<Product>;

    /// All products ordered by name
    async fn list_products(&self) -> AppResult<Vec<Product>>;

    async fn get_product(&self, id: Uuid) -> AppResult<Option<Product>>;

    /// Products with the given ids; unknown ids are skipped
    async fn get_products(&self, ids: &[Uuid]) -> AppResult<Vec<Product>>;

    /// Replace a product's attributes, `None` if it does not exist
    async fn update_product(&self, product: Product) -> AppResult<Option<Product>>;

    // Stock ledger

    /// Insert a new inventory record. The warehouse and product must exist and
    /// the pair must not be stocked yet.
    async fn create_inventory(&self, record: InventoryRecord) -> AppResult<InventoryRecord>;

    async fn get_inventory(&self, key: StockKey) -> AppResult<Option<InventoryRecord>>;

    /// Unlocked read of the records for `product_ids` in one warehouse
    async fn inventory_snapshot(
        &self,
        warehouse_id: Uuid,
        product_ids: &[Uuid],
    ) -> AppResult<Vec<InventoryRecord>>;

    /// Stock of a warehouse joined with products, ordered by product name
    async fn list_inventory(
        &self,
        warehouse_id: Uuid,
        pagination: Pagination,
    ) -> AppResult<Vec<InventoryWithProduct>>;

    /// Add `delta` (possibly negative) to the quantity under the row lock.
    /// Fails with `InsufficientStock` instead of going below zero.
    async fn adjust_quantity(&self, key: StockKey, delta: i32) -> AppResult<InventoryRecord>;

    async fn set_discount(&self, key: StockKey, discount: Decimal) -> AppResult<InventoryRecord>;

    // Analytics

    /// Analytics rows of one warehouse ordered by revenue, highest first
    async fn warehouse_analytics(&self, warehouse_id: Uuid) -> AppResult<Vec<AnalyticsRecord>>;

    /// Warehouses ranked by total revenue, including those without sales
    async fn top_warehouses(&self, limit: u32) -> AppResult<Vec<WarehouseAnalytics>>;

    // Atomic scope

    async fn begin(&self) -> AppResult<Box<dyn StockTransaction>>;

    /// Cheap connectivity check for health reporting
    async fn ping(&self) -> AppResult<()>;
}

/// Unit of work spanning stock decrements and analytics accumulation
#[async_trait]
pub trait StockTransaction: Send {
    /// Lock the inventory rows of `product_ids` in ascending product id order
    /// and return the records that exist, current as seen by this transaction
    async fn lock_inventory(
        &mut self,
        warehouse_id: Uuid,
        product_ids: &[Uuid],
    ) -> AppResult<Vec<InventoryRecord>>;

    /// Subtract `amount` from a row, failing with `InsufficientStock` if the
    /// quantity would go negative
    async fn decrement(&mut self, key: StockKey, amount: i32) -> AppResult<InventoryRecord>;

    /// Add to the analytics row of `key`, creating it on first sale. Fails
    /// with `NotFound` when the warehouse or product does not exist.
    async fn accumulate(
        &mut self,
        key: StockKey,
        sold_quantity: i64,
        revenue: Decimal,
    ) -> AppResult<()>;

    async fn commit(self: Box<Self>) -> AppResult<()>;

    async fn rollback(self: Box<Self>) -> AppResult<()>;
}
