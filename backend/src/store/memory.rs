//! In-process store
//!
//! All state lives behind one `RwLock`. Every inventory row additionally has
//! its own async mutex: transactions hold the guards of the rows they locked
//! until they finish, stage their writes in working copies and apply them in a
//! single write section on commit. Administrative updates take the same row
//! mutex, so they never interleave with a purchase touching that row.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::{
    AnalyticsRecord, InventoryRecord, InventoryWithProduct, Pagination, Product, StockKey,
    Warehouse, WarehouseAnalytics,
};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use super::{StockTransaction, Store};
use crate::error::{AppError, AppResult};

#[derive(Default)]
struct MemoryState {
    warehouses: HashMap<Uuid, Warehouse>,
    products: HashMap<Uuid, Product>,
    inventory: HashMap<StockKey, InventoryRecord>,
    analytics: HashMap<StockKey, AnalyticsRecord>,
}

/// One async mutex per inventory row, created on first use
#[derive(Default)]
struct RowLocks {
    rows: StdMutex<HashMap<StockKey, Arc<Mutex<()>>>>,
}

impl RowLocks {
    fn handle(&self, key: StockKey) -> Arc<Mutex<()>> {
        let mut rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        rows.entry(key).or_default().clone()
    }
}

/// Store keeping everything in memory, used by tests and the `memory` backend
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
    locks: Arc<RowLocks>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing_inventory() -> AppError {
    AppError::NotFound("Inventory record".to_string())
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_warehouse(&self, warehouse: Warehouse) -> AppResult<Warehouse> {
        let mut state = self.state.write().await;
        if state.warehouses.contains_key(&warehouse.id) {
            return Err(AppError::DuplicateEntry("warehouse id".to_string()));
        }
        state.warehouses.insert(warehouse.id, warehouse.clone());
        Ok(warehouse)
    }

    async fn list_warehouses(&self) -> AppResult<Vec<Warehouse>> {
        let state = self.state.read().await;
        let mut warehouses: Vec<Warehouse> = state.warehouses.values().cloned().collect();
        warehouses.sort_by(|a, b| a.address.cmp(&b.address).then(a.id.cmp(&b.id)));
        Ok(warehouses)
    }

    async fn get_warehouse(&self, id: Uuid) -> AppResult<Option<Warehouse>> {
        Ok(self.state.read().await.warehouses.get(&id).cloned())
    }

    async fn create_product(&self, product: Product) -> AppResult<Product> {
        let mut state = self.state.write().await;
        if state.products.contains_key(&product.id) {
            return Err(AppError::DuplicateEntry("product id".to_string()));
        }
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn list_products(&self) -> AppResult<Vec<Product>> {
        let state = self.state.read().await;
        let mut products: Vec<Product> = state.products.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(products)
    }

    async fn get_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn get_products(&self, ids: &[Uuid]) -> AppResult<Vec<Product>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(id))
            .cloned()
            .collect())
    }

    async fn update_product(&self, product: Product) -> AppResult<Option<Product>> {
        let mut state = self.state.write().await;
        match state.products.get_mut(&product.id) {
            Some(existing) => {
                *existing = product.clone();
                Ok(Some(product))
            }
            None => Ok(None),
        }
    }

    async fn create_inventory(&self, record: InventoryRecord) -> AppResult<InventoryRecord> {
        let mut state = self.state.write().await;
        if !state.warehouses.contains_key(&record.warehouse_id) {
            return Err(AppError::NotFound("Warehouse".to_string()));
        }
        if !state.products.contains_key(&record.product_id) {
            return Err(AppError::NotFound("Product".to_string()));
        }
        let key = record.key();
        if state.inventory.contains_key(&key) {
            return Err(AppError::DuplicateEntry("warehouse and product".to_string()));
        }
        state.inventory.insert(key, record.clone());
        Ok(record)
    }

    async fn get_inventory(&self, key: StockKey) -> AppResult<Option<InventoryRecord>> {
        Ok(self.state.read().await.inventory.get(&key).cloned())
    }

    async fn inventory_snapshot(
        &self,
        warehouse_id: Uuid,
        product_ids: &[Uuid],
    ) -> AppResult<Vec<InventoryRecord>> {
        let state = self.state.read().await;
        Ok(product_ids
            .iter()
            .filter_map(|&product_id| state.inventory.get(&StockKey::new(warehouse_id, product_id)))
            .cloned()
            .collect())
    }

    async fn list_inventory(
        &self,
        warehouse_id: Uuid,
        pagination: Pagination,
    ) -> AppResult<Vec<InventoryWithProduct>> {
        let state = self.state.read().await;
        let mut rows: Vec<InventoryWithProduct> = state
            .inventory
            .values()
            .filter(|record| record.warehouse_id == warehouse_id)
            .filter_map(|record| {
                state.products.get(&record.product_id).map(|product| InventoryWithProduct {
                    inventory: record.clone(),
                    product: product.clone(),
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            a.product
                .name
                .cmp(&b.product.name)
                .then(a.product.id.cmp(&b.product.id))
        });

        let offset = usize::try_from(pagination.offset()).unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .skip(offset)
            .take(pagination.limit() as usize)
            .collect())
    }

    async fn adjust_quantity(&self, key: StockKey, delta: i32) -> AppResult<InventoryRecord> {
        let row = self.locks.handle(key);
        let _guard = row.lock().await;

        let mut state = self.state.write().await;
        let record = state.inventory.get_mut(&key).ok_or_else(missing_inventory)?;
        let quantity = record
            .quantity
            .checked_add(delta)
            .ok_or_else(|| AppError::validation("quantity", "Quantity out of range"))?;
        if quantity < 0 {
            return Err(AppError::InsufficientStock {
                product_id: key.product_id,
                available: record.quantity,
                requested: delta.saturating_neg(),
            });
        }
        record.quantity = quantity;
        Ok(record.clone())
    }

    async fn set_discount(&self, key: StockKey, discount: Decimal) -> AppResult<InventoryRecord> {
        let row = self.locks.handle(key);
        let _guard = row.lock().await;

        let mut state = self.state.write().await;
        let record = state.inventory.get_mut(&key).ok_or_else(missing_inventory)?;
        record.discount = discount;
        Ok(record.clone())
    }

    async fn warehouse_analytics(&self, warehouse_id: Uuid) -> AppResult<Vec<AnalyticsRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<AnalyticsRecord> = state
            .analytics
            .values()
            .filter(|record| record.warehouse_id == warehouse_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            b.total_sum
                .cmp(&a.total_sum)
                .then(a.product_id.cmp(&b.product_id))
        });
        Ok(records)
    }

    async fn top_warehouses(&self, limit: u32) -> AppResult<Vec<WarehouseAnalytics>> {
        let state = self.state.read().await;
        let mut revenue: HashMap<Uuid, Decimal> = HashMap::new();
        for record in state.analytics.values() {
            *revenue.entry(record.warehouse_id).or_default() += record.total_sum;
        }

        let mut ranking: Vec<WarehouseAnalytics> = state
            .warehouses
            .values()
            .map(|warehouse| WarehouseAnalytics {
                warehouse_id: warehouse.id,
                address: warehouse.address.clone(),
                total_sum: revenue.get(&warehouse.id).copied().unwrap_or_default(),
            })
            .collect();
        ranking.sort_by(|a, b| {
            b.total_sum
                .cmp(&a.total_sum)
                .then_with(|| a.address.cmp(&b.address))
                .then(a.warehouse_id.cmp(&b.warehouse_id))
        });
        ranking.truncate(limit as usize);
        Ok(ranking)
    }

    async fn begin(&self) -> AppResult<Box<dyn StockTransaction>> {
        Ok(Box::new(MemoryTransaction {
            state: Arc::clone(&self.state),
            locks: Arc::clone(&self.locks),
            guards: HashMap::new(),
            working: HashMap::new(),
            dirty: Vec::new(),
            sales: HashMap::new(),
        }))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Transaction over a [`MemoryStore`]
///
/// Nothing reaches the shared state before [`StockTransaction::commit`];
/// dropping the transaction releases its row guards and discards the
/// staged writes.
pub struct MemoryTransaction {
    state: Arc<RwLock<MemoryState>>,
    locks: Arc<RowLocks>,
    guards: HashMap<StockKey, OwnedMutexGuard<()>>,
    /// Rows as this transaction sees them, `None` when not stocked
    working: HashMap<StockKey, Option<InventoryRecord>>,
    dirty: Vec<StockKey>,
    sales: HashMap<StockKey, (i64, Decimal)>,
}

impl MemoryTransaction {
    async fn lock_keys(&mut self, mut keys: Vec<StockKey>) {
        keys.sort_unstable();
        keys.dedup();

        let mut fresh = Vec::new();
        for key in keys {
            if self.guards.contains_key(&key) {
                continue;
            }
            let guard = self.locks.handle(key).lock_owned().await;
            self.guards.insert(key, guard);
            fresh.push(key);
        }

        if fresh.is_empty() {
            return;
        }
        let state = self.state.read().await;
        for key in fresh {
            self.working.insert(key, state.inventory.get(&key).cloned());
        }
    }
}

#[async_trait]
impl StockTransaction for MemoryTransaction {
    async fn lock_inventory(
        &mut self,
        warehouse_id: Uuid,
        product_ids: &[Uuid],
    ) -> AppResult<Vec<InventoryRecord>> {
        let mut keys: Vec<StockKey> = product_ids
            .iter()
            .map(|&product_id| StockKey::new(warehouse_id, product_id))
            .collect();
        self.lock_keys(keys.clone()).await;

        keys.sort_unstable();
        keys.dedup();
        Ok(keys
            .iter()
            .filter_map(|key| self.working.get(key).cloned().flatten())
            .collect())
    }

    async fn decrement(&mut self, key: StockKey, amount: i32) -> AppResult<InventoryRecord> {
        self.lock_keys(vec![key]).await;

        let record = self
            .working
            .get_mut(&key)
            .and_then(Option::as_mut)
            .ok_or(AppError::ProductNotFoundInWarehouse {
                warehouse_id: key.warehouse_id,
                product_id: key.product_id,
            })?;
        if record.quantity < amount {
            return Err(AppError::InsufficientStock {
                product_id: key.product_id,
                available: record.quantity,
                requested: amount,
            });
        }
        record.quantity -= amount;
        let updated = record.clone();

        if !self.dirty.contains(&key) {
            self.dirty.push(key);
        }
        Ok(updated)
    }

    async fn accumulate(
        &mut self,
        key: StockKey,
        sold_quantity: i64,
        revenue: Decimal,
    ) -> AppResult<()> {
        if !self.sales.contains_key(&key) {
            let state = self.state.read().await;
            if !state.warehouses.contains_key(&key.warehouse_id)
                || !state.products.contains_key(&key.product_id)
            {
                return Err(AppError::NotFound("Warehouse or product".to_string()));
            }
        }

        let entry = self.sales.entry(key).or_insert((0, Decimal::ZERO));
        entry.0 += sold_quantity;
        entry.1 += revenue;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTransaction {
            state,
            guards,
            mut working,
            dirty,
            sales,
            ..
        } = *self;

        let mut state = state.write().await;
        for key in dirty {
            if let Some(Some(record)) = working.remove(&key) {
                state.inventory.insert(key, record);
            }
        }
        for (key, (sold_quantity, revenue)) in sales {
            let record = state.analytics.entry(key).or_insert_with(|| AnalyticsRecord {
                warehouse_id: key.warehouse_id,
                product_id: key.product_id,
                sold_quantity: 0,
                total_sum: Decimal::ZERO,
            });
            record.sold_quantity += sold_quantity;
            record.total_sum += revenue;
        }
        drop(state);
        drop(guards);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}
