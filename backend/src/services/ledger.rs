//! Stock ledger service
//!
//! Stocking and administrative mutations of inventory records. Purchases go
//! through [`crate::services::PurchaseService`] instead.

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::DynStore;
use shared::{
    validate_discount, validate_price, validate_purchase_quantity, validate_stock_quantity,
    InventoryRecord, InventoryWithProduct, Pagination, StockKey,
};

/// Ledger service over inventory records
#[derive(Clone)]
pub struct LedgerService {
    store: DynStore,
}

/// Input for stocking a product in a warehouse
#[derive(Debug, Deserialize)]
pub struct CreateInventoryInput {
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
    #[serde(default)]
    pub discount: Decimal,
}

/// Input for a relative quantity change
#[derive(Debug, Deserialize)]
pub struct AdjustQuantityInput {
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    /// Delta, may be negative
    pub quantity: i32,
}

/// Input for replacing the discount of a record
#[derive(Debug, Deserialize)]
pub struct SetDiscountInput {
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    pub discount: Decimal,
}

impl LedgerService {
    pub fn new(store: DynStore) -> Self {
        Self { store }
    }

    pub async fn get(&self, warehouse_id: Uuid, product_id: Uuid) -> AppResult<InventoryRecord> {
        self.store
            .get_inventory(StockKey::new(warehouse_id, product_id))
            .await?
            .ok_or_else(|| AppError::NotFound("Inventory record".to_string()))
    }

    /// Inventory record together with its product
    pub async fn get_with_product(
        &self,
        warehouse_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<InventoryWithProduct> {
        let inventory = self.get(warehouse_id, product_id).await?;
        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        Ok(InventoryWithProduct { inventory, product })
    }

    pub async fn create(&self, input: CreateInventoryInput) -> AppResult<InventoryRecord> {
        validate_stock_quantity(input.quantity)
            .map_err(|msg| AppError::validation("quantity", msg))?;
        validate_price(input.price).map_err(|msg| AppError::validation("price", msg))?;
        validate_discount(input.discount).map_err(|msg| AppError::validation("discount", msg))?;

        let record = self
            .store
            .create_inventory(InventoryRecord {
                warehouse_id: input.warehouse_id,
                product_id: input.product_id,
                quantity: input.quantity,
                price: input.price,
                discount: input.discount,
            })
            .await?;

        tracing::info!(
            warehouse_id = %record.warehouse_id,
            product_id = %record.product_id,
            quantity = record.quantity,
            "product stocked"
        );
        Ok(record)
    }

    /// Stock of a warehouse, ordered by product name
    pub async fn list_by_warehouse(
        &self,
        warehouse_id: Uuid,
        pagination: Pagination,
    ) -> AppResult<Vec<InventoryWithProduct>> {
        if self.store.get_warehouse(warehouse_id).await?.is_none() {
            return Err(AppError::NotFound("Warehouse".to_string()));
        }
        self.store.list_inventory(warehouse_id, pagination).await
    }

    pub async fn adjust_quantity(&self, input: AdjustQuantityInput) -> AppResult<InventoryRecord> {
        let key = StockKey::new(input.warehouse_id, input.product_id);
        let record = self.store.adjust_quantity(key, input.quantity).await?;

        tracing::info!(
            warehouse_id = %key.warehouse_id,
            product_id = %key.product_id,
            delta = input.quantity,
            quantity = record.quantity,
            "stock adjusted"
        );
        Ok(record)
    }

    pub async fn set_discount(&self, input: SetDiscountInput) -> AppResult<InventoryRecord> {
        validate_discount(input.discount).map_err(|msg| AppError::validation("discount", msg))?;

        let key = StockKey::new(input.warehouse_id, input.product_id);
        let record = self.store.set_discount(key, input.discount).await?;

        tracing::info!(
            warehouse_id = %key.warehouse_id,
            product_id = %key.product_id,
            discount = %record.discount,
            "discount updated"
        );
        Ok(record)
    }

    /// Subtract `amount` in a transaction of its own
    pub async fn decrement(
        &self,
        warehouse_id: Uuid,
        product_id: Uuid,
        amount: i32,
    ) -> AppResult<InventoryRecord> {
        validate_purchase_quantity(amount).map_err(|msg| AppError::validation("amount", msg))?;

        let key = StockKey::new(warehouse_id, product_id);
        let mut tx = self.store.begin().await?;
        tx.lock_inventory(warehouse_id, &[product_id]).await?;

        let record = match tx.decrement(key, amount).await {
            Ok(record) => record,
            Err(AppError::ProductNotFoundInWarehouse { .. }) => {
                return Err(AppError::NotFound("Inventory record".to_string()));
            }
            Err(err) => return Err(err),
        };

        tx.commit().await?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Store};
    use rust_decimal_macros::dec;
    use shared::{Product, Warehouse};
    use std::sync::Arc;

    async fn setup() -> (LedgerService, Uuid, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let warehouse = store.create_warehouse(Warehouse::new("Dock 4")).await.unwrap();
        let product = store.create_product(Product::new("Crate")).await.unwrap();
        (LedgerService::new(store), warehouse.id, product.id)
    }

    fn stock(warehouse_id: Uuid, product_id: Uuid, quantity: i32) -> CreateInventoryInput {
        CreateInventoryInput {
            warehouse_id,
            product_id,
            quantity,
            price: dec!(19.99),
            discount: Decimal::ZERO,
        }
    }

    #[tokio::test]
    async fn test_create_validates_input() {
        let (ledger, w, p) = setup().await;

        let err = ledger.create(stock(w, p, -1)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "quantity"));

        let mut input = stock(w, p, 1);
        input.discount = dec!(100.5);
        let err = ledger.create(input).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "discount"));

        let mut input = stock(w, p, 1);
        input.price = dec!(-0.01);
        assert!(ledger.create(input).await.is_err());
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (ledger, w, p) = setup().await;
        assert!(matches!(ledger.get(w, p).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_decrement() {
        let (ledger, w, p) = setup().await;
        ledger.create(stock(w, p, 5)).await.unwrap();

        assert_eq!(ledger.decrement(w, p, 2).await.unwrap().quantity, 3);
        let err = ledger.decrement(w, p, 4).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock { available: 3, requested: 4, .. }));
        assert_eq!(ledger.get(w, p).await.unwrap().quantity, 3);

        let err = ledger.decrement(w, Uuid::new_v4(), 1).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_set_discount_range() {
        let (ledger, w, p) = setup().await;
        ledger.create(stock(w, p, 5)).await.unwrap();

        let updated = ledger
            .set_discount(SetDiscountInput {
                warehouse_id: w,
                product_id: p,
                discount: dec!(25),
            })
            .await
            .unwrap();
        assert_eq!(updated.discount, dec!(25));

        let err = ledger
            .set_discount(SetDiscountInput {
                warehouse_id: w,
                product_id: p,
                discount: dec!(101),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert_eq!(ledger.get(w, p).await.unwrap().discount, dec!(25));
    }

    #[tokio::test]
    async fn test_list_by_unknown_warehouse() {
        let (ledger, _, _) = setup().await;
        let err = ledger
            .list_by_warehouse(Uuid::new_v4(), Pagination::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
