//! Inventory models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Product;
use crate::pricing;

/// Identity of an inventory or analytics row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StockKey {
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
}

impl StockKey {
    pub fn new(warehouse_id: Uuid, product_id: Uuid) -> Self {
        Self {
            warehouse_id,
            product_id,
        }
    }
}

/// Stock of one product in one warehouse
///
/// Exactly one record exists per (warehouse, product) pair that has ever been
/// stocked. `quantity` never goes below zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InventoryRecord {
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    /// Gross unit price
    pub price: Decimal,
    /// Discount in percent (0-100)
    pub discount: Decimal,
}

impl InventoryRecord {
    pub fn key(&self) -> StockKey {
        StockKey::new(self.warehouse_id, self.product_id)
    }

    /// Unit price after discount
    pub fn price_with_discount(&self) -> Decimal {
        pricing::effective_unit_price(self.price, self.discount)
    }
}

/// Inventory record joined with its product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryWithProduct {
    #[serde(flatten)]
    pub inventory: InventoryRecord,
    pub product: Product,
}
