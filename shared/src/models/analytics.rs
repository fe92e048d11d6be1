//! Sales analytics models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::StockKey;

/// Cumulative sales of one product in one warehouse
///
/// Identity is the (warehouse, product) pair. Both counters only grow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalyticsRecord {
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    pub sold_quantity: i64,
    /// Cumulative revenue after discounts
    pub total_sum: Decimal,
}

impl AnalyticsRecord {
    pub fn key(&self) -> StockKey {
        StockKey::new(self.warehouse_id, self.product_id)
    }
}

/// Sales of a single warehouse, products ordered by revenue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WarehouseSales {
    pub total_sum: Decimal,
    pub analytics: Vec<AnalyticsRecord>,
}

/// Revenue ranking entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WarehouseAnalytics {
    pub warehouse_id: Uuid,
    pub address: String,
    pub total_sum: Decimal,
}
