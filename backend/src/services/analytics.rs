//! Sales analytics aggregator

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::DynStore;
use shared::{effective_limit, StockKey, WarehouseAnalytics, WarehouseSales};

/// Read side of sales analytics plus standalone accumulation
#[derive(Clone)]
pub struct AnalyticsService {
    store: DynStore,
    default_top_limit: u32,
}

impl AnalyticsService {
    pub fn new(store: DynStore, default_top_limit: u32) -> Self {
        Self {
            store,
            default_top_limit,
        }
    }

    /// Record a sale outside a purchase, in a transaction of its own
    pub async fn accumulate(
        &self,
        warehouse_id: Uuid,
        product_id: Uuid,
        sold_quantity: i64,
        revenue: Decimal,
    ) -> AppResult<()> {
        if sold_quantity <= 0 {
            return Err(AppError::validation(
                "sold_quantity",
                "Sold quantity must be greater than 0",
            ));
        }
        if revenue < Decimal::ZERO {
            return Err(AppError::validation("revenue", "Revenue cannot be negative"));
        }

        let mut tx = self.store.begin().await?;
        tx.accumulate(StockKey::new(warehouse_id, product_id), sold_quantity, revenue)
            .await?;
        tx.commit().await
    }

    /// Per-product sales of one warehouse and their total
    ///
    /// A warehouse without sales, known or not, reports an empty list.
    pub async fn by_warehouse(&self, warehouse_id: Uuid) -> AppResult<WarehouseSales> {
        let analytics = self.store.warehouse_analytics(warehouse_id).await?;
        let total_sum = analytics.iter().map(|record| record.total_sum).sum();

        Ok(WarehouseSales {
            total_sum,
            analytics,
        })
    }

    /// Warehouses ranked by revenue; absent or non-positive limits use the
    /// configured default
    pub async fn top_warehouses(&self, limit: Option<i64>) -> AppResult<Vec<WarehouseAnalytics>> {
        let limit = effective_limit(limit, self.default_top_limit);
        self.store.top_warehouses(limit).await
    }
}
