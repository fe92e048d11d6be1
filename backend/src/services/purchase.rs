//! Purchase transaction engine
//!
//! A purchase locks the inventory rows it touches, validates and prices every
//! line against the locked state, then decrements stock and accumulates
//! analytics in the same transaction. Any failure rolls the whole request
//! back. Quotes run the same planning against an unlocked snapshot.

use std::collections::HashMap;
use std::time::Duration;

use tracing::Instrument;
use uuid::Uuid;

use crate::context::RequestContext;
use crate::error::{AppError, AppResult};
use crate::store::{DynStore, StockTransaction};
use shared::{
    plan_purchase, InventoryRecord, PriceQuote, PurchasePlan, PurchaseRequest, QuoteItem, StockKey,
};

/// Purchase engine bound to a store
#[derive(Clone)]
pub struct PurchaseService {
    store: DynStore,
    transaction_timeout: Duration,
}

fn by_product(records: Vec<InventoryRecord>) -> HashMap<Uuid, InventoryRecord> {
    records
        .into_iter()
        .map(|record| (record.product_id, record))
        .collect()
}

impl PurchaseService {
    pub fn new(store: DynStore, transaction_timeout: Duration) -> Self {
        Self {
            store,
            transaction_timeout,
        }
    }

    /// Apply every line of `request` or none of them
    ///
    /// Locking, validation and the staged writes must finish within the
    /// transaction timeout, lock waits included; otherwise the purchase fails
    /// with `ConcurrencyConflict` and changes nothing. The commit itself runs
    /// outside the deadline so a reported failure never hides a committed
    /// purchase.
    pub async fn purchase(
        &self,
        ctx: &RequestContext,
        request: &PurchaseRequest,
    ) -> AppResult<PurchasePlan> {
        let span = tracing::info_span!(
            "purchase",
            request_id = %ctx.request_id,
            warehouse_id = %request.warehouse_id,
            lines = request.products.len(),
        );

        self.execute(request).instrument(span).await
    }

    async fn execute(&self, request: &PurchaseRequest) -> AppResult<PurchasePlan> {
        let (tx, plan) = match tokio::time::timeout(self.transaction_timeout, self.stage(request)).await {
            Ok(staged) => staged?,
            Err(_) => {
                // The dropped transaction rolls back
                tracing::warn!(
                    timeout_ms = self.transaction_timeout.as_millis() as u64,
                    "purchase timed out"
                );
                return Err(AppError::ConcurrencyConflict(
                    "Purchase timed out waiting for stock".to_string(),
                ));
            }
        };

        tx.commit().await?;

        tracing::info!(
            total_sum = %plan.total_sum,
            quantity = plan.total_quantity(),
            "purchase committed"
        );
        Ok(plan)
    }

    /// Open a transaction and apply the purchase to it without committing
    async fn stage(
        &self,
        request: &PurchaseRequest,
    ) -> AppResult<(Box<dyn StockTransaction>, PurchasePlan)> {
        let mut tx = self.store.begin().await?;

        match Self::apply(tx.as_mut(), request).await {
            Ok(plan) => Ok((tx, plan)),
            Err(err) => {
                tracing::debug!(error = %err, "rolling back purchase");
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn apply(
        tx: &mut dyn StockTransaction,
        request: &PurchaseRequest,
    ) -> AppResult<PurchasePlan> {
        let locked = tx
            .lock_inventory(request.warehouse_id, &request.product_ids())
            .await?;
        let plan = plan_purchase(request, &by_product(locked))?;

        for line in &plan.lines {
            let key = StockKey::new(plan.warehouse_id, line.product_id);
            tx.decrement(key, line.quantity).await?;
            tx.accumulate(key, i64::from(line.quantity), line.line_total)
                .await?;
        }

        Ok(plan)
    }

    /// Price `request` against current stock without changing anything
    pub async fn quote(
        &self,
        ctx: &RequestContext,
        request: &PurchaseRequest,
    ) -> AppResult<PriceQuote> {
        let span = tracing::info_span!(
            "quote",
            request_id = %ctx.request_id,
            warehouse_id = %request.warehouse_id,
            lines = request.products.len(),
        );

        self.price(request).instrument(span).await
    }

    async fn price(&self, request: &PurchaseRequest) -> AppResult<PriceQuote> {
        let product_ids = request.product_ids();
        let snapshot = self
            .store
            .inventory_snapshot(request.warehouse_id, &product_ids)
            .await?;
        let plan = plan_purchase(request, &by_product(snapshot))?;

        let names: HashMap<Uuid, String> = self
            .store
            .get_products(&product_ids)
            .await?
            .into_iter()
            .map(|product| (product.id, product.name))
            .collect();

        let items = plan
            .lines
            .iter()
            .map(|line| QuoteItem {
                product_id: line.product_id,
                name: names.get(&line.product_id).cloned().unwrap_or_default(),
                quantity: line.quantity,
                price: line.unit_price,
                price_with_discount: line.price_with_discount,
                total_price: line.line_total,
            })
            .collect();

        tracing::debug!(total_sum = %plan.total_sum, "quote computed");
        Ok(PriceQuote {
            total_sum: plan.total_sum,
            items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Store};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use shared::{
        AnalyticsRecord, InventoryWithProduct, Pagination, Product, PurchaseLine, Warehouse,
        WarehouseAnalytics,
    };
    use std::sync::Arc;

    struct Fixture {
        store: Arc<MemoryStore>,
        service: PurchaseService,
        warehouse_id: Uuid,
        a: Uuid,
        b: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let warehouse = store.create_warehouse(Warehouse::new("Harbor 3")).await.unwrap();
        let a = store.create_product(Product::new("Anvil")).await.unwrap();
        let b = store.create_product(Product::new("Bucket")).await.unwrap();
        for (product_id, quantity, price, discount) in
            [(a.id, 10, dec!(100), dec!(10)), (b.id, 4, dec!(25.50), Decimal::ZERO)]
        {
            store
                .create_inventory(InventoryRecord {
                    warehouse_id: warehouse.id,
                    product_id,
                    quantity,
                    price,
                    discount,
                })
                .await
                .unwrap();
        }

        Fixture {
            service: PurchaseService::new(store.clone(), Duration::from_secs(2)),
            store,
            warehouse_id: warehouse.id,
            a: a.id,
            b: b.id,
        }
    }

    fn request(warehouse_id: Uuid, lines: &[(Uuid, i32)]) -> PurchaseRequest {
        PurchaseRequest {
            warehouse_id,
            products: lines
                .iter()
                .map(|&(product_id, quantity)| PurchaseLine { product_id, quantity })
                .collect(),
        }
    }

    async fn quantity(store: &MemoryStore, warehouse_id: Uuid, product_id: Uuid) -> i32 {
        store
            .get_inventory(StockKey::new(warehouse_id, product_id))
            .await
            .unwrap()
            .unwrap()
            .quantity
    }

    #[tokio::test]
    async fn test_purchase_applies_all_lines() {
        let f = fixture().await;
        let ctx = RequestContext::generate();

        let plan = f
            .service
            .purchase(&ctx, &request(f.warehouse_id, &[(f.a, 3), (f.b, 2)]))
            .await
            .unwrap();
        assert_eq!(plan.total_sum, dec!(321));

        assert_eq!(quantity(&f.store, f.warehouse_id, f.a).await, 7);
        assert_eq!(quantity(&f.store, f.warehouse_id, f.b).await, 2);

        let analytics = f.store.warehouse_analytics(f.warehouse_id).await.unwrap();
        assert_eq!(analytics[0].product_id, f.a);
        assert_eq!(analytics[0].total_sum, dec!(270));
        assert_eq!(analytics[1].total_sum, dec!(51));
    }

    #[tokio::test]
    async fn test_failed_line_changes_nothing() {
        let f = fixture().await;
        let ctx = RequestContext::generate();

        let err = f
            .service
            .purchase(&ctx, &request(f.warehouse_id, &[(f.a, 3), (f.b, 5)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientStock {
                available: 4,
                requested: 5,
                ..
            }
        ));

        assert_eq!(quantity(&f.store, f.warehouse_id, f.a).await, 10);
        assert_eq!(quantity(&f.store, f.warehouse_id, f.b).await, 4);
        assert!(f.store.warehouse_analytics(f.warehouse_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_quote_matches_purchase() {
        let f = fixture().await;
        let ctx = RequestContext::generate();
        let req = request(f.warehouse_id, &[(f.b, 1), (f.a, 2), (f.b, 1)]);

        let quote = f.service.quote(&ctx, &req).await.unwrap();
        assert_eq!(quote.items.len(), 3);
        assert_eq!(quote.items[1].name, "Anvil");
        assert_eq!(quote.items[1].price_with_discount, dec!(90));
        assert_eq!(quantity(&f.store, f.warehouse_id, f.b).await, 4);

        let plan = f.service.purchase(&ctx, &req).await.unwrap();
        assert_eq!(plan.total_sum, quote.total_sum);
    }

    #[tokio::test]
    async fn test_empty_request_is_a_no_op() {
        let f = fixture().await;
        let ctx = RequestContext::generate();
        let req = request(f.warehouse_id, &[]);

        let plan = f.service.purchase(&ctx, &req).await.unwrap();
        assert!(plan.lines.is_empty());
        assert_eq!(f.service.quote(&ctx, &req).await.unwrap().total_sum, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_lock_wait_timeout_is_a_conflict() {
        let f = fixture().await;
        let service = PurchaseService::new(f.store.clone(), Duration::from_millis(50));

        let mut holder = f.store.begin().await.unwrap();
        holder.lock_inventory(f.warehouse_id, &[f.a]).await.unwrap();

        let err = service
            .purchase(&RequestContext::generate(), &request(f.warehouse_id, &[(f.a, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ConcurrencyConflict(_)));
        assert!(err.is_retryable());

        holder.rollback().await.unwrap();
        assert_eq!(quantity(&f.store, f.warehouse_id, f.a).await, 10);
    }

    /// Memory store whose commits take `delay` to complete
    struct SlowCommitStore {
        inner: MemoryStore,
        delay: Duration,
    }

    struct SlowCommit {
        inner: Box<dyn StockTransaction>,
        delay: Duration,
    }

    #[async_trait]
    impl StockTransaction for SlowCommit {
        async fn lock_inventory(
            &mut self,
            warehouse_id: Uuid,
            product_ids: &[Uuid],
        ) -> AppResult<Vec<InventoryRecord>> {
            self.inner.lock_inventory(warehouse_id, product_ids).await
        }

        async fn decrement(&mut self, key: StockKey, amount: i32) -> AppResult<InventoryRecord> {
            self.inner.decrement(key, amount).await
        }

        async fn accumulate(
            &mut self,
            key: StockKey,
            sold_quantity: i64,
            revenue: Decimal,
        ) -> AppResult<()> {
            self.inner.accumulate(key, sold_quantity, revenue).await
        }

        async fn commit(self: Box<Self>) -> AppResult<()> {
            tokio::time::sleep(self.delay).await;
            self.inner.commit().await
        }

        async fn rollback(self: Box<Self>) -> AppResult<()> {
            self.inner.rollback().await
        }
    }

    #[async_trait]
    impl Store for SlowCommitStore {
        async fn create_warehouse(&self, warehouse: Warehouse) -> AppResult<Warehouse> {
            self.inner.create_warehouse(warehouse).await
        }

        async fn list_warehouses(&self) -> AppResult<Vec<Warehouse>> {
            self.inner.list_warehouses().await
        }

        async fn get_warehouse(&self, id: Uuid) -> AppResult<Option<Warehouse>> {
            self.inner.get_warehouse(id).await
        }

        async fn create_product(&self, product: Product) -> AppResult<Product> {
            self.inner.create_product(product).await
        }

        async fn list_products(&self) -> AppResult<Vec<Product>> {
            self.inner.list_products().await
        }

        async fn get_product(&self, id: Uuid) -> AppResult<Option<Product>> {
            self.inner.get_product(id).await
        }

        async fn get_products(&self, ids: &[Uuid]) -> AppResult<Vec<Product>> {
            self.inner.get_products(ids).await
        }

        async fn update_product(&self, product: Product) -> AppResult<Option<Product>> {
            self.inner.update_product(product).await
        }

        async fn create_inventory(&self, record: InventoryRecord) -> AppResult<InventoryRecord> {
            self.inner.create_inventory(record).await
        }

        async fn get_inventory(&self, key: StockKey) -> AppResult<Option<InventoryRecord>> {
            self.inner.get_inventory(key).await
        }

        async fn inventory_snapshot(
            &self,
            warehouse_id: Uuid,
            product_ids: &[Uuid],
        ) -> AppResult<Vec<InventoryRecord>> {
            self.inner.inventory_snapshot(warehouse_id, product_ids).await
        }

        async fn list_inventory(
            &self,
            warehouse_id: Uuid,
            pagination: Pagination,
        ) -> AppResult<Vec<InventoryWithProduct>> {
            self.inner.list_inventory(warehouse_id, pagination).await
        }

        async fn adjust_quantity(&self, key: StockKey, delta: i32) -> AppResult<InventoryRecord> {
            self.inner.adjust_quantity(key, delta).await
        }

        async fn set_discount(&self, key: StockKey, discount: Decimal) -> AppResult<InventoryRecord> {
            self.inner.set_discount(key, discount).await
        }

        async fn warehouse_analytics(&self, warehouse_id: Uuid) -> AppResult<Vec<AnalyticsRecord>> {
            self.inner.warehouse_analytics(warehouse_id).await
        }

        async fn top_warehouses(&self, limit: u32) -> AppResult<Vec<WarehouseAnalytics>> {
            self.inner.top_warehouses(limit).await
        }

        async fn begin(&self) -> AppResult<Box<dyn StockTransaction>> {
            Ok(Box::new(SlowCommit {
                inner: self.inner.begin().await?,
                delay: self.delay,
            }))
        }

        async fn ping(&self) -> AppResult<()> {
            self.inner.ping().await
        }
    }

    #[tokio::test]
    async fn test_slow_commit_is_not_reported_as_failure() {
        let f = fixture().await;
        let store = Arc::new(SlowCommitStore {
            inner: (*f.store).clone(),
            delay: Duration::from_millis(200),
        });
        let service = PurchaseService::new(store, Duration::from_millis(50));

        let plan = service
            .purchase(&RequestContext::generate(), &request(f.warehouse_id, &[(f.a, 4)]))
            .await
            .unwrap();
        assert_eq!(plan.total_sum, dec!(360));

        assert_eq!(quantity(&f.store, f.warehouse_id, f.a).await, 6);
        let analytics = f.store.warehouse_analytics(f.warehouse_id).await.unwrap();
        assert_eq!(analytics[0].sold_quantity, 4);
    }
}
