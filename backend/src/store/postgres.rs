//! PostgreSQL store
//!
//! Purchases lock their inventory rows with `SELECT ... FOR UPDATE` ordered by
//! product id and run under a per-transaction `lock_timeout`. Decrements are
//! conditional on the stock still being sufficient, and analytics rows are
//! upserted with `ON CONFLICT`.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::{
    AnalyticsRecord, InventoryRecord, InventoryWithProduct, Pagination, Product, StockKey,
    Warehouse, WarehouseAnalytics,
};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{StockTransaction, Store};
use crate::config::DatabaseConfig;
use crate::error::{AppError, AppResult};

/// Store backed by a Postgres connection pool
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
    lock_timeout: Duration,
}

#[derive(Debug, FromRow)]
struct WarehouseRow {
    id: Uuid,
    address: String,
}

impl From<WarehouseRow> for Warehouse {
    fn from(row: WarehouseRow) -> Self {
        Warehouse {
            id: row.id,
            address: row.address,
        }
    }
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: String,
    characteristics: serde_json::Value,
    weight: Decimal,
    barcode: String,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            description: row.description,
            characteristics: row.characteristics,
            weight: row.weight,
            barcode: row.barcode,
        }
    }
}

#[derive(Debug, FromRow)]
struct InventoryRow {
    warehouse_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    price: Decimal,
    discount: Decimal,
}

impl From<InventoryRow> for InventoryRecord {
    fn from(row: InventoryRow) -> Self {
        InventoryRecord {
            warehouse_id: row.warehouse_id,
            product_id: row.product_id,
            quantity: row.quantity,
            price: row.price,
            discount: row.discount,
        }
    }
}

/// Row for the warehouse stock listing
#[derive(Debug, FromRow)]
struct StockListingRow {
    warehouse_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    price: Decimal,
    discount: Decimal,
    name: String,
    description: String,
    characteristics: serde_json::Value,
    weight: Decimal,
    barcode: String,
}

impl From<StockListingRow> for InventoryWithProduct {
    fn from(row: StockListingRow) -> Self {
        InventoryWithProduct {
            inventory: InventoryRecord {
                warehouse_id: row.warehouse_id,
                product_id: row.product_id,
                quantity: row.quantity,
                price: row.price,
                discount: row.discount,
            },
            product: Product {
                id: row.product_id,
                name: row.name,
                description: row.description,
                characteristics: row.characteristics,
                weight: row.weight,
                barcode: row.barcode,
            },
        }
    }
}

#[derive(Debug, FromRow)]
struct AnalyticsRow {
    warehouse_id: Uuid,
    product_id: Uuid,
    sold_quantity: i64,
    total_sum: Decimal,
}

impl From<AnalyticsRow> for AnalyticsRecord {
    fn from(row: AnalyticsRow) -> Self {
        AnalyticsRecord {
            warehouse_id: row.warehouse_id,
            product_id: row.product_id,
            sold_quantity: row.sold_quantity,
            total_sum: row.total_sum,
        }
    }
}

#[derive(Debug, FromRow)]
struct RankingRow {
    warehouse_id: Uuid,
    address: String,
    total_sum: Decimal,
}

impl From<RankingRow> for WarehouseAnalytics {
    fn from(row: RankingRow) -> Self {
        WarehouseAnalytics {
            warehouse_id: row.warehouse_id,
            address: row.address,
            total_sum: row.total_sum,
        }
    }
}

const INVENTORY_COLUMNS: &str = "warehouse_id, product_id, quantity, price, discount";
const PRODUCT_COLUMNS: &str = "id, name, description, characteristics, weight, barcode";

impl PgStore {
    pub fn new(db: PgPool, lock_timeout: Duration) -> Self {
        Self { db, lock_timeout }
    }

    /// Open a connection pool sized from `config`
    pub async fn connect(config: &DatabaseConfig, lock_timeout: Duration) -> AppResult<Self> {
        let db = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await?;
        Ok(Self::new(db, lock_timeout))
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.db).await
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_warehouse(&self, warehouse: Warehouse) -> AppResult<Warehouse> {
        let row = sqlx::query_as::<_, WarehouseRow>(
            "INSERT INTO warehouses (id, address) VALUES ($1, $2) RETURNING id, address",
        )
        .bind(warehouse.id)
        .bind(&warehouse.address)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    async fn list_warehouses(&self) -> AppResult<Vec<Warehouse>> {
        let rows = sqlx::query_as::<_, WarehouseRow>(
            "SELECT id, address FROM warehouses ORDER BY address, id",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_warehouse(&self, id: Uuid) -> AppResult<Option<Warehouse>> {
        let row = sqlx::query_as::<_, WarehouseRow>(
            "SELECT id, address FROM warehouses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn create_product(&self, product: Product) -> AppResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            INSERT INTO products (id, name, description, characteristics, weight, barcode)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.characteristics)
        .bind(product.weight)
        .bind(&product.barcode)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    async fn list_products(&self) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name, id"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn get_products(&self, ids: &[Uuid]) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_product(&self, product: Product) -> AppResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            UPDATE products
            SET name = $2, description = $3, characteristics = $4, weight = $5, barcode = $6
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.characteristics)
        .bind(product.weight)
        .bind(&product.barcode)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn create_inventory(&self, record: InventoryRecord) -> AppResult<InventoryRecord> {
        let row = sqlx::query_as::<_, InventoryRow>(&format!(
            r#"
            INSERT INTO inventory (warehouse_id, product_id, quantity, price, discount)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {INVENTORY_COLUMNS}
            "#
        ))
        .bind(record.warehouse_id)
        .bind(record.product_id)
        .bind(record.quantity)
        .bind(record.price)
        .bind(record.discount)
        .fetch_one(&self.db)
        .await
        .map_err(|err| match AppError::from(err) {
            AppError::DuplicateEntry(_) => {
                AppError::DuplicateEntry("warehouse and product".to_string())
            }
            other => other,
        })?;

        Ok(row.into())
    }

    async fn get_inventory(&self, key: StockKey) -> AppResult<Option<InventoryRecord>> {
        let row = sqlx::query_as::<_, InventoryRow>(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory WHERE warehouse_id = $1 AND product_id = $2"
        ))
        .bind(key.warehouse_id)
        .bind(key.product_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn inventory_snapshot(
        &self,
        warehouse_id: Uuid,
        product_ids: &[Uuid],
    ) -> AppResult<Vec<InventoryRecord>> {
        let rows = sqlx::query_as::<_, InventoryRow>(&format!(
            r#"
            SELECT {INVENTORY_COLUMNS} FROM inventory
            WHERE warehouse_id = $1 AND product_id = ANY($2)
            ORDER BY product_id
            "#
        ))
        .bind(warehouse_id)
        .bind(product_ids)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_inventory(
        &self,
        warehouse_id: Uuid,
        pagination: Pagination,
    ) -> AppResult<Vec<InventoryWithProduct>> {
        let rows = sqlx::query_as::<_, StockListingRow>(
            r#"
            SELECT i.warehouse_id, i.product_id, i.quantity, i.price, i.discount,
                   p.name, p.description, p.characteristics, p.weight, p.barcode
            FROM inventory i
            JOIN products p ON p.id = i.product_id
            WHERE i.warehouse_id = $1
            ORDER BY p.name, p.id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(warehouse_id)
        .bind(i64::from(pagination.limit()))
        .bind(i64::try_from(pagination.offset()).unwrap_or(i64::MAX))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn adjust_quantity(&self, key: StockKey, delta: i32) -> AppResult<InventoryRecord> {
        let updated = sqlx::query_as::<_, InventoryRow>(&format!(
            r#"
            UPDATE inventory SET quantity = quantity + $3
            WHERE warehouse_id = $1 AND product_id = $2 AND quantity + $3 >= 0
            RETURNING {INVENTORY_COLUMNS}
            "#
        ))
        .bind(key.warehouse_id)
        .bind(key.product_id)
        .bind(delta)
        .fetch_optional(&self.db)
        .await?;

        if let Some(row) = updated {
            return Ok(row.into());
        }

        match self.get_inventory(key).await? {
            Some(current) => Err(AppError::InsufficientStock {
                product_id: key.product_id,
                available: current.quantity,
                requested: delta.saturating_neg(),
            }),
            None => Err(AppError::NotFound("Inventory record".to_string())),
        }
    }

    async fn set_discount(&self, key: StockKey, discount: Decimal) -> AppResult<InventoryRecord> {
        let row = sqlx::query_as::<_, InventoryRow>(&format!(
            r#"
            UPDATE inventory SET discount = $3
            WHERE warehouse_id = $1 AND product_id = $2
            RETURNING {INVENTORY_COLUMNS}
            "#
        ))
        .bind(key.warehouse_id)
        .bind(key.product_id)
        .bind(discount)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory record".to_string()))?;

        Ok(row.into())
    }

    async fn warehouse_analytics(&self, warehouse_id: Uuid) -> AppResult<Vec<AnalyticsRecord>> {
        let rows = sqlx::query_as::<_, AnalyticsRow>(
            r#"
            SELECT warehouse_id, product_id, sold_quantity, total_sum
            FROM analytics
            WHERE warehouse_id = $1
            ORDER BY total_sum DESC, product_id
            "#,
        )
        .bind(warehouse_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn top_warehouses(&self, limit: u32) -> AppResult<Vec<WarehouseAnalytics>> {
        let rows = sqlx::query_as::<_, RankingRow>(
            r#"
            SELECT w.id AS warehouse_id, w.address,
                   COALESCE(SUM(a.total_sum), 0) AS total_sum
            FROM warehouses w
            LEFT JOIN analytics a ON a.warehouse_id = w.id
            GROUP BY w.id, w.address
            ORDER BY total_sum DESC, w.address, w.id
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn begin(&self) -> AppResult<Box<dyn StockTransaction>> {
        let mut tx = self.db.begin().await?;

        // Scoped to this transaction only
        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", self.lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await?;

        Ok(Box::new(PgTransaction { tx }))
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }
}

/// Open Postgres transaction; rolled back by sqlx when dropped uncommitted
pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StockTransaction for PgTransaction {
    async fn lock_inventory(
        &mut self,
        warehouse_id: Uuid,
        product_ids: &[Uuid],
    ) -> AppResult<Vec<InventoryRecord>> {
        let mut ids = product_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let rows = sqlx::query_as::<_, InventoryRow>(&format!(
            r#"
            SELECT {INVENTORY_COLUMNS} FROM inventory
            WHERE warehouse_id = $1 AND product_id = ANY($2)
            ORDER BY product_id
            FOR UPDATE
            "#
        ))
        .bind(warehouse_id)
        .bind(&ids)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn decrement(&mut self, key: StockKey, amount: i32) -> AppResult<InventoryRecord> {
        let updated = sqlx::query_as::<_, InventoryRow>(&format!(
            r#"
            UPDATE inventory SET quantity = quantity - $3
            WHERE warehouse_id = $1 AND product_id = $2 AND quantity >= $3
            RETURNING {INVENTORY_COLUMNS}
            "#
        ))
        .bind(key.warehouse_id)
        .bind(key.product_id)
        .bind(amount)
        .fetch_optional(&mut *self.tx)
        .await?;

        if let Some(row) = updated {
            return Ok(row.into());
        }

        let current = sqlx::query_scalar::<_, i32>(
            "SELECT quantity FROM inventory WHERE warehouse_id = $1 AND product_id = $2",
        )
        .bind(key.warehouse_id)
        .bind(key.product_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Err(match current {
            Some(available) => AppError::InsufficientStock {
                product_id: key.product_id,
                available,
                requested: amount,
            },
            None => AppError::ProductNotFoundInWarehouse {
                warehouse_id: key.warehouse_id,
                product_id: key.product_id,
            },
        })
    }

    async fn accumulate(
        &mut self,
        key: StockKey,
        sold_quantity: i64,
        revenue: Decimal,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO analytics (warehouse_id, product_id, sold_quantity, total_sum)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (warehouse_id, product_id) DO UPDATE
            SET sold_quantity = analytics.sold_quantity + EXCLUDED.sold_quantity,
                total_sum = analytics.total_sum + EXCLUDED.total_sum
            "#,
        )
        .bind(key.warehouse_id)
        .bind(key.product_id)
        .bind(sold_quantity)
        .bind(revenue)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
