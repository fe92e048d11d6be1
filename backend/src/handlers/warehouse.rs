//! Warehouse HTTP handlers

use axum::{extract::State, http::StatusCode, Json};
use shared::{InventoryWithProduct, Pagination, Warehouse};
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::services::catalog::{CatalogService, CreateWarehouseInput};
use crate::services::LedgerService;
use crate::AppState;

/// List all warehouses
pub async fn list_warehouses(State(state): State<AppState>) -> AppResult<Json<Vec<Warehouse>>> {
    let service = CatalogService::new(state.store);
    let warehouses = service.list_warehouses().await?;
    Ok(Json(warehouses))
}

/// Create a warehouse
pub async fn create_warehouse(
    State(state): State<AppState>,
    AppJson(input): AppJson<CreateWarehouseInput>,
) -> AppResult<(StatusCode, Json<Warehouse>)> {
    let service = CatalogService::new(state.store);
    let warehouse = service.create_warehouse(input).await?;
    Ok((StatusCode::CREATED, Json(warehouse)))
}

/// Stock of a warehouse joined with products, paginated
pub async fn list_warehouse_products(
    State(state): State<AppState>,
    AppPath(warehouse_id): AppPath<Uuid>,
    AppQuery(pagination): AppQuery<Pagination>,
) -> AppResult<Json<Vec<InventoryWithProduct>>> {
    let service = LedgerService::new(state.store);
    let products = service.list_by_warehouse(warehouse_id, pagination).await?;
    Ok(Json(products))
}

/// One stocked product of a warehouse
pub async fn get_warehouse_product(
    State(state): State<AppState>,
    AppPath((warehouse_id, product_id)): AppPath<(Uuid, Uuid)>,
) -> AppResult<Json<InventoryWithProduct>> {
    let service = LedgerService::new(state.store);
    let product = service.get_with_product(warehouse_id, product_id).await?;
    Ok(Json(product))
}
