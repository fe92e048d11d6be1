//! Product catalog HTTP handlers

use axum::{extract::State, http::StatusCode, Json};
use shared::Product;
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::{AppJson, AppPath};
use crate::services::catalog::{CatalogService, ProductInput};
use crate::AppState;

/// List all products
pub async fn list_products(State(state): State<AppState>) -> AppResult<Json<Vec<Product>>> {
    let service = CatalogService::new(state.store);
    let products = service.list_products().await?;
    Ok(Json(products))
}

/// Create a product
pub async fn create_product(
    State(state): State<AppState>,
    AppJson(input): AppJson<ProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let service = CatalogService::new(state.store);
    let product = service.create_product(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Get a product by id
pub async fn get_product(
    State(state): State<AppState>,
    AppPath(product_id): AppPath<Uuid>,
) -> AppResult<Json<Product>> {
    let service = CatalogService::new(state.store);
    let product = service.get_product(product_id).await?;
    Ok(Json(product))
}

/// Replace a product's attributes
pub async fn update_product(
    State(state): State<AppState>,
    AppPath(product_id): AppPath<Uuid>,
    AppJson(input): AppJson<ProductInput>,
) -> AppResult<Json<Product>> {
    let service = CatalogService::new(state.store);
    let product = service.update_product(product_id, input).await?;
    Ok(Json(product))
}
