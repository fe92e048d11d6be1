//! HTTP handlers for stocking and stock administration

use axum::{extract::State, http::StatusCode, Json};
use shared::InventoryRecord;

use crate::error::AppResult;
use crate::extract::AppJson;
use crate::services::ledger::{
    AdjustQuantityInput, CreateInventoryInput, LedgerService, SetDiscountInput,
};
use crate::AppState;

/// Stock a product in a warehouse
pub async fn create_inventory(
    State(state): State<AppState>,
    AppJson(input): AppJson<CreateInventoryInput>,
) -> AppResult<(StatusCode, Json<InventoryRecord>)> {
    let service = LedgerService::new(state.store);
    let record = service.create(input).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Add a (possibly negative) delta to the stocked quantity
pub async fn update_quantity(
    State(state): State<AppState>,
    AppJson(input): AppJson<AdjustQuantityInput>,
) -> AppResult<Json<InventoryRecord>> {
    let service = LedgerService::new(state.store);
    let record = service.adjust_quantity(input).await?;
    Ok(Json(record))
}

/// Replace the discount of a stocked product
pub async fn update_discount(
    State(state): State<AppState>,
    AppJson(input): AppJson<SetDiscountInput>,
) -> AppResult<Json<InventoryRecord>> {
    let service = LedgerService::new(state.store);
    let record = service.set_discount(input).await?;
    Ok(Json(record))
}
