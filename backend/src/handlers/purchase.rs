//! Purchase and quote HTTP handlers

use axum::{extract::State, Extension, Json};
use serde::Serialize;
use shared::{PriceQuote, PurchaseRequest};

use crate::context::RequestContext;
use crate::error::AppResult;
use crate::extract::AppJson;
use crate::services::PurchaseService;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub status: &'static str,
}

fn purchase_service(state: AppState) -> PurchaseService {
    let timeout = state.config.purchase.transaction_timeout();
    PurchaseService::new(state.store, timeout)
}

/// Price a purchase without applying it
pub async fn calculate(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    AppJson(request): AppJson<PurchaseRequest>,
) -> AppResult<Json<PriceQuote>> {
    let quote = purchase_service(state).quote(&ctx, &request).await?;
    Ok(Json(quote))
}

/// Apply a purchase atomically
pub async fn purchase(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    AppJson(request): AppJson<PurchaseRequest>,
) -> AppResult<Json<PurchaseResponse>> {
    purchase_service(state).purchase(&ctx, &request).await?;
    Ok(Json(PurchaseResponse { status: "success" }))
}
