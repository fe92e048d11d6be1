//! Sales analytics HTTP handlers

use axum::{extract::State, Json};
use serde::Deserialize;
use shared::{WarehouseAnalytics, WarehouseSales};
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::{AppPath, AppQuery};
use crate::services::AnalyticsService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TopQuery {
    #[serde(default, deserialize_with = "shared::lenient_int")]
    pub limit: Option<i64>,
}

fn analytics_service(state: AppState) -> AnalyticsService {
    let default_limit = state.config.analytics.default_top_limit;
    AnalyticsService::new(state.store, default_limit)
}

/// Sales of one warehouse by product
pub async fn warehouse_analytics(
    State(state): State<AppState>,
    AppPath(warehouse_id): AppPath<Uuid>,
) -> AppResult<Json<WarehouseSales>> {
    let sales = analytics_service(state).by_warehouse(warehouse_id).await?;
    Ok(Json(sales))
}

/// Warehouses ranked by revenue
pub async fn top_warehouses(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<TopQuery>,
) -> AppResult<Json<Vec<WarehouseAnalytics>>> {
    let top = analytics_service(state).top_warehouses(query.limit).await?;
    Ok(Json(top))
}
