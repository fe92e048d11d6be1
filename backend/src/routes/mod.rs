//! Route definitions for the Warehouse Sales service

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/warehouses", warehouse_routes())
        .nest("/products", product_routes())
        .nest("/inventory", inventory_routes())
        .nest("/analytics", analytics_routes())
}

/// Warehouse, stock listing and purchase routes
fn warehouse_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_warehouses).post(handlers::create_warehouse),
        )
        .route("/calculate", post(handlers::calculate))
        .route("/purchase", post(handlers::purchase))
        .route("/:warehouse_id/products", get(handlers::list_warehouse_products))
        .route(
            "/:warehouse_id/products/:product_id",
            get(handlers::get_warehouse_product),
        )
}

/// Product catalog routes
fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route(
            "/:product_id",
            get(handlers::get_product).put(handlers::update_product),
        )
}

/// Stocking and stock administration routes
fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_inventory))
        .route("/quantity", put(handlers::update_quantity))
        .route("/discount", put(handlers::update_discount))
}

/// Sales analytics routes
fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/warehouses/top", get(handlers::top_warehouses))
        .route("/warehouses/:warehouse_id", get(handlers::warehouse_analytics))
}
