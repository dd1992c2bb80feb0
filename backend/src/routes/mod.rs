//! Route definitions for the Medical Supply Inventory API

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes
        .merge(protected_routes(state))
}

/// Everything that needs an acting user
fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/cabinets", cabinet_routes())
        .nest("/mappings", mapping_routes())
        .nest("/supply-items", supply_routes())
        .route("/returns", get(handlers::list_return_records))
        .nest("/stock", stock_routes())
        .nest("/bills", bill_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Cabinet registry routes
fn cabinet_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_cabinets).post(handlers::create_cabinet))
        .route(
            "/:cabinet_id",
            get(handlers::get_cabinet).delete(handlers::retire_cabinet),
        )
}

/// Cabinet-department mapping routes
fn mapping_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_mappings).post(handlers::create_mapping))
        .route(
            "/:mapping_id",
            get(handlers::get_mapping)
                .put(handlers::update_mapping)
                .delete(handlers::delete_mapping),
        )
}

/// Supply ledger routes
fn supply_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_supply_items).post(handlers::record_dispensed_items),
        )
        .route("/:supply_item_id", get(handlers::get_supply_item))
        .route("/:supply_item_id/used", post(handlers::record_item_used))
        .route("/:supply_item_id/returns", post(handlers::record_item_return))
}

/// Physical stock routes
fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/returns", post(handlers::record_stock_returns))
        .route("/return-to-cabinet", post(handlers::return_items_to_cabinet))
        .route("/dispense", post(handlers::dispense_items_from_cabinet))
}

/// Bill correction routes
fn bill_routes() -> Router<AppState> {
    Router::new().route("/:usage_id/cancel", post(handlers::cancel_bill))
}
