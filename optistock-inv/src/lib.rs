//! optistock-inv library interface
//!
//! Exposes the engine, stores and router for the binary and integration tests.

pub mod api;
pub mod engine;
pub mod error;
pub mod store;

pub use crate::engine::Inventory;
pub use crate::error::{ApiError, ApiResult, InventoryError, InventoryResult};

use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub inventory: Inventory,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(inventory: Inventory) -> Self {
        Self {
            inventory,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::stats_routes())
        .merge(api::import_routes())
        .merge(api::lens_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
