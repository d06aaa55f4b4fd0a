//! Dashboard endpoints
//!
//! GET /api/lens/stats, GET /api/lens/low-stock, GET /api/lens/boxes

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use optistock_common::lens::RawLensFields;
use optistock_common::LensRecord;

use super::lenses::SearchQuery;
use crate::engine::{BoxSummary, InventoryStats};
use crate::{error::ApiResult, AppState};

/// GET /api/lens/stats
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<InventoryStats>> {
    Ok(Json(state.inventory.stats().await?))
}

/// GET /api/lens/low-stock
///
/// Quantity below 4 (out-of-stock included), lowest first.
pub async fn get_low_stock(State(state): State<AppState>) -> ApiResult<Json<Vec<LensRecord>>> {
    Ok(Json(state.inventory.list_low_stock().await?))
}

/// GET /api/lens/boxes
pub async fn get_boxes(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<BoxSummary>>> {
    let fields = RawLensFields::from(query);
    Ok(Json(state.inventory.list_boxes(&fields).await?))
}

/// Build dashboard routes
pub fn stats_routes() -> Router<AppState> {
    Router::new()
        .route("/api/lens/stats", get(get_stats))
        .route("/api/lens/low-stock", get(get_low_stock))
        .route("/api/lens/boxes", get(get_boxes))
}
