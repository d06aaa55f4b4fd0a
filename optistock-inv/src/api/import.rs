//! Bulk import endpoint
//!
//! POST /api/lens/import

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::engine::ImportReport;
use crate::{error::ApiResult, AppState};

/// POST /api/lens/import request
///
/// Rows stay untyped here so one malformed row is reported against itself
/// instead of rejecting the whole body.
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    #[serde(default)]
    pub lenses: Vec<Value>,
}

/// POST /api/lens/import response
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub message: String,
    #[serde(flatten)]
    pub report: ImportReport,
}

/// POST /api/lens/import
///
/// Always 200 once the batch is accepted; per-row failures are listed in `errors`.
pub async fn import_lenses(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<Json<ImportResponse>> {
    info!("Import request with {} rows", request.lenses.len());
    let report = state.inventory.import_batch(request.lenses).await?;

    Ok(Json(ImportResponse {
        message: report.message(),
        report,
    }))
}

/// Build import routes
pub fn import_routes() -> Router<AppState> {
    Router::new().route("/api/lens/import", post(import_lenses))
}
