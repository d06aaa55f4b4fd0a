//! Lens CRUD and quantity adjustment
//!
//! GET/POST /api/lens, GET/PUT/DELETE /api/lens/:id, PATCH /api/lens/:id/quantity

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use optistock_common::lens::RawLensFields;
use optistock_common::LensRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::engine::{Inventory, QuantityDelta};
use crate::{error::ApiResult, AppState};

/// Search parameters; every field is optional and empty strings are ignored
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub sph: Option<String>,
    pub cyl: Option<String>,
    pub axis: Option<String>,
    pub addition: Option<String>,
    pub box_number: Option<String>,
}

impl From<SearchQuery> for RawLensFields {
    fn from(query: SearchQuery) -> Self {
        RawLensFields {
            sph: query.sph.map(Value::String),
            cyl: query.cyl.map(Value::String),
            axis: query.axis.map(Value::String),
            addition: query.addition.map(Value::String),
            box_number: query.box_number.map(Value::String),
            quantity: None,
        }
    }
}

/// POST /api/lens response
#[derive(Debug, Serialize)]
pub struct CreateLensResponse {
    #[serde(flatten)]
    pub lens: LensRecord,
    /// True when the quantity was merged into an existing record
    pub updated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// PATCH /api/lens/:id/quantity request
#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    #[serde(default)]
    pub adjustment: Option<Value>,
}

/// PATCH /api/lens/:id/quantity response
#[derive(Debug, Serialize)]
pub struct AdjustResponse {
    pub lens: LensRecord,
    pub warning: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// GET /api/lens
///
/// Newest first.
pub async fn list_lenses(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<LensRecord>>> {
    let fields = RawLensFields::from(query);
    let lenses = state.inventory.list_filtered(&fields).await?;
    debug!("Search returned {} lenses", lenses.len());
    Ok(Json(lenses))
}

/// POST /api/lens
///
/// 201 when a record was created, 200 when the quantity merged into an
/// existing record with the same specification and box.
pub async fn create_lens(
    State(state): State<AppState>,
    Json(fields): Json<RawLensFields>,
) -> ApiResult<(StatusCode, Json<CreateLensResponse>)> {
    let outcome = state.inventory.create_or_merge(&fields).await?;

    let status = if outcome.was_merged() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    let response = CreateLensResponse {
        updated: outcome.was_merged(),
        message: outcome.note(),
        lens: outcome.into_record(),
    };
    Ok((status, Json(response)))
}

/// GET /api/lens/:id
pub async fn get_lens(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<LensRecord>> {
    let id = Inventory::parse_id(&id)?;
    Ok(Json(state.inventory.get_lens(id).await?))
}

/// PUT /api/lens/:id
pub async fn update_lens(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(fields): Json<RawLensFields>,
) -> ApiResult<Json<LensRecord>> {
    let id = Inventory::parse_id(&id)?;
    Ok(Json(state.inventory.update_lens(id, &fields).await?))
}

/// DELETE /api/lens/:id
pub async fn delete_lens(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let id = Inventory::parse_id(&id)?;
    state.inventory.delete_lens(id).await?;
    Ok(Json(MessageResponse {
        message: "Lens removed".to_string(),
    }))
}

/// PATCH /api/lens/:id/quantity
pub async fn adjust_quantity(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AdjustRequest>,
) -> ApiResult<Json<AdjustResponse>> {
    let delta = QuantityDelta::from_json(request.adjustment.as_ref())?;
    let id = Inventory::parse_id(&id)?;

    let adjustment = state.inventory.adjust_quantity(id, delta).await?;
    Ok(Json(AdjustResponse {
        lens: adjustment.record,
        warning: adjustment.advisory.map(|a| a.to_string()),
    }))
}

/// Build lens routes
pub fn lens_routes() -> Router<AppState> {
    Router::new()
        .route("/api/lens", get(list_lenses).post(create_lens))
        .route(
            "/api/lens/:id",
            get(get_lens).put(update_lens).delete(delete_lens),
        )
        .route("/api/lens/:id/quantity", patch(adjust_quantity))
}
