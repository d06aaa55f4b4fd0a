//! Error types for optistock-inv
//!
//! `InventoryError` is what the engine returns; `ApiError` is its HTTP face.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use optistock_common::lens::ValidationErrors;
use serde_json::json;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

/// Failures of inventory operations
#[derive(Debug, Error)]
pub enum InventoryError {
    /// One or more fields failed presence/range checks; nothing was written
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    /// Unknown (or malformed) lens identifier
    #[error("Lens not found: {0}")]
    NotFound(String),

    /// Adjustment outside {-2, -1, 1, 2}
    #[error("Invalid adjustment value {0}. Use -2, -1, 1, or 2")]
    InvalidAdjustment(String),

    /// Adjustment would take the quantity below zero; the record is untouched
    #[error("Quantity cannot go below 0 (current {current}, adjustment {delta})")]
    QuantityUnderflow { current: u32, delta: i64 },

    /// Compare-and-swap kept losing to concurrent writers
    #[error("Lens {0} is being modified concurrently, try again")]
    Conflict(Uuid),

    /// Storage or connectivity failure
    #[error("Storage error: {0}")]
    Storage(#[from] optistock_common::Error),
}

/// Result type for inventory operations
pub type InventoryResult<T> = Result<T, InventoryError>;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Validation failure (400) with every violated rule
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        reasons: Vec<String>,
    },

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::Validation(errors) => ApiError::Validation {
                message: errors.to_string(),
                reasons: errors.reasons(),
            },
            InventoryError::NotFound(_) => ApiError::NotFound("Lens not found".to_string()),
            InventoryError::InvalidAdjustment(_) => ApiError::BadRequest(
                "Invalid adjustment value. Use -2, -1, 1, or 2".to_string(),
            ),
            InventoryError::QuantityUnderflow { .. } => {
                ApiError::BadRequest("Quantity cannot go below 0".to_string())
            }
            InventoryError::Conflict(id) => ApiError::Conflict(format!(
                "Lens {} is being modified concurrently, try again",
                id
            )),
            InventoryError::Storage(e) => {
                // Details stay in the log
                error!("Storage failure: {}", e);
                ApiError::Internal("Server error".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, reasons) = match self {
            ApiError::Validation { message, reasons } => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                message,
                Some(reasons),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg, None),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
                None,
            ),
        };

        let mut error = json!({
            "code": error_code,
            "message": message,
        });
        if let Some(reasons) = reasons {
            error["reasons"] = json!(reasons);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
