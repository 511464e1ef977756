use axum::extract::{rejection::JsonRejection, Path, State};
use axum::Json;
use serde_json::Value;

use crate::api::format::{document_to_api_value, replacement_from_api_input};
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

use super::utils::resolve_collection;

/// GET /api/:lang/data/:resource/:uid - get a single document
pub async fn get(
    State(state): State<AppState>,
    Path((lang, resource, uid)): Path<(String, String, String)>,
) -> ApiResult<Value> {
    let (kind, documents) = resolve_collection(&state, &lang, &resource)?;

    match documents.select_one(&uid).await? {
        Some(document) => Ok(ApiResponse::success(document_to_api_value(kind, &document))),
        None => Err(ApiError::not_found(format!("{} {} not found", kind, uid))),
    }
}

/// PUT /api/:lang/data/:resource/:uid - replace a document
pub async fn put(
    State(state): State<AppState>,
    Path((lang, resource, uid)): Path<(String, String, String)>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let (kind, documents) = resolve_collection(&state, &lang, &resource)?;
    let Json(payload) = payload?;

    let document = replacement_from_api_input(kind, &uid, payload)?;
    match documents.update(&uid, document).await? {
        Some(updated) => Ok(ApiResponse::success(document_to_api_value(kind, &updated))),
        None => Err(ApiError::not_found(format!("{} {} not found", kind, uid))),
    }
}

/// DELETE /api/:lang/data/:resource/:uid - delete a document, returning it
pub async fn delete(
    State(state): State<AppState>,
    Path((lang, resource, uid)): Path<(String, String, String)>,
) -> ApiResult<Value> {
    let (kind, documents) = resolve_collection(&state, &lang, &resource)?;

    match documents.delete(&uid).await? {
        Some(removed) => {
            tracing::info!("Deleted {} {} from {}", kind, uid, lang);
            Ok(ApiResponse::success(document_to_api_value(kind, &removed)))
        }
        None => Err(ApiError::not_found(format!("{} {} not found", kind, uid))),
    }
}
