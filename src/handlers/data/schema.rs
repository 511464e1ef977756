use axum::extract::{rejection::JsonRejection, Path, Query, State};
use axum::Json;
use serde_json::Value;
use std::collections::HashMap;

use crate::api::format::{document_from_api_input, document_to_api_value, documents_to_api_values};
use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};

use super::utils::{list_filter, resolve_collection};

/// GET /api/:lang/data/:resource - list documents, filtered by query parameters
pub async fn get(
    State(state): State<AppState>,
    Path((lang, resource)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Vec<Value>> {
    let (kind, documents) = resolve_collection(&state, &lang, &resource)?;
    let filter = list_filter(&query, state.config.api.max_list_limit)?;

    let found = documents.select_any(&filter).await?;
    Ok(ApiResponse::success(documents_to_api_values(kind, &found)))
}

/// POST /api/:lang/data/:resource - create one document
pub async fn post(
    State(state): State<AppState>,
    Path((lang, resource)): Path<(String, String)>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let (kind, documents) = resolve_collection(&state, &lang, &resource)?;
    let Json(payload) = payload?;

    let document = document_from_api_input(kind, payload)?;
    let created = documents.create(document).await?;
    tracing::info!("Created {} {} in {}", kind, created.uid().unwrap_or_default(), lang);

    Ok(ApiResponse::created(document_to_api_value(kind, &created)))
}
