use axum::extract::{rejection::JsonRejection, State};
use axum::Json;

use crate::app::AppState;
use crate::integrations::{SendDocumentRequest, SendDocumentResponse};
use crate::middleware::{ApiResponse, ApiResult};

/// POST /api/telegram/send-document - forward a file URL to a Telegram chat
pub async fn send_document(
    State(state): State<AppState>,
    payload: Result<Json<SendDocumentRequest>, JsonRejection>,
) -> ApiResult<SendDocumentResponse> {
    let Json(request) = payload?;
    let response = state.telegram.send_document(request).await?;
    Ok(ApiResponse::success(response))
}
