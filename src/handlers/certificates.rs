use axum::extract::{rejection::JsonRejection, Path, State};
use axum::Json;

use crate::app::AppState;
use crate::database::models::Certificate;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{IssueCertificateRequest, IssuedCertificate};

/// POST /api/certificates/issue - record and render a certificate
pub async fn issue(
    State(state): State<AppState>,
    payload: Result<Json<IssueCertificateRequest>, JsonRejection>,
) -> ApiResult<IssuedCertificate> {
    let Json(request) = payload?;
    let issued = state.certificates.issue(request).await?;
    Ok(ApiResponse::created(issued))
}

/// GET /api/certificates/:cert_id - look up an issued certificate
pub async fn verify(
    State(state): State<AppState>,
    Path(cert_id): Path<String>,
) -> ApiResult<Certificate> {
    let certificate = state.certificates.verify(&cert_id).await?;
    Ok(ApiResponse::success(certificate))
}
