use axum::extract::{Path, State};

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::AssembledProgram;

/// GET /api/:lang/programs/:program_id - the program with its courses, modules,
/// final quiz and the partition's images in one document
pub async fn assemble(
    State(state): State<AppState>,
    Path((lang, program_id)): Path<(String, String)>,
) -> ApiResult<AssembledProgram> {
    let program = state.assembler.assemble(&lang, &program_id).await?;
    Ok(ApiResponse::success(program))
}
