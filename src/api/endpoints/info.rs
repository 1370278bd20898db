//! Model metadata endpoint.

use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::inference::ModelInfo;

/// `GET /api/ml-models/info`: contents of the exported metadata file.
pub async fn model_info(State(ctx): State<ApiContext>) -> Result<Json<ModelInfo>, ApiError> {
    Ok(Json(ctx.core.engine().get_model_info()?))
}
