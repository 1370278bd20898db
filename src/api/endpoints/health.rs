//! Health check endpoint.

use axum::extract::State;
use axum::Json;

use crate::api::types::ApiContext;
use crate::inference::HealthReport;

/// `GET /api/health`: per-bundle load state. Always 200.
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthReport> {
    Json(ctx.core.engine().health_check())
}
