//! Disease prediction endpoints.
//!
//! - `POST /api/ml-models/disease-prediction`: ensemble prediction from health metrics
//! - `GET /api/ml-models/disease-predictions`: recent persisted predictions

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ListQuery};
use crate::chat::resolve_session_id;
use crate::db::{self, DiseasePredictionRecord, NewDiseasePrediction};
use crate::inference::DiseasePrediction;

#[derive(Debug, Deserialize)]
pub struct DiseasePredictionRequest {
    pub health_data: Value,
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DiseasePredictionResponse {
    pub id: i64,
    pub session_id: String,
    pub timestamp: String,
    #[serde(flatten)]
    pub prediction: DiseasePrediction,
}

/// `POST /api/ml-models/disease-prediction`
pub async fn predict(
    State(ctx): State<ApiContext>,
    Json(request): Json<DiseasePredictionRequest>,
) -> Result<Json<DiseasePredictionResponse>, ApiError> {
    if !request.health_data.is_object() {
        return Err(ApiError::BadRequest("health_data must be a JSON object".into()));
    }

    let prediction = ctx.core.engine().predict_disease(&request.health_data)?;
    let session_id = resolve_session_id(request.session_id.as_deref());

    let conn = ctx.core.open_db()?;
    let record = db::insert_disease_prediction(
        &conn,
        &NewDiseasePrediction {
            health_data: &prediction.health_data,
            predicted_disease: &prediction.predicted_disease,
            risk_score: f64::from(prediction.risk_score),
            confidence_level: prediction.confidence_level.as_str(),
            session_id: Some(&session_id),
        },
    )?;

    tracing::info!(
        id = record.id,
        predicted = %prediction.predicted_disease,
        risk_score = prediction.risk_score,
        confidence = %prediction.confidence_level,
        "Disease prediction stored"
    );

    Ok(Json(DiseasePredictionResponse {
        id: record.id,
        session_id,
        timestamp: record.timestamp,
        prediction,
    }))
}

/// `GET /api/ml-models/disease-predictions?limit=`
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<DiseasePredictionRecord>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(db::list_disease_predictions(&conn, query.limit())?))
}
