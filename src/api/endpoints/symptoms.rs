//! Symptom checker endpoints.
//!
//! - `POST /api/ml-models/symptom-checker`: rank diseases for free text
//! - `GET /api/ml-models/symptom-checks`: recent persisted checks

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ListQuery};
use crate::chat::resolve_session_id;
use crate::db::{self, SymptomCheckRecord};
use crate::inference::SymptomPrediction;

/// Longest accepted symptom description, in characters.
pub const MAX_SYMPTOMS_CHARS: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct SymptomCheckRequest {
    pub symptoms: String,
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SymptomCheckResponse {
    pub id: i64,
    pub session_id: String,
    pub timestamp: String,
    /// `possible_conditions` joined by newlines, as stored.
    pub possible_conditions_text: String,
    #[serde(flatten)]
    pub prediction: SymptomPrediction,
}

/// `POST /api/ml-models/symptom-checker`
pub async fn check(
    State(ctx): State<ApiContext>,
    Json(request): Json<SymptomCheckRequest>,
) -> Result<Json<SymptomCheckResponse>, ApiError> {
    if request.symptoms.trim().is_empty() {
        return Err(ApiError::BadRequest("symptoms is required".into()));
    }
    if request.symptoms.chars().count() > MAX_SYMPTOMS_CHARS {
        return Err(ApiError::BadRequest(format!(
            "symptoms must be at most {MAX_SYMPTOMS_CHARS} characters"
        )));
    }

    let prediction = ctx.core.engine().predict_symptoms(&request.symptoms)?;
    let session_id = resolve_session_id(request.session_id.as_deref());

    let conn = ctx.core.open_db()?;
    let record = db::insert_symptom_check(
        &conn,
        &prediction.symptoms,
        &prediction.possible_conditions,
        prediction.confidence_score,
        Some(&session_id),
    )?;

    tracing::info!(
        id = record.id,
        predicted = %prediction.predicted_disease,
        confidence = prediction.confidence_score,
        "Symptom check stored"
    );

    Ok(Json(SymptomCheckResponse {
        id: record.id,
        session_id,
        timestamp: record.timestamp,
        possible_conditions_text: record.possible_conditions,
        prediction,
    }))
}

/// `GET /api/ml-models/symptom-checks?limit=`
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<SymptomCheckRecord>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(db::list_symptom_checks(&conn, query.limit())?))
}
