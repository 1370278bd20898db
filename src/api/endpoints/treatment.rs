//! Treatment lookup endpoints.
//!
//! - `POST /api/ml-models/treatment-info`: cached row (200) or fresh lookup (201)
//! - `GET /api/ml-models/treatment-list`: every cached row

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::{self, NewTreatmentInfo, TreatmentInfoRecord};
use crate::inference::{Bundle, InferenceError, TreatmentLookup};

pub const MAX_DISEASE_NAME_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
pub struct TreatmentInfoRequest {
    pub disease_name: String,
}

#[derive(Debug, Serialize)]
pub struct TreatmentInfoResponse {
    #[serde(flatten)]
    pub record: TreatmentInfoRecord,
    /// Set when the row was found by substring match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'static str>,
}

/// `POST /api/ml-models/treatment-info`
pub async fn lookup(
    State(ctx): State<ApiContext>,
    Json(request): Json<TreatmentInfoRequest>,
) -> Result<(StatusCode, Json<TreatmentInfoResponse>), ApiError> {
    let disease_name = request.disease_name.trim();
    if disease_name.is_empty() {
        return Err(ApiError::BadRequest("disease_name is required".into()));
    }
    if disease_name.chars().count() > MAX_DISEASE_NAME_CHARS {
        return Err(ApiError::BadRequest(format!(
            "disease_name must be at most {MAX_DISEASE_NAME_CHARS} characters"
        )));
    }

    let engine = ctx.core.engine();
    if !engine.is_loaded(Bundle::TreatmentRecommendation) {
        return Err(InferenceError::ModelNotLoaded(Bundle::TreatmentRecommendation).into());
    }

    let conn = ctx.core.open_db()?;
    if let Some(record) = db::find_treatment_info(&conn, disease_name)? {
        tracing::debug!(disease = disease_name, "Treatment info served from cache");
        return Ok((StatusCode::OK, Json(TreatmentInfoResponse { record, note: None })));
    }

    let info = match engine.get_treatment_info(disease_name)? {
        TreatmentLookup::Exact(info) | TreatmentLookup::Partial(info) => info,
        TreatmentLookup::NotFound {
            disease_name,
            suggestion,
            available_diseases,
        } => {
            return Err(ApiError::NotFound {
                message: format!("No treatment information found for '{disease_name}'"),
                details: Some(json!({
                    "disease_name": disease_name,
                    "suggestion": suggestion,
                    "available_diseases": available_diseases,
                })),
            });
        }
    };

    let record = db::insert_treatment_info(
        &conn,
        &NewTreatmentInfo {
            disease_name,
            treatment_options: &info.treatment_options,
            medications: &info.medications,
            lifestyle_changes: &info.lifestyle_changes,
            precautions: &info.precautions,
        },
    )?;
    tracing::info!(
        disease = disease_name,
        matched = %info.disease_name,
        partial = info.is_partial(),
        "Treatment info cached"
    );

    Ok((
        StatusCode::CREATED,
        Json(TreatmentInfoResponse {
            record,
            note: info.note,
        }),
    ))
}

/// `GET /api/ml-models/treatment-list`
pub async fn list(
    State(ctx): State<ApiContext>,
) -> Result<Json<Vec<TreatmentInfoRecord>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(db::list_treatment_info(&conn)?))
}
