use rusqlite::{params, Connection, Row};
use serde::Serialize;
use serde_json::Value;

use crate::db::{now_timestamp, DatabaseError};

/// A persisted disease prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiseasePredictionRecord {
    pub id: i64,
    pub health_data: Value,
    pub predicted_disease: String,
    pub risk_score: f64,
    pub confidence_level: String,
    pub timestamp: String,
    pub session_id: Option<String>,
}

pub struct NewDiseasePrediction<'a> {
    pub health_data: &'a Value,
    pub predicted_disease: &'a str,
    pub risk_score: f64,
    pub confidence_level: &'a str,
    pub session_id: Option<&'a str>,
}

pub fn insert_disease_prediction(
    conn: &Connection,
    prediction: &NewDiseasePrediction<'_>,
) -> Result<DiseasePredictionRecord, DatabaseError> {
    let timestamp = now_timestamp();
    let health_json = serde_json::to_string(prediction.health_data)?;

    conn.execute(
        "INSERT INTO disease_predictions (health_data, predicted_disease, risk_score, confidence_level, timestamp, session_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            health_json,
            prediction.predicted_disease,
            prediction.risk_score,
            prediction.confidence_level,
            timestamp,
            prediction.session_id,
        ],
    )?;

    Ok(DiseasePredictionRecord {
        id: conn.last_insert_rowid(),
        health_data: prediction.health_data.clone(),
        predicted_disease: prediction.predicted_disease.to_string(),
        risk_score: prediction.risk_score,
        confidence_level: prediction.confidence_level.to_string(),
        timestamp,
        session_id: prediction.session_id.map(str::to_string),
    })
}

/// Most recent predictions first.
pub fn list_disease_predictions(
    conn: &Connection,
    limit: usize,
) -> Result<Vec<DiseasePredictionRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, health_data, predicted_disease, risk_score, confidence_level, timestamp, session_id
         FROM disease_predictions ORDER BY timestamp DESC, id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit as i64], read_row)?;

    let mut predictions = Vec::new();
    for row in rows {
        let (raw, record) = row?;
        predictions.push(DiseasePredictionRecord {
            health_data: serde_json::from_str(&raw)?,
            ..record
        });
    }
    Ok(predictions)
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<(String, DiseasePredictionRecord)> {
    Ok((
        row.get(1)?,
        DiseasePredictionRecord {
            id: row.get(0)?,
            health_data: Value::Null,
            predicted_disease: row.get(2)?,
            risk_score: row.get(3)?,
            confidence_level: row.get(4)?,
            timestamp: row.get(5)?,
            session_id: row.get(6)?,
        },
    ))
}
