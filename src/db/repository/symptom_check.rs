use rusqlite::{params, Connection, Row};
use serde::Serialize;

use crate::db::{now_timestamp, DatabaseError};

/// A persisted symptom-checker run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymptomCheckRecord {
    pub id: i64,
    pub symptoms: String,
    /// Ranked conditions, one `"<name> (<pct>%)"` per line.
    pub possible_conditions: String,
    pub confidence_score: f64,
    pub timestamp: String,
    pub session_id: Option<String>,
}

pub fn insert_symptom_check(
    conn: &Connection,
    symptoms: &str,
    possible_conditions: &[String],
    confidence_score: f64,
    session_id: Option<&str>,
) -> Result<SymptomCheckRecord, DatabaseError> {
    let timestamp = now_timestamp();
    let possible_conditions = possible_conditions.join("\n");

    conn.execute(
        "INSERT INTO symptom_checks (symptoms, possible_conditions, confidence_score, timestamp, session_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![symptoms, possible_conditions, confidence_score, timestamp, session_id],
    )?;

    Ok(SymptomCheckRecord {
        id: conn.last_insert_rowid(),
        symptoms: symptoms.to_string(),
        possible_conditions,
        confidence_score,
        timestamp,
        session_id: session_id.map(str::to_string),
    })
}

/// Most recent checks first.
pub fn list_symptom_checks(
    conn: &Connection,
    limit: usize,
) -> Result<Vec<SymptomCheckRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, symptoms, possible_conditions, confidence_score, timestamp, session_id
         FROM symptom_checks ORDER BY timestamp DESC, id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit as i64], row_to_symptom_check)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

fn row_to_symptom_check(row: &Row<'_>) -> rusqlite::Result<SymptomCheckRecord> {
    Ok(SymptomCheckRecord {
        id: row.get(0)?,
        symptoms: row.get(1)?,
        possible_conditions: row.get(2)?,
        confidence_score: row.get(3)?,
        timestamp: row.get(4)?,
        session_id: row.get(5)?,
    })
}
