use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::db::{now_timestamp, DatabaseError};

/// A cached treatment lookup, keyed by the disease name it was requested under.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreatmentInfoRecord {
    pub id: i64,
    pub disease_name: String,
    pub treatment_options: Vec<String>,
    pub medications: Vec<String>,
    pub lifestyle_changes: String,
    pub precautions: String,
    pub timestamp: String,
}

pub struct NewTreatmentInfo<'a> {
    pub disease_name: &'a str,
    pub treatment_options: &'a [String],
    pub medications: &'a [String],
    pub lifestyle_changes: &'a str,
    pub precautions: &'a str,
}

const COLUMNS: &str =
    "id, disease_name, treatment_options, medications, lifestyle_changes, precautions, timestamp";

pub fn insert_treatment_info(
    conn: &Connection,
    info: &NewTreatmentInfo<'_>,
) -> Result<TreatmentInfoRecord, DatabaseError> {
    let timestamp = now_timestamp();

    conn.execute(
        "INSERT INTO treatment_info (disease_name, treatment_options, medications, lifestyle_changes, precautions, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            info.disease_name,
            serde_json::to_string(info.treatment_options)?,
            serde_json::to_string(info.medications)?,
            info.lifestyle_changes,
            info.precautions,
            timestamp,
        ],
    )?;

    Ok(TreatmentInfoRecord {
        id: conn.last_insert_rowid(),
        disease_name: info.disease_name.to_string(),
        treatment_options: info.treatment_options.to_vec(),
        medications: info.medications.to_vec(),
        lifestyle_changes: info.lifestyle_changes.to_string(),
        precautions: info.precautions.to_string(),
        timestamp,
    })
}

/// Case-insensitive lookup. Returns the oldest row when several match.
pub fn find_treatment_info(
    conn: &Connection,
    disease_name: &str,
) -> Result<Option<TreatmentInfoRecord>, DatabaseError> {
    let raw = conn
        .query_row(
            &format!(
                "SELECT {COLUMNS} FROM treatment_info
                 WHERE lower(disease_name) = lower(?1) ORDER BY id LIMIT 1"
            ),
            params![disease_name],
            read_row,
        )
        .optional()?;
    raw.map(decode).transpose()
}

/// Every cached row, ordered by disease name.
pub fn list_treatment_info(conn: &Connection) -> Result<Vec<TreatmentInfoRecord>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM treatment_info ORDER BY disease_name COLLATE NOCASE, id"
    ))?;
    let rows = stmt.query_map([], read_row)?;
    rows.map(|row| decode(row?)).collect()
}

type RawRow = (i64, String, String, String, String, String, String);

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn decode(raw: RawRow) -> Result<TreatmentInfoRecord, DatabaseError> {
    let (id, disease_name, treatment_options, medications, lifestyle_changes, precautions, timestamp) =
        raw;
    Ok(TreatmentInfoRecord {
        id,
        disease_name,
        treatment_options: serde_json::from_str(&treatment_options)?,
        medications: serde_json::from_str(&medications)?,
        lifestyle_changes,
        precautions,
        timestamp,
    })
}
