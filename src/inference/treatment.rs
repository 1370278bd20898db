//! Treatment knowledge base keyed by disease name.

use serde::{Deserialize, Serialize};

/// One row of the treatment table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentRecord {
    pub disease: String,
    pub treatments: Vec<String>,
    pub medications: Vec<String>,
    pub lifestyle_changes: String,
    pub precautions: String,
}

/// How a lookup key matched a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Partial,
}

/// Ordered treatment rows. Disease names are expected to be unique but
/// this is not enforced; lookups return the first match in table order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreatmentTable {
    rows: Vec<TreatmentRecord>,
}

impl TreatmentTable {
    pub fn new(rows: Vec<TreatmentRecord>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[TreatmentRecord] {
        &self.rows
    }

    /// Every disease name, in table order.
    pub fn disease_names(&self) -> Vec<String> {
        self.rows.iter().map(|r| r.disease.clone()).collect()
    }

    /// Case-insensitive exact match first, then the first row whose name
    /// contains the query. Partial hits are not ranked by match quality.
    pub fn find(&self, disease_name: &str) -> Option<(&TreatmentRecord, MatchKind)> {
        let needle = disease_name.to_lowercase();

        if let Some(row) = self
            .rows
            .iter()
            .find(|r| r.disease.to_lowercase() == needle)
        {
            return Some((row, MatchKind::Exact));
        }

        self.rows
            .iter()
            .find(|r| r.disease.to_lowercase().contains(&needle))
            .map(|row| (row, MatchKind::Partial))
    }
}
