use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Bijective mapping between class indices and disease names, fixed at
/// training time. Index `i` decodes to `classes[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new(classes: Vec<String>) -> Result<Self, String> {
        let encoder = Self { classes };
        encoder.validate()?;
        Ok(encoder)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Class index to disease name.
    pub fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    /// Disease name to class index (exact, case-sensitive).
    pub fn encode(&self, name: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == name)
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.classes.is_empty() {
            return Err("label encoder has no classes".into());
        }
        let mut seen = HashSet::with_capacity(self.classes.len());
        for class in &self.classes {
            if !seen.insert(class.as_str()) {
                return Err(format!("label encoder class '{class}' is duplicated"));
            }
        }
        Ok(())
    }
}
