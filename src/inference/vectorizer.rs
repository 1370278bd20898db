//! TF-IDF text vectorizer over a fixed, trained vocabulary.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Tokens are runs of two or more word characters.
static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w\w+\b").unwrap());

/// Row normalization applied after weighting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    #[default]
    L2,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    #[serde(default = "default_lowercase")]
    lowercase: bool,
    #[serde(default)]
    norm: Norm,
    #[serde(default)]
    sublinear_tf: bool,
}

fn default_lowercase() -> bool {
    true
}

impl TfidfVectorizer {
    /// Build a vectorizer with the default options (lowercase, L2 norm,
    /// raw term frequency).
    pub fn new(vocabulary: HashMap<String, usize>, idf: Vec<f64>) -> Result<Self, String> {
        let vectorizer = Self {
            vocabulary,
            idf,
            lowercase: true,
            norm: Norm::L2,
            sublinear_tf: false,
        };
        vectorizer.validate()?;
        Ok(vectorizer)
    }

    pub fn with_norm(mut self, norm: Norm) -> Self {
        self.norm = norm;
        self
    }

    pub fn with_sublinear_tf(mut self, sublinear_tf: bool) -> Self {
        self.sublinear_tf = sublinear_tf;
        self
    }

    /// Length of every produced vector.
    pub fn n_features(&self) -> usize {
        self.idf.len()
    }

    /// Split text into the tokens the vocabulary was trained on.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let text = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };
        TOKEN_PATTERN
            .find_iter(&text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Dense TF-IDF vector. Out-of-vocabulary tokens contribute nothing,
    /// so text with no known terms yields the zero vector.
    pub fn transform(&self, text: &str) -> Vec<f64> {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for token in self.tokenize(text) {
            if let Some(&index) = self.vocabulary.get(&token) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        let mut vector = vec![0.0; self.idf.len()];
        for (index, tf) in counts {
            let tf = if self.sublinear_tf { 1.0 + tf.ln() } else { tf };
            vector[index] = tf * self.idf[index];
        }

        if self.norm == Norm::L2 {
            let length = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
            if length > 0.0 {
                vector.iter_mut().for_each(|v| *v /= length);
            }
        }
        vector
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.vocabulary.len() != self.idf.len() {
            return Err(format!(
                "vocabulary has {} terms but idf has {} weights",
                self.vocabulary.len(),
                self.idf.len()
            ));
        }
        if let Some((term, index)) = self.vocabulary.iter().find(|(_, index)| **index >= self.idf.len()) {
            return Err(format!("vocabulary term '{term}' has out-of-range index {index}"));
        }
        if self.idf.iter().any(|w| !w.is_finite()) {
            return Err("idf contains non-finite weights".into());
        }
        Ok(())
    }
}
