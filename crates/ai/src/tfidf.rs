//! TF-IDF features followed by a linear (logistic regression) decision.
//!
//! The artifact is the JSON export of a trained text pipeline:
//!
//! ```json
//! {
//!   "ngram_range": [1, 2],
//!   "lowercase": true,
//!   "vocabulary": {"good": 0, "very good": 1},
//!   "idf": [1.2, 2.3],
//!   "classes": [0, 1],
//!   "coef": [[0.8, 1.1]],
//!   "intercept": [-0.1]
//! }
//! ```
//!
//! Two classes use a single coefficient row whose positive side is
//! `classes[1]`; more classes use one row per class.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::classifier::SatisfactionClassifier;
use crate::error::ClassifierError;

#[derive(Debug, Deserialize)]
struct Artifact {
    ngram_range: (usize, usize),
    #[serde(default = "default_lowercase")]
    lowercase: bool,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    classes: Vec<i64>,
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
}

fn default_lowercase() -> bool {
    true
}

#[derive(Debug, Clone)]
pub struct TfidfLogisticModel {
    min_n: usize,
    max_n: usize,
    lowercase: bool,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    classes: Vec<i64>,
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
}

impl TfidfLogisticModel {
    pub fn from_path(path: &Path) -> Result<Self, ClassifierError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ClassifierError::Artifact(e.to_string()))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ClassifierError> {
        let artifact: Artifact = serde_json::from_str(raw).map_err(|e| ClassifierError::Artifact(e.to_string()))?;
        Self::try_from(artifact)
    }

    pub fn classes(&self) -> &[i64] {
        &self.classes
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// L2-normalized TF-IDF vector, sparse as `(feature, weight)`.
    fn features(&self, text: &str) -> Vec<(usize, f64)> {
        let text = if self.lowercase { text.to_lowercase() } else { text.to_string() };
        let tokens = tokenize(&text);

        let mut counts: HashMap<usize, f64> = HashMap::new();
        for n in self.min_n..=self.max_n {
            if n > tokens.len() {
                break;
            }
            for window in tokens.windows(n) {
                let gram = window.join(" ");
                if let Some(&index) = self.vocabulary.get(&gram) {
                    *counts.entry(index).or_insert(0.0) += 1.0;
                }
            }
        }

        let mut weighted: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(index, tf)| (index, tf * self.idf[index]))
            .collect();
        let norm = weighted.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in &mut weighted {
                *w /= norm;
            }
        }
        weighted
    }

    fn decision(&self, features: &[(usize, f64)]) -> Vec<f64> {
        self.coef
            .iter()
            .zip(&self.intercept)
            .map(|(row, b)| features.iter().map(|&(i, w)| row[i] * w).sum::<f64>() + b)
            .collect()
    }
}

impl SatisfactionClassifier for TfidfLogisticModel {
    /// Text with no known terms, blank text included, scores the intercepts
    /// alone.
    fn predict(&self, text: &str) -> Result<i64, ClassifierError> {
        let scores = self.decision(&self.features(text));

        let label = if self.classes.len() == 2 {
            if scores[0] > 0.0 { self.classes[1] } else { self.classes[0] }
        } else {
            // First maximum wins on ties.
            let mut best = 0;
            for (i, score) in scores.iter().enumerate() {
                if *score > scores[best] {
                    best = i;
                }
            }
            self.classes[best]
        };
        Ok(label)
    }
}

impl TryFrom<Artifact> for TfidfLogisticModel {
    type Error = ClassifierError;

    fn try_from(a: Artifact) -> Result<Self, Self::Error> {
        let bad = |msg: String| Err(ClassifierError::Inconsistent(msg));

        let (min_n, max_n) = a.ngram_range;
        if min_n == 0 || min_n > max_n {
            return bad(format!("ngram_range ({min_n}, {max_n}) is not a valid range"));
        }
        if a.classes.len() < 2 {
            return bad(format!("need at least 2 classes, got {}", a.classes.len()));
        }

        let n_features = a.idf.len();
        if let Some((term, index)) = a.vocabulary.iter().find(|(_, i)| **i >= n_features) {
            return bad(format!("term {term:?} maps to feature {index}, but idf has {n_features} entries"));
        }

        let rows = if a.classes.len() == 2 { 1 } else { a.classes.len() };
        if a.coef.len() != rows || a.intercept.len() != rows {
            return bad(format!(
                "expected {rows} coefficient rows and intercepts, got {} and {}",
                a.coef.len(),
                a.intercept.len()
            ));
        }
        if let Some(row) = a.coef.iter().find(|row| row.len() != n_features) {
            return bad(format!("coefficient row has {} entries, expected {n_features}", row.len()));
        }

        Ok(Self {
            min_n,
            max_n,
            lowercase: a.lowercase,
            vocabulary: a.vocabulary,
            idf: a.idf,
            classes: a.classes,
            coef: a.coef,
            intercept: a.intercept,
        })
    }
}

/// Word tokens of two or more word characters.
fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.chars().count() >= 2)
        .collect()
}
