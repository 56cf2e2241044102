// src/classifier.rs - Classifier boundary: window tensor in, per-label scores out
use crate::buffer::SequenceWindow;
use crate::error::{ClassifierError, ClassifierResult};
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Fingerspelling alphabet, in model output order.
pub static ALPHABET: Lazy<Vec<String>> =
    Lazy::new(|| ('A'..='Z').map(|c| c.to_string()).collect());

/// Opaque trained model. Implementations must be callable from a blocking
/// worker thread.
pub trait SignClassifier: Send + Sync {
    /// Score every label for a `(sequence_length, features_per_frame)` window.
    fn classify(&self, window: &SequenceWindow) -> ClassifierResult<Vec<f32>>;
}

/// Index of the highest finite score.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .filter(|(_, s)| s.is_finite())
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| i)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    pub fn alphabet() -> Self {
        Self::new(ALPHABET.clone())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Arg-max label for a score vector; `None` if it falls outside the table.
    pub fn resolve(&self, scores: &[f32]) -> Option<&str> {
        argmax(scores).and_then(|index| self.get(index))
    }
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::alphabet()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignTemplate {
    pub label: String,
    pub frame: Vec<f32>,
}

/// Nearest-template classifier: scores each template by the negative mean
/// absolute distance to the window's mean frame. Useful for replaying
/// recorded sessions without a trained model.
#[derive(Debug, Clone)]
pub struct TemplateClassifier {
    templates: Vec<SignTemplate>,
    features_per_frame: usize,
}

impl TemplateClassifier {
    pub fn new(templates: Vec<SignTemplate>, features_per_frame: usize) -> ClassifierResult<Self> {
        if templates.is_empty() {
            return Err(ClassifierError::Unavailable("no templates loaded".to_string()));
        }
        if let Some(bad) = templates.iter().find(|t| t.frame.len() != features_per_frame) {
            return Err(ClassifierError::ShapeMismatch {
                expected: features_per_frame,
                actual: bad.frame.len(),
            });
        }
        Ok(Self {
            templates,
            features_per_frame,
        })
    }

    pub fn load(path: impl AsRef<Path>, features_per_frame: usize) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read templates from {}", path.display()))?;
        let templates: Vec<SignTemplate> = serde_json::from_str(&text)
            .with_context(|| format!("Invalid template file {}", path.display()))?;
        Ok(Self::new(templates, features_per_frame)?)
    }

    /// Labels in score order.
    pub fn labels(&self) -> LabelTable {
        LabelTable::new(self.templates.iter().map(|t| t.label.clone()).collect())
    }
}

impl SignClassifier for TemplateClassifier {
    fn classify(&self, window: &SequenceWindow) -> ClassifierResult<Vec<f32>> {
        let (frames, features) = window.shape();
        if features != self.features_per_frame || frames == 0 {
            return Err(ClassifierError::ShapeMismatch {
                expected: self.features_per_frame,
                actual: features,
            });
        }

        let mut mean = vec![0.0f32; features];
        for frame in window.frames() {
            for (acc, value) in mean.iter_mut().zip(frame) {
                *acc += value;
            }
        }
        mean.iter_mut().for_each(|v| *v /= frames as f32);

        Ok(self
            .templates
            .iter()
            .map(|template| {
                let distance: f32 = template
                    .frame
                    .iter()
                    .zip(&mean)
                    .map(|(a, b)| (a - b).abs())
                    .sum();
                -distance / features as f32
            })
            .collect())
    }
}
