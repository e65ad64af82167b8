use serde::{Deserialize, Serialize};

use super::utils::highest_probability_label_index;
use crate::error::NeuralError;

/// Network output to a classification problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationOutput {
    label_probabilities: Vec<f64>,
    label_index: usize,
}

impl ClassificationOutput {
    /// Picks the label with the highest probability, lowest index on ties.
    pub fn from_probabilities(label_probabilities: Vec<f64>) -> Result<Self, NeuralError> {
        let label_index = highest_probability_label_index(&label_probabilities).ok_or_else(|| {
            NeuralError::ShapeMismatch("Network produced no label probabilities".to_string())
        })?;
        Ok(Self {
            label_probabilities,
            label_index,
        })
    }

    pub fn label_probabilities(&self) -> &[f64] {
        &self.label_probabilities
    }

    pub fn label_index(&self) -> usize {
        self.label_index
    }

    /// Probability assigned to the predicted label, `None` if the index is
    /// out of range (possible for deserialized outputs).
    pub fn confidence(&self) -> Option<f64> {
        self.label_probabilities.get(self.label_index).copied()
    }
}
