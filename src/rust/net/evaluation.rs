use std::fmt;

use ndarray::{Array2, ArrayView1};

use crate::data::highest_probability_label_index;
use crate::error::NeuralError;

/// Classification metrics accumulated over one or more batches.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// [actual][predicted]
    confusion: Array2<usize>,
}

impl Evaluation {
    pub fn new(num_labels: usize) -> Self {
        Self {
            confusion: Array2::zeros((num_labels, num_labels)),
        }
    }

    /// Adds one batch of one-hot labels and predicted probabilities.
    pub fn record(&mut self, labels: &Array2<f64>, output: &Array2<f64>) -> Result<(), NeuralError> {
        let num_labels = self.confusion.nrows();
        if labels.dim() != output.dim() || labels.ncols() != num_labels {
            return Err(NeuralError::ShapeMismatch(format!(
                "Cannot evaluate {:?} predictions against {:?} labels for {} classes",
                output.dim(),
                labels.dim(),
                num_labels
            )));
        }
        for (label_row, output_row) in labels.rows().into_iter().zip(output.rows()) {
            if let (Some(actual), Some(predicted)) = (arg_max(label_row), arg_max(output_row)) {
                self.confusion[[actual, predicted]] += 1;
            }
        }
        Ok(())
    }

    pub fn confusion_matrix(&self) -> &Array2<usize> {
        &self.confusion
    }

    pub fn total(&self) -> usize {
        self.confusion.sum()
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.confusion.diag().sum(), self.total())
    }

    /// Macro-averaged over classes that were predicted at least once.
    pub fn precision(&self) -> f64 {
        let per_class: Vec<f64> = (0..self.confusion.nrows())
            .filter_map(|c| {
                let predicted = self.confusion.column(c).sum();
                (predicted > 0).then(|| ratio(self.confusion[[c, c]], predicted))
            })
            .collect();
        mean(&per_class)
    }

    /// Macro-averaged over classes present in the labels.
    pub fn recall(&self) -> f64 {
        let per_class: Vec<f64> = (0..self.confusion.nrows())
            .filter_map(|c| {
                let actual = self.confusion.row(c).sum();
                (actual > 0).then(|| ratio(self.confusion[[c, c]], actual))
            })
            .collect();
        mean(&per_class)
    }

    pub fn f1(&self) -> f64 {
        let (precision, recall) = (self.precision(), self.recall());
        if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        }
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "examples={} accuracy={:.4} precision={:.4} recall={:.4} f1={:.4}",
            self.total(),
            self.accuracy(),
            self.precision(),
            self.recall(),
            self.f1()
        )
    }
}

fn arg_max(row: ArrayView1<f64>) -> Option<usize> {
    match row.as_slice() {
        Some(values) => highest_probability_label_index(values),
        None => highest_probability_label_index(&row.to_vec()),
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
