use std::fs;
use std::path::Path;

use log::info;

use super::dataset::{LabeledDataSet, LabeledDataSetCollection};
use super::point::LabeledDataPoint;
use super::utils::to_label_probability_array;
use crate::error::NeuralError;

/// How a `label,pixel,pixel,...` CSV row maps onto a single-channel image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CsvLayout {
    pub height: usize,
    pub width: usize,
    pub num_labels: usize,
    pub max_value: f64,
    pub batch_size: usize,
}

impl CsvLayout {
    /// Single CSV row to a data point with a one-hot label.
    ///
    /// Pixels are stored row-major and scaled into `[0, 1]` by `max_value`.
    pub fn row_to_data_point(&self, line: &str) -> Result<LabeledDataPoint, NeuralError> {
        let parts: Vec<&str> = line.trim().split(',').collect();
        let expected = 1 + self.height * self.width;
        if parts.len() != expected {
            return Err(NeuralError::InvalidInput(format!(
                "Expected {} columns but got {}",
                expected,
                parts.len()
            )));
        }

        let label: usize = parts[0]
            .trim()
            .parse()
            .map_err(|e| NeuralError::InvalidInput(format!("Invalid label '{}': {}", parts[0], e)))?;
        if label >= self.num_labels {
            return Err(NeuralError::InvalidInput(format!(
                "Label {} out of range for {} labels",
                label, self.num_labels
            )));
        }

        let mut input = vec![vec![vec![0.0; 1]; self.width]; self.height];
        for (h, row) in input.iter_mut().enumerate() {
            for (w, cell) in row.iter_mut().enumerate() {
                let raw = parts[1 + h * self.width + w].trim();
                let value: f64 = raw
                    .parse()
                    .map_err(|e| NeuralError::InvalidInput(format!("Invalid pixel '{}': {}", raw, e)))?;
                cell[0] = value / self.max_value;
            }
        }

        Ok(LabeledDataPoint::new(
            input,
            to_label_probability_array(label, self.num_labels),
        ))
    }

    /// Parses CSV text (header row skipped) into batches of `batch_size` points.
    pub fn parse(&self, contents: &str) -> Result<LabeledDataSetCollection, NeuralError> {
        let points = contents
            .lines()
            .skip(1)
            .filter(|line| !line.trim().is_empty())
            .map(|line| self.row_to_data_point(line))
            .collect::<Result<Vec<_>, _>>()?;

        let data_sets = points
            .chunks(self.batch_size.max(1))
            .map(LabeledDataSet::new)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LabeledDataSetCollection::new(data_sets))
    }

    /// Read, parse and batch all CSV lines of a file.
    pub fn read(&self, path: &Path) -> Result<LabeledDataSetCollection, NeuralError> {
        info!("Loading csv data from {:?}", path);
        let contents = fs::read_to_string(path)?;
        let collection = self.parse(&contents)?;
        info!("Loaded {} batches from {:?}", collection.len(), path);
        Ok(collection)
    }
}
