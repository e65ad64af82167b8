use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::{MAX_PIXEL_VALUE, MNIST_DATA_SHAPE};
use crate::data::{ClassificationOutput, UnlabeledDataPoint};
use crate::error::NeuralError;
use crate::net::SavedNetworkRunner;

const MISSING_BODY: &str = "Required request body is missing";

/// JSON input format: `{"pixels": [[0, 0, ...], ...]}`, 28 rows of 28
/// values in `0..=255`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DigitClassificationInput {
    #[serde(default)]
    pub pixels: Option<Vec<Vec<f64>>>,
}

impl DigitClassificationInput {
    pub fn new(pixels: Vec<Vec<f64>>) -> Self {
        Self {
            pixels: Some(pixels),
        }
    }

    /// An all-black image.
    pub fn blank() -> Self {
        Self::new(vec![vec![0.0; MNIST_DATA_SHAPE.length]; MNIST_DATA_SHAPE.height])
    }

    /// Validates the pixel grid and scales it into a single-channel data point.
    pub fn to_data_point(&self) -> Result<UnlabeledDataPoint, NeuralError> {
        let pixels = self
            .pixels
            .as_ref()
            .ok_or_else(|| NeuralError::InvalidInput("Null input".into()))?;
        if pixels.len() != MNIST_DATA_SHAPE.height {
            return Err(NeuralError::InvalidInput(format!(
                "Height must be {} but got {}",
                MNIST_DATA_SHAPE.height,
                pixels.len()
            )));
        }

        let mut as_3d: Vec<Vec<Vec<f64>>> = Vec::with_capacity(MNIST_DATA_SHAPE.height);
        for (h, row) in pixels.iter().enumerate() {
            if row.len() != MNIST_DATA_SHAPE.length {
                return Err(NeuralError::InvalidInput(format!(
                    "Invalid length at row {} should be {} but got {}",
                    h,
                    MNIST_DATA_SHAPE.length,
                    row.len()
                )));
            }
            // Add the depth dimension
            as_3d.push(row.iter().map(|&p| vec![p / MAX_PIXEL_VALUE]).collect());
        }
        Ok(UnlabeledDataPoint::new(as_3d, MNIST_DATA_SHAPE))
    }
}

/// Accepts a pixel map, passes it through the configured network and returns
/// the network's prediction.
#[derive(Clone)]
pub struct DigitClassifier {
    network_id: String,
    runner: Arc<SavedNetworkRunner>,
}

impl DigitClassifier {
    pub fn new(network_id: impl Into<String>, runner: Arc<SavedNetworkRunner>) -> Self {
        Self {
            network_id: network_id.into(),
            runner,
        }
    }

    pub fn network_id(&self) -> &str {
        &self.network_id
    }

    /// # Errors
    /// `InvalidInput` for a missing body, a missing pixel array or a grid
    /// that is not 28x28, each with its own message; anything the runner
    /// reports otherwise.
    pub fn classify_digit(
        &self,
        input: Option<&DigitClassificationInput>,
    ) -> Result<ClassificationOutput, NeuralError> {
        let point = input
            .ok_or_else(|| NeuralError::InvalidInput(MISSING_BODY.into()))?
            .to_data_point()?;
        self.runner.run_classification(&self.network_id, &point)
    }

    /// Runs a blank image through the network so the first real request does
    /// not pay for loading it. A network that has not been trained yet is not
    /// an error here.
    pub fn warm_up(&self) -> Result<(), NeuralError> {
        info!("Running warmup point through network '{}'", self.network_id);
        match self.classify_digit(Some(&DigitClassificationInput::blank())) {
            Ok(_) => Ok(()),
            Err(NeuralError::ModelNotFound(id)) => {
                warn!("Skipping warmup, no network found for id '{}'", id);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
