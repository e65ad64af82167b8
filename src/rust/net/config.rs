use serde::{Deserialize, Serialize};

use super::spec::CommonNetSpecification;
use crate::data::DataShape;
use crate::error::NeuralError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Identity,
    Relu,
    Sigmoid,
    Tanh,
    /// Only valid on the output layer, paired with multi-class cross entropy.
    Softmax,
}

/// A fully connected layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayerConfiguration {
    pub name: String,
    pub n_out: usize,
    pub activation: Activation,
    /// Probability of zeroing each of this layer's inputs while training.
    pub dropout: f64,
}

impl DenseLayerConfiguration {
    pub fn new(name: impl Into<String>, n_out: usize, activation: Activation) -> Self {
        Self {
            name: name.into(),
            n_out,
            activation,
            dropout: 0.0,
        }
    }

    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }
}

/// Topology plus optimiser settings for a trainable network.
///
/// The last layer is the output layer; it must use softmax and produce one
/// value per label of `input_shape`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfiguration {
    pub seed: u64,
    pub learning_rate: f64,
    pub input_shape: DataShape,
    pub layers: Vec<DenseLayerConfiguration>,
}

impl NetworkConfiguration {
    pub fn new(input_shape: DataShape) -> Self {
        Self {
            seed: CommonNetSpecification::DEFAULT_SEED,
            learning_rate: CommonNetSpecification::DEFAULT_LEARNING_RATE,
            input_shape,
            layers: Vec::new(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn add_layer(mut self, layer: DenseLayerConfiguration) -> Self {
        self.layers.push(layer);
        self
    }

    /// Number of inputs feeding each layer, in order.
    pub fn layer_inputs(&self) -> Result<Vec<usize>, NeuralError> {
        let input_size = self.input_size()?;
        Ok(std::iter::once(input_size)
            .chain(self.layers.iter().map(|l| l.n_out))
            .take(self.layers.len())
            .collect())
    }

    fn input_size(&self) -> Result<usize, NeuralError> {
        let shape = self.input_shape;
        shape.input_size().ok_or_else(|| {
            NeuralError::InvalidConfiguration(format!(
                "Input shape {}x{}x{} is too large",
                shape.depth, shape.height, shape.length
            ))
        })
    }

    pub fn validate(&self) -> Result<(), NeuralError> {
        if self.input_shape.num_dimensions != 3 {
            return Err(NeuralError::UnsupportedShape {
                num_dimensions: self.input_shape.num_dimensions,
            });
        }
        if self.input_size()? == 0 {
            return Err(NeuralError::InvalidConfiguration(
                "Input shape has no values".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(NeuralError::InvalidConfiguration(format!(
                "Learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        let output = self.layers.last().ok_or_else(|| {
            NeuralError::InvalidConfiguration("Network needs at least one layer".to_string())
        })?;
        if output.activation != Activation::Softmax {
            return Err(NeuralError::InvalidConfiguration(format!(
                "Output layer '{}' must use softmax",
                output.name
            )));
        }
        if output.n_out != self.input_shape.num_labels {
            return Err(NeuralError::InvalidConfiguration(format!(
                "Output layer '{}' has {} outputs but data has {} labels",
                output.name, output.n_out, self.input_shape.num_labels
            )));
        }
        for (i, (layer, n_in)) in self.layers.iter().zip(self.layer_inputs()?).enumerate() {
            if n_in.checked_mul(layer.n_out).is_none() {
                return Err(NeuralError::InvalidConfiguration(format!(
                    "Layer '{}' is too large ({} x {})",
                    layer.name, n_in, layer.n_out
                )));
            }
            if layer.n_out == 0 {
                return Err(NeuralError::InvalidConfiguration(format!(
                    "Layer '{}' has no outputs",
                    layer.name
                )));
            }
            if !(0.0..1.0).contains(&layer.dropout) {
                return Err(NeuralError::InvalidConfiguration(format!(
                    "Layer '{}' dropout must be in [0, 1), got {}",
                    layer.name, layer.dropout
                )));
            }
            if layer.activation == Activation::Softmax && i + 1 != self.layers.len() {
                return Err(NeuralError::InvalidConfiguration(format!(
                    "Softmax is only supported on the output layer, not '{}'",
                    layer.name
                )));
            }
        }
        Ok(())
    }
}

/// Produces a trainable topology from shared hyper-parameters and the data geometry.
pub trait NetworkConfigurationBuilder {
    fn build(&self, spec: &CommonNetSpecification, data_shape: &DataShape) -> NetworkConfiguration;
}

/// One ReLU hidden layer followed by a softmax output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedForward {
    pub hidden_units: usize,
}

impl FeedForward {
    pub fn new(hidden_units: usize) -> Self {
        Self { hidden_units }
    }
}

impl NetworkConfigurationBuilder for FeedForward {
    fn build(&self, spec: &CommonNetSpecification, data_shape: &DataShape) -> NetworkConfiguration {
        NetworkConfiguration::new(*data_shape)
            .with_seed(spec.seed)
            .with_learning_rate(spec.learning_rate)
            .add_layer(
                DenseLayerConfiguration::new(
                    "hidden",
                    self.hidden_units * spec.size_multiplier.max(1),
                    Activation::Relu,
                )
                .with_dropout(spec.dropout),
            )
            .add_layer(
                DenseLayerConfiguration::new("output", data_shape.num_labels, Activation::Softmax)
                    .with_dropout(spec.dropout),
            )
    }
}
