use std::fmt::{self, Write as _};
use std::sync::{Mutex, MutexGuard, PoisonError};

use burn::backend::{Autodiff, NdArray};
use burn::module::{AutodiffModule, Module, Param};
use burn::nn::loss::CrossEntropyLossConfig;
use burn::nn::{Dropout, DropoutConfig};
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::record::{BinBytesRecorder, FullPrecisionSettings, Recorder};
use burn::tensor::activation::{relu, sigmoid, softmax, tanh};
use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Int, Tensor, TensorData};
use ndarray::{Array2, Array4};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use super::config::{Activation, NetworkConfiguration};
use super::evaluation::Evaluation;
use super::trainer::TrainableModel;
use crate::data::{highest_probability_label_index, DataSet, DataSetSource, DataShape};
use crate::error::NeuralError;

pub(crate) type InferenceBackend = NdArray<f32>;
pub(crate) type TrainingBackend = Autodiff<InferenceBackend>;

type LayerStack<B> = Vec<DenseLayer<B>>;
type NetworkOptimizer = OptimizerAdaptor<Adam, LayerStack<TrainingBackend>, TrainingBackend>;

/// A fully connected layer, `input x weight + bias`.
#[derive(Module, Debug)]
pub(crate) struct DenseLayer<B: Backend> {
    /// [n_in][n_out]
    weight: Param<Tensor<B, 2>>,
    bias: Param<Tensor<B, 1>>,
}

impl<B: Backend> DenseLayer<B> {
    /// Xavier initialisation: N(0, 2 / (n_in + n_out)), zero bias.
    fn xavier(
        n_in: usize,
        n_out: usize,
        rng: &mut StdRng,
        device: &B::Device,
    ) -> Result<Self, NeuralError> {
        let std_dev = (2.0 / (n_in + n_out) as f64).sqrt();
        let normal = Normal::new(0.0, std_dev)
            .map_err(|e| NeuralError::InvalidConfiguration(e.to_string()))?;
        let weights: Vec<f32> = (0..n_in * n_out).map(|_| normal.sample(rng) as f32).collect();
        Ok(Self {
            weight: Param::from_tensor(Tensor::from_data(
                TensorData::new(weights, [n_in, n_out]),
                device,
            )),
            bias: Param::from_tensor(Tensor::zeros([n_out], device)),
        })
    }

    fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        input.matmul(self.weight.val()) + self.bias.val().unsqueeze::<2>()
    }
}

/// Parameters plus the optimiser state that belongs to them.
struct TrainingState {
    layers: LayerStack<TrainingBackend>,
    /// Created on the first `fit`.
    optimizer: Option<NetworkOptimizer>,
}

/// A feed-forward network of dense layers ending in a softmax output,
/// trained with cross entropy and Adam.
///
/// Clones copy the parameters but start with a fresh optimiser.
pub struct Network {
    configuration: NetworkConfiguration,
    dropouts: Vec<Dropout>,
    state: Mutex<TrainingState>,
    iteration: u64,
    score: Option<f64>,
}

impl Network {
    pub fn new(configuration: NetworkConfiguration) -> Result<Self, NeuralError> {
        configuration.validate()?;
        let device = Default::default();
        let mut rng = StdRng::seed_from_u64(configuration.seed);
        let layers = configuration
            .layer_inputs()?
            .into_iter()
            .zip(&configuration.layers)
            .map(|(n_in, layer)| DenseLayer::xavier(n_in, layer.n_out, &mut rng, &device))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_layers(configuration, layers, 0))
    }

    fn from_layers(
        configuration: NetworkConfiguration,
        layers: LayerStack<TrainingBackend>,
        iteration: u64,
    ) -> Self {
        let dropouts = configuration
            .layers
            .iter()
            .map(|layer| DropoutConfig::new(layer.dropout).init())
            .collect();
        Self {
            configuration,
            dropouts,
            state: Mutex::new(TrainingState {
                layers,
                optimizer: None,
            }),
            iteration,
            score: None,
        }
    }

    pub fn configuration(&self) -> &NetworkConfiguration {
        &self.configuration
    }

    pub fn data_shape(&self) -> DataShape {
        self.configuration.input_shape
    }

    /// Number of parameter updates applied so far.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Forward pass without dropout: `[example][depth][height][length]` ->
    /// `[example][label]` probabilities.
    pub fn output(&self, features: &Array4<f64>) -> Result<Array2<f64>, NeuralError> {
        let input = self.input_tensor::<InferenceBackend>(features)?;
        if features.dim().0 == 0 {
            return Ok(Array2::zeros((0, self.configuration.input_shape.num_labels)));
        }
        let layers = self.inference_layers();
        let logits = forward(&layers, &self.dropouts, &self.configuration, input);
        to_array(softmax(logits, 1))
    }

    /// Accuracy, precision, recall and F1 over every data set of a source.
    pub fn evaluate(&self, source: &dyn DataSetSource) -> Result<Evaluation, NeuralError> {
        let mut evaluation = Evaluation::new(self.configuration.input_shape.num_labels);
        for data_set in source.data_sets() {
            let output = self.output(data_set.features())?;
            evaluation.record(data_set.labels(), &output)?;
        }
        Ok(evaluation)
    }

    /// The parameters in the toolkit's binary record format.
    pub(crate) fn to_record_bytes(&self) -> Result<Vec<u8>, NeuralError> {
        let record = self.inference_layers().into_record();
        Recorder::<InferenceBackend>::record(&recorder(), record, ())
            .map_err(|e| NeuralError::Storage(format!("Failed to record parameters: {:?}", e)))
    }

    /// Rebuilds a network from its configuration and recorded parameters.
    ///
    /// # Errors
    /// `CorruptModel` if the record cannot be read or does not match the
    /// configured layer sizes; configuration errors as from [`Network::new`].
    pub(crate) fn from_record_bytes(
        configuration: NetworkConfiguration,
        iteration: u64,
        bytes: Vec<u8>,
    ) -> Result<Self, NeuralError> {
        configuration.validate()?;
        let device = Default::default();
        let record: Vec<DenseLayerRecord<InferenceBackend>> =
            Recorder::<InferenceBackend>::load(&recorder(), bytes, &device)
                .map_err(|e| NeuralError::CorruptModel(format!("Unreadable parameters: {:?}", e)))?;
        if record.len() != configuration.layers.len() {
            return Err(NeuralError::CorruptModel(format!(
                "{} layers stored for {} configured",
                record.len(),
                configuration.layers.len()
            )));
        }

        let mut layers = Vec::with_capacity(record.len());
        for ((layer, n_in), config) in record
            .into_iter()
            .zip(configuration.layer_inputs()?)
            .zip(&configuration.layers)
        {
            let weight = layer.weight.val();
            let bias = layer.bias.val();
            if weight.dims() != [n_in, config.n_out] || bias.dims() != [config.n_out] {
                return Err(NeuralError::CorruptModel(format!(
                    "Layer '{}' does not match its configured size {}x{}",
                    config.name, n_in, config.n_out
                )));
            }
            let finite = values(weight.clone())?
                .into_iter()
                .chain(values(bias.clone())?)
                .all(f32::is_finite);
            if !finite {
                return Err(NeuralError::CorruptModel(format!(
                    "Layer '{}' holds non-finite parameters",
                    config.name
                )));
            }
            layers.push(DenseLayer {
                weight: Param::from_tensor(Tensor::from_inner(weight)),
                bias: Param::from_tensor(Tensor::from_inner(bias)),
            });
        }
        Ok(Self::from_layers(configuration, layers, iteration))
    }

    fn lock(&self) -> MutexGuard<'_, TrainingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn inference_layers(&self) -> LayerStack<InferenceBackend> {
        self.lock().layers.valid()
    }

    fn parameter_values(&self) -> Result<Vec<f32>, NeuralError> {
        let mut all = Vec::new();
        for layer in self.inference_layers() {
            all.extend(values(layer.weight.val())?);
            all.extend(values(layer.bias.val())?);
        }
        Ok(all)
    }

    fn input_tensor<B: Backend>(&self, features: &Array4<f64>) -> Result<Tensor<B, 2>, NeuralError> {
        let shape = self.configuration.input_shape;
        let (n, depth, height, length) = features.dim();
        if (depth, height, length) != (shape.depth, shape.height, shape.length) {
            return Err(NeuralError::ShapeMismatch(format!(
                "Network expects {}x{}x{} (depth x height x length) inputs, got {}x{}x{}",
                shape.depth, shape.height, shape.length, depth, height, length
            )));
        }
        let flat: Vec<f32> = features.iter().map(|&v| v as f32).collect();
        Ok(Tensor::from_data(
            TensorData::new(flat, [n, depth * height * length]),
            &Default::default(),
        ))
    }

    /// Class indices of one-hot label rows.
    fn targets<B: Backend>(
        &self,
        labels: &Array2<f64>,
        examples: usize,
    ) -> Result<Tensor<B, 1, Int>, NeuralError> {
        let num_labels = self.configuration.input_shape.num_labels;
        if labels.dim() != (examples, num_labels) {
            return Err(NeuralError::ShapeMismatch(format!(
                "Expected {}x{} labels, got {}x{}",
                examples,
                num_labels,
                labels.nrows(),
                labels.ncols()
            )));
        }
        let classes: Vec<B::IntElem> = labels
            .rows()
            .into_iter()
            .map(|row| {
                let index = highest_probability_label_index(&row.to_vec()).unwrap_or(0);
                (index as i64).elem::<B::IntElem>()
            })
            .collect();
        Ok(Tensor::from_data(
            TensorData::new(classes, [examples]),
            &Default::default(),
        ))
    }
}

impl Clone for Network {
    fn clone(&self) -> Self {
        let layers = self.lock().layers.clone();
        let mut copy = Self::from_layers(self.configuration.clone(), layers, self.iteration);
        copy.score = self.score;
        copy
    }
}

impl PartialEq for Network {
    fn eq(&self, other: &Self) -> bool {
        self.configuration == other.configuration
            && self.iteration == other.iteration
            && matches!(
                (self.parameter_values(), other.parameter_values()),
                (Ok(a), Ok(b)) if a == b
            )
    }
}

impl fmt::Debug for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Network")
            .field("configuration", &self.configuration)
            .field("iteration", &self.iteration)
            .field("score", &self.score)
            .finish_non_exhaustive()
    }
}

impl TrainableModel for Network {
    type Configuration = NetworkConfiguration;

    fn from_configuration(configuration: &NetworkConfiguration) -> Result<Self, NeuralError> {
        Network::new(configuration.clone())
    }

    /// One Adam step on the whole data set treated as a single minibatch.
    fn fit(&mut self, data_set: &DataSet) -> Result<(), NeuralError> {
        let examples = data_set.num_examples();
        let input = self.input_tensor::<TrainingBackend>(data_set.features())?;
        let targets = self.targets::<TrainingBackend>(data_set.labels(), examples)?;
        if examples == 0 {
            return Ok(());
        }

        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        let logits = forward(&state.layers, &self.dropouts, &self.configuration, input);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits, targets);
        let value: f64 = loss.clone().into_scalar().elem();
        if !value.is_finite() {
            return Err(NeuralError::Training(format!(
                "Loss diverged at iteration {}",
                self.iteration
            )));
        }

        let gradients = GradientsParams::from_grads(loss.backward(), &state.layers);
        let optimizer = state
            .optimizer
            .get_or_insert_with(|| AdamConfig::new().init());
        let layers = std::mem::take(&mut state.layers);
        state.layers = optimizer.step(self.configuration.learning_rate, layers, gradients);

        self.iteration += 1;
        self.score = Some(value);
        Ok(())
    }

    fn score(&self) -> Option<f64> {
        self.score
    }

    fn loss(&self, data_set: &DataSet) -> Result<f64, NeuralError> {
        let examples = data_set.num_examples();
        let input = self.input_tensor::<InferenceBackend>(data_set.features())?;
        let targets = self.targets::<InferenceBackend>(data_set.labels(), examples)?;
        if examples == 0 {
            return Ok(0.0);
        }
        let layers = self.inference_layers();
        let logits = forward(&layers, &self.dropouts, &self.configuration, input);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits, targets);
        Ok(loss.into_scalar().elem())
    }

    fn num_params(&self) -> usize {
        self.lock().layers.num_params()
    }

    fn summary(&self) -> String {
        let mut summary = String::new();
        let inputs = self.configuration.layer_inputs().unwrap_or_default();
        for (config, n_in) in self.configuration.layers.iter().zip(inputs) {
            let _ = writeln!(
                summary,
                "{:<10} {:>6} -> {:<6} {:?} dropout={} params={}",
                config.name,
                n_in,
                config.n_out,
                config.activation,
                config.dropout,
                n_in * config.n_out + config.n_out
            );
        }
        let _ = write!(summary, "total params={}", self.num_params());
        summary
    }
}

fn recorder() -> BinBytesRecorder<FullPrecisionSettings> {
    BinBytesRecorder::<FullPrecisionSettings>::new()
}

/// Logits of the output layer; softmax is left to the loss or the caller.
fn forward<B: Backend>(
    layers: &[DenseLayer<B>],
    dropouts: &[Dropout],
    configuration: &NetworkConfiguration,
    input: Tensor<B, 2>,
) -> Tensor<B, 2> {
    layers
        .iter()
        .zip(dropouts)
        .zip(&configuration.layers)
        .fold(input, |x, ((layer, dropout), config)| {
            activate(layer.forward(dropout.forward(x)), config.activation)
        })
}

fn activate<B: Backend>(z: Tensor<B, 2>, activation: Activation) -> Tensor<B, 2> {
    match activation {
        Activation::Identity | Activation::Softmax => z,
        Activation::Relu => relu(z),
        Activation::Sigmoid => sigmoid(z),
        Activation::Tanh => tanh(z),
    }
}

fn values<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>, NeuralError> {
    tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| NeuralError::Training(format!("Unreadable tensor: {:?}", e)))
}

fn to_array<B: Backend>(tensor: Tensor<B, 2>) -> Result<Array2<f64>, NeuralError> {
    let [rows, cols] = tensor.dims();
    let flat = values(tensor)?.into_iter().map(f64::from).collect();
    Array2::from_shape_vec((rows, cols), flat).map_err(|e| NeuralError::ShapeMismatch(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{to_label_probability_array, LabeledDataPoint, LabeledDataSet};
    use crate::net::config::{DenseLayerConfiguration, FeedForward, NetworkConfigurationBuilder};
    use crate::net::CommonNetSpecification;

    fn two_class_data() -> LabeledDataSet {
        let points: Vec<LabeledDataPoint> = (0..4)
            .map(|i| {
                let label = i % 2;
                let v = if label == 0 { 0.9 } else { 0.1 };
                LabeledDataPoint::new(
                    vec![vec![vec![v], vec![1.0 - v]]],
                    to_label_probability_array(label, 2),
                )
            })
            .collect();
        LabeledDataSet::new(&points).unwrap()
    }

    fn network(data: &LabeledDataSet) -> Network {
        let spec = CommonNetSpecification::default().with_dropout(0.0).with_learning_rate(0.05);
        Network::new(FeedForward::new(8).build(&spec, &data.data_shape())).unwrap()
    }

    #[test]
    fn test_same_seed_same_weights() {
        let data = two_class_data();
        assert_eq!(network(&data), network(&data));
    }

    #[test]
    fn test_output_rows_are_probabilities() {
        let data = two_class_data();
        let net = network(&data);
        let output = net.output(data.data_set().features()).unwrap();
        assert_eq!(output.dim(), (4, 2));
        for row in output.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-5);
            assert!(row.iter().all(|&p| p > 0.0));
        }
    }

    #[test]
    fn test_fit_reduces_loss() {
        let data = two_class_data();
        let mut net = network(&data);
        let before = net.loss(data.data_set()).unwrap();
        for _ in 0..50 {
            net.fit(data.data_set()).unwrap();
        }
        let after = net.loss(data.data_set()).unwrap();
        assert!(after < before, "loss went from {} to {}", before, after);
        assert_eq!(net.iteration(), 50);
        assert!(net.score().is_some());
    }

    #[test]
    fn test_clone_keeps_parameters() {
        let data = two_class_data();
        let mut net = network(&data);
        net.fit(data.data_set()).unwrap();
        let copy = net.clone();
        assert_eq!(copy, net);
        assert_eq!(copy.score(), net.score());

        net.fit(data.data_set()).unwrap();
        assert_ne!(copy, net);
    }

    #[test]
    fn test_wrong_input_shape() {
        let data = two_class_data();
        let net = network(&data);
        let features = Array4::zeros((1, 1, 3, 3));
        assert!(matches!(net.output(&features), Err(NeuralError::ShapeMismatch(_))));
    }

    #[test]
    fn test_num_params_and_summary() {
        let data = two_class_data();
        let net = network(&data);
        // 2 inputs -> 8 hidden -> 2 outputs
        assert_eq!(net.num_params(), 2 * 8 + 8 + 8 * 2 + 2);
        assert!(net.summary().contains("hidden"));
        assert!(net.summary().ends_with("total params=42"));
    }

    #[test]
    fn test_record_round_trip() {
        let data = two_class_data();
        let net = network(&data);
        let bytes = net.to_record_bytes().unwrap();
        let restored =
            Network::from_record_bytes(net.configuration().clone(), net.iteration(), bytes).unwrap();
        assert_eq!(restored, net);
    }

    #[test]
    fn test_record_must_match_configuration() {
        let data = two_class_data();
        let net = network(&data);
        let bytes = net.to_record_bytes().unwrap();

        let mut resized = net.configuration().clone();
        resized.layers[0] = DenseLayerConfiguration::new("hidden", 9, Activation::Relu);
        assert!(matches!(
            Network::from_record_bytes(resized, 0, bytes.clone()),
            Err(NeuralError::CorruptModel(_))
        ));

        let mut deeper = net.configuration().clone();
        deeper.layers.insert(0, DenseLayerConfiguration::new("extra", 2, Activation::Relu));
        assert!(matches!(
            Network::from_record_bytes(deeper, 0, bytes),
            Err(NeuralError::CorruptModel(_))
        ));

        assert!(matches!(
            Network::from_record_bytes(net.configuration().clone(), 0, vec![1, 2, 3]),
            Err(NeuralError::CorruptModel(_))
        ));
    }
}
