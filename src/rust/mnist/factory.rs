use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info};

use super::{HIDDEN_UNITS, MNIST_CSV_LAYOUT};
use crate::data::DataShape;
use crate::error::NeuralError;
use crate::net::storage::validate_network_id;
use crate::net::{
    CommonNetSpecification, FeedForward, Network, NetworkConfiguration, NetworkConfigurationBuilder,
    NetworkLoader, NetworkSaver, NetworkSerializer, SerializedNetwork, Trainer, TrainingResult,
};

/// A single hidden layer of 200 ReLU units over the flattened image.
#[derive(Debug, Clone, Copy, Default)]
pub struct MnistFeedForward;

impl NetworkConfigurationBuilder for MnistFeedForward {
    fn build(&self, spec: &CommonNetSpecification, data_shape: &DataShape) -> NetworkConfiguration {
        FeedForward::new(HIDDEN_UNITS).build(spec, data_shape)
    }
}

/// Trains and saves a digit network from MNIST CSV files.
pub struct MnistNetworkFactory {
    loader: Arc<dyn NetworkLoader>,
    saver: Arc<dyn NetworkSaver>,
    serializer: NetworkSerializer,
    specification: CommonNetSpecification,
}

impl MnistNetworkFactory {
    pub fn new(loader: Arc<dyn NetworkLoader>, saver: Arc<dyn NetworkSaver>) -> Self {
        Self {
            loader,
            saver,
            serializer: NetworkSerializer::new(),
            specification: CommonNetSpecification::default(),
        }
    }

    pub fn with_specification(mut self, specification: CommonNetSpecification) -> Self {
        self.specification = specification;
        self
    }

    /// Trains for `time_to_spend` and saves the best network under `network_id`.
    ///
    /// A network already saved under the same id is trained further instead of
    /// starting from scratch. The best network so far is saved whenever it
    /// improves, and once more when training ends.
    pub fn create_network(
        &self,
        network_id: &str,
        time_to_spend: Duration,
        training_data_csv: &Path,
        testing_data_csv: &Path,
    ) -> Result<TrainingResult<Network>, NeuralError> {
        validate_network_id(network_id)?;
        let training_data = MNIST_CSV_LAYOUT.read(training_data_csv)?;
        let data_shape = training_data
            .data_shape()
            .ok_or_else(|| NeuralError::InvalidConfiguration("Training data is empty".into()))?;

        let configuration = MnistFeedForward.build(&self.specification, &data_shape);
        let initial_model = self.load_existing(network_id)?;
        let save = |network: &Network| self.save(network_id, data_shape, network);

        let mut builder = Trainer::<Network>::builder()
            .configuration(configuration)
            .training_data(&training_data)
            .max_time(time_to_spend)
            .best_model_saver(save);
        if let Some(model) = initial_model {
            info!("Continuing training of existing network '{}'", network_id);
            builder = builder.initial_model(model);
        }
        let trainer = builder.build()?;

        info!("Spending {:.2?} on training", time_to_spend);
        let result = trainer.fit()?;

        info!("Training data:\n{}", result.best_model.evaluate(&training_data)?);
        let testing_data = MNIST_CSV_LAYOUT.read(testing_data_csv)?;
        info!("Testing data:\n{}", result.best_model.evaluate(&testing_data)?);

        save(&result.best_model)?;
        Ok(result)
    }

    fn load_existing(&self, network_id: &str) -> Result<Option<Network>, NeuralError> {
        self.loader
            .load(network_id)?
            .map(|saved| {
                saved.ensure_compatible()?;
                self.serializer.deserialize(&saved.network_binary_base64)
            })
            .transpose()
    }

    fn save(&self, network_id: &str, data_shape: DataShape, network: &Network) -> Result<(), NeuralError> {
        let encoded = self.serializer.serialize(network)?;
        self.saver
            .save(&SerializedNetwork::new(network_id, data_shape, encoded))
            .map_err(|e| {
                error!("Failed to save network '{}': {}", network_id, e);
                e
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mnist::MNIST_DATA_SHAPE;
    use crate::net::InMemoryNetworkStore;

    #[test]
    fn test_mnist_topology() {
        let config = MnistFeedForward.build(&CommonNetSpecification::default(), &MNIST_DATA_SHAPE);
        assert!(config.validate().is_ok());
        assert_eq!(config.layer_inputs().unwrap(), vec![784, 200]);
        assert_eq!(config.layers[1].n_out, 10);
    }

    #[test]
    fn test_missing_csv_is_an_error() {
        let store = Arc::new(InMemoryNetworkStore::new());
        let factory = MnistNetworkFactory::new(store.clone(), store.clone());
        let missing = Path::new("/definitely/not/here.csv");
        let result = factory.create_network("digits", Duration::from_secs(1), missing, missing);
        assert!(matches!(result, Err(NeuralError::Io(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_invalid_network_id() {
        let store = Arc::new(InMemoryNetworkStore::new());
        let factory = MnistNetworkFactory::new(store.clone(), store);
        let path = Path::new("train.csv");
        let result = factory.create_network("../digits", Duration::from_secs(1), path, path);
        assert!(matches!(result, Err(NeuralError::InvalidInput(_))));
    }
}
