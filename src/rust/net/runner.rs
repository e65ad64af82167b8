use std::sync::Arc;

use log::{debug, info};

use super::cache::{NetworkCache, DEFAULT_CACHE_CAPACITY};
use super::network::Network;
use super::serializer::NetworkSerializer;
use super::storage::NetworkLoader;
use crate::data::{to_single_input_array, ClassificationOutput, DataPoint};
use crate::error::NeuralError;

/// Runs single-example inference against saved networks, decoding each
/// network once and reusing it for later requests.
///
/// Safe to share between threads. Two callers missing the cache for the same
/// id may both load and decode it; whichever is cached first is used by both.
pub struct SavedNetworkRunner {
    loader: Arc<dyn NetworkLoader>,
    serializer: NetworkSerializer,
    cache: NetworkCache<Network>,
}

impl SavedNetworkRunner {
    pub fn new(loader: Arc<dyn NetworkLoader>) -> Self {
        Self::with_capacity(loader, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(loader: Arc<dyn NetworkLoader>, capacity: usize) -> Self {
        Self {
            loader,
            serializer: NetworkSerializer::new(),
            cache: NetworkCache::new(capacity),
        }
    }

    /// Classifies one data point with the network saved under `id`.
    ///
    /// # Errors
    /// `ModelNotFound` when the loader has nothing under `id`, `ShapeMismatch`
    /// when the point's shape is not the one the network was trained on;
    /// corrupt or incompatible payloads and loader failures propagate as-is.
    pub fn run_classification(
        &self,
        id: &str,
        data_point: &dyn DataPoint,
    ) -> Result<ClassificationOutput, NeuralError> {
        let network = self.network(id)?;
        let shape = data_point.data_shape();
        if shape != network.data_shape() {
            return Err(NeuralError::ShapeMismatch(format!(
                "Network '{}' expects {:?}, got {:?}",
                id,
                network.data_shape(),
                shape
            )));
        }
        let input = to_single_input_array(data_point)?;
        let output = network.output(&input)?;
        let probabilities = output.row(0).to_vec();
        ClassificationOutput::from_probabilities(probabilities)
    }

    /// Drops the cached network for `id`, so the next request reloads it.
    pub fn evict(&self, id: &str) -> bool {
        self.cache.remove(id).is_some()
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn cached_networks(&self) -> usize {
        self.cache.len()
    }

    fn network(&self, id: &str) -> Result<Arc<Network>, NeuralError> {
        if let Some(network) = self.cache.get(id) {
            return Ok(network);
        }

        debug!("Cache miss for network '{}'", id);
        let serialized = self
            .loader
            .load(id)?
            .ok_or_else(|| NeuralError::ModelNotFound(id.to_string()))?;
        serialized.ensure_compatible()?;
        let network = self.serializer.deserialize(&serialized.network_binary_base64)?;
        info!("Loaded network '{}' ({} iterations)", id, network.iteration());
        Ok(self.cache.insert(id, network))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataShape, UnlabeledDataPoint};
    use crate::net::storage::{InMemoryNetworkStore, NetworkSaver};
    use crate::net::{CommonNetSpecification, FeedForward, NetworkConfigurationBuilder, SerializedNetwork};

    #[test]
    fn test_missing_network() {
        let runner = SavedNetworkRunner::new(Arc::new(InMemoryNetworkStore::new()));
        let point = UnlabeledDataPoint::new(vec![vec![vec![0.0]]], DataShape::three_d(2, 1, 1, 1));
        let err = runner.run_classification("nope", &point).unwrap_err();
        assert_eq!(err.to_string(), "No network found for id 'nope'");
    }

    #[test]
    fn test_caches_after_first_use() {
        let shape = DataShape::three_d(2, 2, 1, 1);
        let network =
            Network::new(FeedForward::new(3).build(&CommonNetSpecification::default(), &shape)).unwrap();
        let store = Arc::new(InMemoryNetworkStore::new());
        let encoded = NetworkSerializer::new().serialize(&network).unwrap();
        store.save(&SerializedNetwork::new("tiny", shape, encoded)).unwrap();

        let runner = SavedNetworkRunner::new(store);
        let point = UnlabeledDataPoint::new(vec![vec![vec![0.3], vec![0.7]]], shape);
        let first = runner.run_classification("tiny", &point).unwrap();
        assert_eq!(runner.cached_networks(), 1);
        let second = runner.run_classification("tiny", &point).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.label_probabilities().len(), 2);

        assert!(runner.evict("tiny"));
        assert!(!runner.evict("tiny"));
        assert_eq!(runner.cached_networks(), 0);
    }

    #[test]
    fn test_point_shape_must_match_network() {
        let shape = DataShape::three_d(2, 2, 1, 1);
        let network =
            Network::new(FeedForward::new(3).build(&CommonNetSpecification::default(), &shape)).unwrap();
        let store = Arc::new(InMemoryNetworkStore::new());
        let encoded = NetworkSerializer::new().serialize(&network).unwrap();
        store.save(&SerializedNetwork::new("tiny", shape, encoded)).unwrap();
        let runner = SavedNetworkRunner::new(store);

        let huge = UnlabeledDataPoint::new(
            vec![vec![vec![0.3], vec![0.7]]],
            DataShape::three_d(2, usize::MAX / 2, 4, 1),
        );
        let err = runner.run_classification("tiny", &huge).unwrap_err();
        assert!(matches!(err, NeuralError::ShapeMismatch(_)), "{:?}", err);
        assert!(err.is_client_error());

        let more_labels = UnlabeledDataPoint::new(
            vec![vec![vec![0.3], vec![0.7]]],
            DataShape::three_d(3, 2, 1, 1),
        );
        assert!(matches!(
            runner.run_classification("tiny", &more_labels),
            Err(NeuralError::ShapeMismatch(_))
        ));
    }
}
