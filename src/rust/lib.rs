//! Train small classification networks against a time budget, save the best
//! one, and serve predictions from a cache of decoded networks.
//!
//! # Basic Usage
//!
//! ```rust
//! # fn main() -> Result<(), netforge::NeuralError> {
//! use std::sync::Arc;
//! use std::time::Duration;
//! use netforge::data::{LabeledDataPoint, LabeledDataSet, UnlabeledDataPoint};
//! use netforge::net::{
//!     CommonNetSpecification, FeedForward, InMemoryNetworkStore, Network, NetworkConfigurationBuilder,
//!     NetworkSaver, NetworkSerializer, SavedNetworkRunner, SerializedNetwork, Trainer,
//! };
//!
//! // Two 1x2 single-channel images with two labels
//! let points = vec![
//!     LabeledDataPoint::new(vec![vec![vec![0.0], vec![1.0]]], vec![1.0, 0.0]),
//!     LabeledDataPoint::new(vec![vec![vec![1.0], vec![0.0]]], vec![0.0, 1.0]),
//! ];
//! let training_data = LabeledDataSet::new(&points)?;
//! let shape = training_data.data_shape();
//!
//! let result = Trainer::<Network>::builder()
//!     .configuration(FeedForward::new(8).build(&CommonNetSpecification::default(), &shape))
//!     .training_data(&training_data)
//!     .max_time(Duration::from_millis(200))
//!     .build()?
//!     .fit()?;
//!
//! let store = Arc::new(InMemoryNetworkStore::new());
//! let encoded = NetworkSerializer::new().serialize(&result.best_model)?;
//! store.save(&SerializedNetwork::new("pairs", shape, encoded))?;
//!
//! let runner = SavedNetworkRunner::new(store);
//! let point = UnlabeledDataPoint::new(vec![vec![vec![0.0], vec![1.0]]], shape);
//! let output = runner.run_classification("pairs", &point)?;
//! assert_eq!(output.label_probabilities().len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! [`SavedNetworkRunner`] can be shared across threads using `Arc`. Each
//! network is decoded on first use and the cached copy serves every later
//! request for the same id.

pub mod config;
pub mod data;
pub mod error;
pub mod mnist;
pub mod net;

pub use config::RuntimeConfig;
pub use data::{ClassificationOutput, DataPoint, DataShape, LabeledDataPoint, UnlabeledDataPoint};
pub use error::NeuralError;
pub use net::{
    CommonNetSpecification, Network, NetworkLoader, NetworkSaver, NetworkSerializer, SavedNetworkRunner,
    SerializedNetwork, Trainer, TrainingOutcome, TrainingResult,
};

pub fn init_logger() {
    env_logger::init();
}
