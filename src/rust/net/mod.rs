//! Network construction, training, serialization and serving.

mod cache;
mod config;
mod evaluation;
mod network;
mod runner;
mod serialized;
mod serializer;
mod spec;
pub mod storage;
mod trainer;

pub use cache::{NetworkCache, DEFAULT_CACHE_CAPACITY};
pub use config::{
    Activation, DenseLayerConfiguration, FeedForward, NetworkConfiguration, NetworkConfigurationBuilder,
};
pub use evaluation::Evaluation;
pub use network::Network;
pub use runner::SavedNetworkRunner;
pub use serialized::SerializedNetwork;
pub use serializer::NetworkSerializer;
pub use spec::CommonNetSpecification;
pub use storage::{HttpNetworkStore, InMemoryNetworkStore, LocalFileNetworkStore, NetworkLoader, NetworkSaver};
pub use trainer::{
    BestModelSaver, TrainableModel, Trainer, TrainerBuilder, TrainingOutcome, TrainingResult,
};
