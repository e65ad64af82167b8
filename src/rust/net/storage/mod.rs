//! Persistence ports for serialized networks and the adapters implementing them.

mod http;
mod local;
mod memory;

pub use http::HttpNetworkStore;
pub use local::LocalFileNetworkStore;
pub use memory::InMemoryNetworkStore;

use super::serialized::SerializedNetwork;
use crate::error::NeuralError;

/// Load saved networks.
pub trait NetworkLoader: Send + Sync {
    /// Returns `Ok(None)` when no network is stored under `id`; any other
    /// failure is an error.
    fn load(&self, id: &str) -> Result<Option<SerializedNetwork>, NeuralError>;
}

/// Save a network. Failures propagate to the caller.
pub trait NetworkSaver: Send + Sync {
    fn save(&self, network: &SerializedNetwork) -> Result<(), NeuralError>;
}

/// Rejects ids that cannot be used safely as a file name or object key.
pub fn validate_network_id(id: &str) -> Result<(), NeuralError> {
    if id.is_empty() {
        return Err(NeuralError::InvalidInput("Network id cannot be empty".into()));
    }
    if id.starts_with('.') {
        return Err(NeuralError::InvalidInput(format!(
            "Network id '{}' cannot start with '.'",
            id
        )));
    }
    if let Some(c) = id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(NeuralError::InvalidInput(format!(
            "Network id '{}' contains invalid character '{}'",
            id, c
        )));
    }
    Ok(())
}
