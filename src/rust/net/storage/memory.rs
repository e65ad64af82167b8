use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::{NetworkLoader, NetworkSaver};
use crate::error::NeuralError;
use crate::net::serialized::SerializedNetwork;

/// Process-local store, mostly useful in tests and for short-lived runs.
#[derive(Debug, Default)]
pub struct InMemoryNetworkStore {
    networks: RwLock<HashMap<String, SerializedNetwork>>,
}

impl InMemoryNetworkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.networks.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NetworkLoader for InMemoryNetworkStore {
    fn load(&self, id: &str) -> Result<Option<SerializedNetwork>, NeuralError> {
        let networks = self.networks.read().unwrap_or_else(PoisonError::into_inner);
        Ok(networks.get(id).cloned())
    }
}

impl NetworkSaver for InMemoryNetworkStore {
    fn save(&self, network: &SerializedNetwork) -> Result<(), NeuralError> {
        let mut networks = self.networks.write().unwrap_or_else(PoisonError::into_inner);
        networks.insert(network.id.clone(), network.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataShape;

    #[test]
    fn test_last_save_wins() {
        let store = InMemoryNetworkStore::new();
        let shape = DataShape::three_d(2, 1, 1, 1);
        assert!(store.is_empty());

        store.save(&SerializedNetwork::new("a", shape, "AAAA")).unwrap();
        store.save(&SerializedNetwork::new("a", shape, "BBBB")).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.load("a").unwrap().unwrap().network_binary_base64, "BBBB");
        assert_eq!(store.load("b").unwrap(), None);
    }
}
