use std::time::Duration;

use log::{debug, info};
use reqwest::blocking::Client;
use reqwest::StatusCode;

use super::{validate_network_id, NetworkLoader, NetworkSaver};
use crate::error::NeuralError;
use crate::net::serialized::SerializedNetwork;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Reads and writes networks as JSON documents under a base URL, e.g.
/// `GET {base_url}/mnist.net1.json`.
///
/// Uses the blocking client; call it from a blocking context, not directly
/// from an async task.
#[derive(Debug, Clone)]
pub struct HttpNetworkStore {
    base_url: String,
    client: Client,
}

impl HttpNetworkStore {
    pub fn new(base_url: impl Into<String>) -> Result<Self, NeuralError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    pub fn network_url(&self, id: &str) -> String {
        format!("{}/{}", self.base_url, SerializedNetwork::storage_key(id))
    }
}

impl NetworkLoader for HttpNetworkStore {
    fn load(&self, id: &str) -> Result<Option<SerializedNetwork>, NeuralError> {
        validate_network_id(id)?;
        let url = self.network_url(id);
        info!("Fetching network '{}' from {}", id, url);

        let response = self.client.get(&url).send()?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("{} returned 404", url);
            return Ok(None);
        }
        let network = response.error_for_status()?.json::<SerializedNetwork>()?;
        Ok(Some(network))
    }
}

impl NetworkSaver for HttpNetworkStore {
    fn save(&self, network: &SerializedNetwork) -> Result<(), NeuralError> {
        validate_network_id(&network.id)?;
        let url = self.network_url(&network.id);
        info!("Uploading network '{}' to {}", network.id, url);
        self.client.put(&url).json(network).send()?.error_for_status()?;
        Ok(())
    }
}
