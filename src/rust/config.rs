use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use log::info;

use crate::error::NeuralError;
use crate::net::{
    HttpNetworkStore, LocalFileNetworkStore, NetworkLoader, NetworkSaver, DEFAULT_CACHE_CAPACITY,
};

pub const HOME_VAR: &str = "NETFORGE_HOME";
pub const CACHE_CAPACITY_VAR: &str = "NETFORGE_CACHE_CAPACITY";
pub const REMOTE_URL_VAR: &str = "NETFORGE_REMOTE_URL";
pub const NETWORK_ID_VAR: &str = "NETFORGE_NETWORK_ID";

pub const DEFAULT_NETWORK_ID: &str = "mnist";

/// Process-wide settings for where networks live and how many stay decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub network_dir: PathBuf,
    pub cache_capacity: usize,
    /// When set, networks are read from and written to this URL instead of
    /// `network_dir`.
    pub remote_url: Option<String>,
    pub network_id: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            network_dir: LocalFileNetworkStore::get_default_networks_dir(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            remote_url: None,
            network_id: DEFAULT_NETWORK_ID.to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Reads the `NETFORGE_*` environment variables, falling back to defaults
    /// for anything unset.
    pub fn from_env() -> Result<Self, NeuralError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars<F>(var: F) -> Result<Self, NeuralError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(home) = var(HOME_VAR) {
            config.network_dir = PathBuf::from(home).join("networks");
        }
        if let Some(capacity) = var(CACHE_CAPACITY_VAR) {
            config.cache_capacity = match capacity.trim().parse::<usize>() {
                Ok(capacity) if capacity > 0 => capacity,
                _ => {
                    return Err(NeuralError::InvalidConfiguration(format!(
                        "{} must be a positive integer, got '{}'",
                        CACHE_CAPACITY_VAR, capacity
                    )))
                }
            };
        }
        config.remote_url = var(REMOTE_URL_VAR).filter(|url| !url.trim().is_empty());
        if let Some(id) = var(NETWORK_ID_VAR) {
            config.network_id = id;
        }
        Ok(config)
    }

    pub fn loader(&self) -> Result<Arc<dyn NetworkLoader>, NeuralError> {
        let loader: Arc<dyn NetworkLoader> = match &self.remote_url {
            Some(url) => {
                info!("Loading networks from {}", url);
                Arc::new(HttpNetworkStore::new(url.as_str())?)
            }
            None => Arc::new(LocalFileNetworkStore::new(&self.network_dir)?),
        };
        Ok(loader)
    }

    pub fn saver(&self) -> Result<Arc<dyn NetworkSaver>, NeuralError> {
        let saver: Arc<dyn NetworkSaver> = match &self.remote_url {
            Some(url) => {
                info!("Saving networks to {}", url);
                Arc::new(HttpNetworkStore::new(url.as_str())?)
            }
            None => Arc::new(LocalFileNetworkStore::new(&self.network_dir)?),
        };
        Ok(saver)
    }
}
