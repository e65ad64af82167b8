use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::info;
use tempfile::NamedTempFile;

use super::{validate_network_id, NetworkLoader, NetworkSaver};
use crate::config::HOME_VAR;
use crate::error::NeuralError;
use crate::net::serialized::SerializedNetwork;

/// Stores each network as a JSON file named after its id and format version.
#[derive(Debug, Clone)]
pub struct LocalFileNetworkStore {
    networks_dir: PathBuf,
}

impl LocalFileNetworkStore {
    /// Creates a store in the default networks directory
    pub fn new_default() -> io::Result<Self> {
        Self::new(Self::get_default_networks_dir())
    }

    /// Returns the default networks directory path
    pub fn get_default_networks_dir() -> PathBuf {
        Self::default_networks_dir_for(env::var(HOME_VAR).ok())
    }

    /// The default directory given the value of `NETFORGE_HOME`, if set.
    fn default_networks_dir_for(home: Option<String>) -> PathBuf {
        // 1. Explicit home
        if let Some(path) = home {
            return PathBuf::from(path).join("networks");
        }

        // 2. Use platform-specific data directory
        if let Some(data_dir) = dirs::data_local_dir() {
            return data_dir.join("netforge").join("networks");
        }

        // 3. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".local").join("share").join("netforge").join("networks");
        }

        // 4. If all else fails, use system temp directory
        env::temp_dir().join("netforge").join("networks")
    }

    pub fn new<P: AsRef<Path>>(networks_dir: P) -> io::Result<Self> {
        let networks_dir = networks_dir.as_ref().to_path_buf();
        fs::create_dir_all(&networks_dir)?;
        Ok(Self { networks_dir })
    }

    pub fn networks_dir(&self) -> &Path {
        &self.networks_dir
    }

    pub fn get_network_path(&self, id: &str) -> PathBuf {
        self.networks_dir.join(SerializedNetwork::storage_key(id))
    }

    pub fn remove(&self, id: &str) -> Result<(), NeuralError> {
        validate_network_id(id)?;
        let path = self.get_network_path(id);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

impl NetworkLoader for LocalFileNetworkStore {
    fn load(&self, id: &str) -> Result<Option<SerializedNetwork>, NeuralError> {
        validate_network_id(id)?;
        let path = self.get_network_path(id);
        info!("Loading network '{}' from {:?}", id, path);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No file {:?}", path);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&json)?))
    }
}

impl NetworkSaver for LocalFileNetworkStore {
    /// Writes to a uniquely named temporary file in the same directory, then
    /// renames it over the target, so readers never see a partial network and
    /// concurrent saves of one id never share a temporary file.
    fn save(&self, network: &SerializedNetwork) -> Result<(), NeuralError> {
        validate_network_id(&network.id)?;
        let path = self.get_network_path(&network.id);
        info!("Saving network '{}' to {:?}", network.id, path);
        fs::create_dir_all(&self.networks_dir)?;

        let json = serde_json::to_string(network)?;
        let mut tmp = NamedTempFile::new_in(&self.networks_dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }
}
