use std::io;

/// Represents the different types of errors that can occur while building,
/// training, persisting or running a network.
#[derive(Debug, thiserror::Error)]
pub enum NeuralError {
    /// The trainer was given an unusable specification
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// A batch was assembled from zero data points
    #[error("Empty data")]
    EmptyBatch,
    /// Only 3d input data can be laid out for the network
    #[error("Only 3d data implemented, got {num_dimensions} dimensions")]
    UnsupportedShape { num_dimensions: usize },
    /// No serialized network exists for the requested id
    #[error("No network found for id '{0}'")]
    ModelNotFound(String),
    /// The serialized network could not be decoded
    #[error("Corrupt model: {0}")]
    CorruptModel(String),
    /// The serialized network was written by an incompatible encoder
    #[error("Unsupported format version: expected {expected}, got {found}")]
    UnsupportedFormatVersion { expected: u32, found: u32 },
    /// Input or label tensors do not fit the network
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
    /// Caller supplied input was rejected before reaching the network
    #[error("{0}")]
    InvalidInput(String),
    /// A training step failed
    #[error("Training error: {0}")]
    Training(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl NeuralError {
    /// True for errors caused by the caller's input rather than by the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::ModelNotFound(_) | Self::ShapeMismatch(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_not_found_message() {
        let err = NeuralError::ModelNotFound("id".to_string());
        assert_eq!(err.to_string(), "No network found for id 'id'");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_io_errors_are_not_client_errors() {
        let err: NeuralError = io::Error::new(io::ErrorKind::Other, "disk on fire").into();
        assert!(!err.is_client_error());
        assert_eq!(err.to_string(), "IO error: disk on fire");
    }
}
