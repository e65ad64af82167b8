use serde::{Deserialize, Serialize};

use crate::data::DataShape;
use crate::error::NeuralError;

/// A serialized [`Network`](super::Network) plus the metadata needed to serve it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedNetwork {
    pub id: String,
    pub data_shape: DataShape,
    pub network_binary_base64: String,
    pub format_version: u32,
}

impl SerializedNetwork {
    /// Bumped whenever the encoding changes, so old payloads are rejected
    /// instead of misread.
    pub const FORMAT_VERSION: u32 = 1;

    pub fn new(
        id: impl Into<String>,
        data_shape: DataShape,
        network_binary_base64: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            data_shape,
            network_binary_base64: network_binary_base64.into(),
            format_version: Self::FORMAT_VERSION,
        }
    }

    pub fn ensure_compatible(&self) -> Result<(), NeuralError> {
        if self.format_version != Self::FORMAT_VERSION {
            return Err(NeuralError::UnsupportedFormatVersion {
                expected: Self::FORMAT_VERSION,
                found: self.format_version,
            });
        }
        Ok(())
    }

    /// Storage key for a network id, versioned so incompatible encodings never collide.
    pub fn storage_key(id: &str) -> String {
        format!("{}.net{}.json", id, Self::FORMAT_VERSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_check() {
        let mut network = SerializedNetwork::new("id", DataShape::three_d(2, 1, 1, 1), "AAAA");
        assert!(network.ensure_compatible().is_ok());

        network.format_version = 0;
        assert!(matches!(
            network.ensure_compatible(),
            Err(NeuralError::UnsupportedFormatVersion { expected: 1, found: 0 })
        ));
    }

    #[test]
    fn test_json_round_trip_and_key() {
        let network = SerializedNetwork::new("digits", DataShape::three_d(10, 28, 28, 1), "AAAA");
        let json = serde_json::to_string(&network).unwrap();
        assert!(json.contains(r#""networkBinaryBase64":"AAAA""#));
        assert!(json.contains(r#""formatVersion":1"#));
        assert_eq!(serde_json::from_str::<SerializedNetwork>(&json).unwrap(), network);
        assert_eq!(SerializedNetwork::storage_key("digits"), "digits.net1.json");
    }

    #[test]
    fn test_missing_version_is_rejected() {
        let json = r#"{"id":"x","dataShape":{"numDimensions":3,"numLabels":1,"length":1,"height":1,"depth":1},"networkBinaryBase64":""}"#;
        assert!(serde_json::from_str::<SerializedNetwork>(json).is_err());
    }
}
