use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use log::debug;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::config::NetworkConfiguration;
use super::network::Network;
use crate::error::NeuralError;

const MAGIC: &[u8; 4] = b"NFNW";
const DIGEST_LEN: usize = 32;
const HEADER_LEN: usize = MAGIC.len() + DIGEST_LEN;

/// What gets written for one network.
#[derive(Debug, Serialize, Deserialize)]
struct NetworkPayload {
    configuration: NetworkConfiguration,
    iteration: u64,
    /// Parameter record in the toolkit's own binary format.
    parameters: Vec<u8>,
}

/// Serialize and deserialize [`Network`]s as base64 text.
///
/// The binary form is `MAGIC | sha256(payload) | bincode(payload)`, where the
/// payload carries the configuration next to the parameter record. Anything
/// that cannot be turned back into a consistent network, from a flipped bit
/// to a configuration that disagrees with its parameters, is reported as
/// [`NeuralError::CorruptModel`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkSerializer;

impl NetworkSerializer {
    pub fn new() -> Self {
        Self
    }

    /// Network -> base64 string
    pub fn serialize(&self, network: &Network) -> Result<String, NeuralError> {
        let payload = NetworkPayload {
            configuration: network.configuration().clone(),
            iteration: network.iteration(),
            parameters: network.to_record_bytes()?,
        };
        seal(&payload)
    }

    /// base64 string -> Network
    pub fn deserialize(&self, encoded: &str) -> Result<Network, NeuralError> {
        let payload = unseal(encoded)?;
        Network::from_record_bytes(payload.configuration, payload.iteration, payload.parameters)
            .map_err(|e| match e {
                NeuralError::CorruptModel(_) => e,
                other => NeuralError::CorruptModel(other.to_string()),
            })
    }
}

fn seal(payload: &NetworkPayload) -> Result<String, NeuralError> {
    let body = bincode::serialize(payload)
        .map_err(|e| NeuralError::Storage(format!("Failed to encode network: {}", e)))?;
    let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&Sha256::digest(&body));
    bytes.extend_from_slice(&body);
    debug!("Encoded network into {} bytes", bytes.len());
    Ok(STANDARD.encode(bytes))
}

fn unseal(encoded: &str) -> Result<NetworkPayload, NeuralError> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| NeuralError::CorruptModel(format!("Invalid base64: {}", e)))?;
    if bytes.len() < HEADER_LEN {
        return Err(NeuralError::CorruptModel(format!(
            "Payload too short ({} bytes)",
            bytes.len()
        )));
    }

    let (magic, rest) = bytes.split_at(MAGIC.len());
    let (digest, body) = rest.split_at(DIGEST_LEN);
    if magic != MAGIC {
        return Err(NeuralError::CorruptModel("Not a serialized network".to_string()));
    }
    if Sha256::digest(body).as_slice() != digest {
        return Err(NeuralError::CorruptModel("Checksum mismatch".to_string()));
    }
    bincode::deserialize(body)
        .map_err(|e| NeuralError::CorruptModel(format!("Undecodable network: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataShape;
    use crate::net::{CommonNetSpecification, FeedForward, NetworkConfigurationBuilder};

    fn network() -> Network {
        let shape = DataShape::three_d(3, 2, 2, 1);
        Network::new(FeedForward::new(4).build(&CommonNetSpecification::default(), &shape)).unwrap()
    }

    #[test]
    fn test_round_trip_is_identical() {
        let serializer = NetworkSerializer::new();
        let original = network();
        let restored = serializer.deserialize(&serializer.serialize(&original).unwrap()).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_rejects_garbage() {
        let serializer = NetworkSerializer::new();
        let header_only = STANDARD.encode(b"NFNW");
        for input in ["not base64 !!", "", "AAAA", header_only.as_str()] {
            assert!(
                matches!(serializer.deserialize(input), Err(NeuralError::CorruptModel(_))),
                "accepted {:?}",
                input
            );
        }
    }

    #[test]
    fn test_rejects_flipped_byte() {
        let serializer = NetworkSerializer::new();
        let mut bytes = STANDARD.decode(serializer.serialize(&network()).unwrap()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        let result = serializer.deserialize(&STANDARD.encode(&bytes));
        assert!(matches!(result, Err(NeuralError::CorruptModel(_))));
    }

    /// Re-seals a genuine network's payload after `edit`, so only the
    /// contents are wrong and the frame and checksum are valid.
    fn tampered(edit: impl FnOnce(&mut NetworkPayload)) -> String {
        let serializer = NetworkSerializer::new();
        let mut payload = unseal(&serializer.serialize(&network()).unwrap()).unwrap();
        edit(&mut payload);
        seal(&payload).unwrap()
    }

    #[test]
    fn test_rejects_overflowing_input_shape() {
        let encoded = tampered(|payload| {
            payload.configuration.input_shape = DataShape::three_d(3, usize::MAX / 2, 4, 1);
        });
        let result = NetworkSerializer::new().deserialize(&encoded);
        assert!(matches!(result, Err(NeuralError::CorruptModel(_))), "{:?}", result);
    }

    #[test]
    fn test_rejects_configuration_that_disagrees_with_parameters() {
        let encoded = tampered(|payload| payload.configuration.layers[0].n_out = 5);
        let result = NetworkSerializer::new().deserialize(&encoded);
        assert!(matches!(result, Err(NeuralError::CorruptModel(_))), "{:?}", result);

        let encoded = tampered(|payload| payload.parameters.truncate(payload.parameters.len() / 2));
        let result = NetworkSerializer::new().deserialize(&encoded);
        assert!(matches!(result, Err(NeuralError::CorruptModel(_))), "{:?}", result);
    }

    #[test]
    fn test_rejects_wrong_magic() {
        let serializer = NetworkSerializer::new();
        let mut bytes = STANDARD.decode(serializer.serialize(&network()).unwrap()).unwrap();
        bytes[0] = b'X';
        let result = serializer.deserialize(&STANDARD.encode(&bytes));
        assert!(matches!(result, Err(NeuralError::CorruptModel(_))));
    }
}
