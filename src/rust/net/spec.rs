use serde::{Deserialize, Serialize};

/// Hyper-parameters found on all networks, whatever their topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CommonNetSpecification {
    pub seed: u64,
    pub dropout: f64,
    pub learning_rate: f64,
    pub size_multiplier: usize,
}

impl CommonNetSpecification {
    pub const DEFAULT_SEED: u64 = 1234;
    pub const DEFAULT_DROPOUT: f64 = 0.2;
    pub const DEFAULT_LEARNING_RATE: f64 = 0.005;
    pub const DEFAULT_SIZE_MULTIPLIER: usize = 1;

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_size_multiplier(mut self, size_multiplier: usize) -> Self {
        self.size_multiplier = size_multiplier;
        self
    }
}

impl Default for CommonNetSpecification {
    fn default() -> Self {
        Self {
            seed: Self::DEFAULT_SEED,
            dropout: Self::DEFAULT_DROPOUT,
            learning_rate: Self::DEFAULT_LEARNING_RATE,
            size_multiplier: Self::DEFAULT_SIZE_MULTIPLIER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let spec = CommonNetSpecification::default();
        assert_eq!(spec.seed, 1234);
        assert_eq!(spec.dropout, 0.2);
        assert_eq!(spec.learning_rate, 0.005);
        assert_eq!(spec.size_multiplier, 1);
    }

    #[test]
    fn test_omitted_fields_take_defaults() {
        let spec: CommonNetSpecification = serde_json::from_str(r#"{"learningRate":0.01}"#).unwrap();
        assert_eq!(spec.learning_rate, 0.01);
        assert_eq!(spec.seed, 1234);
        assert_eq!(spec.dropout, 0.2);
    }
}
