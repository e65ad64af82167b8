use serde::{Deserialize, Serialize};

/// Description of the shape of input data to a network.
///
/// Only 3d inputs (`height x length x depth`, e.g. image rows x columns x channels)
/// are laid out by this crate, so shapes derived from data points always carry
/// `num_dimensions == 3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataShape {
    pub num_dimensions: usize,
    pub num_labels: usize,
    pub length: usize,
    pub height: usize,
    pub depth: usize,
}

impl DataShape {
    pub const fn new(
        num_dimensions: usize,
        num_labels: usize,
        length: usize,
        height: usize,
        depth: usize,
    ) -> Self {
        Self {
            num_dimensions,
            num_labels,
            length,
            height,
            depth,
        }
    }

    /// A 3d shape, the only kind the batch assembler accepts.
    pub const fn three_d(num_labels: usize, length: usize, height: usize, depth: usize) -> Self {
        Self::new(3, num_labels, length, height, depth)
    }

    /// Number of scalar inputs in one example, `None` if it overflows `usize`.
    pub fn input_size(&self) -> Option<usize> {
        self.depth
            .checked_mul(self.height)
            .and_then(|n| n.checked_mul(self.length))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_field_names() {
        let shape = DataShape::three_d(10, 28, 28, 1);
        let json = serde_json::to_string(&shape).unwrap();
        assert_eq!(
            json,
            r#"{"numDimensions":3,"numLabels":10,"length":28,"height":28,"depth":1}"#
        );
        let parsed: DataShape = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, shape);
    }

    #[test]
    fn test_input_size() {
        assert_eq!(DataShape::three_d(4, 3, 2, 2).input_size(), Some(12));
        assert_eq!(DataShape::three_d(4, 0, 0, 0).input_size(), Some(0));
        assert_eq!(DataShape::three_d(2, usize::MAX / 2, 4, 1).input_size(), None);
    }
}
