use super::shape::DataShape;

/// A single network input, addressed as `[height][length][depth]`.
pub trait DataPoint {
    /// The scalar at the given position, or `None` when the position lies
    /// outside the underlying array.
    fn value_at(&self, height: usize, length: usize, depth: usize) -> Option<f64>;

    /// The shape of the network input data.
    fn data_shape(&self) -> DataShape;
}

/// A data point with a label vector, used for training.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledDataPoint {
    /// [height][length][depth]
    input_data_3d: Vec<Vec<Vec<f64>>>,
    labels: Vec<f64>,
}

impl LabeledDataPoint {
    pub fn new(input_data_3d: Vec<Vec<Vec<f64>>>, labels: Vec<f64>) -> Self {
        Self {
            input_data_3d,
            labels,
        }
    }

    pub fn input_data_3d(&self) -> &[Vec<Vec<f64>>] {
        &self.input_data_3d
    }

    pub fn labels(&self) -> &[f64] {
        &self.labels
    }
}

impl DataPoint for LabeledDataPoint {
    fn value_at(&self, height: usize, length: usize, depth: usize) -> Option<f64> {
        value_at(&self.input_data_3d, height, length, depth)
    }

    /// Derived from the input array: degenerate arrays give zero-sized dimensions.
    fn data_shape(&self) -> DataShape {
        let height = self.input_data_3d.len();
        let length = self.input_data_3d.first().map_or(0, Vec::len);
        let depth = if length == 0 {
            0
        } else {
            self.input_data_3d[0].first().map_or(0, Vec::len)
        };
        DataShape::three_d(self.labels.len(), length, height, depth)
    }
}

/// A data point without a label. The shape is supplied by the caller since
/// there is no label vector to infer the number of labels from.
#[derive(Debug, Clone, PartialEq)]
pub struct UnlabeledDataPoint {
    input_data_3d: Vec<Vec<Vec<f64>>>,
    data_shape: DataShape,
}

impl UnlabeledDataPoint {
    pub fn new(input_data_3d: Vec<Vec<Vec<f64>>>, data_shape: DataShape) -> Self {
        Self {
            input_data_3d,
            data_shape,
        }
    }

    pub fn input_data_3d(&self) -> &[Vec<Vec<f64>>] {
        &self.input_data_3d
    }
}

impl DataPoint for UnlabeledDataPoint {
    fn value_at(&self, height: usize, length: usize, depth: usize) -> Option<f64> {
        value_at(&self.input_data_3d, height, length, depth)
    }

    fn data_shape(&self) -> DataShape {
        self.data_shape
    }
}

fn value_at(data: &[Vec<Vec<f64>>], height: usize, length: usize, depth: usize) -> Option<f64> {
    data.get(height)?.get(length)?.get(depth).copied()
}
