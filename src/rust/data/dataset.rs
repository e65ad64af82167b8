use std::iter;

use ndarray::{Array2, Array4, ArrayView1, Axis};

use super::point::{DataPoint, LabeledDataPoint};
use super::shape::DataShape;
use super::utils::in_input_array_row;
use crate::error::NeuralError;

/// Dense tensor pair consumed by the network.
///
/// `features` is indexed `[example][depth][height][length]`,
/// `labels` is indexed `[example][label]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    features: Array4<f64>,
    labels: Array2<f64>,
}

impl DataSet {
    pub fn new(features: Array4<f64>, labels: Array2<f64>) -> Result<Self, NeuralError> {
        if features.len_of(Axis(0)) != labels.nrows() {
            return Err(NeuralError::ShapeMismatch(format!(
                "{} feature rows but {} label rows",
                features.len_of(Axis(0)),
                labels.nrows()
            )));
        }
        Ok(Self { features, labels })
    }

    pub fn features(&self) -> &Array4<f64> {
        &self.features
    }

    pub fn labels(&self) -> &Array2<f64> {
        &self.labels
    }

    pub fn num_examples(&self) -> usize {
        self.labels.nrows()
    }
}

/// Anything that can hand the trainer an ordered pass over data sets.
pub trait DataSetSource {
    fn data_sets(&self) -> Box<dyn Iterator<Item = &DataSet> + '_>;
}

impl DataSetSource for DataSet {
    fn data_sets(&self) -> Box<dyn Iterator<Item = &DataSet> + '_> {
        Box::new(iter::once(self))
    }
}

impl DataSetSource for [DataSet] {
    fn data_sets(&self) -> Box<dyn Iterator<Item = &DataSet> + '_> {
        Box::new(self.iter())
    }
}

impl DataSetSource for Vec<DataSet> {
    fn data_sets(&self) -> Box<dyn Iterator<Item = &DataSet> + '_> {
        Box::new(self.iter())
    }
}

/// A batch of labeled data points sharing one shape, materialized for training.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledDataSet {
    data_shape: DataShape,
    data_set: DataSet,
}

impl LabeledDataSet {
    /// Builds a batch using the shape of the first point.
    ///
    /// Points are assumed to share that shape; the caller parsing the rows
    /// owns homogeneity.
    pub fn new(data: &[LabeledDataPoint]) -> Result<Self, NeuralError> {
        let first = data.first().ok_or(NeuralError::EmptyBatch)?;
        Self::with_data_shape(first.data_shape(), data)
    }

    /// Builds a batch laid out according to an explicit shape.
    pub fn with_data_shape(
        data_shape: DataShape,
        data: &[LabeledDataPoint],
    ) -> Result<Self, NeuralError> {
        if data.is_empty() {
            return Err(NeuralError::EmptyBatch);
        }
        if data_shape.num_dimensions != 3 {
            return Err(NeuralError::UnsupportedShape {
                num_dimensions: data_shape.num_dimensions,
            });
        }

        let mut features = Array4::zeros((
            data.len(),
            data_shape.depth,
            data_shape.height,
            data_shape.length,
        ));
        let mut labels = Array2::zeros((data.len(), data_shape.num_labels));

        for (i, point) in data.iter().enumerate() {
            let row = in_input_array_row(&data_shape, |h, l, d| point.value_at(h, l, d))?;
            features.index_axis_mut(Axis(0), i).assign(&row);

            if point.labels().len() != data_shape.num_labels {
                return Err(NeuralError::ShapeMismatch(format!(
                    "Point {} has {} labels, expected {}",
                    i,
                    point.labels().len(),
                    data_shape.num_labels
                )));
            }
            labels.row_mut(i).assign(&ArrayView1::from(point.labels()));
        }

        Ok(Self {
            data_shape,
            data_set: DataSet { features, labels },
        })
    }

    pub fn data_shape(&self) -> DataShape {
        self.data_shape
    }

    pub fn data_set(&self) -> &DataSet {
        &self.data_set
    }

    pub fn to_singleton_iter(&self) -> iter::Once<&DataSet> {
        iter::once(&self.data_set)
    }
}

impl DataSetSource for LabeledDataSet {
    fn data_sets(&self) -> Box<dyn Iterator<Item = &DataSet> + '_> {
        Box::new(self.to_singleton_iter())
    }
}

/// An ordered collection of batches.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LabeledDataSetCollection {
    data_sets: Vec<LabeledDataSet>,
    data_shape: Option<DataShape>,
}

impl LabeledDataSetCollection {
    pub fn new(data_sets: Vec<LabeledDataSet>) -> Self {
        let data_shape = data_sets.first().map(LabeledDataSet::data_shape);
        Self {
            data_sets,
            data_shape,
        }
    }

    /// Shape of the first batch, `None` for an empty collection.
    pub fn data_shape(&self) -> Option<DataShape> {
        self.data_shape
    }

    pub fn labeled_data_sets(&self) -> &[LabeledDataSet] {
        &self.data_sets
    }

    pub fn len(&self) -> usize {
        self.data_sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data_sets.is_empty()
    }

    /// Iterates over every batch in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &DataSet> + '_ {
        self.data_sets.iter().map(LabeledDataSet::data_set)
    }
}

impl From<LabeledDataSet> for LabeledDataSetCollection {
    fn from(data_set: LabeledDataSet) -> Self {
        Self::new(vec![data_set])
    }
}

impl DataSetSource for LabeledDataSetCollection {
    fn data_sets(&self) -> Box<dyn Iterator<Item = &DataSet> + '_> {
        Box::new(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::to_label_probability_array;

    fn point(value: f64, label: usize) -> LabeledDataPoint {
        LabeledDataPoint::new(
            vec![vec![vec![value], vec![value + 1.0]]],
            to_label_probability_array(label, 2),
        )
    }

    #[test]
    fn test_labels_row_per_point() {
        let data_set = LabeledDataSet::new(&[point(1.0, 0), point(5.0, 1)]).unwrap();
        let labels = data_set.data_set().labels();
        assert_eq!(labels.shape(), &[2, 2]);
        assert_eq!(labels[[0, 0]], 1.0);
        assert_eq!(labels[[1, 1]], 1.0);
        assert_eq!(data_set.data_set().features()[[1, 0, 0, 1]], 6.0);
    }

    #[test]
    fn test_label_count_mismatch() {
        let odd = LabeledDataPoint::new(vec![vec![vec![1.0], vec![2.0]]], vec![1.0]);
        let result = LabeledDataSet::new(&[point(1.0, 0), odd]);
        assert!(matches!(result, Err(NeuralError::ShapeMismatch(_))));
    }

    #[test]
    fn test_collection_iterates_in_order() {
        let first = LabeledDataSet::new(&[point(1.0, 0)]).unwrap();
        let second = LabeledDataSet::new(&[point(2.0, 1), point(3.0, 0)]).unwrap();
        let collection = LabeledDataSetCollection::new(vec![first.clone(), second.clone()]);

        let sizes: Vec<usize> = collection.data_sets().map(DataSet::num_examples).collect();
        assert_eq!(sizes, vec![1, 2]);
        assert_eq!(collection.iter().next(), Some(first.data_set()));
        assert_eq!(collection.iter().last(), Some(second.data_set()));
    }

    #[test]
    fn test_empty_collection_has_no_shape() {
        let collection = LabeledDataSetCollection::new(vec![]);
        assert!(collection.data_shape().is_none());
        assert_eq!(collection.iter().count(), 0);
    }
}
