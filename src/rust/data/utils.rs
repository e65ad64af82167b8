use ndarray::{Array3, Array4, Axis};

use super::point::DataPoint;
use super::shape::DataShape;
use crate::error::NeuralError;

/// index -> array of probabilities with one at the selected index and zeros at the others.
pub fn to_label_probability_array(index: usize, num_labels: usize) -> Vec<f64> {
    (0..num_labels)
        .map(|i| if i == index { 1.0 } else { 0.0 })
        .collect()
}

/// array of probabilities -> index of the highest value.
///
/// Scans left to right and only moves on a strictly greater value, so ties
/// resolve to the lowest index. `None` only for an empty slice.
pub fn highest_probability_label_index(label_probabilities: &[f64]) -> Option<usize> {
    let (first, rest) = label_probabilities.split_first()?;
    let mut max_value = *first;
    let mut index = 0;
    for (i, &value) in rest.iter().enumerate() {
        if value > max_value {
            max_value = value;
            index = i + 1;
        }
    }
    Some(index)
}

/// Re-lays a `[height][length][depth]` accessor into a channel-first
/// `[depth][height][length]` array.
///
/// ```text
/// [ [ [a, b], [c, d], [e, f] ],        [ [ [a, c, e],
///   [ [h, i], [j, k], [l, m] ] ]   ->      [h, j, l] ],
///                                        [ [b, d, f],
///                                          [i, k, m] ] ]
/// ```
pub fn in_input_array_row<F>(data_shape: &DataShape, value: F) -> Result<Array3<f64>, NeuralError>
where
    F: Fn(usize, usize, usize) -> Option<f64>,
{
    if !data_shape.input_size().is_some_and(|n| n <= isize::MAX as usize) {
        return Err(NeuralError::ShapeMismatch(format!(
            "Shape {}x{}x{} is too large",
            data_shape.height, data_shape.length, data_shape.depth
        )));
    }
    let mut output = Array3::zeros((data_shape.depth, data_shape.height, data_shape.length));
    for d in 0..data_shape.depth {
        for l in 0..data_shape.length {
            for h in 0..data_shape.height {
                output[[d, h, l]] = value(h, l, d).ok_or_else(|| {
                    NeuralError::ShapeMismatch(format!(
                        "No input value at [{}][{}][{}] for shape {}x{}x{}",
                        h, l, d, data_shape.height, data_shape.length, data_shape.depth
                    ))
                })?;
            }
        }
    }
    Ok(output)
}

/// A single data point -> channel-first array with one input row.
pub fn to_single_input_array(data_point: &dyn DataPoint) -> Result<Array4<f64>, NeuralError> {
    let data_shape = data_point.data_shape();
    let row = in_input_array_row(&data_shape, |h, l, d| data_point.value_at(h, l, d))?;
    Ok(row.insert_axis(Axis(0)))
}
