//! Handwritten digit classification on 28x28 MNIST images.

mod classifier;
mod factory;

pub use classifier::{DigitClassificationInput, DigitClassifier};
pub use factory::{MnistFeedForward, MnistNetworkFactory};

use crate::data::{CsvLayout, DataShape};

pub const HEIGHT: usize = 28;
pub const WIDTH: usize = 28;
pub const NUM_DIGITS: usize = 10;
pub const MAX_PIXEL_VALUE: f64 = 255.0;
pub const HIDDEN_UNITS: usize = 200;

/// Rows per training batch when reading MNIST CSVs.
pub const BATCH_SIZE: usize = 1000;

pub const MNIST_DATA_SHAPE: DataShape = DataShape::three_d(NUM_DIGITS, WIDTH, HEIGHT, 1);

/// `label,pixel0,...,pixel783` with pixels in `0..=255`.
pub const MNIST_CSV_LAYOUT: CsvLayout = CsvLayout {
    height: HEIGHT,
    width: WIDTH,
    num_labels: NUM_DIGITS,
    max_value: MAX_PIXEL_VALUE,
    batch_size: BATCH_SIZE,
};
