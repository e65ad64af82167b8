//! Data shapes, data points and the batches built from them.

mod csv;
mod dataset;
mod output;
mod point;
mod shape;
mod utils;

pub use csv::CsvLayout;
pub use dataset::{DataSet, DataSetSource, LabeledDataSet, LabeledDataSetCollection};
pub use output::ClassificationOutput;
pub use point::{DataPoint, LabeledDataPoint, UnlabeledDataPoint};
pub use shape::DataShape;
pub use utils::{
    highest_probability_label_index, in_input_array_row, to_label_probability_array,
    to_single_input_array,
};
