//! Dataset preparation: loading, sampling, encoding, scaling, and train/test partitioning.

pub mod preparer;
pub mod source;
pub mod split;
pub mod transform;

pub use preparer::DatasetPreparer;
pub use source::{CsvSource, RawTable};
pub use split::Split;
pub use transform::StandardScaler;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Where the standardization transform is fit relative to the train/test partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMode {
    /// Fit on every sampled row before partitioning. Test-set statistics leak
    /// into the training features; kept as the default for comparability with
    /// earlier benchmark runs.
    #[default]
    FullSample,
    /// Partition first, fit on the training rows only, apply to both partitions.
    TrainOnly,
}

/// Feature matrix with its column names, in original file order.
#[derive(Debug, Clone, PartialEq)]
pub struct Features {
    pub columns: Vec<String>,
    pub values: Array2<f64>,
}

impl Features {
    pub fn empty(columns: Vec<String>) -> Self {
        let width = columns.len();
        Self {
            columns,
            values: Array2::zeros((0, width)),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.values.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }
}

/// Encoded class labels. `values[i]` indexes into `classes`.
#[derive(Debug, Clone, PartialEq)]
pub struct Labels {
    /// Distinct label values in ascending order.
    pub classes: Vec<String>,
    pub values: Array1<usize>,
}

impl Labels {
    pub fn empty() -> Self {
        Self {
            classes: Vec::new(),
            values: Array1::zeros(0),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Label value for an encoded class index.
    pub fn class_name(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }
}
