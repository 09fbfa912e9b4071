//! Train/test partition of a prepared sample.

use crate::error::MlError;
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Scaled train/test partition shared read-only by every registered model.
#[derive(Debug, Clone)]
pub struct Split {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<usize>,
    pub y_test: Array1<usize>,
    /// Sample row index of each training row.
    pub train_indices: Vec<usize>,
    /// Sample row index of each test row.
    pub test_indices: Vec<usize>,
    pub feature_names: Vec<String>,
    /// Class names in ascending order; labels index into this list.
    pub classes: Vec<String>,
}

impl Split {
    pub fn train_len(&self) -> usize {
        self.y_train.len()
    }

    pub fn test_len(&self) -> usize {
        self.y_test.len()
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn n_features(&self) -> usize {
        self.x_train.ncols()
    }
}

/// Number of rows held out for testing: `ceil(test_fraction * total)`.
pub fn test_size(total: usize, test_fraction: f64) -> usize {
    (test_fraction * total as f64).ceil() as usize
}

/// Shuffle `0..total` with `seed`; the first `test_size` indices are the test
/// partition, the rest are training rows.
pub fn partition_indices(
    total: usize,
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>), MlError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(MlError::invalid_input(format!(
            "test_fraction must be in (0, 1), got {test_fraction}"
        )));
    }
    if total == 0 {
        return Err(MlError::data("cannot split an empty sample"));
    }
    let n_test = test_size(total, test_fraction);
    if n_test >= total {
        return Err(MlError::data(format!(
            "test_fraction {test_fraction} leaves no training rows out of {total}"
        )));
    }

    let mut order: Vec<usize> = (0..total).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);
    let train = order.split_off(n_test);
    Ok((train, order))
}
