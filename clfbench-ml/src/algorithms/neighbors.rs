use crate::algorithms::{Classifier, argmax, check_fit_input, check_predict_input};
use crate::error::MlError;
use linfa_nn::distance::L2Dist;
use linfa_nn::{CommonNearestNeighbour, NearestNeighbour};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

const ALGORITHM: &str = "knn";

/// k-nearest-neighbors with uniform Euclidean votes over a `linfa-nn` ball tree.
///
/// Vote ties go to the smallest class index.
pub struct KNearestNeighbors {
    pub k: usize,
    x: Array2<f64>,
    y: Array1<usize>,
    n_classes: usize,
}

impl KNearestNeighbors {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            x: Array2::zeros((0, 0)),
            y: Array1::zeros(0),
            n_classes: 0,
        }
    }
}

impl Default for KNearestNeighbors {
    fn default() -> Self {
        Self::new(5)
    }
}

impl Classifier for KNearestNeighbors {
    fn algorithm(&self) -> &'static str {
        ALGORITHM
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, usize>) -> Result<(), MlError> {
        check_fit_input(ALGORITHM, x, y)?;
        if self.k == 0 {
            return Err(MlError::model(ALGORITHM, "k must be positive"));
        }
        self.x = x.to_owned();
        self.y = y.to_owned();
        self.n_classes = y.iter().max().map_or(0, |m| m + 1);
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<usize>, MlError> {
        let fitted = (!self.y.is_empty()).then_some(self.x.ncols());
        check_predict_input(ALGORITHM, x, fitted)?;

        // the index borrows the training rows
        let index = CommonNearestNeighbour::BallTree
            .from_batch(&self.x, L2Dist)
            .map_err(|e| MlError::model(ALGORITHM, e.to_string()))?;
        let k = self.k.min(self.x.nrows());

        let mut predicted = Vec::with_capacity(x.nrows());
        for row in x.outer_iter() {
            let neighbours = index
                .k_nearest(row, k)
                .map_err(|e| MlError::model(ALGORITHM, e.to_string()))?;
            let mut votes = vec![0.0; self.n_classes];
            for (_, i) in neighbours {
                votes[self.y[i]] += 1.0;
            }
            predicted.push(argmax(votes));
        }
        Ok(Array1::from(predicted))
    }
}
