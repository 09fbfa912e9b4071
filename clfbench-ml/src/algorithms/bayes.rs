use crate::algorithms::{Classifier, check_fit_input, check_predict_input, training_set};
use crate::error::MlError;
use linfa::prelude::*;
use linfa_bayes::GaussianNb as GaussianModel;
use ndarray::{Array1, ArrayView1, ArrayView2};

const ALGORITHM: &str = "naive_bayes";

/// Gaussian naive Bayes over `linfa-bayes`.
///
/// Every per-class variance is inflated by `var_smoothing` times the largest
/// feature variance so constant features stay usable.
pub struct GaussianNb {
    pub var_smoothing: f64,
    model: Option<GaussianModel<f64, usize>>,
    n_features: Option<usize>,
}

impl GaussianNb {
    pub fn new(var_smoothing: f64) -> Self {
        Self {
            var_smoothing,
            model: None,
            n_features: None,
        }
    }
}

impl Default for GaussianNb {
    fn default() -> Self {
        Self::new(1e-9)
    }
}

impl Classifier for GaussianNb {
    fn algorithm(&self) -> &'static str {
        ALGORITHM
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, usize>) -> Result<(), MlError> {
        check_fit_input(ALGORITHM, x, y)?;
        let model = GaussianModel::params()
            .var_smoothing(self.var_smoothing)
            .fit(&training_set(x, y))
            .map_err(|e| MlError::model(ALGORITHM, e.to_string()))?;
        self.model = Some(model);
        self.n_features = Some(x.ncols());
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<usize>, MlError> {
        check_predict_input(ALGORITHM, x, self.n_features)?;
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| MlError::model(ALGORITHM, "predict called before fit"))?;
        let predicted: Array1<usize> = model.predict(&x);
        Ok(predicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::test_data::{accuracy, three_clusters};
    use ndarray::array;

    #[test]
    fn test_predicts_nearest_class_mean() {
        let x = array![[0.0], [2.0], [10.0], [12.0]];
        let y = array![0usize, 0, 1, 1];
        let mut nb = GaussianNb::default();
        nb.fit(x.view(), y.view()).unwrap();
        assert_eq!(nb.predict(array![[1.5], [9.0], [-4.0]].view()).unwrap(), array![0, 1, 0]);
    }

    #[test]
    fn test_constant_feature_survives_smoothing() {
        let x = array![[1.0, 0.0], [1.0, 0.2], [1.0, 5.0], [1.0, 5.2]];
        let y = array![0usize, 0, 1, 1];
        let mut nb = GaussianNb::default();
        nb.fit(x.view(), y.view()).unwrap();
        assert_eq!(nb.predict(x.view()).unwrap(), y);
    }

    #[test]
    fn test_uses_observed_class_indices() {
        let x = array![[0.0], [0.5], [9.0], [9.5]];
        let y = array![1usize, 1, 3, 3];
        let mut nb = GaussianNb::default();
        nb.fit(x.view(), y.view()).unwrap();
        assert_eq!(nb.predict(array![[9.2]].view()).unwrap(), array![3]);
    }

    #[test]
    fn test_clusters() {
        let (x, y) = three_clusters(10);
        let mut nb = GaussianNb::default();
        nb.fit(x.view(), y.view()).unwrap();
        assert_eq!(accuracy(&y, &nb.predict(x.view()).unwrap()), 1.0);
    }

    #[test]
    fn test_predict_before_fit() {
        assert!(GaussianNb::default().predict(array![[0.0]].view()).is_err());
    }
}
