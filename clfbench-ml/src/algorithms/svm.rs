//! Soft-margin support vector classifier with an RBF kernel, backed by `linfa-svm`.

use crate::algorithms::{BinaryModel, BinaryScorer};
use crate::error::MlError;
use linfa::Dataset;
use linfa::prelude::*;
use linfa_svm::Svm;
use ndarray::{Array1, ArrayView2};

const ALGORITHM: &str = "svc";

/// `1 / (n_features · Var(X))` over every entry of `x`, or 1 for constant input.
pub fn scale_gamma(x: ArrayView2<'_, f64>) -> f64 {
    let count = x.len() as f64;
    if count == 0.0 {
        return 1.0;
    }
    let mean = x.sum() / count;
    let var = x.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / count;
    if var > 0.0 {
        1.0 / (x.ncols() as f64 * var)
    } else {
        1.0
    }
}

/// Settings of a binary RBF-kernel SVM, `k(a, b) = exp(-gamma · |a - b|²)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RbfSvm {
    /// Penalty on margin violations, applied to both classes.
    pub c: f64,
    /// Kernel width; `None` derives it from the training data.
    pub gamma: Option<f64>,
    /// Solver stopping tolerance.
    pub tol: f64,
}

impl RbfSvm {
    pub fn new(c: f64, gamma: Option<f64>, tol: f64) -> Self {
        Self { c, gamma, tol }
    }
}

impl Default for RbfSvm {
    fn default() -> Self {
        Self::new(1.0, None, 1e-3)
    }
}

/// A trained machine with the kernel width it was trained with.
pub struct FittedSvm {
    machine: Svm<f64, bool>,
    gamma: f64,
}

impl FittedSvm {
    pub fn support_count(&self) -> usize {
        self.machine.nsupport()
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }
}

impl BinaryScorer for RbfSvm {
    type Model = FittedSvm;

    fn fit_binary(
        &self,
        x: ArrayView2<'_, f64>,
        positive: &[bool],
    ) -> Result<FittedSvm, MlError> {
        if self.c <= 0.0 || self.tol <= 0.0 {
            return Err(MlError::model(ALGORITHM, "C and tol must be positive"));
        }
        if positive.iter().all(|&p| p) || !positive.iter().any(|&p| p) {
            return Err(MlError::model(ALGORITHM, "both classes must be present"));
        }
        let gamma = self.gamma.unwrap_or_else(|| scale_gamma(x));
        if !(gamma.is_finite() && gamma > 0.0) {
            return Err(MlError::model(ALGORITHM, format!("invalid gamma {gamma}")));
        }

        let dataset = Dataset::new(x.to_owned(), Array1::from(positive.to_vec()));
        let machine = Svm::<_, bool>::params()
            .pos_neg_weights(self.c, self.c)
            .eps(self.tol)
            .gaussian_kernel(1.0 / gamma)
            .fit(&dataset)
            .map_err(|e| MlError::model(ALGORITHM, e.to_string()))?;

        tracing::debug!(
            support_vectors = machine.nsupport(),
            gamma,
            "SVC fit complete"
        );
        Ok(FittedSvm { machine, gamma })
    }
}

impl BinaryModel for FittedSvm {
    fn decision(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        x.outer_iter()
            .map(|row| self.machine.weighted_sum(&row) - self.machine.rho)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::test_data::{accuracy, blobs, three_clusters};
    use crate::algorithms::{Classifier, OneVsRest};
    use ndarray::array;

    #[test]
    fn test_scale_gamma() {
        let x = array![[0.0, 2.0], [2.0, 0.0]];
        // mean 1, variance 1, two features
        assert!((scale_gamma(x.view()) - 0.5).abs() < 1e-12);
        assert_eq!(scale_gamma(array![[3.0, 3.0]].view()), 1.0);
    }

    #[test]
    fn test_separates_blobs_with_few_support_vectors() {
        let (x, y) = blobs(30);
        let target: Vec<bool> = y.iter().map(|&c| c == 1).collect();
        let svm = RbfSvm::default().fit_binary(x.view(), &target).unwrap();
        let scores = svm.decision(x.view());
        for (score, positive) in scores.iter().zip(&target) {
            assert_eq!(*score > 0.0, *positive);
        }
        assert!(svm.support_count() < x.nrows());
        assert!((svm.gamma() - scale_gamma(x.view())).abs() < 1e-12);
    }

    #[test]
    fn test_xor_needs_the_kernel() {
        let x = array![
            [1.0, 1.0],
            [-1.0, -1.0],
            [1.0, -1.0],
            [-1.0, 1.0],
            [1.2, 0.9],
            [-0.9, -1.1],
            [1.1, -0.8],
            [-1.2, 1.0]
        ];
        let y = array![0usize, 0, 1, 1, 0, 0, 1, 1];
        let mut clf = OneVsRest::new(ALGORITHM, RbfSvm::new(10.0, Some(1.0), 1e-3));
        clf.fit(x.view(), y.view()).unwrap();
        assert_eq!(clf.predict(x.view()).unwrap(), y);
    }

    #[test]
    fn test_multiclass() {
        let (x, y) = three_clusters(15);
        let mut clf = OneVsRest::new(ALGORITHM, RbfSvm::default());
        clf.fit(x.view(), y.view()).unwrap();
        assert!(accuracy(&y, &clf.predict(x.view()).unwrap()) > 0.95);
    }

    #[test]
    fn test_rejects_single_class_and_bad_settings() {
        let x = array![[0.0], [1.0]];
        assert!(RbfSvm::default().fit_binary(x.view(), &[true, true]).is_err());
        let bad = RbfSvm::new(0.0, None, 1e-3);
        assert!(bad.fit_binary(x.view(), &[true, false]).is_err());
        let bad = RbfSvm::new(1.0, Some(-1.0), 1e-3);
        assert!(bad.fit_binary(x.view(), &[true, false]).is_err());
    }
}
