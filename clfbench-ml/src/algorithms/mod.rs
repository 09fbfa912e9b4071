//! Classifiers benchmarked by the runner.
//!
//! Every learner implements [`Classifier`]. Most wrap a `linfa` estimator;
//! learners that only separate two classes implement [`BinaryScorer`] and are
//! lifted to any number of classes by [`OneVsRest`].

pub mod bayes;
pub mod boosting;
pub mod classical;
pub mod ensemble;
pub mod linear;
pub mod neighbors;
pub mod svm;
pub mod tree;

pub use bayes::GaussianNb;
pub use boosting::{BoostedTrees, BoostingConfig, GradientBoostedTrees, SplitFinder};
pub use classical::ClassicalAlgorithm;
pub use ensemble::{AdaBoost, RandomForest};
pub use linear::LogisticRegression;
pub use neighbors::KNearestNeighbors;
pub use svm::{FittedSvm, RbfSvm};
pub use tree::{DecisionTree, TreeSettings};

use crate::error::MlError;
use linfa::{Dataset, DatasetBase};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// A trainable, predictable classifier over encoded class indices.
pub trait Classifier: Send {
    /// Stable identifier of the algorithm (not the registry name).
    fn algorithm(&self) -> &'static str;

    /// Fit on `x` (rows × features) and class indices `y`.
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, usize>) -> Result<(), MlError>;

    /// Predict a class index for every row of `x`.
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<usize>, MlError>;
}

/// Settings of a two-class learner. Fitting yields a separate [`BinaryModel`].
pub trait BinaryScorer: Send {
    type Model: BinaryModel;

    fn fit_binary(
        &self,
        x: ArrayView2<'_, f64>,
        positive: &[bool],
    ) -> Result<Self::Model, MlError>;
}

/// A fitted two-class learner; a positive score favors the positive class.
pub trait BinaryModel: Send {
    fn decision(&self, x: ArrayView2<'_, f64>) -> Array1<f64>;
}

/// Owned `linfa` training set over encoded class indices.
pub(crate) fn training_set(
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, usize>,
) -> DatasetBase<Array2<f64>, Array1<usize>> {
    Dataset::new(x.to_owned(), y.to_owned())
}

/// Validate training input shared by every learner.
pub(crate) fn check_fit_input(
    algorithm: &str,
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, usize>,
) -> Result<(), MlError> {
    if x.nrows() == 0 {
        return Err(MlError::model(algorithm, "cannot fit on zero rows"));
    }
    if x.nrows() != y.len() {
        return Err(MlError::model(
            algorithm,
            format!("{} feature rows but {} labels", x.nrows(), y.len()),
        ));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(MlError::model(algorithm, "features contain non-finite values"));
    }
    Ok(())
}

/// Validate prediction input against the fitted feature count.
pub(crate) fn check_predict_input(
    algorithm: &str,
    x: ArrayView2<'_, f64>,
    fitted_features: Option<usize>,
) -> Result<(), MlError> {
    let Some(expected) = fitted_features else {
        return Err(MlError::model(algorithm, "predict called before fit"));
    };
    if x.ncols() != expected {
        return Err(MlError::model(
            algorithm,
            format!("fitted on {expected} features, got {}", x.ncols()),
        ));
    }
    Ok(())
}

/// Distinct class indices present in `y`, ascending.
pub(crate) fn observed_classes(y: ArrayView1<'_, usize>) -> Vec<usize> {
    let mut classes: Vec<usize> = y.iter().copied().collect();
    classes.sort_unstable();
    classes.dedup();
    classes
}

/// Index of the largest value; the first one wins ties.
pub(crate) fn argmax(values: impl IntoIterator<Item = f64>) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (i, v) in values.into_iter().enumerate() {
        if v > best_value {
            best = i;
            best_value = v;
        }
    }
    best
}

enum Fitted<M> {
    /// Only one class was seen during training.
    Constant(usize),
    Binary {
        negative: usize,
        positive: usize,
        model: M,
    },
    OneVsRest {
        classes: Vec<usize>,
        models: Vec<M>,
    },
}

/// Lifts a [`BinaryScorer`] to a multi-class [`Classifier`].
///
/// Two observed classes train one model (the higher class index is positive);
/// more train one model per class and predict the highest score.
pub struct OneVsRest<S: BinaryScorer> {
    algorithm: &'static str,
    params: S,
    fitted: Option<Fitted<S::Model>>,
    n_features: Option<usize>,
}

impl<S: BinaryScorer> OneVsRest<S> {
    pub fn new(algorithm: &'static str, params: S) -> Self {
        Self {
            algorithm,
            params,
            fitted: None,
            n_features: None,
        }
    }

    pub fn params(&self) -> &S {
        &self.params
    }
}

impl<S: BinaryScorer> Classifier for OneVsRest<S> {
    fn algorithm(&self) -> &'static str {
        self.algorithm
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, usize>) -> Result<(), MlError> {
        check_fit_input(self.algorithm, x, y)?;
        let classes = observed_classes(y);

        let fitted = if classes.len() == 1 {
            Fitted::Constant(classes[0])
        } else if classes.len() == 2 {
            let (negative, positive) = (classes[0], classes[1]);
            let target: Vec<bool> = y.iter().map(|&c| c == positive).collect();
            Fitted::Binary {
                negative,
                positive,
                model: self.params.fit_binary(x, &target)?,
            }
        } else {
            let mut models = Vec::with_capacity(classes.len());
            for &class in &classes {
                let target: Vec<bool> = y.iter().map(|&c| c == class).collect();
                models.push(self.params.fit_binary(x, &target)?);
            }
            Fitted::OneVsRest { classes, models }
        };

        self.fitted = Some(fitted);
        self.n_features = Some(x.ncols());
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<usize>, MlError> {
        check_predict_input(self.algorithm, x, self.n_features)?;
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| MlError::model(self.algorithm, "predict called before fit"))?;

        let predictions = match fitted {
            Fitted::Constant(class) => Array1::from_elem(x.nrows(), *class),
            Fitted::Binary {
                negative,
                positive,
                model,
            } => model
                .decision(x)
                .mapv(|score| if score > 0.0 { *positive } else { *negative }),
            Fitted::OneVsRest { classes, models } => {
                let scores: Vec<Array1<f64>> = models.iter().map(|m| m.decision(x)).collect();
                (0..x.nrows())
                    .map(|row| classes[argmax(scores.iter().map(|s| s[row]))])
                    .collect()
            }
        };
        Ok(predictions)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    struct FirstFeatureSign;

    impl BinaryScorer for FirstFeatureSign {
        type Model = FirstFeatureSign;

        fn fit_binary(
            &self,
            _x: ArrayView2<'_, f64>,
            _y: &[bool],
        ) -> Result<FirstFeatureSign, MlError> {
            Ok(FirstFeatureSign)
        }
    }

    impl BinaryModel for FirstFeatureSign {
        fn decision(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
            x.column(0).to_owned()
        }
    }

    #[test]
    fn test_one_vs_rest_binary_maps_to_observed_classes() {
        let mut clf = OneVsRest::new("sign", FirstFeatureSign);
        let x = array![[-1.0], [1.0]];
        clf.fit(x.view(), array![2usize, 5].view()).unwrap();
        let pred = clf.predict(array![[3.0], [-3.0]].view()).unwrap();
        assert_eq!(pred, array![5, 2]);
    }

    #[test]
    fn test_one_vs_rest_single_class_is_constant() {
        let mut clf = OneVsRest::new("sign", FirstFeatureSign);
        clf.fit(array![[1.0], [2.0]].view(), array![1usize, 1].view())
            .unwrap();
        let pred = clf.predict(array![[-9.0]].view()).unwrap();
        assert_eq!(pred, array![1]);
    }

    #[test]
    fn test_predict_before_fit_and_width_mismatch() {
        let clf = OneVsRest::new("sign", FirstFeatureSign);
        assert!(clf.predict(array![[1.0]].view()).is_err());

        let mut clf = OneVsRest::new("sign", FirstFeatureSign);
        clf.fit(array![[1.0], [2.0]].view(), array![0usize, 1].view())
            .unwrap();
        assert!(clf.predict(array![[1.0, 2.0]].view()).is_err());
    }

    #[test]
    fn test_fit_input_checks() {
        let x = array![[1.0], [f64::NAN]];
        assert!(check_fit_input("t", x.view(), array![0usize, 1].view()).is_err());
        let x = array![[1.0], [2.0]];
        assert!(check_fit_input("t", x.view(), array![0usize].view()).is_err());
    }

    #[test]
    fn test_argmax_prefers_first_on_ties() {
        assert_eq!(argmax([0.5, 0.9, 0.9]), 1);
        assert_eq!(argmax([f64::NEG_INFINITY]), 0);
    }
}
