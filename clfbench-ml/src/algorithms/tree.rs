//! CART classification tree with Gini impurity, backed by `linfa-trees`.

use crate::algorithms::{Classifier, check_fit_input, check_predict_input, training_set};
use crate::error::MlError;
use linfa::prelude::*;
use linfa_trees::{DecisionTree as CartModel, SplitQuality};
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

const ALGORITHM: &str = "decision_tree";

/// Growth limits of a single tree. Weights are summed sample weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeSettings {
    pub max_depth: Option<usize>,
    /// Minimum node weight before a split is attempted.
    pub min_weight_split: f32,
    pub min_weight_leaf: f32,
}

impl Default for TreeSettings {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_weight_split: 2.0,
            min_weight_leaf: 1.0,
        }
    }
}

impl TreeSettings {
    /// Depth-one tree used by AdaBoost. Sample weights may be fractional, so
    /// the weight floors are lifted.
    pub fn stump() -> Self {
        Self {
            max_depth: Some(1),
            min_weight_split: 0.0,
            min_weight_leaf: 0.0,
        }
    }
}

/// Fit one Gini tree, optionally with per-sample weights.
pub(crate) fn fit_cart(
    algorithm: &str,
    settings: &TreeSettings,
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, usize>,
    weights: Option<Array1<f32>>,
) -> Result<CartModel<f64, usize>, MlError> {
    let mut dataset = training_set(x, y);
    if let Some(weights) = weights {
        dataset = dataset.with_weights(weights);
    }
    CartModel::params()
        .split_quality(SplitQuality::Gini)
        .max_depth(settings.max_depth)
        .min_weight_split(settings.min_weight_split)
        .min_weight_leaf(settings.min_weight_leaf)
        .fit(&dataset)
        .map_err(|e| MlError::model(algorithm, e.to_string()))
}

/// Single classification tree.
pub struct DecisionTree {
    pub settings: TreeSettings,
    model: Option<CartModel<f64, usize>>,
    n_features: Option<usize>,
}

impl DecisionTree {
    pub fn new(settings: TreeSettings) -> Self {
        Self {
            settings,
            model: None,
            n_features: None,
        }
    }

    pub fn leaf_count(&self) -> Option<usize> {
        self.model.as_ref().map(|m| m.num_leaves())
    }
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new(TreeSettings::default())
    }
}

impl Classifier for DecisionTree {
    fn algorithm(&self) -> &'static str {
        ALGORITHM
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, usize>) -> Result<(), MlError> {
        check_fit_input(ALGORITHM, x, y)?;
        self.model = Some(fit_cart(ALGORITHM, &self.settings, x, y, None)?);
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
