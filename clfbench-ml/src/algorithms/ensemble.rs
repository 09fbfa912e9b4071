//! Tree ensembles over `linfa-trees`: bagged random forest and SAMME AdaBoost.

use crate::algorithms::tree::{TreeSettings, fit_cart};
use crate::algorithms::{Classifier, argmax, check_fit_input, check_predict_input};
use crate::error::MlError;
use linfa::prelude::*;
use linfa_trees::DecisionTree as CartModel;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

const FOREST: &str = "random_forest";
const ADABOOST: &str = "adaboost";

struct Member {
    /// Sorted feature columns this tree was trained on.
    features: Vec<usize>,
    tree: CartModel<f64, usize>,
}

/// Bootstrap-aggregated CART trees, each over a random feature subset.
/// Predicts the class with the most tree votes.
pub struct RandomForest {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    /// Share of the features each tree sees, in `(0, 1]`.
    pub feature_fraction: f64,
    pub seed: u64,
    members: Vec<Member>,
    n_classes: usize,
    n_features: Option<usize>,
}

impl RandomForest {
    pub fn new(n_estimators: usize, max_depth: Option<usize>, seed: u64) -> Self {
        Self {
            n_estimators,
            max_depth,
            feature_fraction: 0.7,
            seed,
            members: Vec::new(),
            n_classes: 0,
            n_features: None,
        }
    }

    pub fn with_feature_fraction(mut self, fraction: f64) -> Self {
        self.feature_fraction = fraction;
        self
    }

    pub fn tree_count(&self) -> usize {
        self.members.len()
    }

    /// Share of trees voting for each class.
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, MlError> {
        check_predict_input(FOREST, x, self.n_features)?;
        let mut votes = Array2::<f64>::zeros((x.nrows(), self.n_classes));
        for member in &self.members {
            let columns = x.select(Axis(1), &member.features);
            let predicted: Array1<usize> = member.tree.predict(&columns);
            for (row, &class) in predicted.iter().enumerate() {
                votes[[row, class]] += 1.0;
            }
        }
        Ok(votes / self.members.len() as f64)
    }
}

impl Classifier for RandomForest {
    fn algorithm(&self) -> &'static str {
        FOREST
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, usize>) -> Result<(), MlError> {
        check_fit_input(FOREST, x, y)?;
        if self.n_estimators == 0 {
            return Err(MlError::model(FOREST, "n_estimators must be positive"));
        }
        if !(self.feature_fraction > 0.0 && self.feature_fraction <= 1.0) {
            return Err(MlError::model(FOREST, "feature_fraction must be in (0, 1]"));
        }
        let (n, d) = x.dim();
        if d == 0 {
            return Err(MlError::model(FOREST, "cannot fit on zero features"));
        }
        let n_classes = y.iter().max().map_or(0, |m| m + 1);
        let per_tree = ((d as f64 * self.feature_fraction).ceil() as usize).clamp(1, d);
        let settings = TreeSettings {
            max_depth: self.max_depth,
            ..TreeSettings::default()
        };

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut members = Vec::with_capacity(self.n_estimators);
        for _ in 0..self.n_estimators {
            let rows: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let mut features = index::sample(&mut rng, d, per_tree).into_vec();
            features.sort_unstable();

            let sample_x = x.select(Axis(0), &rows).select(Axis(1), &features);
            let sample_y = y.select(Axis(0), &rows);
            let tree = fit_cart(FOREST, &settings, sample_x.view(), sample_y.view(), None)?;
            members.push(Member { features, tree });
        }

        tracing::debug!(
            trees = members.len(),
            features_per_tree = per_tree,
            "Random forest fit complete"
        );
        self.members = members;
        self.n_classes = n_classes;
        self.n_features = Some(d);
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<usize>, MlError> {
        let proba = self.predict_proba(x)?;
        Ok(proba
            .outer_iter()
            .map(|row| argmax(row.iter().copied()))
            .collect())
    }
}

/// Multi-class AdaBoost (SAMME) over weighted decision stumps.
pub struct AdaBoost {
    pub n_estimators: usize,
    pub learning_rate: f64,
    stages: Vec<(CartModel<f64, usize>, f64)>,
    n_classes: usize,
    n_features: Option<usize>,
}

impl AdaBoost {
    pub fn new(n_estimators: usize, learning_rate: f64) -> Self {
        Self {
            n_estimators,
            learning_rate,
            stages: Vec::new(),
            n_classes: 0,
            n_features: None,
        }
    }

    /// Number of boosting stages kept after early termination.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

impl Classifier for AdaBoost {
    fn algorithm(&self) -> &'static str {
        ADABOOST
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, usize>) -> Result<(), MlError> {
        check_fit_input(ADABOOST, x, y)?;
        if self.n_estimators == 0 || self.learning_rate <= 0.0 {
            return Err(MlError::model(
                ADABOOST,
                "n_estimators and learning_rate must be positive",
            ));
        }
        let n = y.len();
        let n_classes = y.iter().max().map_or(0, |m| m + 1);
        let stump_settings = TreeSettings::stump();
        // renormalized to mean one after every stage
        let mut weights = Array1::<f64>::ones(n);
        let mut stages = Vec::new();

        for _ in 0..self.n_estimators {
            let stump = fit_cart(
                ADABOOST,
                &stump_settings,
                x,
                y,
                Some(weights.mapv(|w| w as f32)),
            )?;
            let predicted: Array1<usize> = stump.predict(&x);
            let missed: Vec<bool> = predicted.iter().zip(y.iter()).map(|(p, t)| p != t).collect();

            let error = weights
                .iter()
                .zip(&missed)
                .filter(|(_, m)| **m)
                .map(|(w, _)| w)
                .sum::<f64>()
                / weights.sum();

            if error <= 0.0 {
                stages.push((stump, 1.0));
                break;
            }
            // no better than chance for this many classes
            if n_classes > 1 && error >= 1.0 - 1.0 / n_classes as f64 {
                if stages.is_empty() {
                    stages.push((stump, 1.0));
                }
                break;
            }

            let alpha = self.learning_rate
                * (((1.0 - error) / error).ln() + ((n_classes - 1) as f64).ln());
            for (w, &miss) in weights.iter_mut().zip(&missed) {
                if miss {
                    *w *= alpha.exp();
                }
            }
            let mean = weights.mean().unwrap_or(1.0);
            weights.mapv_inplace(|w| w / mean);
            stages.push((stump, alpha));
        }

        tracing::debug!(stages = stages.len(), "AdaBoost fit complete");
        self.stages = stages;
        self.n_classes = n_classes;
        self.n_features = Some(x.ncols());
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<usize>, MlError> {
        check_predict_input(ADABOOST, x, self.n_features)?;
        let mut votes = Array2::<f64>::zeros((x.nrows(), self.n_classes));
        for (stump, alpha) in &self.stages {
            let predicted: Array1<usize> = stump.predict(&x);
            for (row, class) in predicted.iter().enumerate() {
                votes[[row, *class]] += alpha;
            }
        }
        Ok(votes
            .outer_iter()
            .map(|row| argmax(row.iter().copied()))
            .collect())
    }
}
