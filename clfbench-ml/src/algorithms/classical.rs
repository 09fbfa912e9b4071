//! Catalog of the benchmarked algorithms and their hyper-parameters.

use crate::algorithms::{
    AdaBoost, BoostingConfig, Classifier, DecisionTree, GaussianNb, GradientBoostedTrees,
    KNearestNeighbors, LogisticRegression, OneVsRest, RandomForest, RbfSvm, SplitFinder,
    TreeSettings,
};
use serde::{Deserialize, Serialize};

/// A classical classifier with its settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum ClassicalAlgorithm {
    LogisticRegression {
        c: f64,
        max_iter: usize,
        tol: f64,
    },
    RandomForest {
        n_estimators: usize,
        max_depth: Option<usize>,
    },
    GradientBoosting {
        n_estimators: usize,
        learning_rate: f64,
        max_depth: usize,
    },
    #[serde(rename = "adaboost")]
    AdaBoost {
        n_estimators: usize,
        learning_rate: f64,
    },
    Svc {
        c: f64,
        /// `None` uses `1 / (n_features · Var(X))`.
        gamma: Option<f64>,
        tol: f64,
    },
    Knn {
        n_neighbors: usize,
    },
    NaiveBayes {
        var_smoothing: f64,
    },
    DecisionTree {
        max_depth: Option<usize>,
    },
    /// LightGBM-style boosting: leaf-wise growth over histogram bins. Trained by
    /// the in-crate booster, not by the LightGBM library.
    #[serde(rename = "lightgbm")]
    LightGbm {
        n_estimators: usize,
        learning_rate: f64,
        num_leaves: usize,
        max_bins: usize,
        min_child_samples: usize,
    },
    /// XGBoost-style boosting: depth-wise exact greedy splits with an L2 leaf
    /// penalty. Trained by the in-crate booster, not by the XGBoost library.
    #[serde(rename = "xgboost")]
    XgBoost {
        n_estimators: usize,
        learning_rate: f64,
        max_depth: usize,
        reg_lambda: f64,
    },
}

impl ClassicalAlgorithm {
    /// Stable snake_case identifier.
    pub fn id(&self) -> &'static str {
        match self {
            Self::LogisticRegression { .. } => "logistic_regression",
            Self::RandomForest { .. } => "random_forest",
            Self::GradientBoosting { .. } => "gradient_boosting",
            Self::AdaBoost { .. } => "adaboost",
            Self::Svc { .. } => "svc",
            Self::Knn { .. } => "knn",
            Self::NaiveBayes { .. } => "naive_bayes",
            Self::DecisionTree { .. } => "decision_tree",
            Self::LightGbm { .. } => "lightgbm",
            Self::XgBoost { .. } => "xgboost",
        }
    }

    pub fn logistic_regression() -> Self {
        Self::LogisticRegression {
            c: 1.0,
            max_iter: 1000,
            tol: 1e-4,
        }
    }

    pub fn random_forest() -> Self {
        Self::RandomForest {
            n_estimators: 50,
            max_depth: None,
        }
    }

    pub fn gradient_boosting() -> Self {
        Self::GradientBoosting {
            n_estimators: 50,
            learning_rate: 0.1,
            max_depth: 3,
        }
    }

    pub fn adaboost() -> Self {
        Self::AdaBoost {
            n_estimators: 50,
            learning_rate: 1.0,
        }
    }

    pub fn svc() -> Self {
        Self::Svc {
            c: 1.0,
            gamma: None,
            tol: 1e-3,
        }
    }

    pub fn knn() -> Self {
        Self::Knn { n_neighbors: 5 }
    }

    pub fn naive_bayes() -> Self {
        Self::NaiveBayes {
            var_smoothing: 1e-9,
        }
    }

    pub fn decision_tree() -> Self {
        Self::DecisionTree { max_depth: None }
    }

    pub fn lightgbm() -> Self {
        Self::LightGbm {
            n_estimators: 100,
            learning_rate: 0.1,
            num_leaves: 31,
            max_bins: 255,
            min_child_samples: 20,
        }
    }

    pub fn xgboost() -> Self {
        Self::XgBoost {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            reg_lambda: 1.0,
        }
    }

    /// Build an unfitted classifier; `seed` drives every randomized learner.
    pub fn build(&self, seed: u64) -> Box<dyn Classifier> {
        match *self {
            Self::LogisticRegression { c, max_iter, tol } => {
                Box::new(LogisticRegression::new(c, max_iter as u64, tol))
            }
            Self::RandomForest {
                n_estimators,
                max_depth,
            } => Box::new(RandomForest::new(n_estimators, max_depth, seed)),
            Self::AdaBoost {
                n_estimators,
                learning_rate,
            } => Box::new(AdaBoost::new(n_estimators, learning_rate)),
            Self::Svc { c, gamma, tol } => {
                Box::new(OneVsRest::new(self.id(), RbfSvm::new(c, gamma, tol)))
            }
            Self::Knn { n_neighbors } => Box::new(KNearestNeighbors::new(n_neighbors)),
            Self::NaiveBayes { var_smoothing } => Box::new(GaussianNb::new(var_smoothing)),
            Self::DecisionTree { max_depth } => Box::new(DecisionTree::new(TreeSettings {
                max_depth,
                ..TreeSettings::default()
            })),
            Self::GradientBoosting {
                n_estimators,
                learning_rate,
                max_depth,
            } => boosted(
                self.id(),
                BoostingConfig::classic(n_estimators, learning_rate, max_depth),
            ),
            Self::LightGbm {
                n_estimators,
                learning_rate,
                num_leaves,
                max_bins,
                min_child_samples,
            } => {
                let mut config =
                    BoostingConfig::leaf_wise_histogram(n_estimators, learning_rate, num_leaves);
                config.split_finder = SplitFinder::Histogram { max_bins };
                config.min_samples_leaf = min_child_samples;
                boosted(self.id(), config)
            }
            Self::XgBoost {
                n_estimators,
                learning_rate,
                max_depth,
                reg_lambda,
            } => boosted(
                self.id(),
                BoostingConfig::depth_wise_exact(n_estimators, learning_rate, max_depth, reg_lambda),
            ),
        }
    }
}

fn boosted(algorithm: &'static str, config: BoostingConfig) -> Box<dyn Classifier> {
    Box::new(OneVsRest::new(algorithm, GradientBoostedTrees::new(config)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::test_data::{accuracy, three_clusters};
    use pretty_assertions::assert_eq;

    fn catalog() -> Vec<ClassicalAlgorithm> {
        vec![
            ClassicalAlgorithm::logistic_regression(),
            ClassicalAlgorithm::random_forest(),
            ClassicalAlgorithm::gradient_boosting(),
            ClassicalAlgorithm::adaboost(),
            ClassicalAlgorithm::svc(),
            ClassicalAlgorithm::knn(),
            ClassicalAlgorithm::naive_bayes(),
            ClassicalAlgorithm::decision_tree(),
            ClassicalAlgorithm::lightgbm(),
            ClassicalAlgorithm::xgboost(),
        ]
    }

    #[test]
    fn test_build_reports_matching_id() {
        for algorithm in catalog() {
            assert_eq!(algorithm.build(0).algorithm(), algorithm.id());
        }
    }

    #[test]
    fn test_every_algorithm_learns_clusters() {
        let (x, y) = three_clusters(25);
        for algorithm in catalog() {
            let mut clf = algorithm.build(42);
            clf.fit(x.view(), y.view()).unwrap();
            let acc = accuracy(&y, &clf.predict(x.view()).unwrap());
            assert!(acc > 0.9, "{} reached only {acc}", algorithm.id());
        }
    }

    #[test]
    fn test_serde_tagging() {
        let json = serde_json::to_value(ClassicalAlgorithm::knn()).unwrap();
        assert_eq!(json, serde_json::json!({"algorithm": "knn", "n_neighbors": 5}));
        let back: ClassicalAlgorithm = serde_json::from_value(json).unwrap();
        assert_eq!(back, ClassicalAlgorithm::knn());

        for algorithm in catalog() {
            let json = serde_json::to_value(&algorithm).unwrap();
            assert_eq!(json["algorithm"], algorithm.id());
        }
    }
}
