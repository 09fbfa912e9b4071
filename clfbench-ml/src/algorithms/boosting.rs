//! Gradient-boosted regression trees on the binary log-loss.
//!
//! One tree learner serves three boosting styles:
//!
//! - **classic**: least-squares split search on the gradients, Newton leaf
//!   values, shallow depth-wise trees.
//! - **leaf-wise histogram**: features pre-binned into quantile buckets, the
//!   leaf with the largest gain is split first until a leaf budget is spent.
//! - **depth-wise exact**: exact greedy search over sorted values with a
//!   second-order gain and an L2 penalty on leaf weights.
//!
//! The catalog's `lightgbm` and `xgboost` entries are the last two styles of
//! this learner. Neither the LightGBM nor the XGBoost library is linked.

use crate::algorithms::{BinaryModel, BinaryScorer};
use crate::error::MlError;
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Numerically stable logistic function.
pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// How candidate thresholds are enumerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SplitFinder {
    /// Every midpoint between consecutive distinct values.
    Exact,
    /// Bucket boundaries from per-feature quantiles.
    Histogram { max_bins: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostingConfig {
    pub n_rounds: usize,
    pub learning_rate: f64,
    pub max_depth: Option<usize>,
    pub max_leaves: Option<usize>,
    /// L2 penalty on leaf weights.
    pub lambda: f64,
    /// Minimum gain required to split.
    pub gamma: f64,
    /// Minimum hessian sum in each child.
    pub min_child_weight: f64,
    pub min_samples_leaf: usize,
    pub split_finder: SplitFinder,
    /// Score splits by squared-error reduction on the gradients instead of the
    /// second-order gain.
    pub unit_hessian_splits: bool,
}

impl BoostingConfig {
    pub fn classic(n_rounds: usize, learning_rate: f64, max_depth: usize) -> Self {
        Self {
            n_rounds,
            learning_rate,
            max_depth: Some(max_depth),
            max_leaves: None,
            lambda: 0.0,
            gamma: 0.0,
            min_child_weight: 0.0,
            min_samples_leaf: 1,
            split_finder: SplitFinder::Exact,
            unit_hessian_splits: true,
        }
    }

    pub fn leaf_wise_histogram(n_rounds: usize, learning_rate: f64, max_leaves: usize) -> Self {
        Self {
            n_rounds,
            learning_rate,
            max_depth: None,
            max_leaves: Some(max_leaves),
            lambda: 0.0,
            gamma: 0.0,
            min_child_weight: 1e-3,
            min_samples_leaf: 20,
            split_finder: SplitFinder::Histogram { max_bins: 255 },
            unit_hessian_splits: false,
        }
    }

    pub fn depth_wise_exact(
        n_rounds: usize,
        learning_rate: f64,
        max_depth: usize,
        lambda: f64,
    ) -> Self {
        Self {
            n_rounds,
            learning_rate,
            max_depth: Some(max_depth),
            max_leaves: None,
            lambda,
            gamma: 0.0,
            min_child_weight: 1.0,
            min_samples_leaf: 1,
            split_finder: SplitFinder::Exact,
            unit_hessian_splits: false,
        }
    }

    fn validate(&self) -> Result<(), MlError> {
        if self.n_rounds == 0 || self.learning_rate <= 0.0 {
            return Err(MlError::model(
                "gradient_boosting",
                "n_rounds and learning_rate must be positive",
            ));
        }
        if self.lambda < 0.0 || self.gamma < 0.0 {
            return Err(MlError::model(
                "gradient_boosting",
                "lambda and gamma must not be negative",
            ));
        }
        if matches!(self.max_leaves, Some(l) if l < 2) {
            return Err(MlError::model("gradient_boosting", "max_leaves must be at least 2"));
        }
        if matches!(self.split_finder, SplitFinder::Histogram { max_bins } if max_bins < 2) {
            return Err(MlError::model("gradient_boosting", "max_bins must be at least 2"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum RegressionNode {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
struct RegressionTree {
    nodes: Vec<RegressionNode>,
}

impl RegressionTree {
    fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                RegressionNode::Leaf(value) => return *value,
                RegressionNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, RegressionNode::Leaf(_)))
            .count()
    }
}

/// Per-feature bucket boundaries; bucket `b` holds values `<= cuts[b]`, the
/// last bucket holds everything above the final cut.
#[derive(Debug, Clone)]
struct BinMapper {
    cuts: Vec<Vec<f64>>,
}

impl BinMapper {
    fn fit(x: ArrayView2<'_, f64>, max_bins: usize) -> Self {
        let cuts = x
            .columns()
            .into_iter()
            .map(|column| {
                let mut distinct: Vec<f64> = column.to_vec();
                distinct.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
                distinct.dedup();
                if distinct.len() <= max_bins {
                    distinct.windows(2).map(|w| w[0] + (w[1] - w[0]) / 2.0).collect()
                } else {
                    let mut cuts: Vec<f64> = (1..max_bins)
                        .map(|k| {
                            let hi = k * distinct.len() / max_bins;
                            distinct[hi - 1] + (distinct[hi] - distinct[hi - 1]) / 2.0
                        })
                        .collect();
                    cuts.dedup();
                    cuts
                }
            })
            .collect();
        Self { cuts }
    }

    fn bin(&self, feature: usize, value: f64) -> usize {
        self.cuts[feature].partition_point(|&c| c < value)
    }

    fn n_bins(&self, feature: usize) -> usize {
        self.cuts[feature].len() + 1
    }
}

/// Per-sample first and second derivatives of the loss.
struct Gradients<'a> {
    grad: &'a [f64],
    hess: &'a [f64],
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct OpenLeaf {
    node: usize,
    rows: Vec<usize>,
    depth: usize,
    best: Option<Candidate>,
}

/// Grows one regression tree on the current gradients.
///
/// The binned columns live only as long as one `fit_binary` call.
struct TreeGrower<'a, 'x> {
    config: &'a BoostingConfig,
    x: ArrayView2<'x, f64>,
    bins: Option<(&'a BinMapper, &'a [Vec<usize>])>,
}

impl TreeGrower<'_, '_> {
    fn grow(&self, gradients: &Gradients<'_>) -> RegressionTree {
        let rows: Vec<usize> = (0..self.x.nrows()).collect();
        let mut nodes = vec![RegressionNode::Leaf(0.0)];
        let best = self.find_split(&rows, 0, gradients);
        let mut open = vec![OpenLeaf {
            node: 0,
            rows,
            depth: 0,
            best,
        }];
        let mut finished: Vec<OpenLeaf> = Vec::new();

        loop {
            let leaves = open.len() + finished.len();
            if self.config.max_leaves.is_some_and(|max| leaves >= max) {
                break;
            }
            // split the open leaf with the largest gain first
            let Some(pos) = open
                .iter()
                .enumerate()
                .filter_map(|(i, leaf)| leaf.best.map(|c| (i, c.gain)))
                .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
                .map(|(i, _)| i)
            else {
                break;
            };

            let leaf = open.swap_remove(pos);
            let Some(split) = leaf.best else {
                finished.push(leaf);
                continue;
            };
            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = leaf
                .rows
                .into_iter()
                .partition(|&r| self.x[[r, split.feature]] <= split.threshold);

            let left = nodes.len();
            let right = left + 1;
            nodes.push(RegressionNode::Leaf(0.0));
            nodes.push(RegressionNode::Leaf(0.0));
            nodes[leaf.node] = RegressionNode::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };

            let depth = leaf.depth + 1;
            for (node, rows) in [(left, left_rows), (right, right_rows)] {
                let best = self.find_split(&rows, depth, gradients);
                open.push(OpenLeaf {
                    node,
                    rows,
                    depth,
                    best,
                });
            }
        }

        for leaf in open.into_iter().chain(finished) {
            nodes[leaf.node] = RegressionNode::Leaf(self.leaf_value(&leaf.rows, gradients));
        }
        RegressionTree { nodes }
    }

    /// Newton step `-G / (H + lambda)`, shrunk by the learning rate.
    fn leaf_value(&self, rows: &[usize], gradients: &Gradients<'_>) -> f64 {
        let g: f64 = rows.iter().map(|&r| gradients.grad[r]).sum();
        let h: f64 = rows.iter().map(|&r| gradients.hess[r]).sum();
        let denom = h + self.config.lambda;
        if denom <= 1e-12 {
            0.0
        } else {
            -g / denom * self.config.learning_rate
        }
    }

    fn find_split(
        &self,
        rows: &[usize],
        depth: usize,
        gradients: &Gradients<'_>,
    ) -> Option<Candidate> {
        if self.config.max_depth.is_some_and(|d| depth >= d) {
            return None;
        }
        if rows.len() < 2 * self.config.min_samples_leaf.max(1) {
            return None;
        }
        let best = match self.bins {
            Some((mapper, binned)) => self.histogram_split(rows, gradients, mapper, binned),
            None => self.exact_split(rows, gradients),
        };
        best.filter(|c| c.gain > 1e-12)
    }

    fn split_stats(&self, gradients: &Gradients<'_>, row: usize) -> (f64, f64) {
        let h = if self.config.unit_hessian_splits {
            1.0
        } else {
            gradients.hess[row]
        };
        (gradients.grad[row], h)
    }

    fn gain(&self, gl: f64, hl: f64, gr: f64, hr: f64) -> f64 {
        let lambda = self.config.lambda;
        let score = |g: f64, h: f64| {
            let denom = h + lambda;
            if denom <= 1e-12 { 0.0 } else { g * g / denom }
        };
        0.5 * (score(gl, hl) + score(gr, hr) - score(gl + gr, hl + hr)) - self.config.gamma
    }

    fn admissible(&self, count_left: usize, count_right: usize, hl: f64, hr: f64) -> bool {
        let min_leaf = self.config.min_samples_leaf.max(1);
        count_left >= min_leaf
            && count_right >= min_leaf
            && hl >= self.config.min_child_weight
            && hr >= self.config.min_child_weight
    }

    fn exact_split(&self, rows: &[usize], gradients: &Gradients<'_>) -> Option<Candidate> {
        let (g_total, h_total) = rows.iter().fold((0.0, 0.0), |acc, &r| {
            let (g, h) = self.split_stats(gradients, r);
            (acc.0 + g, acc.1 + h)
        });
        let hess_total: f64 = rows.iter().map(|&r| gradients.hess[r]).sum();

        let mut best: Option<Candidate> = None;
        let mut order = rows.to_vec();
        for feature in 0..self.x.ncols() {
            order.sort_by(|&a, &b| {
                self.x[[a, feature]]
                    .partial_cmp(&self.x[[b, feature]])
                    .unwrap_or(Ordering::Equal)
            });
            let (mut gl, mut hl, mut hess_left) = (0.0, 0.0, 0.0);
            for pos in 0..order.len() - 1 {
                let row = order[pos];
                let (g, h) = self.split_stats(gradients, row);
                gl += g;
                hl += h;
                hess_left += gradients.hess[row];

                let here = self.x[[row, feature]];
                let next = self.x[[order[pos + 1], feature]];
                if next - here <= 1e-12 * here.abs().max(1.0) {
                    continue;
                }
                let count_left = pos + 1;
                if !self.admissible(
                    count_left,
                    order.len() - count_left,
                    hess_left,
                    hess_total - hess_left,
                ) {
                    continue;
                }
                let gain = self.gain(gl, hl, g_total - gl, h_total - hl);
                if best.is_none_or(|b| gain > b.gain) {
                    best = Some(Candidate {
                        feature,
                        threshold: here + (next - here) / 2.0,
                        gain,
                    });
                }
            }
        }
        best
    }

    fn histogram_split(
        &self,
        rows: &[usize],
        gradients: &Gradients<'_>,
        mapper: &BinMapper,
        binned: &[Vec<usize>],
    ) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;
        for (feature, feature_bins) in binned.iter().enumerate() {
            let n_bins = mapper.n_bins(feature);
            if n_bins < 2 {
                continue;
            }
            // per bucket: split gradient, split hessian, true hessian, count
            let mut hist = vec![(0.0, 0.0, 0.0, 0usize); n_bins];
            for &row in rows {
                let (g, h) = self.split_stats(gradients, row);
                let slot = &mut hist[feature_bins[row]];
                slot.0 += g;
                slot.1 += h;
                slot.2 += gradients.hess[row];
                slot.3 += 1;
            }
            let total = hist.iter().fold((0.0, 0.0, 0.0, 0usize), |acc, b| {
                (acc.0 + b.0, acc.1 + b.1, acc.2 + b.2, acc.3 + b.3)
            });

            let mut left = (0.0, 0.0, 0.0, 0usize);
            for (bin, slot) in hist.iter().enumerate().take(n_bins - 1) {
                left = (left.0 + slot.0, left.1 + slot.1, left.2 + slot.2, left.3 + slot.3);
                if slot.3 == 0 {
                    continue;
                }
                let right_count = total.3 - left.3;
                if !self.admissible(left.3, right_count, left.2, total.2 - left.2) {
                    continue;
                }
                let gain = self.gain(left.0, left.1, total.0 - left.0, total.1 - left.1);
                if best.is_none_or(|b| gain > b.gain) {
                    best = Some(Candidate {
                        feature,
                        threshold: mapper.cuts[feature][bin],
                        gain,
                    });
                }
            }
        }
        best
    }
}

/// Binary gradient-boosted trees with a log-loss objective.
#[derive(Debug, Clone)]
pub struct GradientBoostedTrees {
    pub config: BoostingConfig,
}

impl GradientBoostedTrees {
    pub fn new(config: BoostingConfig) -> Self {
        Self { config }
    }
}

/// Additive raw-score model produced by [`GradientBoostedTrees`].
#[derive(Debug, Clone)]
pub struct BoostedTrees {
    base_score: f64,
    trees: Vec<RegressionTree>,
}

impl BoostedTrees {
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Largest number of leaves in any fitted tree.
    pub fn max_leaf_count(&self) -> usize {
        self.trees.iter().map(RegressionTree::leaf_count).max().unwrap_or(0)
    }
}

impl BinaryScorer for GradientBoostedTrees {
    type Model = BoostedTrees;

    fn fit_binary(
        &self,
        x: ArrayView2<'_, f64>,
        positive: &[bool],
    ) -> Result<BoostedTrees, MlError> {
        self.config.validate()?;
        let n = x.nrows();
        let target: Vec<f64> = positive.iter().map(|&p| if p { 1.0 } else { 0.0 }).collect();

        let prior = (target.iter().sum::<f64>() / n as f64).clamp(1e-6, 1.0 - 1e-6);
        let base_score = (prior / (1.0 - prior)).ln();

        let mapper = match self.config.split_finder {
            SplitFinder::Histogram { max_bins } => Some(BinMapper::fit(x, max_bins)),
            SplitFinder::Exact => None,
        };
        let binned: Vec<Vec<usize>> = match &mapper {
            Some(mapper) => (0..x.ncols())
                .map(|f| x.column(f).iter().map(|&v| mapper.bin(f, v)).collect())
                .collect(),
            None => Vec::new(),
        };
        let grower = TreeGrower {
            config: &self.config,
            x: x.reborrow(),
            bins: mapper.as_ref().map(|m| (m, binned.as_slice())),
        };

        let mut raw = vec![base_score; n];
        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];
        let mut trees = Vec::with_capacity(self.config.n_rounds);
        for _ in 0..self.config.n_rounds {
            for i in 0..n {
                let p = sigmoid(raw[i]);
                grad[i] = p - target[i];
                hess[i] = (p * (1.0 - p)).max(1e-16);
            }
            let tree = grower.grow(&Gradients {
                grad: &grad,
                hess: &hess,
            });
            for (i, row) in x.outer_iter().enumerate() {
                raw[i] += tree.predict_row(row);
            }
            trees.push(tree);
        }

        if raw.iter().any(|r| !r.is_finite()) {
            return Err(MlError::model("gradient_boosting", "boosting diverged"));
        }
        Ok(BoostedTrees { base_score, trees })
    }
}

impl BinaryModel for BoostedTrees {
    fn decision(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        x.outer_iter()
            .map(|row| {
                self.base_score
                    + self
                        .trees
                        .iter()
                        .map(|tree| tree.predict_row(row))
                        .sum::<f64>()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::test_data::{accuracy, blobs, three_clusters};
    use crate::algorithms::{Classifier, OneVsRest};
    use ndarray::{Array2, array};

    fn ring(n: usize) -> (Array2<f64>, Array1<usize>) {
        // class 1 inside radius 1, class 0 on a ring of radius 2
        let mut x = Array2::zeros((n, 2));
        let mut y = Array1::zeros(n);
        for i in 0..n {
            let angle = i as f64 * 0.7;
            let radius = if i % 2 == 0 { 0.5 } else { 2.0 };
            x[[i, 0]] = radius * angle.cos();
            x[[i, 1]] = radius * angle.sin();
            y[i] = usize::from(i % 2 == 0);
        }
        (x, y)
    }

    #[test]
    fn test_classic_style_learns_nonlinear_boundary() {
        let (x, y) = ring(200);
        let mut clf = OneVsRest::new(
            "gradient_boosting",
            GradientBoostedTrees::new(BoostingConfig::classic(50, 0.1, 3)),
        );
        clf.fit(x.view(), y.view()).unwrap();
        assert!(accuracy(&y, &clf.predict(x.view()).unwrap()) > 0.95);
    }

    #[test]
    fn test_leaf_wise_respects_leaf_budget() {
        let (x, y) = ring(200);
        let target: Vec<bool> = y.iter().map(|&c| c == 1).collect();
        let mut config = BoostingConfig::leaf_wise_histogram(20, 0.1, 4);
        config.min_samples_leaf = 5;
        let model = GradientBoostedTrees::new(config)
            .fit_binary(x.view(), &target)
            .unwrap();
        assert_eq!(model.tree_count(), 20);
        assert!(model.max_leaf_count() <= 4);
        assert!(model.max_leaf_count() > 1);
    }

    #[test]
    fn test_depth_wise_exact_separates_blobs() {
        let (x, y) = blobs(30);
        let mut clf = OneVsRest::new(
            "xgboost",
            GradientBoostedTrees::new(BoostingConfig::depth_wise_exact(30, 0.3, 6, 1.0)),
        );
        clf.fit(x.view(), y.view()).unwrap();
        assert_eq!(accuracy(&y, &clf.predict(x.view()).unwrap()), 1.0);
    }

    #[test]
    fn test_histogram_multiclass() {
        let (x, y) = three_clusters(30);
        let mut config = BoostingConfig::leaf_wise_histogram(30, 0.1, 8);
        config.min_samples_leaf = 3;
        let mut clf = OneVsRest::new("lightgbm", GradientBoostedTrees::new(config));
        clf.fit(x.view(), y.view()).unwrap();
        assert!(accuracy(&y, &clf.predict(x.view()).unwrap()) > 0.95);
    }

    #[test]
    fn test_bin_mapper_boundaries() {
        let x = array![[1.0], [2.0], [2.0], [4.0]];
        let mapper = BinMapper::fit(x.view(), 255);
        assert_eq!(mapper.cuts[0], vec![1.5, 3.0]);
        assert_eq!(mapper.bin(0, 1.0), 0);
        assert_eq!(mapper.bin(0, 1.5), 0);
        assert_eq!(mapper.bin(0, 2.0), 1);
        assert_eq!(mapper.bin(0, 9.0), 2);

        let wide: Array2<f64> = Array2::from_shape_fn((100, 1), |(i, _)| i as f64);
        let mapper = BinMapper::fit(wide.view(), 10);
        assert_eq!(mapper.n_bins(0), 10);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let (x, y) = blobs(5);
        let target: Vec<bool> = y.iter().map(|&c| c == 1).collect();
        let params = GradientBoostedTrees::new(BoostingConfig::classic(0, 0.1, 3));
        assert!(params.fit_binary(x.view(), &target).is_err());
    }

    #[test]
    fn test_boosting_styles_differ() {
        let histogram = BoostingConfig::leaf_wise_histogram(100, 0.1, 31);
        assert_eq!(histogram.split_finder, SplitFinder::Histogram { max_bins: 255 });
        assert_eq!((histogram.max_depth, histogram.max_leaves), (None, Some(31)));
        assert!(!histogram.unit_hessian_splits);

        let exact = BoostingConfig::depth_wise_exact(100, 0.3, 6, 1.0);
        assert_eq!(exact.split_finder, SplitFinder::Exact);
        assert_eq!((exact.max_depth, exact.max_leaves), (Some(6), None));
        assert_eq!(exact.lambda, 1.0);

        let classic = BoostingConfig::classic(50, 0.1, 3);
        assert!(classic.unit_hessian_splits);
        assert_ne!(classic, exact);
    }

    #[test]
    fn test_sigmoid_is_stable() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(-1000.0) >= 0.0);
        assert!(sigmoid(1000.0) <= 1.0);
        assert!((sigmoid(2.0) + sigmoid(-2.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_fitted_model_outlives_training_view() {
        let (x, y) = blobs(20);
        let target: Vec<bool> = y.iter().map(|&c| c == 1).collect();
        let mut config = BoostingConfig::leaf_wise_histogram(5, 0.3, 4);
        config.min_samples_leaf = 5;
        let model = {
            let owned = x.to_owned();
            GradientBoostedTrees::new(config)
                .fit_binary(owned.view(), &target)
                .unwrap()
        };
        let scores = model.decision(x.view());
        for (score, positive) in scores.iter().zip(&target) {
            assert_eq!(*score > 0.0, *positive);
        }
    }
}
