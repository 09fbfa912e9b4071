//! Accuracy, support-weighted precision/recall/F1 and the confusion matrix.

use crate::error::MlError;
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Counts indexed `[true class, predicted class]`.
pub type ConfusionMatrix = Array2<u64>;

/// Scores of one model on the test partition, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
}

impl ClassificationMetrics {
    /// Score `predicted` against `truth` over `n_classes` classes.
    ///
    /// Precision, recall and F1 are averaged with weights equal to each class's
    /// true support. A class with no predictions (or no true rows) scores 0.
    pub fn compute(
        truth: ArrayView1<'_, usize>,
        predicted: ArrayView1<'_, usize>,
        n_classes: usize,
    ) -> Result<Self, MlError> {
        let cm = confusion_matrix(truth, predicted, n_classes)?;
        let total = truth.len() as f64;

        let (mut precision, mut recall, mut f1) = (0.0, 0.0, 0.0);
        for class in 0..n_classes {
            let tp = cm[[class, class]] as f64;
            let support = cm.row(class).sum() as f64;
            let predicted_count = cm.column(class).sum() as f64;
            if support == 0.0 {
                continue;
            }
            let p = if predicted_count > 0.0 { tp / predicted_count } else { 0.0 };
            let r = tp / support;
            let f = if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 };
            let weight = support / total;
            precision += weight * p;
            recall += weight * r;
            f1 += weight * f;
        }

        Ok(Self {
            accuracy: accuracy(truth, predicted)?,
            precision,
            recall,
            f1_score: f1,
        })
    }
}

/// Fraction of positions where `predicted` equals `truth`.
pub fn accuracy(
    truth: ArrayView1<'_, usize>,
    predicted: ArrayView1<'_, usize>,
) -> Result<f64, MlError> {
    check_lengths(truth, predicted)?;
    let correct = truth
        .iter()
        .zip(predicted.iter())
        .filter(|(t, p)| t == p)
        .count();
    Ok(correct as f64 / truth.len() as f64)
}

/// Rows are true classes and columns predicted classes, both in ascending class
/// order. Every row sums to that class's true count.
pub fn confusion_matrix(
    truth: ArrayView1<'_, usize>,
    predicted: ArrayView1<'_, usize>,
    n_classes: usize,
) -> Result<ConfusionMatrix, MlError> {
    check_lengths(truth, predicted)?;
    let mut cm = Array2::<u64>::zeros((n_classes, n_classes));
    for (&t, &p) in truth.iter().zip(predicted.iter()) {
        if t >= n_classes || p >= n_classes {
            return Err(MlError::invalid_input(format!(
                "class index {} outside the {n_classes} known classes",
                t.max(p)
            )));
        }
        cm[[t, p]] += 1;
    }
    Ok(cm)
}

fn check_lengths(
    truth: ArrayView1<'_, usize>,
    predicted: ArrayView1<'_, usize>,
) -> Result<(), MlError> {
    if truth.is_empty() {
        return Err(MlError::invalid_input("no predictions to score"));
    }
    if truth.len() != predicted.len() {
        return Err(MlError::invalid_input(format!(
            "{} true labels but {} predictions",
            truth.len(),
            predicted.len()
        )));
    }
    Ok(())
}
