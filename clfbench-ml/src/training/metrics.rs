//! Per-model result records of a benchmark run.

use crate::eval::{ClassificationMetrics, ConfusionMatrix};
use serde::{Deserialize, Serialize};

/// Scores of one registry entry, recorded once per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResult {
    pub name: String,
    pub algorithm: String,
    /// Position of the entry in the registry; the x-axis key of its logged values.
    pub step: u64,
    pub metrics: ClassificationMetrics,
    /// `[true class][predicted class]` counts.
    pub confusion_matrix: Vec<Vec<u64>>,
    pub fit_ms: f64,
    pub predict_ms: f64,
}

impl ModelResult {
    pub fn confusion_rows(cm: &ConfusionMatrix) -> Vec<Vec<u64>> {
        cm.outer_iter().map(|row| row.to_vec()).collect()
    }
}

/// Result records in registry order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResults {
    /// Class names indexing the confusion matrices.
    pub classes: Vec<String>,
    records: Vec<ModelResult>,
}

impl BenchmarkResults {
    pub fn new(classes: Vec<String>) -> Self {
        Self {
            classes,
            records: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, record: ModelResult) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ModelResult] {
        &self.records
    }

    pub fn get(&self, name: &str) -> Option<&ModelResult> {
        self.records.iter().find(|r| r.name == name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record with the highest weighted F1; the earliest wins ties.
    pub fn best_by_f1(&self) -> Option<&ModelResult> {
        self.records.iter().fold(None, |best: Option<&ModelResult>, r| match best {
            Some(b) if b.metrics.f1_score >= r.metrics.f1_score => Some(b),
            _ => Some(r),
        })
    }
}
