//! Scoring of test-set predictions.

pub mod metrics;

pub use metrics::{ClassificationMetrics, ConfusionMatrix, accuracy, confusion_matrix};
