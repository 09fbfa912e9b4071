//! # clfbench-ml: classifier benchmarking harness
//!
//! Loads a tabular dataset, draws a reproducible sample, standardizes and
//! partitions it once, then fits every registered classifier on the shared
//! split. Each model's accuracy, weighted precision/recall/F1 and confusion
//! matrix are streamed to a run-scoped tracking sink.

// Foundation
pub mod config;
pub mod error;

// Data preparation
pub mod data;

// Classifiers and scoring
pub mod algorithms;
pub mod eval;

// Experiment tracking and orchestration
pub mod tracking;
pub mod training;

#[cfg(test)]
mod test_logs;

// Re-exports
pub use config::{BenchConfig, load_config};
pub use data::{DatasetPreparer, Features, Labels, ScalingMode, Split};
pub use error::{MlError, PipelineError, Stage};
pub use eval::ClassificationMetrics;
pub use tracking::{MemorySink, RunWriter, TrackingSink};
pub use training::{BenchmarkResults, BenchmarkRunner, ModelRegistry, ModelResult, RunStatus};
