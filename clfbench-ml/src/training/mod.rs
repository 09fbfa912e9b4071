//! Benchmark orchestration: registry, run lifecycle, result records, runner.

pub mod experiment;
pub mod metrics;
pub mod registry;
pub mod runner;

pub use experiment::{RunState, RunStatus};
pub use metrics::{BenchmarkResults, ModelResult};
pub use registry::{ModelRegistry, RegistryEntry, default_algorithms};
pub use runner::BenchmarkRunner;
