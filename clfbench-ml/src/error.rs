//! Error types for the clfbench-ml crate.

use std::fmt;
use std::panic::Location;
use thiserror::Error;

/// Top-level error type for benchmark operations.
#[derive(Debug, Error)]
pub enum MlError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Model error [{model}]: {message}")]
    Model { model: String, message: String },

    #[error("Tracking error: {0}")]
    Tracking(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl MlError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    pub fn model(model: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Model {
            model: model.into(),
            message: msg.into(),
        }
    }

    pub fn tracking(msg: impl Into<String>) -> Self {
        Self::Tracking(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Re-tag a model error raised inside a classifier with the registry name it ran under.
    pub fn for_model(self, name: &str) -> Self {
        match self {
            Self::Model { message, .. } => Self::model(name, message),
            other => Self::model(name, other.to_string()),
        }
    }
}

/// Pipeline stage a [`PipelineError`] was raised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Loading,
    Splitting,
    Training,
}

impl Stage {
    /// Stage-qualified message attached to failures of this stage.
    pub fn failure_message(self) -> &'static str {
        match self {
            Self::Loading => "error while loading data",
            Self::Splitting => "error while splitting data",
            Self::Training => "error during training and evaluation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Loading => "loading",
            Self::Splitting => "splitting",
            Self::Training => "training",
        };
        f.write_str(name)
    }
}

/// Stage-scoped wrapper around the failure that aborted a run.
///
/// Records the source location that performed the wrap so the single reported
/// line points at the failing stage.
#[derive(Debug, Error)]
#[error("Error in {file}, line {line}: {message}")]
pub struct PipelineError {
    pub stage: Stage,
    pub message: String,
    pub file: &'static str,
    pub line: u32,
    #[source]
    pub source: Box<MlError>,
}

impl PipelineError {
    #[track_caller]
    pub fn new(stage: Stage, source: MlError) -> Self {
        let location = Location::caller();
        Self {
            stage,
            message: stage.failure_message().to_string(),
            file: location.file(),
            line: location.line(),
            source: Box::new(source),
        }
    }

    /// The failure that triggered the wrap.
    pub fn cause(&self) -> &MlError {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_pipeline_error_records_location_and_cause() {
        let err = PipelineError::new(Stage::Loading, MlError::not_found("data.csv"));
        let rendered = err.to_string();
        assert!(rendered.starts_with("Error in "));
        assert!(rendered.contains("error.rs"));
        assert!(rendered.ends_with("error while loading data"));
        assert!(matches!(err.cause(), MlError::NotFound(_)));
        assert_eq!(err.source().unwrap().to_string(), "Not found: data.csv");
    }

    #[test]
    fn test_for_model_retags_errors() {
        let err = MlError::data("empty").for_model("Naive Bayes");
        assert_eq!(err.to_string(), "Model error [Naive Bayes]: Data error: empty");

        let err = MlError::model("inner", "no rows").for_model("Decision Tree");
        assert_eq!(err.to_string(), "Model error [Decision Tree]: no rows");
    }

    #[test]
    fn test_stage_messages() {
        assert_eq!(Stage::Splitting.failure_message(), "error while splitting data");
        assert_eq!(
            Stage::Training.failure_message(),
            "error during training and evaluation"
        );
    }
}
