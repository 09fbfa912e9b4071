//! Configuration for a benchmark run.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace config file -> environment -> explicit overrides.

use crate::data::ScalingMode;
use crate::error::MlError;
use crate::tracking::RendererConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the workspace-level configuration file.
pub const WORKSPACE_CONFIG_FILE: &str = "clfbench.toml";

/// Top-level benchmark configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Input dataset and preparation settings.
    #[serde(default)]
    pub data: DataConfig,
    /// Experiment-tracking destination.
    #[serde(default)]
    pub tracking: TrackingConfig,
    /// Settings shared by the registered models.
    #[serde(default)]
    pub models: ModelsConfig,
    /// Confusion-matrix figure rendering.
    #[serde(default)]
    pub render: RendererConfig,
}

/// Dataset preparation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Path to the delimited input file.
    #[serde(default = "default_data_path")]
    pub path: PathBuf,
    /// Column holding the class label.
    #[serde(default = "default_label_column")]
    pub label_column: String,
    /// Field delimiter of the input file.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Fraction of rows drawn for the benchmark sample, in (0, 1].
    #[serde(default = "default_sample_fraction")]
    pub sample_fraction: f64,
    /// Fraction of the sample held out for testing, in (0, 1).
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    /// Seed for sampling and partitioning.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Where the standardization transform is fit.
    #[serde(default)]
    pub scaling: ScalingMode,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: default_data_path(),
            label_column: default_label_column(),
            delimiter: default_delimiter(),
            sample_fraction: default_sample_fraction(),
            test_fraction: default_test_fraction(),
            seed: default_seed(),
            scaling: ScalingMode::default(),
        }
    }
}

fn default_data_path() -> PathBuf {
    PathBuf::from("artifacts/processed/data.csv")
}

fn default_label_column() -> String {
    "satisfaction".to_string()
}

fn default_delimiter() -> char {
    ','
}

fn default_sample_fraction() -> f64 {
    0.1
}

fn default_test_fraction() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

/// Tracking sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Root directory under which each run gets its own `run_<timestamp>` directory.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
        }
    }
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("tensorboard_logs")
}

/// Settings applied across the model registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Seed for learners that draw random numbers (bootstrap, feature subsampling).
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
        }
    }
}

impl BenchConfig {
    /// Reject settings the preparer cannot honor.
    pub fn validate(&self) -> Result<(), MlError> {
        let data = &self.data;
        if !(data.sample_fraction > 0.0 && data.sample_fraction <= 1.0) {
            return Err(MlError::config(format!(
                "data.sample_fraction must be in (0, 1], got {}",
                data.sample_fraction
            )));
        }
        if !(data.test_fraction > 0.0 && data.test_fraction < 1.0) {
            return Err(MlError::config(format!(
                "data.test_fraction must be in (0, 1), got {}",
                data.test_fraction
            )));
        }
        if data.label_column.trim().is_empty() {
            return Err(MlError::config("data.label_column must not be empty"));
        }
        if !data.delimiter.is_ascii() {
            return Err(MlError::config(format!(
                "data.delimiter must be a single ASCII character, got {:?}",
                data.delimiter
            )));
        }
        if self.render.cell_size == 0 {
            return Err(MlError::config("render.cell_size must be positive"));
        }
        Ok(())
    }
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `CLFBENCH_`, nested with `__`)
/// 3. Explicit config file, or `clfbench.toml` in the workspace
/// 4. User config (`<config dir>/clfbench/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    config_file: Option<&Path>,
    overrides: Option<&serde_json::Value>,
) -> Result<BenchConfig, MlError> {
    let mut figment = Figment::from(Serialized::defaults(BenchConfig::default()));

    if let Some(dirs) = directories::ProjectDirs::from("dev", "clfbench", "clfbench") {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    match config_file {
        Some(path) => {
            if !path.exists() {
                return Err(MlError::not_found(format!(
                    "config file {}",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }
        None => {
            if let Some(ws) = workspace {
                let ws_config = ws.join(WORKSPACE_CONFIG_FILE);
                if ws_config.exists() {
                    figment = figment.merge(Toml::file(&ws_config));
                }
            }
        }
    }

    // CLFBENCH_DATA__SAMPLE_FRACTION, CLFBENCH_TRACKING__LOG_DIR, etc.
    figment = figment.merge(Env::prefixed("CLFBENCH_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let config: BenchConfig = figment
        .extract()
        .map_err(|e| MlError::config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_match_reference_run() {
        let config = BenchConfig::default();
        assert_eq!(config.data.label_column, "satisfaction");
        assert_eq!(config.data.sample_fraction, 0.1);
        assert_eq!(config.data.test_fraction, 0.2);
        assert_eq!(config.data.seed, 42);
        assert_eq!(config.data.scaling, ScalingMode::FullSample);
        assert_eq!(config.tracking.log_dir, PathBuf::from("tensorboard_logs"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_fractions() {
        let mut config = BenchConfig::default();
        config.data.sample_fraction = 0.0;
        assert!(matches!(config.validate(), Err(MlError::Config(_))));

        let mut config = BenchConfig::default();
        config.data.test_fraction = 1.0;
        assert!(matches!(config.validate(), Err(MlError::Config(_))));
    }

    #[test]
    fn test_workspace_file_and_overrides() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(WORKSPACE_CONFIG_FILE),
            "[data]\nsample_fraction = 0.5\nscaling = \"train_only\"\n",
        )
        .unwrap();

        let overrides = json!({ "data": { "seed": 7 } });
        let config = load_config(Some(dir.path()), None, Some(&overrides)).unwrap();
        assert_eq!(config.data.sample_fraction, 0.5);
        assert_eq!(config.data.scaling, ScalingMode::TrainOnly);
        assert_eq!(config.data.seed, 7);
        assert_eq!(config.data.test_fraction, 0.2);
    }

    #[test]
    fn test_missing_explicit_config_file() {
        let err = load_config(None, Some(Path::new("/nonexistent/clfbench.toml")), None)
            .unwrap_err();
        assert!(matches!(err, MlError::NotFound(_)));
    }
}
