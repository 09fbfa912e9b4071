//! Subcommand handlers.

use crate::{ConfigAction, RunArgs};
use anyhow::Context;
use clfbench_ml::config::WORKSPACE_CONFIG_FILE;
use clfbench_ml::{BenchConfig, BenchmarkResults, BenchmarkRunner, load_config};
use serde_json::{Map, Value, json};
use std::path::Path;

/// Translate the CLI flags that were given into a configuration overlay.
pub(crate) fn overrides(args: &RunArgs) -> Value {
    let mut data = Map::new();
    if let Some(path) = &args.data {
        data.insert("path".into(), json!(path));
    }
    if let Some(label) = &args.label {
        data.insert("label_column".into(), json!(label));
    }
    if let Some(fraction) = args.sample_fraction {
        data.insert("sample_fraction".into(), json!(fraction));
    }
    if let Some(fraction) = args.test_fraction {
        data.insert("test_fraction".into(), json!(fraction));
    }
    if let Some(seed) = args.seed {
        data.insert("seed".into(), json!(seed));
    }
    if args.scale_train_only {
        data.insert("scaling".into(), json!("train_only"));
    }

    let mut root = Map::new();
    if !data.is_empty() {
        root.insert("data".into(), Value::Object(data));
    }
    if let Some(seed) = args.seed {
        root.insert("models".into(), json!({ "seed": seed }));
    }
    if let Some(log_dir) = &args.log_dir {
        root.insert("tracking".into(), json!({ "log_dir": log_dir }));
    }
    Value::Object(root)
}

fn resolve_config(
    workspace: &Path,
    config_file: Option<&Path>,
    args: &RunArgs,
) -> anyhow::Result<BenchConfig> {
    let overlay = overrides(args);
    load_config(Some(workspace), config_file, Some(&overlay))
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))
}

pub(crate) fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    config_file: Option<&Path>,
    args: &RunArgs,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = workspace.join(WORKSPACE_CONFIG_FILE);
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }
            let toml_str = toml::to_string_pretty(&BenchConfig::default())?;
            std::fs::write(&config_path, &toml_str)
                .with_context(|| format!("writing {}", config_path.display()))?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = resolve_config(workspace, config_file, args)?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}

pub(crate) fn run_benchmark(
    workspace: &Path,
    config_file: Option<&Path>,
    args: &RunArgs,
) -> anyhow::Result<()> {
    let mut config = resolve_config(workspace, config_file, args)?;
    if config.data.path.is_relative() {
        config.data.path = workspace.join(&config.data.path);
    }
    if config.tracking.log_dir.is_relative() {
        config.tracking.log_dir = workspace.join(&config.tracking.log_dir);
    }

    let mut runner = BenchmarkRunner::from_config(&config)?;
    let run_dir = runner.sink().dir().to_path_buf();
    let results = runner.run()?;

    println!("{}", format_summary(results));
    println!("Run directory: {}", run_dir.display());
    Ok(())
}

/// Fixed-width table of every result record, in registry order.
pub(crate) fn format_summary(results: &BenchmarkResults) -> String {
    let width = results
        .records()
        .iter()
        .map(|r| r.name.len())
        .max()
        .unwrap_or(0)
        .max("Model".len());

    let mut lines = vec![format!(
        "{:<width$}  {:>8}  {:>9}  {:>6}  {:>8}  {:>10}",
        "Model", "Accuracy", "Precision", "Recall", "F1", "Fit (ms)"
    )];
    lines.push("-".repeat(width + 2 + 8 + 2 + 9 + 2 + 6 + 2 + 8 + 2 + 10));
    for r in results.records() {
        lines.push(format!(
            "{:<width$}  {:>8.4}  {:>9.4}  {:>6.4}  {:>8.4}  {:>10.1}",
            r.name,
            r.metrics.accuracy,
            r.metrics.precision,
            r.metrics.recall,
            r.metrics.f1_score,
            r.fit_ms
        ));
    }
    if let Some(best) = results.best_by_f1() {
        lines.push(String::new());
        lines.push(format!(
            "Best by F1: {} ({:.4})",
            best.name, best.metrics.f1_score
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_overrides_only_include_given_flags() {
        assert_eq!(overrides(&RunArgs::default()), json!({}));

        let args = RunArgs {
            sample_fraction: Some(1.0),
            seed: Some(7),
            scale_train_only: true,
            ..RunArgs::default()
        };
        assert_eq!(
            overrides(&args),
            json!({
                "data": {"sample_fraction": 1.0, "seed": 7, "scaling": "train_only"},
                "models": {"seed": 7}
            })
        );
    }

    #[test]
    fn test_summary_of_empty_results() {
        let summary = format_summary(&BenchmarkResults::default());
        assert!(summary.starts_with("Model"));
        assert!(!summary.contains("Best by F1"));
    }
}
