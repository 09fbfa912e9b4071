//! Benchmark runner: one shared split, every registered model, one tracking run.

use crate::config::{BenchConfig, DataConfig};
use crate::data::{DatasetPreparer, Split};
use crate::error::{MlError, PipelineError, Stage};
use crate::eval::{ClassificationMetrics, confusion_matrix};
use crate::tracking::{RendererConfig, RunWriter, TrackingSink, render_confusion_matrix};
use crate::training::experiment::{RunState, RunStatus};
use crate::training::metrics::{BenchmarkResults, ModelResult};
use crate::training::registry::{ModelRegistry, RegistryEntry};
use std::time::Instant;

/// Scalar tags emitted for every model, in emission order.
pub const SCALAR_TAGS: [&str; 4] = ["Accuracy", "Precision", "Recall", "F1_score"];
pub const CONFUSION_MATRIX_TAG: &str = "Confusion_Matrix";

/// Trains every registry entry on the same split and streams the scores to a sink.
pub struct BenchmarkRunner<S: TrackingSink> {
    preparer: DatasetPreparer,
    data: DataConfig,
    render: RendererConfig,
    registry: ModelRegistry,
    sink: S,
    state: RunState,
    results: BenchmarkResults,
}

impl BenchmarkRunner<RunWriter> {
    /// Default registry writing to a fresh `run_<timestamp>` directory under
    /// `tracking.log_dir`.
    pub fn from_config(config: &BenchConfig) -> Result<Self, MlError> {
        config.validate()?;
        let sink = RunWriter::create(&config.tracking.log_dir)?;
        Self::new(config, sink)
    }
}

impl<S: TrackingSink> BenchmarkRunner<S> {
    pub fn new(config: &BenchConfig, sink: S) -> Result<Self, MlError> {
        Self::with_registry(
            config,
            ModelRegistry::default_registry(config.models.seed),
            sink,
        )
    }

    /// Fails with [`MlError::Config`] when `config` does not validate.
    pub fn with_registry(
        config: &BenchConfig,
        registry: ModelRegistry,
        sink: S,
    ) -> Result<Self, MlError> {
        config.validate()?;
        let data = config.data.clone();
        let delimiter = u8::try_from(data.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                MlError::config(format!(
                    "data.delimiter must be a single ASCII character, got {:?}",
                    data.delimiter
                ))
            })?;
        let preparer = DatasetPreparer::new(data.label_column.clone())
            .with_delimiter(delimiter)
            .with_scaling(data.scaling);
        Ok(Self {
            preparer,
            data,
            render: config.render.clone(),
            registry,
            sink,
            state: RunState::default(),
            results: BenchmarkResults::default(),
        })
    }

    pub fn status(&self) -> RunStatus {
        self.state.status()
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Records of every model scored so far, in registry order.
    pub fn results(&self) -> &BenchmarkResults {
        &self.results
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Load, split, then train and evaluate every model.
    ///
    /// A stage failure is returned as [`MlError::Pipeline`] naming the stage.
    pub fn run(&mut self) -> Result<&BenchmarkResults, MlError> {
        if self.state.status() != RunStatus::Idle {
            return Err(MlError::invalid_state(format!(
                "run() needs an idle runner, this one is {}",
                self.state.status()
            )));
        }

        self.state.advance(RunStatus::Loading)?;
        let loaded = self.preparer.load(
            &self.data.path,
            self.data.sample_fraction,
            self.data.seed,
        );
        let (features, labels) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => return Err(self.fail(PipelineError::new(Stage::Loading, e))),
        };
        tracing::info!(
            rows = labels.len(),
            features = features.n_features(),
            classes = labels.n_classes(),
            "Data loaded"
        );

        self.state.advance(RunStatus::Splitting)?;
        let split = match self.preparer.split(
            &features,
            &labels,
            self.data.test_fraction,
            self.data.seed,
        ) {
            Ok(split) => split,
            Err(e) => return Err(self.fail(PipelineError::new(Stage::Splitting, e))),
        };
        tracing::info!(
            train = split.train_len(),
            test = split.test_len(),
            "Data split"
        );

        if let Err(e) = self.evaluate_split(&split) {
            return Err(self.fail(PipelineError::new(Stage::Training, e)));
        }
        tracing::info!(models = self.results.len(), "Benchmark complete");
        Ok(&self.results)
    }

    /// Fit, predict, score and log every registry entry against `split`, then
    /// close the sink. The first failing model aborts the loop.
    pub fn train_and_evaluate(&mut self, split: &Split) -> Result<&BenchmarkResults, MlError> {
        match self.evaluate_split(split) {
            Ok(()) => Ok(&self.results),
            Err(e) => {
                if !self.state.status().is_terminal() {
                    let _ = self.state.advance(RunStatus::Failed);
                }
                Err(e)
            }
        }
    }

    fn evaluate_split(&mut self, split: &Split) -> Result<(), MlError> {
        if self.registry.is_empty() {
            return Err(MlError::invalid_input("no models registered"));
        }
        self.state.advance(RunStatus::Training { step: 0 })?;
        self.results = BenchmarkResults::new(split.classes.clone());

        let outcome = self.evaluate_entries(split);
        let closed = self.sink.close();
        match outcome {
            Ok(()) => {
                closed?;
                self.state.advance(RunStatus::Closed)?;
                Ok(())
            }
            Err(e) => {
                if let Err(close_err) = closed {
                    tracing::warn!(error = %close_err, "Failed to close tracking sink");
                }
                self.state.advance(RunStatus::Failed)?;
                Err(e)
            }
        }
    }

    fn evaluate_entries(&mut self, split: &Split) -> Result<(), MlError> {
        let Self {
            registry,
            sink,
            state,
            results,
            render,
            ..
        } = self;

        for (step, entry) in registry.entries_mut().enumerate() {
            let step = step as u64;
            if step > 0 {
                state.advance(RunStatus::Training { step })?;
            }
            tracing::info!(model = %entry.name, step, "Training model");
            match evaluate_entry(entry, split, step, sink, render, results) {
                Ok(()) => {}
                Err(e) => {
                    tracing::warn!(model = %entry.name, error = %e, "Model training failed");
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Mark the run failed, close the sink and wrap the failure for the caller.
    fn fail(&mut self, err: PipelineError) -> MlError {
        tracing::debug!(stage = %err.stage, cause = %err.cause(), "Benchmark run failed");
        if !self.state.status().is_terminal() {
            let _ = self.state.advance(RunStatus::Failed);
        }
        if !self.sink.is_closed()
            && let Err(close_err) = self.sink.close()
        {
            tracing::warn!(error = %close_err, "Failed to close tracking sink");
        }
        MlError::Pipeline(err)
    }
}

fn evaluate_entry<S: TrackingSink>(
    entry: &mut RegistryEntry,
    split: &Split,
    step: u64,
    sink: &mut S,
    render: &RendererConfig,
    results: &mut BenchmarkResults,
) -> Result<(), MlError> {
    let name = entry.name.as_str();

    let started = Instant::now();
    entry
        .model
        .fit(split.x_train.view(), split.y_train.view())
        .map_err(|e| e.for_model(name))?;
    let fit_ms = started.elapsed().as_secs_f64() * 1000.0;

    let started = Instant::now();
    let predicted = entry
        .model
        .predict(split.x_test.view())
        .map_err(|e| e.for_model(name))?;
    let predict_ms = started.elapsed().as_secs_f64() * 1000.0;

    let n_classes = split.n_classes();
    let metrics = ClassificationMetrics::compute(split.y_test.view(), predicted.view(), n_classes)
        .map_err(|e| e.for_model(name))?;
    let cm = confusion_matrix(split.y_test.view(), predicted.view(), n_classes)
        .map_err(|e| e.for_model(name))?;

    results.push(ModelResult {
        name: name.to_string(),
        algorithm: entry.model.algorithm().to_string(),
        step,
        metrics,
        confusion_matrix: ModelResult::confusion_rows(&cm),
        fit_ms,
        predict_ms,
    });

    let values = [
        metrics.accuracy,
        metrics.precision,
        metrics.recall,
        metrics.f1_score,
    ];
    for (tag, value) in SCALAR_TAGS.iter().zip(values) {
        sink.add_scalar(&format!("{tag}/{name}"), value, step)?;
    }

    let figure = render_confusion_matrix(cm.view(), &split.classes, name, render)?;
    sink.add_figure(&format!("{CONFUSION_MATRIX_TAG}/{name}"), &figure, step)?;

    tracing::info!(
        model = name,
        step,
        accuracy = metrics.accuracy,
        precision = metrics.precision,
        recall = metrics.recall,
        f1_score = metrics.f1_score,
        fit_ms,
        "Model evaluated"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::{Classifier, DecisionTree, KNearestNeighbors};
    use crate::test_logs::{capture_logs, lines_at};
    use crate::tracking::{MemorySink, TrackingEvent};
    use ndarray::{Array1, ArrayView1, ArrayView2, array};
    use pretty_assertions::assert_eq;

    struct Broken;

    impl Classifier for Broken {
        fn algorithm(&self) -> &'static str {
            "broken"
        }

        fn fit(&mut self, _x: ArrayView2<'_, f64>, _y: ArrayView1<'_, usize>) -> Result<(), MlError> {
            Err(MlError::model("broken", "refuses to fit"))
        }

        fn predict(&self, _x: ArrayView2<'_, f64>) -> Result<Array1<usize>, MlError> {
            Err(MlError::model("broken", "not fitted"))
        }
    }

    fn toy_split() -> Split {
        Split {
            x_train: array![[-2.0], [-1.5], [-1.0], [1.0], [1.5], [2.0]],
            x_test: array![[-1.2], [1.2], [1.8]],
            y_train: array![0, 0, 0, 1, 1, 1],
            y_test: array![0, 1, 1],
            train_indices: vec![0, 1, 2, 3, 4, 5],
            test_indices: vec![6, 7, 8],
            feature_names: vec!["x".to_string()],
            classes: vec!["neutral".to_string(), "satisfied".to_string()],
        }
    }

    fn two_model_registry() -> ModelRegistry {
        let mut registry = ModelRegistry::new();
        registry
            .register("K-Nearest Neighbors", Box::new(KNearestNeighbors::new(3)))
            .unwrap();
        registry
            .register(
                "Decision Tree",
                Box::new(DecisionTree::default()),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_train_and_evaluate_logs_every_model() {
        let config = BenchConfig::default();
        let mut runner =
            BenchmarkRunner::with_registry(&config, two_model_registry(), MemorySink::new())
                .unwrap();
        let results = runner.train_and_evaluate(&toy_split()).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results.records()[1].name, "Decision Tree");
        assert_eq!(results.records()[1].step, 1);
        assert_eq!(results.records()[0].metrics.accuracy, 1.0);
        assert_eq!(results.records()[0].confusion_matrix, vec![vec![1, 0], vec![0, 2]]);

        let sink = runner.sink();
        assert_eq!(sink.close_count(), 1);
        assert_eq!(sink.events().len(), 10);
        assert_eq!(sink.scalar("Accuracy/K-Nearest Neighbors"), Some(1.0));
        assert!(sink.scalar("F1_score/Decision Tree").is_some());
        let figure = sink.figure("Confusion_Matrix/Decision Tree").unwrap();
        assert_eq!(figure.title, "Confusion Matrix - Decision Tree");

        let steps: Vec<u64> = sink
            .events()
            .iter()
            .filter(|e| matches!(e, TrackingEvent::Figure { .. }))
            .map(TrackingEvent::step)
            .collect();
        assert_eq!(steps, vec![0, 1]);
        assert_eq!(runner.status(), RunStatus::Closed);
    }

    #[test]
    fn test_first_failure_aborts_but_keeps_earlier_records() {
        let mut registry = ModelRegistry::new();
        registry
            .register("K-Nearest Neighbors", Box::new(KNearestNeighbors::new(3)))
            .unwrap();
        registry.register("Broken", Box::new(Broken)).unwrap();
        registry
            .register("Never Reached", Box::new(KNearestNeighbors::new(1)))
            .unwrap();

        let mut runner =
            BenchmarkRunner::with_registry(&BenchConfig::default(), registry, MemorySink::new())
                .unwrap();
        let err = runner.train_and_evaluate(&toy_split()).unwrap_err();

        assert!(matches!(&err, MlError::Model { model, .. } if model == "Broken"));
        assert_eq!(runner.results().len(), 1);
        assert_eq!(runner.results().records()[0].name, "K-Nearest Neighbors");
        assert_eq!(runner.sink().close_count(), 1);
        assert!(runner.sink().scalar("Accuracy/Never Reached").is_none());
        assert_eq!(runner.status(), RunStatus::Failed);
    }

    #[test]
    fn test_second_evaluation_is_rejected() {
        let mut runner = BenchmarkRunner::with_registry(
            &BenchConfig::default(),
            two_model_registry(),
            MemorySink::new(),
        )
        .unwrap();
        runner.train_and_evaluate(&toy_split()).unwrap();
        assert!(matches!(
            runner.train_and_evaluate(&toy_split()),
            Err(MlError::InvalidState(_))
        ));
        assert!(matches!(runner.run(), Err(MlError::InvalidState(_))));
        assert_eq!(runner.sink().close_count(), 1);
    }

    #[test]
    fn test_run_wraps_loading_failure() {
        let mut config = BenchConfig::default();
        config.data.path = "/nonexistent/clfbench/data.csv".into();
        let mut runner =
            BenchmarkRunner::with_registry(&config, two_model_registry(), MemorySink::new())
                .unwrap();
        let err = runner.run().unwrap_err();

        let MlError::Pipeline(pipeline) = &err else {
            panic!("expected a pipeline error, got {err:?}");
        };
        assert_eq!(pipeline.stage, Stage::Loading);
        assert!(matches!(pipeline.cause(), MlError::NotFound(_)));
        assert!(err.to_string().contains("runner.rs"));
        assert!(err.to_string().ends_with("error while loading data"));
        assert_eq!(runner.status(), RunStatus::Failed);
        assert_eq!(runner.sink().close_count(), 1);
    }

    #[test]
    fn test_model_failure_is_logged_below_error_level() {
        let mut registry = ModelRegistry::new();
        registry.register("Broken", Box::new(Broken)).unwrap();
        let mut runner =
            BenchmarkRunner::with_registry(&BenchConfig::default(), registry, MemorySink::new())
                .unwrap();

        let (outcome, logs) = capture_logs(|| runner.train_and_evaluate(&toy_split()).is_err());
        assert!(outcome);
        assert!(lines_at(&logs, "ERROR").is_empty(), "{logs}");
        let warnings = lines_at(&logs, "WARN");
        assert_eq!(warnings.len(), 1, "{logs}");
        assert!(warnings[0].contains("Model training failed"));
        assert!(warnings[0].contains("Broken"));
    }

    #[test]
    fn test_stage_failure_is_logged_below_error_level() {
        let mut config = BenchConfig::default();
        config.data.path = "/nonexistent/clfbench/data.csv".into();
        let mut runner =
            BenchmarkRunner::with_registry(&config, two_model_registry(), MemorySink::new())
                .unwrap();

        let (outcome, logs) = capture_logs(|| runner.run().is_err());
        assert!(outcome);
        assert!(lines_at(&logs, "ERROR").is_empty(), "{logs}");
        assert!(lines_at(&logs, "DEBUG").iter().any(|l| l.contains("Benchmark run failed")));
    }

    #[test]
    fn test_non_ascii_delimiter_is_rejected() {
        let mut config = BenchConfig::default();
        for delimiter in ['é', '€'] {
            config.data.delimiter = delimiter;
            let err =
                BenchmarkRunner::with_registry(&config, two_model_registry(), MemorySink::new())
                    .err()
                    .unwrap();
            assert!(matches!(err, MlError::Config(_)));
        }

        config.data.delimiter = ';';
        assert!(
            BenchmarkRunner::with_registry(&config, two_model_registry(), MemorySink::new())
                .is_ok()
        );
    }
}
