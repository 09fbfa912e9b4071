//! Dataset preparer: reproducible sampling, label separation, scaling and splitting.

use crate::data::source::CsvSource;
use crate::data::split::{Split, partition_indices};
use crate::data::transform::{StandardScaler, encode_column, is_missing, sorted_classes};
use crate::data::{Features, Labels, ScalingMode};
use crate::error::MlError;
use ndarray::{Array1, Array2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;
use std::path::Path;

/// Turns a delimited file into a scaled train/test [`Split`].
#[derive(Debug, Clone)]
pub struct DatasetPreparer {
    pub label_column: String,
    pub delimiter: u8,
    pub scaling: ScalingMode,
}

impl Default for DatasetPreparer {
    fn default() -> Self {
        Self::new("satisfaction")
    }
}

impl DatasetPreparer {
    pub fn new(label_column: impl Into<String>) -> Self {
        Self {
            label_column: label_column.into(),
            delimiter: b',',
            scaling: ScalingMode::default(),
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_scaling(mut self, scaling: ScalingMode) -> Self {
        self.scaling = scaling;
        self
    }

    /// Load `path`, draw `round(sample_fraction * rows)` rows with `seed`, and
    /// separate the label column from the features.
    pub fn load(
        &self,
        path: &Path,
        sample_fraction: f64,
        seed: u64,
    ) -> Result<(Features, Labels), MlError> {
        if !(sample_fraction > 0.0 && sample_fraction <= 1.0) {
            return Err(MlError::invalid_input(format!(
                "sample_fraction must be in (0, 1], got {sample_fraction}"
            )));
        }
        tracing::info!(path = %path.display(), "Loading CSV file");

        let table = CsvSource::new(path)
            .with_delimiter(self.delimiter)
            .read()?;

        let label_idx = table.column_index(&self.label_column);
        let feature_columns: Vec<String> = table
            .columns
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != label_idx)
            .map(|(_, c)| c.clone())
            .collect();

        if table.row_count() == 0 {
            tracing::warn!(path = %path.display(), "Loaded file contains zero rows");
            return Ok((Features::empty(feature_columns), Labels::empty()));
        }

        let label_idx = label_idx.ok_or_else(|| {
            MlError::data(format!(
                "label column '{}' not found in {}",
                self.label_column,
                path.display()
            ))
        })?;

        let labelled: Vec<&Vec<String>> = table
            .rows
            .iter()
            .filter(|row| !is_missing(&row[label_idx]))
            .collect();
        let dropped = table.row_count() - labelled.len();
        if dropped > 0 {
            tracing::warn!(dropped, "Dropped rows with an empty label");
        }

        let sample_size = (sample_fraction * labelled.len() as f64).round() as usize;
        let mut rng = StdRng::seed_from_u64(seed);
        let picked = rand::seq::index::sample(&mut rng, labelled.len(), sample_size);
        let sampled: Vec<&Vec<String>> = picked.iter().map(|i| labelled[i]).collect();

        if sampled.is_empty() {
            tracing::warn!(
                rows = labelled.len(),
                sample_fraction,
                "Sample contains zero rows"
            );
            return Ok((Features::empty(feature_columns), Labels::empty()));
        }

        let classes = sorted_classes(sampled.iter().map(|row| row[label_idx].as_str()));
        let class_index: HashMap<&str, usize> = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();
        let label_values: Array1<usize> = sampled
            .iter()
            .map(|row| class_index[row[label_idx].as_str()])
            .collect();

        let n_rows = sampled.len();
        let mut values = Array2::<f64>::zeros((n_rows, feature_columns.len()));
        let source_columns = (0..table.column_count()).filter(|&i| i != label_idx);
        for (j, col) in source_columns.enumerate() {
            let (encoded, _) = encode_column(sampled.iter().map(|row| row[col].as_str()));
            for (i, v) in encoded.into_iter().enumerate() {
                values[[i, j]] = v;
            }
        }

        tracing::info!(
            rows = n_rows,
            features = feature_columns.len(),
            classes = classes.len(),
            "Data loaded and sampled successfully"
        );

        Ok((
            Features {
                columns: feature_columns,
                values,
            },
            Labels {
                classes,
                values: label_values,
            },
        ))
    }

    /// Standardize the features and partition them into train and test rows.
    pub fn split(
        &self,
        features: &Features,
        labels: &Labels,
        test_fraction: f64,
        seed: u64,
    ) -> Result<Split, MlError> {
        if features.is_empty() || labels.is_empty() {
            return Err(MlError::data("cannot split an empty dataset"));
        }
        if features.n_rows() != labels.len() {
            return Err(MlError::data(format!(
                "features have {} rows but labels have {}",
                features.n_rows(),
                labels.len()
            )));
        }
        tracing::info!(test_fraction, scaling = ?self.scaling, "Scaling and splitting data");

        let (train_indices, test_indices) =
            partition_indices(features.n_rows(), test_fraction, seed)?;

        let (x_train, x_test) = match self.scaling {
            ScalingMode::FullSample => {
                let (_, scaled) = StandardScaler::fit_transform(features.values.view())?;
                (
                    scaled.select(Axis(0), &train_indices),
                    scaled.select(Axis(0), &test_indices),
                )
            }
            ScalingMode::TrainOnly => {
                let raw_train = features.values.select(Axis(0), &train_indices);
                let raw_test = features.values.select(Axis(0), &test_indices);
                let (scaler, x_train) = StandardScaler::fit_transform(raw_train.view())?;
                let x_test = scaler.transform(raw_test.view())?;
                (x_train, x_test)
            }
        };

        let y_train = labels.values.select(Axis(0), &train_indices);
        let y_test = labels.values.select(Axis(0), &test_indices);

        tracing::info!(
            train = train_indices.len(),
            test = test_indices.len(),
            "Data split complete"
        );

        Ok(Split {
            x_train,
            x_test,
            y_train,
            y_test,
            train_indices,
            test_indices,
            feature_names: features.columns.clone(),
            classes: labels.classes.clone(),
        })
    }
}
