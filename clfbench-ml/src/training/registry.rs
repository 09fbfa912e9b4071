//! Ordered, uniquely named set of classifiers benchmarked in one run.

use crate::algorithms::{ClassicalAlgorithm, Classifier};
use crate::error::MlError;

/// One named classifier.
pub struct RegistryEntry {
    pub name: String,
    pub model: Box<dyn Classifier>,
}

impl std::fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("name", &self.name)
            .field("algorithm", &self.model.algorithm())
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct ModelRegistry {
    entries: Vec<RegistryEntry>,
}

/// Registry names and algorithms of the default benchmark, in run order.
pub fn default_algorithms() -> Vec<(&'static str, ClassicalAlgorithm)> {
    vec![
        ("Logistic Regression", ClassicalAlgorithm::logistic_regression()),
        ("Random Forest", ClassicalAlgorithm::random_forest()),
        ("Gradient Boosting", ClassicalAlgorithm::gradient_boosting()),
        ("AdaBoost", ClassicalAlgorithm::adaboost()),
        ("Support Vector Classifier", ClassicalAlgorithm::svc()),
        ("K-Nearest Neighbors", ClassicalAlgorithm::knn()),
        ("Naive Bayes", ClassicalAlgorithm::naive_bayes()),
        ("Decision Tree", ClassicalAlgorithm::decision_tree()),
        ("LightGBM", ClassicalAlgorithm::lightgbm()),
        ("XGBoost", ClassicalAlgorithm::xgboost()),
    ]
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The ten default classifiers, randomized learners seeded with `seed`.
    pub fn default_registry(seed: u64) -> Self {
        let mut registry = Self::new();
        for (name, algorithm) in default_algorithms() {
            registry.entries.push(RegistryEntry {
                name: name.to_string(),
                model: algorithm.build(seed),
            });
        }
        registry
    }

    /// Append `model` under `name`. Names must be unique.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        model: Box<dyn Classifier>,
    ) -> Result<(), MlError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(MlError::invalid_input("model name must not be empty"));
        }
        if self.entries.iter().any(|e| e.name == name) {
            return Err(MlError::invalid_input(format!(
                "model name '{name}' is already registered"
            )));
        }
        self.entries.push(RegistryEntry { name, model });
        Ok(())
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entries_mut(&mut self) -> impl Iterator<Item = &mut RegistryEntry> {
        self.entries.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::KNearestNeighbors;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_registry_order() {
        let registry = ModelRegistry::default_registry(42);
        assert_eq!(
            registry.names(),
            vec![
                "Logistic Regression",
                "Random Forest",
                "Gradient Boosting",
                "AdaBoost",
                "Support Vector Classifier",
                "K-Nearest Neighbors",
                "Naive Bayes",
                "Decision Tree",
                "LightGBM",
                "XGBoost",
            ]
        );
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let mut registry = ModelRegistry::new();
        registry
            .register("KNN", Box::new(KNearestNeighbors::new(3)))
            .unwrap();
        let err = registry
            .register("KNN", Box::new(KNearestNeighbors::new(5)))
            .unwrap_err();
        assert!(matches!(err, MlError::InvalidInput(_)));
        assert_eq!(registry.len(), 1);
        assert!(registry.register("  ", Box::new(KNearestNeighbors::new(1))).is_err());
    }
}
