//! Core traits for SVM implementation

use crate::core::{ClassifierType, Prediction, Result, Sample, SolverStatus, SparseVector};
use crate::features::FeatureSet;
use std::sync::Arc;

/// Labeled data source for training and evaluation
pub trait Dataset: Send + Sync {
    /// Number of samples in the dataset
    fn len(&self) -> usize;

    /// Number of features (dimensionality)
    fn dim(&self) -> usize;

    /// Shared, read-only feature collection for kernel binding
    fn features(&self) -> Arc<FeatureSet>;

    /// Labels in sample order
    fn labels(&self) -> &[f64];

    /// Get a single sample by index
    ///
    /// # Panics
    /// Panics if index >= len()
    fn get_sample(&self, i: usize) -> Sample {
        Sample::new(self.features().vector(i).clone(), self.labels()[i])
    }

    /// Check if the dataset is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Binary classifier surface exposed to the surrounding model framework
pub trait Classifier: Send + Sync {
    /// Fit the decision function. `Ok` carries whether the solver converged
    /// or stopped early with an approximate solution.
    fn train(&mut self, features: Arc<FeatureSet>, labels: &[f64]) -> Result<SolverStatus>;

    /// Signed margin score for a single feature vector
    fn predict(&self, x: &SparseVector) -> Result<f64>;

    /// Predict every vector of a feature set
    fn predict_batch(&self, features: &FeatureSet) -> Result<Vec<Prediction>> {
        features
            .iter()
            .map(|x| self.predict(x).map(Prediction::from_decision_value))
            .collect()
    }

    fn classifier_type(&self) -> ClassifierType;

    fn name(&self) -> &'static str;
}
