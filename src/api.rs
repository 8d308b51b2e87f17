//! High-level API for training and using kernel SVMs
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ksvm::api::SVM;
//! use ksvm::distance::EuclideanDistance;
//! use ksvm::kernel::CauchyKernel;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let kernel = CauchyKernel::new(1.0, EuclideanDistance::sparse())?;
//! let model = SVM::with_kernel(kernel)
//!     .with_c(1.0)
//!     .with_epsilon(0.001)
//!     .train_from_file("data.libsvm")?
//!     .ensure_converged()?;
//!
//! println!("Accuracy: {:.2}%", model.evaluate_from_file("test.libsvm")? * 100.0);
//! # Ok(())
//! # }
//! ```

use crate::core::{
    CacheSize, Classifier, ClassifierType, Dataset, Prediction, Result, SVMError, SolverStatus,
    SolverType, SparseVector, SvmConfig, WorkingSetStrategy,
};
use crate::data::LibSVMDataset;
use crate::features::FeatureSet;
use crate::kernel::{Kernel, LinearKernel};
use crate::optimizer::{SVMOptimizer, TrainedSVM};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// High-level SVM interface with builder pattern
///
/// Parameters are only checked when training starts (or on [`SVM::build`]),
/// so an invalid C, nu or tolerance surfaces as `InvalidParameter` before
/// any kernel work.
pub struct SVM<K: Kernel = LinearKernel> {
    kernel: K,
    config: SvmConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl SVM<LinearKernel> {
    /// Create a new SVM with linear kernel and default parameters
    pub fn new() -> Self {
        Self::with_kernel(LinearKernel::new())
    }
}

impl Default for SVM<LinearKernel> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Kernel + Clone> SVM<K> {
    /// Create SVM with custom kernel
    pub fn with_kernel(kernel: K) -> Self {
        Self {
            kernel,
            config: SvmConfig::default(),
            cancel: None,
        }
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: SvmConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_solver_type(mut self, solver_type: SolverType) -> Self {
        self.config.solver_type = solver_type;
        self
    }

    /// Set regularization parameter C (C-SVC)
    pub fn with_c(mut self, c: f64) -> Self {
        self.config.c = c;
        self
    }

    /// Per-class multipliers on C
    pub fn with_class_weights(mut self, positive: f64, negative: f64) -> Self {
        self.config.positive_weight = positive;
        self.config.negative_weight = negative;
        self
    }

    /// Switch to nu-SVC with the given nu
    pub fn with_nu(mut self, nu: f64) -> Self {
        self.config.solver_type = SolverType::NuSvc;
        self.config.nu = nu;
        self
    }

    /// Set convergence tolerance
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.config.epsilon = epsilon;
        self
    }

    /// Set maximum number of iterations
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    pub fn with_cache_size(mut self, cache_size: CacheSize) -> Self {
        self.config.cache_size = cache_size;
        self
    }

    pub fn with_shrinking(mut self, shrinking: bool) -> Self {
        self.config.shrinking = shrinking;
        self
    }

    pub fn with_working_set_strategy(mut self, strategy: WorkingSetStrategy) -> Self {
        self.config.working_set_strategy = strategy;
        self
    }

    /// Flag checked between solver iterations; setting it stops training
    /// with [`SolverStatus::Cancelled`]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &SvmConfig {
        &self.config
    }

    /// Validate the configuration and produce an untrained classifier
    pub fn build(self) -> Result<KernelSVM<K>> {
        let mut optimizer = SVMOptimizer::new(self.kernel, self.config)?;
        if let Some(flag) = self.cancel {
            optimizer = optimizer.with_cancel_flag(flag);
        }
        Ok(KernelSVM {
            optimizer,
            model: None,
        })
    }

    /// Train on a feature set and its labels
    pub fn train_features(self, features: Arc<FeatureSet>, labels: &[f64]) -> Result<TrainedModel<K>> {
        let mut svm = self.build()?;
        let model = svm.optimizer.train(features, labels)?;
        Ok(TrainedModel { model })
    }

    /// Train on a dataset
    pub fn train<D: Dataset>(self, dataset: &D) -> Result<TrainedModel<K>> {
        self.train_features(dataset.features(), dataset.labels())
    }

    /// Train from LibSVM format file
    pub fn train_from_file<P: AsRef<Path>>(self, path: P) -> Result<TrainedModel<K>> {
        let dataset = LibSVMDataset::from_file(path)?;
        self.train(&dataset)
    }
}

/// Trained SVM model with high-level prediction interface
#[derive(Debug, Clone)]
pub struct TrainedModel<K: Kernel> {
    model: TrainedSVM<K>,
}

impl<K: Kernel + Clone> TrainedModel<K> {
    /// Predict a single vector
    pub fn predict(&self, x: &SparseVector) -> Result<Prediction> {
        self.model.predict(x)
    }

    /// Predict every vector of `features` (evaluated in parallel)
    pub fn predict_features(&self, features: Arc<FeatureSet>) -> Result<Vec<Prediction>> {
        self.model.predict_set(features)
    }

    pub fn predict_dataset<D: Dataset>(&self, dataset: &D) -> Result<Vec<Prediction>> {
        self.predict_features(dataset.features())
    }

    /// Predict from LibSVM file
    pub fn predict_from_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<Prediction>> {
        let dataset = LibSVMDataset::from_file(path)?;
        self.predict_dataset(&dataset)
    }

    /// Accuracy on a dataset
    pub fn evaluate<D: Dataset>(&self, dataset: &D) -> Result<f64> {
        Ok(self.evaluate_detailed(dataset)?.accuracy())
    }

    /// Evaluate accuracy from LibSVM file
    pub fn evaluate_from_file<P: AsRef<Path>>(&self, path: P) -> Result<f64> {
        let dataset = LibSVMDataset::from_file(path)?;
        self.evaluate(&dataset)
    }

    /// Confusion matrix on a dataset
    pub fn evaluate_detailed<D: Dataset>(&self, dataset: &D) -> Result<EvaluationMetrics> {
        let predictions = self.predict_dataset(dataset)?;
        Ok(EvaluationMetrics::from_predictions(
            &predictions,
            dataset.labels(),
        ))
    }

    /// Get model information
    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            n_support_vectors: self.model.n_support_vectors(),
            bias: self.model.bias(),
            support_vector_indices: self.model.decision().support_indices(),
            iterations: self.model.iterations(),
            objective: self.model.objective(),
            status: self.model.status(),
            solver_type: self.model.solver_type(),
        }
    }

    pub fn status(&self) -> SolverStatus {
        self.model.status()
    }

    pub fn is_converged(&self) -> bool {
        self.model.status().is_converged()
    }

    /// Turn an approximate model into `SolverNonConvergence`
    pub fn ensure_converged(self) -> Result<Self> {
        if self.is_converged() {
            Ok(self)
        } else {
            Err(SVMError::SolverNonConvergence {
                iterations: self.model.iterations(),
            })
        }
    }

    /// Get the underlying trained model
    pub fn inner(&self) -> &TrainedSVM<K> {
        &self.model
    }
}

/// Kernel SVM behind the [`Classifier`] interface
pub struct KernelSVM<K: Kernel> {
    optimizer: SVMOptimizer<K>,
    model: Option<TrainedSVM<K>>,
}

impl<K: Kernel + Clone> KernelSVM<K> {
    /// Untrained classifier with `config`
    pub fn new(kernel: K, config: SvmConfig) -> Result<Self> {
        SVM::with_kernel(kernel).with_config(config).build()
    }

    pub fn config(&self) -> &SvmConfig {
        self.optimizer.config()
    }

    pub fn solver_type(&self) -> SolverType {
        self.optimizer.config().solver_type
    }

    /// Trained model, if `train` succeeded
    pub fn model(&self) -> Option<&TrainedSVM<K>> {
        self.model.as_ref()
    }

    fn trained(&self) -> Result<&TrainedSVM<K>> {
        self.model.as_ref().ok_or(SVMError::ModelNotTrained)
    }
}

impl<K: Kernel + Clone> Classifier for KernelSVM<K> {
    fn train(&mut self, features: Arc<FeatureSet>, labels: &[f64]) -> Result<SolverStatus> {
        self.model = None;
        let model = self.optimizer.train(features, labels)?;
        let status = model.status();
        self.model = Some(model);
        Ok(status)
    }

    fn predict(&self, x: &SparseVector) -> Result<f64> {
        self.trained()?.decision_function(x)
    }

    fn predict_batch(&self, features: &FeatureSet) -> Result<Vec<Prediction>> {
        self.trained()?.predict_set(Arc::new(features.clone()))
    }

    fn classifier_type(&self) -> ClassifierType {
        ClassifierType::LibSvm
    }

    fn name(&self) -> &'static str {
        "LibSVM"
    }
}

/// Detailed evaluation metrics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationMetrics {
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl EvaluationMetrics {
    fn new(tp: usize, tn: usize, fp: usize, fn_: usize) -> Self {
        Self {
            true_positives: tp,
            true_negatives: tn,
            false_positives: fp,
            false_negatives: fn_,
        }
    }

    /// Confusion matrix of predicted against actual labels
    pub fn from_predictions(predictions: &[Prediction], labels: &[f64]) -> Self {
        let (mut tp, mut tn, mut fp, mut fn_) = (0, 0, 0, 0);
        for (pred, &actual) in predictions.iter().zip(labels) {
            match (pred.label > 0.0, actual > 0.0) {
                (true, true) => tp += 1,
                (false, false) => tn += 1,
                (true, false) => fp += 1,
                (false, true) => fn_ += 1,
            }
        }
        Self::new(tp, tn, fp, fn_)
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.true_negatives + self.false_positives + self.false_negatives
    }

    /// Calculate accuracy: (TP + TN) / (TP + TN + FP + FN)
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            (self.true_positives + self.true_negatives) as f64 / total as f64
        }
    }

    /// Calculate precision: TP / (TP + FP)
    pub fn precision(&self) -> f64 {
        let denominator = self.true_positives + self.false_positives;
        if denominator == 0 {
            0.0
        } else {
            self.true_positives as f64 / denominator as f64
        }
    }

    /// Calculate recall (sensitivity): TP / (TP + FN)
    pub fn recall(&self) -> f64 {
        let denominator = self.true_positives + self.false_negatives;
        if denominator == 0 {
            0.0
        } else {
            self.true_positives as f64 / denominator as f64
        }
    }

    pub fn f1_score(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * (p * r) / (p + r)
        }
    }

    /// Calculate specificity: TN / (TN + FP)
    pub fn specificity(&self) -> f64 {
        let denominator = self.true_negatives + self.false_positives;
        if denominator == 0 {
            0.0
        } else {
            self.true_negatives as f64 / denominator as f64
        }
    }
}

/// Model information
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub n_support_vectors: usize,
    pub bias: f64,
    pub support_vector_indices: Vec<usize>,
    pub iterations: usize,
    pub objective: f64,
    pub status: SolverStatus,
    pub solver_type: SolverType,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::EuclideanDistance;
    use crate::kernel::CauchyKernel;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn line_features() -> (Arc<FeatureSet>, Vec<f64>) {
        let features = FeatureSet::sparse(vec![
            SparseVector::new(vec![0], vec![2.0]),
            SparseVector::new(vec![0], vec![-2.0]),
            SparseVector::new(vec![0], vec![1.5]),
            SparseVector::new(vec![0], vec![-1.5]),
        ]);
        (Arc::new(features), vec![1.0, -1.0, 1.0, -1.0])
    }

    #[test]
    fn test_svm_builder_pattern() {
        let svm = SVM::new()
            .with_c(2.0)
            .with_epsilon(0.01)
            .with_max_iterations(5000)
            .with_cache_size(CacheSize::Rows(10))
            .with_shrinking(false)
            .with_working_set_strategy(WorkingSetStrategy::MaximalViolatingPair);

        assert_eq!(svm.config().c, 2.0);
        assert_eq!(svm.config().epsilon, 0.01);
        assert_eq!(svm.config().max_iterations, 5000);
        assert_eq!(svm.config().cache_size, CacheSize::Rows(10));
        assert!(!svm.config().shrinking);

        let svm = SVM::new().with_nu(0.3);
        assert_eq!(svm.config().solver_type, SolverType::NuSvc);
        assert_eq!(svm.config().nu, 0.3);
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        assert!(matches!(
            SVM::new().with_nu(1.5).build(),
            Err(SVMError::InvalidParameter(_))
        ));
        assert!(matches!(
            SVM::new().with_c(0.0).build(),
            Err(SVMError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_quick_training() {
        let (features, labels) = line_features();
        let model = SVM::new()
            .train_features(features, &labels)
            .expect("Training should succeed");

        let prediction = model.predict(&SparseVector::new(vec![0], vec![1.0])).unwrap();
        assert_eq!(prediction.label, 1.0);

        let info = model.info();
        assert!(info.n_support_vectors > 0);
        assert_eq!(info.status, SolverStatus::Converged);
        assert!(model.is_converged());
    }

    #[test]
    fn test_ensure_converged() {
        let (features, labels) = line_features();
        let model = SVM::new()
            .with_max_iterations(1)
            .with_epsilon(1e-12)
            .train_features(features, &labels)
            .unwrap();

        // The cap is checked before the next optimality test
        assert_eq!(model.status(), SolverStatus::MaxIterExceeded);
        assert!(matches!(
            model.ensure_converged(),
            Err(SVMError::SolverNonConvergence { iterations: 1 })
        ));
    }

    #[test]
    fn test_classifier_interface() {
        let (features, labels) = line_features();
        let kernel = CauchyKernel::new(1.0, EuclideanDistance::sparse()).unwrap();
        let mut svm = KernelSVM::new(kernel, SvmConfig::default()).unwrap();

        assert_eq!(svm.name(), "LibSVM");
        assert_eq!(svm.classifier_type(), ClassifierType::LibSvm);
        assert!(matches!(
            svm.predict(features.vector(0)),
            Err(SVMError::ModelNotTrained)
        ));

        let status = svm.train(Arc::clone(&features), &labels).unwrap();
        assert!(status.is_converged());
        assert!(svm.model().is_some());

        for (i, &y) in labels.iter().enumerate() {
            assert!(svm.predict(features.vector(i)).unwrap() * y > 0.0);
        }
        let batch = svm.predict_batch(&features).unwrap();
        assert_eq!(
            batch.iter().map(|p| p.label).collect::<Vec<_>>(),
            labels
        );
    }

    #[test]
    fn test_evaluation_metrics() {
        let metrics = EvaluationMetrics::new(10, 5, 2, 3);

        assert_eq!(metrics.accuracy(), 0.75); // (10+5)/(10+5+2+3)
        assert_eq!(metrics.precision(), 10.0 / 12.0);
        assert_eq!(metrics.recall(), 10.0 / 13.0);
        assert!(metrics.f1_score() > 0.0);
        assert_eq!(metrics.specificity(), 5.0 / 7.0);
        assert_eq!(metrics.total(), 20);

        let predictions = [1.0, -1.0, -0.5, 0.2].map(Prediction::from_decision_value);
        let metrics = EvaluationMetrics::from_predictions(&predictions, &[1.0, -1.0, 1.0, -1.0]);
        assert_eq!(metrics, EvaluationMetrics::new(1, 1, 1, 1));
    }

    #[test]
    fn test_file_operations() {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(temp_file, "+1 1:2.0").expect("Failed to write");
        writeln!(temp_file, "-1 1:-2.0").expect("Failed to write");
        writeln!(temp_file, "+1 1:1.5").expect("Failed to write");
        writeln!(temp_file, "-1 1:-1.5").expect("Failed to write");
        temp_file.flush().expect("Failed to flush");

        let kernel = CauchyKernel::new(1.0, EuclideanDistance::sparse()).unwrap();
        let model = SVM::with_kernel(kernel)
            .train_from_file(temp_file.path())
            .expect("Training should succeed");

        let accuracy = model
            .evaluate_from_file(temp_file.path())
            .expect("Evaluation should succeed");
        assert_eq!(accuracy, 1.0);

        let predictions = model.predict_from_file(temp_file.path()).unwrap();
        assert_eq!(predictions.len(), 4);
    }
}
