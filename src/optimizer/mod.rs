//! Training pipeline: formulation → dual problem → SMO → decision function
//!
//! [`SVMOptimizer`] owns a [`CachedKernel`] and turns a feature set plus
//! labels into a [`TrainedSVM`], which predicts by re-binding a copy of the
//! kernel on (test points, support vectors).

pub mod formulation;

pub use self::formulation::*;

use crate::cache::{CacheStats, CachedKernel};
use crate::core::{
    Prediction, Result, SVMError, SolverStatus, SolverType, SparseVector, SvmConfig,
};
use crate::features::FeatureSet;
use crate::kernel::Kernel;
use crate::solver::{SMOSolver, SolverResult};
use log::info;
use rayon::prelude::*;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Alphas at or below this fraction of the largest alpha are not support vectors
const SUPPORT_THRESHOLD: f64 = 1e-12;

/// Sparse decision function f(x) = Σ coefᵢ K(x, xᵢ) + bias
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionFunction {
    /// (training index, αᵢyᵢ) per support vector
    support: Vec<(usize, f64)>,
    bias: f64,
    status: SolverStatus,
}

impl DecisionFunction {
    /// Keep variables with non-negligible alpha; bias = −rho
    pub fn from_solution(result: &SolverResult, labels: &[f64]) -> Self {
        let max_alpha = result.alpha.iter().copied().fold(0.0, f64::max);
        let threshold = SUPPORT_THRESHOLD * max_alpha;
        let support = result
            .alpha
            .iter()
            .zip(labels)
            .enumerate()
            .filter(|(_, (&alpha, _))| alpha > threshold)
            .map(|(i, (&alpha, &y))| (i, alpha * y))
            .collect();

        Self {
            support,
            bias: -result.rho,
            status: result.status,
        }
    }

    pub fn support(&self) -> &[(usize, f64)] {
        &self.support
    }

    pub fn support_indices(&self) -> Vec<usize> {
        self.support.iter().map(|&(i, _)| i).collect()
    }

    pub fn coefficients(&self) -> Vec<f64> {
        self.support.iter().map(|&(_, coef)| coef).collect()
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn status(&self) -> SolverStatus {
        self.status
    }

    pub fn n_support_vectors(&self) -> usize {
        self.support.len()
    }

    /// Σ coefᵢ·k[i] + bias for one row of kernel values against the support set
    fn evaluate(&self, kernel_row: impl Iterator<Item = Result<f64>>) -> Result<f64> {
        let mut sum = self.bias;
        for (&(_, coef), k) in self.support.iter().zip(kernel_row) {
            sum += coef * k?;
        }
        Ok(sum)
    }
}

/// High-level optimizer combining a kernel, its cache and the solver
pub struct SVMOptimizer<K: Kernel> {
    kernel: CachedKernel<K>,
    config: SvmConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl<K: Kernel + Clone> SVMOptimizer<K> {
    /// Validate `config` and wrap `kernel` in a cache of the configured size
    pub fn new(kernel: K, config: SvmConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            kernel: CachedKernel::new(kernel, config.cache_size),
            config,
            cancel: None,
        })
    }

    pub fn with_kernel(kernel: K) -> Result<Self> {
        Self::new(kernel, SvmConfig::default())
    }

    /// Abort training between iterations once `flag` is set
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Train on `features` with ±1 `labels`
    ///
    /// Label, class balance and nu feasibility checks run before the kernel
    /// is bound. The returned model carries the solver status; hitting the
    /// iteration cap is not an error.
    pub fn train(&mut self, features: Arc<FeatureSet>, labels: &[f64]) -> Result<TrainedSVM<K>> {
        if features.is_empty() {
            return Err(SVMError::EmptyTrainingSet(
                "no training samples".to_string(),
            ));
        }
        if features.len() != labels.len() {
            return Err(SVMError::DimensionMismatch {
                expected: features.len(),
                actual: labels.len(),
            });
        }

        let formulation = Formulation::from_config(&self.config);
        let problem = formulation.build_problem(labels)?;

        self.kernel.init(Arc::clone(&features), Arc::clone(&features))?;

        let mut solver = SMOSolver::new(&self.kernel, &self.config);
        if let Some(flag) = &self.cancel {
            solver = solver.with_cancel_flag(Arc::clone(flag));
        }
        let result = formulation.rescale(solver.solve(&problem)?);
        let decision = DecisionFunction::from_solution(&result, labels);

        let stats = self.kernel.stats();
        info!(
            "Training finished: {:?}, {} iterations, {} support vectors, objective {:.6}, bias {:.6}",
            result.status,
            result.iterations,
            decision.n_support_vectors(),
            result.objective,
            decision.bias()
        );
        info!(
            "Kernel cache: {} hits, {} misses, {}/{} rows",
            stats.hits, stats.misses, stats.size, stats.capacity
        );

        let support_set = Arc::new(features.subset(&decision.support_indices()));
        Ok(TrainedSVM {
            kernel: self.kernel.kernel().clone(),
            support_set,
            decision,
            iterations: result.iterations,
            objective: result.objective,
            max_violation: result.max_violation,
            solver_type: formulation.solver_type(),
        })
    }

    pub fn config(&self) -> &SvmConfig {
        &self.config
    }

    pub fn kernel(&self) -> &K {
        self.kernel.kernel()
    }

    /// Cache statistics of the last training run
    pub fn cache_stats(&self) -> CacheStats {
        self.kernel.stats()
    }
}

/// A trained binary SVM
#[derive(Debug, Clone)]
pub struct TrainedSVM<K: Kernel> {
    kernel: K,
    support_set: Arc<FeatureSet>,
    decision: DecisionFunction,
    iterations: usize,
    objective: f64,
    max_violation: f64,
    solver_type: SolverType,
}

impl<K: Kernel + Clone> TrainedSVM<K> {
    /// Decision values f(x) for every vector of `points`, in parallel
    ///
    /// `points` must carry the same feature tags as the training set.
    pub fn decision_values(&self, points: Arc<FeatureSet>) -> Result<Vec<f64>> {
        let mut kernel = self.kernel.clone();
        kernel.init(points, Arc::clone(&self.support_set))?;

        (0..kernel.num_lhs())
            .into_par_iter()
            .map(|i| {
                self.decision
                    .evaluate((0..self.support_set.len()).map(|j| kernel.compute(i, j)))
            })
            .collect()
    }

    /// Decision value for a single vector
    pub fn decision_function(&self, x: &SparseVector) -> Result<f64> {
        let points = Arc::new(self.support_set.same_kind(vec![x.clone()]));
        let values = self.decision_values(points)?;
        values.first().copied().ok_or(SVMError::ModelNotTrained)
    }

    pub fn predict(&self, x: &SparseVector) -> Result<Prediction> {
        self.decision_function(x).map(Prediction::from_decision_value)
    }

    pub fn predict_set(&self, points: Arc<FeatureSet>) -> Result<Vec<Prediction>> {
        Ok(self
            .decision_values(points)?
            .into_iter()
            .map(Prediction::from_decision_value)
            .collect())
    }

    pub fn decision(&self) -> &DecisionFunction {
        &self.decision
    }

    /// Support vectors, in the order of [`DecisionFunction::support`]
    pub fn support_vectors(&self) -> &FeatureSet {
        &self.support_set
    }

    pub fn n_support_vectors(&self) -> usize {
        self.decision.n_support_vectors()
    }

    pub fn bias(&self) -> f64 {
        self.decision.bias()
    }

    pub fn status(&self) -> SolverStatus {
        self.decision.status()
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn objective(&self) -> f64 {
        self.objective
    }

    pub fn max_violation(&self) -> f64 {
        self.max_violation
    }

    pub fn solver_type(&self) -> SolverType {
        self.solver_type
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CacheSize;
    use crate::distance::EuclideanDistance;
    use crate::kernel::{CauchyKernel, LinearKernel};

    fn clusters() -> (Arc<FeatureSet>, Vec<f64>) {
        let rows = vec![
            vec![2.0, 2.0],
            vec![2.5, 1.5],
            vec![1.5, 2.5],
            vec![3.0, 2.0],
            vec![-2.0, -2.0],
            vec![-2.5, -1.5],
            vec![-1.5, -2.5],
            vec![-3.0, -2.0],
        ];
        let labels = vec![1.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0, -1.0];
        (Arc::new(FeatureSet::dense(rows).unwrap()), labels)
    }

    #[test]
    fn test_svm_optimizer_creation() {
        let optimizer = SVMOptimizer::with_kernel(LinearKernel::new()).unwrap();
        assert_eq!(optimizer.config().c, 1.0);
        assert_eq!(optimizer.config().epsilon, 0.001);

        let config = SvmConfig {
            c: -1.0,
            ..SvmConfig::default()
        };
        assert!(matches!(
            SVMOptimizer::new(LinearKernel::new(), config),
            Err(SVMError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_train_and_predict_c_svc() {
        let (features, labels) = clusters();
        let kernel = CauchyKernel::new(1.0, EuclideanDistance::new()).unwrap();
        let mut optimizer = SVMOptimizer::with_kernel(kernel).unwrap();

        let model = optimizer.train(Arc::clone(&features), &labels).unwrap();
        assert!(model.status().is_converged());
        assert!(model.n_support_vectors() > 0);
        assert_eq!(model.support_vectors().len(), model.n_support_vectors());
        assert_eq!(model.solver_type(), SolverType::CSvc);

        let predictions = model.predict_set(features).unwrap();
        for (prediction, &y) in predictions.iter().zip(&labels) {
            assert_eq!(prediction.label, y);
        }

        let x = SparseVector::from_dense(&[2.2, 1.9]);
        assert_eq!(model.predict(&x).unwrap().label, 1.0);
        let x = SparseVector::from_dense(&[-2.2, -1.9]);
        assert_eq!(model.predict(&x).unwrap().label, -1.0);
    }

    #[test]
    fn test_train_nu_svc() {
        let (features, labels) = clusters();
        let config = SvmConfig {
            solver_type: SolverType::NuSvc,
            nu: 0.5,
            ..SvmConfig::default()
        };
        let kernel = CauchyKernel::new(1.0, EuclideanDistance::new()).unwrap();
        let mut optimizer = SVMOptimizer::new(kernel, config).unwrap();

        let model = optimizer.train(Arc::clone(&features), &labels).unwrap();
        assert!(model.status().is_converged());
        // nu bounds the fraction of support vectors from below
        assert!(model.n_support_vectors() >= 4);

        let values = model.decision_values(features).unwrap();
        for (value, &y) in values.iter().zip(&labels) {
            assert!(value * y > 0.0);
        }
    }

    #[test]
    fn test_decision_function_matches_manual_sum() {
        let (features, labels) = clusters();
        let mut optimizer = SVMOptimizer::new(
            LinearKernel::new(),
            SvmConfig {
                cache_size: CacheSize::Rows(1),
                ..SvmConfig::default()
            },
        )
        .unwrap();
        let model = optimizer.train(Arc::clone(&features), &labels).unwrap();

        let x = features.vector(0);
        let manual: f64 = model
            .decision()
            .support()
            .iter()
            .map(|&(i, coef)| coef * features.vector(i).dot(x))
            .sum::<f64>()
            + model.bias();
        approx::assert_abs_diff_eq!(model.decision_function(x).unwrap(), manual, epsilon = 1e-12);
    }

    #[test]
    fn test_training_rejects_bad_input() {
        let (features, labels) = clusters();
        let mut optimizer = SVMOptimizer::with_kernel(LinearKernel::new()).unwrap();

        assert!(matches!(
            optimizer.train(Arc::clone(&features), &labels[..3]),
            Err(SVMError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            optimizer.train(Arc::clone(&features), &[1.0; 8]),
            Err(SVMError::EmptyTrainingSet(_))
        ));
        let empty = Arc::new(FeatureSet::sparse(vec![]));
        assert!(matches!(
            optimizer.train(empty, &[]),
            Err(SVMError::EmptyTrainingSet(_))
        ));
    }

    #[test]
    fn test_cancelled_training_still_yields_model() {
        let (features, labels) = clusters();
        let flag = Arc::new(AtomicBool::new(true));
        let mut optimizer = SVMOptimizer::with_kernel(LinearKernel::new())
            .unwrap()
            .with_cancel_flag(flag);

        let model = optimizer.train(features, &labels).unwrap();
        assert_eq!(model.status(), SolverStatus::Cancelled);
        assert_eq!(model.iterations(), 0);
        assert_eq!(model.n_support_vectors(), 0);
    }

    #[test]
    fn test_support_threshold_drops_zero_alphas() {
        let result = SolverResult {
            alpha: vec![0.0, 0.5, 1e-15, 1.0],
            gradient: vec![0.0; 4],
            alpha_status: vec![],
            rho: 0.25,
            r: 0.0,
            objective: -1.0,
            iterations: 7,
            status: SolverStatus::Converged,
            max_violation: 0.0,
        };
        let decision = DecisionFunction::from_solution(&result, &[1.0, -1.0, 1.0, 1.0]);

        assert_eq!(decision.support(), &[(1, -0.5), (3, 1.0)]);
        assert_eq!(decision.bias(), -0.25);
        assert_eq!(decision.support_indices(), vec![1, 3]);
        assert_eq!(decision.coefficients(), vec![-0.5, 1.0]);
    }
}
