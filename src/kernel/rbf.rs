//! RBF (Radial Basis Function) kernel implementation
//!
//! The RBF kernel is defined as: K(x, y) = exp(-γ * ||x - y||²)
//! where γ (gamma) is a hyperparameter that controls the kernel width.

use crate::core::{Result, SVMError};
use crate::features::{check_compatible, FeatureBinding, FeatureClass, FeatureSet, FeatureType};
use crate::kernel::{Kernel, KernelType};
use std::sync::Arc;

/// RBF (Gaussian) kernel: K(x, y) = exp(-γ * ||x - y||²)
///
/// The gamma parameter controls the "reach" of each training example:
/// - High gamma: close points have high influence (potential overfitting)
/// - Low gamma: distant points have influence (potential underfitting)
#[derive(Debug, Clone)]
pub struct RBFKernel {
    gamma: f64,
    binding: Option<FeatureBinding>,
    /// Squared norms of the bound sets, so a pair costs one dot product
    norms: Option<(Arc<[f64]>, Arc<[f64]>)>,
}

impl RBFKernel {
    /// Create a new RBF kernel with specified gamma parameter
    ///
    /// Fails with `InvalidParameter` unless gamma is positive and finite.
    pub fn new(gamma: f64) -> Result<Self> {
        if !(gamma.is_finite() && gamma > 0.0) {
            return Err(SVMError::InvalidParameter(format!(
                "Gamma must be positive, got: {gamma}"
            )));
        }
        Ok(Self {
            gamma,
            binding: None,
            norms: None,
        })
    }

    /// Create RBF kernel with gamma = 1.0 / n_features
    pub fn with_auto_gamma(n_features: usize) -> Result<Self> {
        if n_features == 0 {
            return Err(SVMError::InvalidParameter(
                "Number of features must be positive".to_string(),
            ));
        }
        Self::new(1.0 / n_features as f64)
    }

    /// Create RBF kernel with gamma = 1.0
    pub fn unit_gamma() -> Self {
        Self {
            gamma: 1.0,
            binding: None,
            norms: None,
        }
    }

    /// Get the gamma parameter
    pub fn gamma(&self) -> f64 {
        self.gamma
    }
}

impl Default for RBFKernel {
    /// Default RBF kernel with gamma = 1.0
    fn default() -> Self {
        Self::unit_gamma()
    }
}

fn squared_norms(set: &FeatureSet) -> Arc<[f64]> {
    set.iter().map(|x| x.norm_squared()).collect()
}

impl Kernel for RBFKernel {
    fn init(&mut self, left: Arc<FeatureSet>, right: Arc<FeatureSet>) -> Result<()> {
        self.cleanup();
        check_compatible(
            self.name(),
            self.feature_type(),
            self.feature_class(),
            &left,
            &right,
        )?;

        let left_norms = squared_norms(&left);
        let right_norms = if Arc::ptr_eq(&left, &right) {
            Arc::clone(&left_norms)
        } else {
            squared_norms(&right)
        };
        self.norms = Some((left_norms, right_norms));
        self.binding = Some(FeatureBinding::new(left, right));
        Ok(())
    }

    fn cleanup(&mut self) {
        self.binding = None;
        self.norms = None;
    }

    fn compute(&self, i: usize, j: usize) -> Result<f64> {
        let (binding, (left_norms, right_norms)) = match (&self.binding, &self.norms) {
            (Some(binding), Some(norms)) => (binding, norms),
            _ => return Err(SVMError::KernelNotInitialized),
        };
        let (x, y) = binding.pair(i, j)?;

        // ||x - y||² = ||x||² + ||y||² - 2*x^T*y, clamped against rounding
        let squared_distance = (left_norms[i] + right_norms[j] - 2.0 * x.dot(y)).max(0.0);
        Ok((-self.gamma * squared_distance).exp())
    }

    fn is_initialized(&self) -> bool {
        self.binding.is_some()
    }

    fn num_lhs(&self) -> usize {
        self.binding.as_ref().map_or(0, FeatureBinding::num_lhs)
    }

    fn num_rhs(&self) -> usize {
        self.binding.as_ref().map_or(0, FeatureBinding::num_rhs)
    }

    fn kernel_type(&self) -> KernelType {
        KernelType::Gaussian
    }

    fn feature_type(&self) -> FeatureType {
        FeatureType::Real
    }

    fn feature_class(&self) -> FeatureClass {
        FeatureClass::Any
    }

    fn name(&self) -> &'static str {
        "GaussianKernel"
    }
}
