//! Cauchy kernel implementation
//!
//! K(x, y) = 1 / (1 + ||x - y||² / σ)
//!
//! The kernel is built on top of a [`Distance`] provider: binding the kernel
//! binds the distance to the same feature pairing, and the kernel reports
//! the distance's feature type and class as its own.

use crate::core::{Result, SVMError};
use crate::distance::{Distance, EuclideanDistance};
use crate::features::{FeatureClass, FeatureSet, FeatureType};
use crate::kernel::{Kernel, KernelType};
use std::sync::Arc;

/// Cauchy kernel over a distance provider (Euclidean by default)
#[derive(Debug, Clone)]
pub struct CauchyKernel<D: Distance = EuclideanDistance> {
    sigma: f64,
    distance: D,
}

impl<D: Distance> CauchyKernel<D> {
    /// Create a Cauchy kernel with scale `sigma` over `distance`
    ///
    /// Fails with `InvalidParameter` unless sigma is positive and finite.
    pub fn new(sigma: f64, distance: D) -> Result<Self> {
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(SVMError::InvalidParameter(format!(
                "Cauchy sigma must be positive, got: {sigma}"
            )));
        }
        Ok(Self { sigma, distance })
    }

    /// Create and bind in one step
    pub fn with_features(
        left: Arc<FeatureSet>,
        right: Arc<FeatureSet>,
        sigma: f64,
        distance: D,
    ) -> Result<Self> {
        let mut kernel = Self::new(sigma, distance)?;
        kernel.init(left, right)?;
        Ok(kernel)
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// The distance provider this kernel evaluates through
    pub fn distance(&self) -> &D {
        &self.distance
    }
}

impl<D: Distance> Kernel for CauchyKernel<D> {
    fn init(&mut self, left: Arc<FeatureSet>, right: Arc<FeatureSet>) -> Result<()> {
        // The distance validates the pairing against its own declared type/class
        self.distance.init(left, right)
    }

    fn cleanup(&mut self) {
        self.distance.cleanup();
    }

    fn compute(&self, i: usize, j: usize) -> Result<f64> {
        if !self.distance.is_initialized() {
            return Err(SVMError::DistanceNotInitialized);
        }
        let dist = self.distance.distance(i, j)?;
        Ok(1.0 / (1.0 + dist * dist / self.sigma))
    }

    fn is_initialized(&self) -> bool {
        self.distance.is_initialized()
    }

    fn num_lhs(&self) -> usize {
        self.distance.lhs().map_or(0, |set| set.len())
    }

    fn num_rhs(&self) -> usize {
        self.distance.rhs().map_or(0, |set| set.len())
    }

    fn kernel_type(&self) -> KernelType {
        KernelType::Cauchy
    }

    fn feature_type(&self) -> FeatureType {
        self.distance.feature_type()
    }

    fn feature_class(&self) -> FeatureClass {
        self.distance.feature_class()
    }

    fn name(&self) -> &'static str {
        "CauchyKernel"
    }
}
