//! Linear kernel implementation

use crate::core::{Result, SVMError};
use crate::features::{check_compatible, FeatureBinding, FeatureClass, FeatureSet, FeatureType};
use crate::kernel::{Kernel, KernelType};
use std::sync::Arc;

/// Linear kernel: K(x, y) = x^T * y
///
/// This is the simplest kernel function, computing the dot product between two vectors.
#[derive(Debug, Clone, Default)]
pub struct LinearKernel {
    binding: Option<FeatureBinding>,
}

impl LinearKernel {
    /// Create a new, unbound linear kernel
    pub fn new() -> Self {
        Self { binding: None }
    }
}

impl Kernel for LinearKernel {
    fn init(&mut self, left: Arc<FeatureSet>, right: Arc<FeatureSet>) -> Result<()> {
        self.binding = None;
        check_compatible(
            self.name(),
            self.feature_type(),
            self.feature_class(),
            &left,
            &right,
        )?;
        self.binding = Some(FeatureBinding::new(left, right));
        Ok(())
    }

    fn cleanup(&mut self) {
        self.binding = None;
    }

    fn compute(&self, i: usize, j: usize) -> Result<f64> {
        let binding = self.binding.as_ref().ok_or(SVMError::KernelNotInitialized)?;
        let (x, y) = binding.pair(i, j)?;
        Ok(x.dot(y))
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
        KernelType::Linear
    }

    fn feature_type(&self) -> FeatureType {
        FeatureType::Real
    }

    fn feature_class(&self) -> FeatureClass {
        FeatureClass::Any
    }

    fn name(&self) -> &'static str {
        "LinearKernel"
    }
}
