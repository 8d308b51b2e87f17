//! Kernel trait definition

use crate::core::Result;
use crate::features::{FeatureClass, FeatureSet, FeatureType};
use std::sync::Arc;

/// Tag identifying the kernel variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelType {
    Linear,
    Gaussian,
    Polynomial,
    Cauchy,
}

/// Kernel function over a bound (left, right) pair of feature sets
///
/// A kernel function K(x, y) must satisfy Mercer's condition to be valid for SVM.
/// Implementations are bound to two feature collections with [`Kernel::init`]
/// and then evaluated by index: `compute(i, j)` is K(left[i], right[j]).
/// The result depends only on the current binding and the kernel's own
/// scalar parameters.
pub trait Kernel: Send + Sync {
    /// Bind the kernel to `left` and `right` (which may be the same set).
    ///
    /// Rebinding replaces both sides at once. If the feature sets are not
    /// compatible with [`Kernel::feature_type`]/[`Kernel::feature_class`] the
    /// call fails with `FeatureTypeMismatch` and the kernel is left unbound.
    fn init(&mut self, left: Arc<FeatureSet>, right: Arc<FeatureSet>) -> Result<()>;

    /// Drop the current binding
    fn cleanup(&mut self);

    /// Kernel value for element `i` of the left set and `j` of the right set
    fn compute(&self, i: usize, j: usize) -> Result<f64>;

    /// Fill `row[j] = K(i, j)` for every right-hand element
    fn compute_row(&self, i: usize, row: &mut [f64]) -> Result<()> {
        for (j, value) in row.iter_mut().enumerate() {
            *value = self.compute(i, j)?;
        }
        Ok(())
    }

    fn is_initialized(&self) -> bool;

    /// Size of the bound left set (0 when unbound)
    fn num_lhs(&self) -> usize;

    /// Size of the bound right set (0 when unbound)
    fn num_rhs(&self) -> usize;

    fn kernel_type(&self) -> KernelType;

    fn feature_type(&self) -> FeatureType;

    fn feature_class(&self) -> FeatureClass;

    fn name(&self) -> &'static str;
}
