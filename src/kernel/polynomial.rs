//! Polynomial Kernel Implementation
//!
//! The polynomial kernel is defined as:
//! K(x, y) = (γ * <x, y> + r)^d
//!
//! Where:
//! - γ (gamma): scaling factor for the dot product
//! - r (coef0): independent term in the polynomial
//! - d (degree): degree of the polynomial

use crate::core::{Result, SVMError};
use crate::features::{check_compatible, FeatureBinding, FeatureClass, FeatureSet, FeatureType};
use crate::kernel::{Kernel, KernelType};
use std::sync::Arc;

/// Polynomial kernel with configurable degree, gamma, and coefficient
#[derive(Debug, Clone)]
pub struct PolynomialKernel {
    gamma: f64,
    coef0: f64,
    degree: u32,
    binding: Option<FeatureBinding>,
}

impl PolynomialKernel {
    /// Creates a new polynomial kernel
    ///
    /// # Arguments
    /// * `degree` - Degree of the polynomial (must be > 0)
    /// * `gamma` - Scaling factor for the dot product (must be > 0)
    /// * `coef0` - Independent term in the polynomial
    pub fn new(degree: u32, gamma: f64, coef0: f64) -> Result<Self> {
        if degree == 0 {
            return Err(SVMError::InvalidParameter(
                "Polynomial degree must be positive".to_string(),
            ));
        }
        if !(gamma.is_finite() && gamma > 0.0) {
            return Err(SVMError::InvalidParameter(format!(
                "Gamma must be positive, got: {gamma}"
            )));
        }
        if !coef0.is_finite() {
            return Err(SVMError::InvalidParameter(format!(
                "coef0 must be finite, got: {coef0}"
            )));
        }

        Ok(Self {
            gamma,
            coef0,
            degree,
            binding: None,
        })
    }

    /// Quadratic kernel: (γ * <x,y> + 1)²
    pub fn quadratic(gamma: f64) -> Result<Self> {
        Self::new(2, gamma, 1.0)
    }

    pub fn degree(&self) -> u32 {
        self.degree
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn coef0(&self) -> f64 {
        self.coef0
    }
}

impl Kernel for PolynomialKernel {
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
        Ok((self.gamma * x.dot(y) + self.coef0).powi(self.degree as i32))
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
        KernelType::Polynomial
    }

    fn feature_type(&self) -> FeatureType {
        FeatureType::Real
    }

    fn feature_class(&self) -> FeatureClass {
        FeatureClass::Any
    }

    fn name(&self) -> &'static str {
        "PolyKernel"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polynomial_parameters() {
        let kernel = PolynomialKernel::quadratic(0.5).unwrap();
        assert_eq!(kernel.degree(), 2);
        assert_eq!(kernel.gamma(), 0.5);
        assert_eq!(kernel.coef0(), 1.0);

        assert!(PolynomialKernel::new(0, 1.0, 1.0).is_err());
        assert!(PolynomialKernel::new(2, 0.0, 1.0).is_err());
        assert!(PolynomialKernel::new(2, 1.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_polynomial_values() {
        let set = Arc::new(FeatureSet::dense(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap());
        let mut kernel = PolynomialKernel::new(2, 1.0, 1.0).unwrap();
        kernel.init(Arc::clone(&set), set).unwrap();

        // <x, y> = 11, (11 + 1)^2
        assert_eq!(kernel.compute(0, 1).unwrap(), 144.0);
        // <x, x> = 5, (5 + 1)^2
        assert_eq!(kernel.compute(0, 0).unwrap(), 36.0);
    }

    #[test]
    fn test_polynomial_degree_one_is_affine_linear() {
        let set = Arc::new(FeatureSet::dense(vec![vec![2.0], vec![-3.0]]).unwrap());
        let mut kernel = PolynomialKernel::new(1, 2.0, 0.5).unwrap();
        kernel.init(Arc::clone(&set), set).unwrap();
        assert_eq!(kernel.compute(0, 1).unwrap(), 2.0 * -6.0 + 0.5);
    }
}
