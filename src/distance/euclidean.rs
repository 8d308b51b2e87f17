//! Euclidean distance provider

use crate::core::{Result, SVMError};
use crate::distance::Distance;
use crate::features::{check_compatible, FeatureBinding, FeatureClass, FeatureSet, FeatureType};
use std::sync::Arc;

/// Euclidean distance: d(x, y) = ||x - y||
///
/// Operates on real-valued features of one storage class, chosen at
/// construction (dense unless built with [`EuclideanDistance::sparse`]).
#[derive(Debug, Clone)]
pub struct EuclideanDistance {
    feature_class: FeatureClass,
    binding: Option<FeatureBinding>,
}

impl EuclideanDistance {
    /// Distance over dense real features
    pub fn new() -> Self {
        Self::for_class(FeatureClass::Dense)
    }

    /// Distance over sparse real features
    pub fn sparse() -> Self {
        Self::for_class(FeatureClass::Sparse)
    }

    pub fn for_class(feature_class: FeatureClass) -> Self {
        Self {
            feature_class,
            binding: None,
        }
    }

    /// Bound at construction
    pub fn with_features(left: Arc<FeatureSet>, right: Arc<FeatureSet>) -> Result<Self> {
        let mut distance = Self::for_class(left.feature_class());
        distance.init(left, right)?;
        Ok(distance)
    }
}

impl Default for EuclideanDistance {
    fn default() -> Self {
        Self::new()
    }
}

impl Distance for EuclideanDistance {
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

    fn distance(&self, i: usize, j: usize) -> Result<f64> {
        let binding = self
            .binding
            .as_ref()
            .ok_or(SVMError::DistanceNotInitialized)?;
        let (x, y) = binding.pair(i, j)?;
        // Clamp guards against -0.0 from cancellation
        Ok(x.squared_distance(y).max(0.0).sqrt())
    }

    fn is_initialized(&self) -> bool {
        self.binding.is_some()
    }

    fn lhs(&self) -> Option<&Arc<FeatureSet>> {
        self.binding.as_ref().map(FeatureBinding::left)
    }

    fn rhs(&self) -> Option<&Arc<FeatureSet>> {
        self.binding.as_ref().map(FeatureBinding::right)
    }

    fn feature_type(&self) -> FeatureType {
        FeatureType::Real
    }

    fn feature_class(&self) -> FeatureClass {
        self.feature_class
    }

    fn name(&self) -> &'static str {
        "EuclideanDistance"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SparseVector;
    use approx::assert_relative_eq;

    fn dense(rows: Vec<Vec<f64>>) -> Arc<FeatureSet> {
        Arc::new(FeatureSet::dense(rows).unwrap())
    }

    #[test]
    fn test_distance_requires_init() {
        let distance = EuclideanDistance::new();
        assert!(!distance.is_initialized());
        assert!(matches!(
            distance.distance(0, 0),
            Err(SVMError::DistanceNotInitialized)
        ));
    }

    #[test]
    fn test_euclidean_values() {
        let set = dense(vec![vec![0.0, 0.0], vec![3.0, 4.0]]);
        let distance = EuclideanDistance::with_features(Arc::clone(&set), set).unwrap();

        assert_relative_eq!(distance.distance(0, 1).unwrap(), 5.0);
        assert_relative_eq!(distance.distance(1, 0).unwrap(), 5.0);
        assert_eq!(distance.distance(1, 1).unwrap(), 0.0);
    }

    #[test]
    fn test_euclidean_out_of_range() {
        let set = dense(vec![vec![1.0]]);
        let distance = EuclideanDistance::with_features(Arc::clone(&set), set).unwrap();
        assert!(matches!(
            distance.distance(0, 3),
            Err(SVMError::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_class_mismatch_leaves_unbound() {
        let sparse = Arc::new(FeatureSet::sparse(vec![SparseVector::new(
            vec![0],
            vec![1.0],
        )]));
        let mut distance = EuclideanDistance::new();
        let result = distance.init(Arc::clone(&sparse), sparse);
        assert!(matches!(result, Err(SVMError::FeatureTypeMismatch { .. })));
        assert!(!distance.is_initialized());
    }

    #[test]
    fn test_sparse_distance_and_cleanup() {
        let sparse = Arc::new(FeatureSet::sparse(vec![
            SparseVector::new(vec![0], vec![1.0]),
            SparseVector::new(vec![3], vec![1.0]),
        ]));
        let mut distance = EuclideanDistance::sparse();
        distance.init(Arc::clone(&sparse), sparse).unwrap();
        assert_relative_eq!(distance.distance(0, 1).unwrap(), 2.0_f64.sqrt());

        distance.cleanup();
        assert!(distance.lhs().is_none());
        assert!(distance.distance(0, 1).is_err());
    }
}
