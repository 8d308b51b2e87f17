//! Feature collections bound to kernels and distances
//!
//! A [`FeatureSet`] is an ordered, fixed-size, read-only collection of
//! vectors. Kernels and distances hold it through an `Arc`, so binding a
//! kernel never copies the data.

use crate::core::{Result, SVMError, SparseVector};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Element type of the stored features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureType {
    Real,
    Binary,
    /// Only meaningful on the consumer side: accepts every type
    Any,
}

impl FeatureType {
    /// Whether a consumer declaring `self` accepts features of type `actual`
    pub fn accepts(self, actual: FeatureType) -> bool {
        self == FeatureType::Any || self == actual
    }
}

/// Storage class the features were built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureClass {
    Dense,
    Sparse,
    /// Only meaningful on the consumer side: accepts every class
    Any,
}

impl FeatureClass {
    /// Whether a consumer declaring `self` accepts features of class `actual`
    pub fn accepts(self, actual: FeatureClass) -> bool {
        self == FeatureClass::Any || self == actual
    }
}

/// Ordered collection of feature vectors with type/class tags
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    vectors: Vec<SparseVector>,
    dim: usize,
    feature_type: FeatureType,
    feature_class: FeatureClass,
}

impl FeatureSet {
    /// Real-valued sparse features; dimensionality is the largest index seen
    pub fn sparse(vectors: Vec<SparseVector>) -> Self {
        let dim = vectors.iter().map(SparseVector::dim).max().unwrap_or(0);
        Self {
            vectors,
            dim,
            feature_type: FeatureType::Real,
            feature_class: FeatureClass::Sparse,
        }
    }

    /// Real-valued dense features; every row must have the same length
    pub fn dense(rows: Vec<Vec<f64>>) -> Result<Self> {
        let dim = rows.first().map_or(0, Vec::len);
        let vectors = rows
            .iter()
            .map(|row| {
                if row.len() != dim {
                    return Err(SVMError::DimensionMismatch {
                        expected: dim,
                        actual: row.len(),
                    });
                }
                Ok(SparseVector::from_dense(row))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            vectors,
            dim,
            feature_type: FeatureType::Real,
            feature_class: FeatureClass::Dense,
        })
    }

    /// Dense binary features, stored as 0/1 values
    pub fn binary(rows: Vec<Vec<bool>>) -> Result<Self> {
        let real_rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|b| if b { 1.0 } else { 0.0 }).collect())
            .collect();
        let mut set = Self::dense(real_rows)?;
        set.feature_type = FeatureType::Binary;
        Ok(set)
    }

    /// New set holding the listed vectors, same tags and dimensionality
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            vectors: indices.iter().map(|&i| self.vectors[i].clone()).collect(),
            dim: self.dim,
            feature_type: self.feature_type,
            feature_class: self.feature_class,
        }
    }

    /// New set over `vectors` with the same type and class tags, e.g. test
    /// points to be paired with this set in a kernel
    pub fn same_kind(&self, vectors: Vec<SparseVector>) -> Self {
        let dim = vectors
            .iter()
            .map(SparseVector::dim)
            .fold(self.dim, usize::max);
        Self {
            vectors,
            dim,
            feature_type: self.feature_type,
            feature_class: self.feature_class,
        }
    }

    /// Number of vectors
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Vector at `i`
    ///
    /// # Panics
    /// Panics if `i >= len()`
    pub fn vector(&self, i: usize) -> &SparseVector {
        &self.vectors[i]
    }

    pub fn get(&self, i: usize) -> Option<&SparseVector> {
        self.vectors.get(i)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SparseVector> {
        self.vectors.iter()
    }

    pub fn feature_type(&self) -> FeatureType {
        self.feature_type
    }

    pub fn feature_class(&self) -> FeatureClass {
        self.feature_class
    }
}

/// A (left, right) pairing of feature sets, as bound by `init`
#[derive(Debug, Clone)]
pub struct FeatureBinding {
    left: Arc<FeatureSet>,
    right: Arc<FeatureSet>,
}

impl FeatureBinding {
    pub fn new(left: Arc<FeatureSet>, right: Arc<FeatureSet>) -> Self {
        Self { left, right }
    }

    pub fn left(&self) -> &Arc<FeatureSet> {
        &self.left
    }

    pub fn right(&self) -> &Arc<FeatureSet> {
        &self.right
    }

    pub fn num_lhs(&self) -> usize {
        self.left.len()
    }

    pub fn num_rhs(&self) -> usize {
        self.right.len()
    }

    /// Whether both sides are the very same collection
    pub fn is_symmetric(&self) -> bool {
        Arc::ptr_eq(&self.left, &self.right)
    }

    /// Whether `other` binds the same two collections (by identity)
    pub fn same_pairing(&self, other: &FeatureBinding) -> bool {
        Arc::ptr_eq(&self.left, &other.left) && Arc::ptr_eq(&self.right, &other.right)
    }

    /// Left vector `i` and right vector `j`
    pub fn pair(&self, i: usize, j: usize) -> Result<(&SparseVector, &SparseVector)> {
        match (self.left.get(i), self.right.get(j)) {
            (Some(x), Some(y)) => Ok((x, y)),
            _ => Err(SVMError::IndexOutOfBounds {
                i,
                j,
                lhs: self.left.len(),
                rhs: self.right.len(),
            }),
        }
    }
}

/// Check that `left` and `right` agree with each other and with what the
/// consumer named `consumer` declares.
pub(crate) fn check_compatible(
    consumer: &'static str,
    expected_type: FeatureType,
    expected_class: FeatureClass,
    left: &FeatureSet,
    right: &FeatureSet,
) -> Result<()> {
    for side in [left, right] {
        let type_ok = expected_type.accepts(side.feature_type())
            && side.feature_type() == left.feature_type();
        let class_ok = expected_class.accepts(side.feature_class())
            && side.feature_class() == left.feature_class();
        if !type_ok || !class_ok {
            return Err(SVMError::FeatureTypeMismatch {
                kernel: consumer,
                expected_type,
                expected_class,
                actual_type: side.feature_type(),
                actual_class: side.feature_class(),
            });
        }
    }

    if left.feature_class() == FeatureClass::Dense && left.dim() != right.dim() {
        return Err(SVMError::DimensionMismatch {
            expected: left.dim(),
            actual: right.dim(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_feature_set() {
        let set = FeatureSet::dense(vec![vec![1.0, 0.0], vec![0.0, 2.0]]).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.dim(), 2);
        assert_eq!(set.feature_type(), FeatureType::Real);
        assert_eq!(set.feature_class(), FeatureClass::Dense);
        assert_eq!(set.vector(1).get(1), 2.0);
    }

    #[test]
    fn test_dense_rejects_ragged_rows() {
        let result = FeatureSet::dense(vec![vec![1.0, 0.0], vec![0.0]]);
        assert!(matches!(
            result,
            Err(SVMError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_sparse_feature_set_dim() {
        let set = FeatureSet::sparse(vec![
            SparseVector::new(vec![0, 4], vec![1.0, 1.0]),
            SparseVector::new(vec![2], vec![1.0]),
        ]);
        assert_eq!(set.dim(), 5);
        assert_eq!(set.feature_class(), FeatureClass::Sparse);
    }

    #[test]
    fn test_binary_feature_set() {
        let set = FeatureSet::binary(vec![vec![true, false], vec![false, true]]).unwrap();
        assert_eq!(set.feature_type(), FeatureType::Binary);
        assert_eq!(set.vector(0).get(0), 1.0);
        assert_eq!(set.vector(0).get(1), 0.0);
    }

    #[test]
    fn test_subset_keeps_tags() {
        let set = FeatureSet::dense(vec![vec![1.0], vec![2.0], vec![3.0]]).unwrap();
        let sub = set.subset(&[2, 0]);
        assert_eq!(sub.len(), 2);
        assert_eq!(sub.vector(0).get(0), 3.0);
        assert_eq!(sub.feature_class(), FeatureClass::Dense);
        assert_eq!(sub.dim(), 1);
    }

    #[test]
    fn test_same_kind_keeps_tags() {
        let set = FeatureSet::dense(vec![vec![1.0, 0.0, 2.0]]).unwrap();
        let probe = set.same_kind(vec![SparseVector::new(vec![0], vec![1.0])]);
        assert_eq!(probe.feature_class(), FeatureClass::Dense);
        assert_eq!(probe.dim(), 3);

        let wide = set.same_kind(vec![SparseVector::new(vec![5], vec![1.0])]);
        assert_eq!(wide.dim(), 6);
    }

    #[test]
    fn test_feature_binding_pair() {
        let left = Arc::new(FeatureSet::dense(vec![vec![1.0], vec![2.0]]).unwrap());
        let binding = FeatureBinding::new(Arc::clone(&left), Arc::clone(&left));
        assert!(binding.is_symmetric());
        assert_eq!(binding.num_lhs(), 2);

        let (x, y) = binding.pair(0, 1).unwrap();
        assert_eq!(x.get(0), 1.0);
        assert_eq!(y.get(0), 2.0);
        assert!(matches!(
            binding.pair(2, 0),
            Err(SVMError::IndexOutOfBounds { i: 2, j: 0, lhs: 2, rhs: 2 })
        ));

        let other = Arc::new(FeatureSet::dense(vec![vec![1.0], vec![2.0]]).unwrap());
        let rebound = FeatureBinding::new(left, other);
        assert!(!rebound.is_symmetric());
        assert!(!binding.same_pairing(&rebound));
    }

    #[test]
    fn test_check_compatible() {
        let dense = FeatureSet::dense(vec![vec![1.0, 2.0]]).unwrap();
        let sparse = FeatureSet::sparse(vec![SparseVector::new(vec![0], vec![1.0])]);
        let binary = FeatureSet::binary(vec![vec![true, false]]).unwrap();

        assert!(check_compatible("k", FeatureType::Real, FeatureClass::Any, &dense, &dense).is_ok());
        assert!(matches!(
            check_compatible("k", FeatureType::Real, FeatureClass::Any, &dense, &sparse),
            Err(SVMError::FeatureTypeMismatch { .. })
        ));
        assert!(matches!(
            check_compatible("k", FeatureType::Real, FeatureClass::Any, &binary, &binary),
            Err(SVMError::FeatureTypeMismatch { .. })
        ));
        assert!(matches!(
            check_compatible("k", FeatureType::Real, FeatureClass::Dense, &sparse, &sparse),
            Err(SVMError::FeatureTypeMismatch { .. })
        ));

        let wider = FeatureSet::dense(vec![vec![1.0, 2.0, 3.0]]).unwrap();
        assert!(matches!(
            check_compatible("k", FeatureType::Real, FeatureClass::Any, &dense, &wider),
            Err(SVMError::DimensionMismatch { .. })
        ));
    }
}
