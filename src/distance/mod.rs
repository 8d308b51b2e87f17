//! Distance providers consumed by distance-derived kernels

pub mod euclidean;

pub use self::euclidean::*;

use crate::core::Result;
use crate::features::{FeatureClass, FeatureSet, FeatureType};
use std::sync::Arc;

/// Non-negative distance between element `i` of the left set and element
/// `j` of the right set.
///
/// A provider must be bound with [`Distance::init`] before any call to
/// [`Distance::distance`]; unbound calls return
/// [`SVMError::DistanceNotInitialized`](crate::core::SVMError::DistanceNotInitialized).
pub trait Distance: Send + Sync {
    /// Bind both sides. Fails with `FeatureTypeMismatch` if either side is
    /// not of the declared type/class; on failure the provider is unbound.
    fn init(&mut self, left: Arc<FeatureSet>, right: Arc<FeatureSet>) -> Result<()>;

    /// Drop the current binding
    fn cleanup(&mut self);

    fn distance(&self, i: usize, j: usize) -> Result<f64>;

    fn is_initialized(&self) -> bool;

    /// The sets currently bound, if any
    fn lhs(&self) -> Option<&Arc<FeatureSet>>;

    fn rhs(&self) -> Option<&Arc<FeatureSet>>;

    fn feature_type(&self) -> FeatureType;

    fn feature_class(&self) -> FeatureClass;

    fn name(&self) -> &'static str;
}
