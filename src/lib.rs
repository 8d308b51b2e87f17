//! Kernel-based binary Support Vector Machine
//!
//! Pluggable kernels (including the distance-derived Cauchy kernel) bound
//! to shared feature sets, a row-granular LRU kernel cache, and an SMO
//! decomposition solver for the C-SVC and nu-SVC dual problems.

pub mod api;
pub mod cache;
pub mod core;
pub mod data;
pub mod distance;
pub mod features;
pub mod kernel;
pub mod optimizer;
pub mod solver;

// Re-export main types for convenience
pub use crate::api::{EvaluationMetrics, KernelSVM, ModelInfo, TrainedModel, SVM};
pub use crate::cache::{CacheStats, CachedKernel, KernelCache};
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::core::{Result, SVMError};
pub use crate::data::LibSVMDataset;
pub use crate::distance::{Distance, EuclideanDistance};
pub use crate::features::{FeatureBinding, FeatureClass, FeatureSet, FeatureType};
pub use crate::kernel::{
    CauchyKernel, Kernel, KernelType, LinearKernel, PolynomialKernel, RBFKernel,
};
pub use crate::optimizer::{DecisionFunction, SVMOptimizer, TrainedSVM};
pub use crate::solver::{DualProblem, SMOSolver, SolverResult};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
