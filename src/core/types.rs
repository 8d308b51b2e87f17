//! Core type definitions for SVM

use crate::core::{Result, SVMError};
use serde::{Deserialize, Serialize};

/// Prediction result containing label and decision value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Predicted class label (+1 or -1)
    pub label: f64,
    /// Raw decision function value
    pub decision_value: f64,
}

impl Prediction {
    /// Create a prediction from a signed margin score
    pub fn from_decision_value(decision_value: f64) -> Self {
        let label = if decision_value >= 0.0 { 1.0 } else { -1.0 };
        Self {
            label,
            decision_value,
        }
    }

    /// Get confidence as absolute value of decision value
    pub fn confidence(&self) -> f64 {
        self.decision_value.abs()
    }
}

/// Sparse vector representation with sorted indices
#[derive(Clone, Debug, PartialEq)]
pub struct SparseVector {
    /// Sorted indices of non-zero elements
    pub indices: Vec<usize>,
    /// Values corresponding to indices
    pub values: Vec<f64>,
}

impl SparseVector {
    /// Create a new sparse vector, ensuring indices are sorted
    pub fn new(indices: Vec<usize>, values: Vec<f64>) -> Self {
        assert_eq!(
            indices.len(),
            values.len(),
            "Indices and values must have same length"
        );

        let mut pairs: Vec<_> = indices.into_iter().zip(values).collect();
        pairs.sort_by_key(|&(idx, _)| idx);

        let (indices, values): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        Self { indices, values }
    }

    /// Build a sparse vector from a dense row, dropping exact zeros
    pub fn from_dense(row: &[f64]) -> Self {
        let (indices, values) = row
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0.0)
            .map(|(i, &v)| (i, v))
            .unzip();
        Self { indices, values }
    }

    /// Create an empty sparse vector
    pub fn empty() -> Self {
        Self {
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Get the value at a specific index (0 if not present)
    pub fn get(&self, index: usize) -> f64 {
        match self.indices.binary_search(&index) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    /// Compute squared L2 norm
    pub fn norm_squared(&self) -> f64 {
        self.values.iter().map(|&v| v * v).sum()
    }

    /// Compute L2 norm
    pub fn norm(&self) -> f64 {
        self.norm_squared().sqrt()
    }

    /// Dot product with another sparse vector.
    ///
    /// Both index lists are sorted, so this is a single merge pass.
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let mut result = 0.0;
        let (mut i, mut j) = (0, 0);

        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Equal => {
                    result += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
            }
        }

        result
    }

    /// Squared Euclidean distance ||x - y||², absent coordinates count as zero
    pub fn squared_distance(&self, other: &SparseVector) -> f64 {
        let mut distance_sq = 0.0;
        let (mut i, mut j) = (0, 0);

        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Equal => {
                    let diff = self.values[i] - other.values[j];
                    distance_sq += diff * diff;
                    i += 1;
                    j += 1;
                }
                std::cmp::Ordering::Less => {
                    distance_sq += self.values[i] * self.values[i];
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    distance_sq += other.values[j] * other.values[j];
                    j += 1;
                }
            }
        }

        distance_sq += self.values[i..].iter().map(|v| v * v).sum::<f64>();
        distance_sq += other.values[j..].iter().map(|v| v * v).sum::<f64>();

        distance_sq
    }

    /// Number of non-zero elements
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Check if vector is empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// One past the largest stored index (0 for an empty vector)
    pub fn dim(&self) -> usize {
        self.indices.last().map_or(0, |&i| i + 1)
    }
}

/// Training sample with features and label
#[derive(Clone, Debug)]
pub struct Sample {
    /// Feature vector (sparse representation)
    pub features: SparseVector,
    /// Class label (+1 or -1 for binary classification)
    pub label: f64,
}

impl Sample {
    /// Create a new sample
    pub fn new(features: SparseVector, label: f64) -> Self {
        Self { features, label }
    }
}

/// Dual formulation used for training
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolverType {
    /// Box constraint `0 <= alpha_i <= C`
    #[default]
    CSvc,
    /// `sum(alpha) = nu * n`, nu in (0, 1]
    NuSvc,
}

/// Working set selection rule for the decomposition solver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkingSetStrategy {
    /// First-order rule: the pair with the largest KKT violation
    MaximalViolatingPair,
    /// Keep the maximal violator, choose its partner by second-order gain
    #[default]
    SecondOrder,
}

/// Kernel cache budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheSize {
    /// Memory budget in bytes, converted to whole rows
    Bytes(usize),
    /// Number of kernel rows kept
    Rows(usize),
}

impl CacheSize {
    /// Number of rows of length `row_len` this budget holds (at least one)
    pub fn rows_for(&self, row_len: usize) -> usize {
        match *self {
            CacheSize::Rows(rows) => rows.max(1),
            CacheSize::Bytes(bytes) => {
                let row_bytes = row_len.max(1) * std::mem::size_of::<f64>();
                (bytes / row_bytes).max(1)
            }
        }
    }
}

impl Default for CacheSize {
    fn default() -> Self {
        CacheSize::Bytes(100_000_000)
    }
}

/// Training configuration, captured once per training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvmConfig {
    pub solver_type: SolverType,
    /// Regularization constant (C-SVC)
    pub c: f64,
    /// Multiplier on C for positive samples
    pub positive_weight: f64,
    /// Multiplier on C for negative samples
    pub negative_weight: f64,
    /// Fraction bound (nu-SVC)
    pub nu: f64,
    /// Tolerance on the maximal KKT violation
    pub epsilon: f64,
    pub max_iterations: usize,
    pub cache_size: CacheSize,
    pub shrinking: bool,
    pub working_set_strategy: WorkingSetStrategy,
}

impl Default for SvmConfig {
    fn default() -> Self {
        Self {
            solver_type: SolverType::CSvc,
            c: 1.0,
            positive_weight: 1.0,
            negative_weight: 1.0,
            nu: 0.5,
            epsilon: 0.001,
            max_iterations: 10_000_000,
            cache_size: CacheSize::default(),
            shrinking: true,
            working_set_strategy: WorkingSetStrategy::SecondOrder,
        }
    }
}

impl SvmConfig {
    /// Reject invalid values before any kernel or solver work starts
    pub fn validate(&self) -> Result<()> {
        match self.solver_type {
            SolverType::CSvc => {
                if !(self.c.is_finite() && self.c > 0.0) {
                    return Err(SVMError::InvalidParameter(format!(
                        "C must be positive and finite, got {}",
                        self.c
                    )));
                }
                for (name, w) in [
                    ("positive_weight", self.positive_weight),
                    ("negative_weight", self.negative_weight),
                ] {
                    if !(w.is_finite() && w > 0.0) {
                        return Err(SVMError::InvalidParameter(format!(
                            "{name} must be positive and finite, got {w}"
                        )));
                    }
                }
            }
            SolverType::NuSvc => {
                if !(self.nu > 0.0 && self.nu <= 1.0) {
                    return Err(SVMError::InvalidParameter(format!(
                        "nu must be in (0, 1], got {}",
                        self.nu
                    )));
                }
            }
        }

        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(SVMError::InvalidParameter(format!(
                "epsilon must be positive and finite, got {}",
                self.epsilon
            )));
        }
        if self.max_iterations == 0 {
            return Err(SVMError::InvalidParameter(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if matches!(self.cache_size, CacheSize::Bytes(0) | CacheSize::Rows(0)) {
            return Err(SVMError::InvalidParameter(
                "cache size must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Lifecycle of a solver run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverStatus {
    Initialized,
    Iterating,
    /// Maximal KKT violation fell below epsilon
    Converged,
    /// Iteration cap reached first; the solution is usable but approximate
    MaxIterExceeded,
    /// Stopped through the cancellation flag; the solution is approximate
    Cancelled,
}

impl SolverStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SolverStatus::Converged | SolverStatus::MaxIterExceeded | SolverStatus::Cancelled
        )
    }

    pub fn is_converged(&self) -> bool {
        *self == SolverStatus::Converged
    }
}

/// Machine type reported to the surrounding model framework
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierType {
    LibSvm,
}
