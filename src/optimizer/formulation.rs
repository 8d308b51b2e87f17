//! C-SVC and nu-SVC formulations on top of the common dual problem

use crate::core::{Result, SVMError, SolverType, SvmConfig};
use crate::solver::{DualProblem, SolverResult, SolverVariant};
use log::warn;

/// Number of positive and negative samples in a label vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassCounts {
    pub positive: usize,
    pub negative: usize,
}

impl ClassCounts {
    /// Count labels, rejecting anything other than ±1 and sets that do not
    /// contain both classes
    pub fn from_labels(labels: &[f64]) -> Result<Self> {
        if labels.is_empty() {
            return Err(SVMError::EmptyTrainingSet(
                "no training samples".to_string(),
            ));
        }

        let mut counts = Self {
            positive: 0,
            negative: 0,
        };
        for &label in labels {
            if label == 1.0 {
                counts.positive += 1;
            } else if label == -1.0 {
                counts.negative += 1;
            } else {
                return Err(SVMError::InvalidLabel(label));
            }
        }

        if counts.positive == 0 || counts.negative == 0 {
            return Err(SVMError::EmptyTrainingSet(format!(
                "training set holds a single class ({} positive, {} negative)",
                counts.positive, counts.negative
            )));
        }
        Ok(counts)
    }

    pub fn total(&self) -> usize {
        self.positive + self.negative
    }
}

/// Dual formulation chosen from [`SolverType`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Formulation {
    /// Box [0, C·w(y)] per variable, p = −1
    CSvc { c_positive: f64, c_negative: f64 },
    /// Box [0, 1], p = 0, Σα per class fixed to nu·n/2
    NuSvc { nu: f64 },
}

impl Formulation {
    pub fn from_config(config: &SvmConfig) -> Self {
        match config.solver_type {
            SolverType::CSvc => Formulation::CSvc {
                c_positive: config.c * config.positive_weight,
                c_negative: config.c * config.negative_weight,
            },
            SolverType::NuSvc => Formulation::NuSvc { nu: config.nu },
        }
    }

    pub fn solver_type(&self) -> SolverType {
        match self {
            Formulation::CSvc { .. } => SolverType::CSvc,
            Formulation::NuSvc { .. } => SolverType::NuSvc,
        }
    }

    /// Build the dual problem for `labels`
    pub fn build_problem(&self, labels: &[f64]) -> Result<DualProblem> {
        let counts = ClassCounts::from_labels(labels)?;
        let n = labels.len();

        match *self {
            Formulation::CSvc {
                c_positive,
                c_negative,
            } => {
                let upper = labels
                    .iter()
                    .map(|&y| if y > 0.0 { c_positive } else { c_negative })
                    .collect();
                DualProblem::new(
                    SolverVariant::Standard,
                    labels.to_vec(),
                    vec![-1.0; n],
                    upper,
                    vec![0.0; n],
                )
            }
            Formulation::NuSvc { nu } => {
                let per_class = nu * n as f64 / 2.0;
                if per_class > counts.positive.min(counts.negative) as f64 {
                    return Err(SVMError::InvalidParameter(format!(
                        "nu = {nu} is infeasible for {} positive and {} negative samples",
                        counts.positive, counts.negative
                    )));
                }

                let mut remaining_pos = per_class;
                let mut remaining_neg = per_class;
                let alpha0 = labels
                    .iter()
                    .map(|&y| {
                        let remaining = if y > 0.0 {
                            &mut remaining_pos
                        } else {
                            &mut remaining_neg
                        };
                        let alpha = remaining.min(1.0);
                        *remaining -= alpha;
                        alpha
                    })
                    .collect();

                DualProblem::new(
                    SolverVariant::Nu,
                    labels.to_vec(),
                    vec![0.0; n],
                    vec![1.0; n],
                    alpha0,
                )
            }
        }
    }

    /// Bring a raw solver result back to the scale of the decision function
    ///
    /// The nu problem is solved with unit bounds; dividing α and rho by r
    /// recovers the classifier (objective by r²).
    pub fn rescale(&self, mut result: SolverResult) -> SolverResult {
        if let Formulation::NuSvc { .. } = self {
            let r = result.r;
            if r > 0.0 && r.is_finite() {
                for alpha in &mut result.alpha {
                    *alpha /= r;
                }
                result.rho /= r;
                result.objective /= r * r;
            } else {
                warn!("nu-SVC: non-positive margin scale r = {r}, leaving solution unscaled");
            }
        }
        result
    }
}
