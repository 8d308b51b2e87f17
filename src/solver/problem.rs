//! Box-constrained dual problem handed to the SMO solver
//!
//! min ½ αᵀQα + pᵀα  subject to  yᵀα = Δ,  0 ≤ αᵢ ≤ Cᵢ
//!
//! where Qᵢⱼ = yᵢ yⱼ K(i, j) and Δ is fixed by the starting point.

use crate::core::{Result, SVMError};

/// Which optimality conditions the solver works with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverVariant {
    /// One equality constraint (C-SVC)
    Standard,
    /// Equality constraints per class (nu-SVC), selection and rho per class
    Nu,
}

/// A dual problem instance: one variable per training sample
#[derive(Debug, Clone)]
pub struct DualProblem {
    variant: SolverVariant,
    y: Vec<f64>,
    p: Vec<f64>,
    upper: Vec<f64>,
    alpha0: Vec<f64>,
}

impl DualProblem {
    /// Build a problem, checking that all vectors agree in length, labels
    /// are ±1 and the starting point lies inside the box.
    pub fn new(
        variant: SolverVariant,
        y: Vec<f64>,
        p: Vec<f64>,
        upper: Vec<f64>,
        alpha0: Vec<f64>,
    ) -> Result<Self> {
        let n = y.len();
        if n == 0 {
            return Err(SVMError::EmptyTrainingSet(
                "dual problem has no variables".to_string(),
            ));
        }
        for len in [p.len(), upper.len(), alpha0.len()] {
            if len != n {
                return Err(SVMError::DimensionMismatch {
                    expected: n,
                    actual: len,
                });
            }
        }
        if let Some(&bad) = y.iter().find(|&&label| label != 1.0 && label != -1.0) {
            return Err(SVMError::InvalidLabel(bad));
        }
        if let Some(&c) = upper.iter().find(|&&c| !(c.is_finite() && c > 0.0)) {
            return Err(SVMError::InvalidParameter(format!(
                "upper bound must be positive and finite, got {c}"
            )));
        }
        if alpha0.iter().zip(&upper).any(|(&a, &c)| !(0.0..=c).contains(&a)) {
            return Err(SVMError::InvalidParameter(
                "starting point violates the box constraints".to_string(),
            ));
        }

        Ok(Self {
            variant,
            y,
            p,
            upper,
            alpha0,
        })
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn variant(&self) -> SolverVariant {
        self.variant
    }

    /// Labels (±1)
    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// Linear term
    pub fn p(&self) -> &[f64] {
        &self.p
    }

    /// Per-variable upper bounds Cᵢ; every lower bound is 0
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    pub fn alpha0(&self) -> &[f64] {
        &self.alpha0
    }

    /// yᵀα − yᵀα₀: how far `alpha` has drifted off the equality constraint
    pub fn equality_residual(&self, alpha: &[f64]) -> f64 {
        self.y
            .iter()
            .zip(alpha.iter().zip(&self.alpha0))
            .map(|(&y, (&a, &a0))| y * (a - a0))
            .sum()
    }

    /// Whether every αᵢ lies within [−tol, Cᵢ + tol]
    pub fn is_box_feasible(&self, alpha: &[f64], tol: f64) -> bool {
        alpha.len() == self.len()
            && alpha
                .iter()
                .zip(&self.upper)
                .all(|(&a, &c)| a >= -tol && a <= c + tol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_class() -> DualProblem {
        DualProblem::new(
            SolverVariant::Standard,
            vec![1.0, -1.0, 1.0],
            vec![-1.0; 3],
            vec![1.0; 3],
            vec![0.0; 3],
        )
        .unwrap()
    }

    #[test]
    fn test_problem_accessors() {
        let problem = two_class();
        assert_eq!(problem.len(), 3);
        assert_eq!(problem.variant(), SolverVariant::Standard);
        assert_eq!(problem.upper(), &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_problem_rejects_empty() {
        let result = DualProblem::new(SolverVariant::Standard, vec![], vec![], vec![], vec![]);
        assert!(matches!(result, Err(SVMError::EmptyTrainingSet(_))));
    }

    #[test]
    fn test_problem_rejects_bad_inputs() {
        assert!(matches!(
            DualProblem::new(SolverVariant::Standard, vec![0.5], vec![-1.0], vec![1.0], vec![0.0]),
            Err(SVMError::InvalidLabel(_))
        ));
        assert!(matches!(
            DualProblem::new(SolverVariant::Standard, vec![1.0], vec![-1.0, -1.0], vec![1.0], vec![0.0]),
            Err(SVMError::DimensionMismatch { .. })
        ));
        assert!(DualProblem::new(SolverVariant::Standard, vec![1.0], vec![-1.0], vec![0.0], vec![0.0]).is_err());
        assert!(DualProblem::new(SolverVariant::Standard, vec![1.0], vec![-1.0], vec![1.0], vec![2.0]).is_err());
    }

    #[test]
    fn test_equality_residual_and_box() {
        let problem = two_class();
        assert_eq!(problem.equality_residual(&[0.5, 0.5, 0.0]), 0.0);
        assert_eq!(problem.equality_residual(&[0.5, 0.0, 0.0]), 0.5);

        assert!(problem.is_box_feasible(&[0.0, 1.0, 0.3], 0.0));
        assert!(!problem.is_box_feasible(&[0.0, 1.1, 0.3], 1e-9));
        assert!(!problem.is_box_feasible(&[0.0, 1.0], 0.0));
    }
}
