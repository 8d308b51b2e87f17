//! Shrinking heuristic
//!
//! Variables sitting at a bound whose gradient says they will stay there
//! are dropped from the active set; the solver keeps them out of working
//! set selection and gradient updates. Their gradients go stale and are
//! rebuilt from `G_bar` once before the final convergence check.

use crate::solver::problem::SolverVariant;
use crate::solver::smo::SolverState;
use log::debug;

/// Largest KKT violations per class and direction over a set of variables
///
/// `up_*` is taken over variables that may still increase along the
/// constraint direction (`-y·G` in I_up), `low_*` over those that may
/// decrease (`y·G` in I_low).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViolationBounds {
    pub up_pos: f64,
    pub low_pos: f64,
    pub up_neg: f64,
    pub low_neg: f64,
}

impl ViolationBounds {
    /// Scan the listed variables of `state`
    pub fn over<I>(state: &SolverState, y: &[f64], indices: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let mut bounds = Self {
            up_pos: f64::NEG_INFINITY,
            low_pos: f64::NEG_INFINITY,
            up_neg: f64::NEG_INFINITY,
            low_neg: f64::NEG_INFINITY,
        };
        let g = &state.gradient;

        for t in indices {
            if y[t] > 0.0 {
                if !state.is_upper(t) {
                    bounds.up_pos = bounds.up_pos.max(-g[t]);
                }
                if !state.is_lower(t) {
                    bounds.low_pos = bounds.low_pos.max(g[t]);
                }
            } else {
                if !state.is_lower(t) {
                    bounds.up_neg = bounds.up_neg.max(g[t]);
                }
                if !state.is_upper(t) {
                    bounds.low_neg = bounds.low_neg.max(-g[t]);
                }
            }
        }

        bounds
    }

    /// Maximal KKT violation, `-inf` when no pair can move
    pub fn violation(&self, variant: SolverVariant) -> f64 {
        match variant {
            SolverVariant::Standard => {
                self.up_pos.max(self.up_neg) + self.low_pos.max(self.low_neg)
            }
            SolverVariant::Nu => {
                (self.up_pos + self.low_pos).max(self.up_neg + self.low_neg)
            }
        }
    }

    /// Gradient threshold beyond which a bound variable is considered settled
    fn threshold(&self, variant: SolverVariant, at_upper: bool, positive: bool) -> f64 {
        let up = self.up_pos.max(self.up_neg);
        let low = self.low_pos.max(self.low_neg);
        match (variant, at_upper, positive) {
            (SolverVariant::Standard, true, true) | (SolverVariant::Standard, false, false) => up,
            (SolverVariant::Standard, true, false) | (SolverVariant::Standard, false, true) => low,
            (SolverVariant::Nu, true, true) => self.up_pos,
            (SolverVariant::Nu, true, false) => self.low_neg,
            (SolverVariant::Nu, false, true) => self.low_pos,
            (SolverVariant::Nu, false, false) => self.up_neg,
        }
    }

    /// Whether variable `i` can leave the active set
    pub fn is_settled(&self, state: &SolverState, y: &[f64], variant: SolverVariant, i: usize) -> bool {
        let g = state.gradient[i];
        let positive = y[i] > 0.0;
        if state.is_upper(i) {
            -g > self.threshold(variant, true, positive)
        } else if state.is_lower(i) {
            g > self.threshold(variant, false, positive)
        } else {
            false
        }
    }
}

/// Shrinking strategy for the SMO solver
///
/// Shrinks once per call; the first time the active violation gets within
/// `10 * epsilon` the caller must rebuild the full gradient and reactivate
/// every variable before shrinking continues.
#[derive(Debug, Default)]
pub struct ShrinkingStrategy {
    unshrunk: bool,
}

impl ShrinkingStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the caller must unshrink now. Returns `true` at most once.
    pub fn needs_unshrink(
        &mut self,
        bounds: &ViolationBounds,
        variant: SolverVariant,
        epsilon: f64,
    ) -> bool {
        if !self.unshrunk && bounds.violation(variant) <= epsilon * 10.0 {
            self.unshrunk = true;
            return true;
        }
        false
    }

    /// Drop settled variables from the active set, returning how many left
    pub fn shrink(
        &self,
        state: &mut SolverState,
        y: &[f64],
        bounds: &ViolationBounds,
        variant: SolverVariant,
    ) -> usize {
        let before = state.active.len();
        let mut active = std::mem::take(&mut state.active);
        active.retain(|&i| !bounds.is_settled(state, y, variant, i));
        state.active = active;

        let removed = before - state.active.len();
        if removed > 0 {
            debug!(
                "Shrinking: removed {} variables, {} active",
                removed,
                state.active.len()
            );
        }
        removed
    }
}
