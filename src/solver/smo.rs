//! Sequential Minimal Optimization (SMO) solver
//!
//! Decomposition solver for the dual problem in [`DualProblem`]: every
//! iteration picks a pair of variables (working set), solves the
//! two-variable subproblem analytically and updates the gradient
//! `G = Qα + p` incrementally. Kernel rows come from a [`CachedKernel`]
//! bound on the training features (both sides).

use crate::cache::CachedKernel;
use crate::core::{Result, SVMError, SolverStatus, SvmConfig, WorkingSetStrategy};
use crate::kernel::Kernel;
use crate::solver::problem::{DualProblem, SolverVariant};
use crate::solver::shrinking::{ShrinkingStrategy, ViolationBounds};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Floor for non-positive curvature along the update direction
const TAU: f64 = 1e-12;

/// Upper limit on the number of iterations between shrinking passes
const SHRINKING_INTERVAL: usize = 1000;

/// Position of a variable inside its box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaStatus {
    LowerBound,
    UpperBound,
    Free,
}

impl AlphaStatus {
    fn of(alpha: f64, upper: f64) -> Self {
        if alpha >= upper {
            AlphaStatus::UpperBound
        } else if alpha <= 0.0 {
            AlphaStatus::LowerBound
        } else {
            AlphaStatus::Free
        }
    }
}

/// Mutable solver state for one run
#[derive(Debug, Clone)]
pub struct SolverState {
    pub(crate) alpha: Vec<f64>,
    pub(crate) gradient: Vec<f64>,
    /// Σ over upper-bounded j of Cⱼ·Qⱼ, used to rebuild shrunk gradients
    pub(crate) g_bar: Vec<f64>,
    pub(crate) alpha_status: Vec<AlphaStatus>,
    /// Variables still taking part in selection and gradient updates
    pub(crate) active: Vec<usize>,
    pub(crate) status: SolverStatus,
    pub(crate) iterations: usize,
}

impl SolverState {
    fn new(problem: &DualProblem) -> Self {
        let alpha = problem.alpha0().to_vec();
        let alpha_status = alpha
            .iter()
            .zip(problem.upper())
            .map(|(&a, &c)| AlphaStatus::of(a, c))
            .collect();

        Self {
            g_bar: vec![0.0; alpha.len()],
            gradient: problem.p().to_vec(),
            active: (0..alpha.len()).collect(),
            alpha,
            alpha_status,
            status: SolverStatus::Initialized,
            iterations: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        alpha: Vec<f64>,
        gradient: Vec<f64>,
        alpha_status: Vec<AlphaStatus>,
    ) -> Self {
        Self {
            g_bar: vec![0.0; alpha.len()],
            active: (0..alpha.len()).collect(),
            alpha,
            gradient,
            alpha_status,
            status: SolverStatus::Initialized,
            iterations: 0,
        }
    }

    pub fn alpha(&self) -> &[f64] {
        &self.alpha
    }

    pub fn gradient(&self) -> &[f64] {
        &self.gradient
    }

    pub fn status(&self) -> SolverStatus {
        self.status
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn active_size(&self) -> usize {
        self.active.len()
    }

    pub(crate) fn is_upper(&self, i: usize) -> bool {
        self.alpha_status[i] == AlphaStatus::UpperBound
    }

    pub(crate) fn is_lower(&self, i: usize) -> bool {
        self.alpha_status[i] == AlphaStatus::LowerBound
    }

    pub(crate) fn is_free(&self, i: usize) -> bool {
        self.alpha_status[i] == AlphaStatus::Free
    }

    fn update_alpha_status(&mut self, i: usize, upper: f64) {
        self.alpha_status[i] = AlphaStatus::of(self.alpha[i], upper);
    }
}

/// Outcome of a solver run
#[derive(Debug, Clone)]
pub struct SolverResult {
    pub alpha: Vec<f64>,
    pub gradient: Vec<f64>,
    pub alpha_status: Vec<AlphaStatus>,
    /// Threshold of the decision function (bias = −rho)
    pub rho: f64,
    /// Scale factor of the nu formulation, 0 for the standard variant
    pub r: f64,
    /// ½ αᵀQα + pᵀα
    pub objective: f64,
    pub iterations: usize,
    pub status: SolverStatus,
    /// Maximal KKT violation of the returned point (0 when no pair can move)
    pub max_violation: f64,
}

impl SolverResult {
    /// Indices with non-zero alpha
    pub fn support_indices(&self) -> Vec<usize> {
        self.alpha
            .iter()
            .enumerate()
            .filter(|(_, &a)| a > 0.0)
            .map(|(i, _)| i)
            .collect()
    }
}

/// SMO solver over a cached kernel
///
/// The kernel must be bound with the training features on both sides so
/// that `row(i)` holds K(i, ·) for the whole training set.
pub struct SMOSolver<'a, K: Kernel> {
    kernel: &'a CachedKernel<K>,
    epsilon: f64,
    max_iterations: usize,
    shrinking: bool,
    strategy: WorkingSetStrategy,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a, K: Kernel> SMOSolver<'a, K> {
    /// Create a solver taking its tolerance, iteration cap, shrinking flag
    /// and selection rule from `config`
    pub fn new(kernel: &'a CachedKernel<K>, config: &SvmConfig) -> Self {
        Self {
            kernel,
            epsilon: config.epsilon,
            max_iterations: config.max_iterations,
            shrinking: config.shrinking,
            strategy: config.working_set_strategy,
            cancel: None,
        }
    }

    /// Stop at the next iteration boundary once `flag` is set
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Run the solver to a terminal status
    ///
    /// Hitting the iteration cap or the cancellation flag is not an error:
    /// the result carries the approximate solution and its status.
    pub fn solve(&self, problem: &DualProblem) -> Result<SolverResult> {
        let n = problem.len();
        let kernel = self.kernel.kernel();
        if !kernel.is_initialized() {
            return Err(SVMError::KernelNotInitialized);
        }
        for size in [kernel.num_lhs(), kernel.num_rhs()] {
            if size != n {
                return Err(SVMError::DimensionMismatch {
                    expected: n,
                    actual: size,
                });
            }
        }

        let variant = problem.variant();
        let diag = self.kernel.diagonal()?;
        let mut state = SolverState::new(problem);
        self.init_gradient(problem, &mut state)?;

        info!(
            "SMO: {} variables, {:?} variant, {:?} selection, shrinking={}",
            n, variant, self.strategy, self.shrinking
        );

        let mut shrinker = ShrinkingStrategy::new();
        let mut counter = n.min(SHRINKING_INTERVAL) + 1;
        state.status = SolverStatus::Iterating;

        loop {
            if self.is_cancelled() {
                state.status = SolverStatus::Cancelled;
                break;
            }
            if state.iterations >= self.max_iterations {
                state.status = SolverStatus::MaxIterExceeded;
                break;
            }

            counter -= 1;
            if counter == 0 {
                counter = n.min(SHRINKING_INTERVAL);
                if self.shrinking {
                    self.shrink(problem, &mut state, &mut shrinker)?;
                }
            }

            let (i, j) = match self.select_working_set(problem, &state, &diag)? {
                Some(pair) => pair,
                None if state.active.len() == n => {
                    state.status = SolverStatus::Converged;
                    break;
                }
                None => {
                    // Optimal on the active set; check again on all variables
                    self.unshrink(problem, &mut state)?;
                    match self.select_working_set(problem, &state, &diag)? {
                        Some(pair) => {
                            counter = 1;
                            pair
                        }
                        None => {
                            state.status = SolverStatus::Converged;
                            break;
                        }
                    }
                }
            };

            state.iterations += 1;
            self.update_pair(problem, &mut state, &diag, i, j)?;

            if state.iterations % 1000 == 0 {
                debug!(
                    "SMO: iteration {}, {} active variables",
                    state.iterations,
                    state.active.len()
                );
            }
        }

        if state.active.len() < n {
            self.unshrink(problem, &mut state)?;
        }

        let y = problem.y();
        let max_violation = ViolationBounds::over(&state, y, 0..n)
            .violation(variant)
            .max(0.0);
        let (rho, r) = match variant {
            SolverVariant::Standard => (calculate_rho(&state, y), 0.0),
            SolverVariant::Nu => calculate_rho_nu(&state, y),
        };
        let objective = state
            .alpha
            .iter()
            .zip(state.gradient.iter().zip(problem.p()))
            .map(|(&a, (&g, &p))| a * (g + p))
            .sum::<f64>()
            / 2.0;

        match state.status {
            SolverStatus::Converged => info!(
                "SMO: converged after {} iterations (objective {:.6}, rho {:.6})",
                state.iterations, objective, rho
            ),
            SolverStatus::MaxIterExceeded => warn!(
                "SMO: reached max number of iterations ({}), max violation {:.3e}",
                state.iterations, max_violation
            ),
            SolverStatus::Cancelled => warn!(
                "SMO: cancelled after {} iterations, max violation {:.3e}",
                state.iterations, max_violation
            ),
            SolverStatus::Initialized | SolverStatus::Iterating => {}
        }

        Ok(SolverResult {
            alpha: state.alpha,
            gradient: state.gradient,
            alpha_status: state.alpha_status,
            rho,
            r,
            objective,
            iterations: state.iterations,
            status: state.status,
            max_violation,
        })
    }

    /// G = Qα₀ + p and G_bar from the starting point
    fn init_gradient(&self, problem: &DualProblem, state: &mut SolverState) -> Result<()> {
        let y = problem.y();
        for i in 0..problem.len() {
            if state.is_lower(i) {
                continue;
            }
            let row = self.kernel.row(i)?;
            let alpha_i = state.alpha[i];
            let c_i = problem.upper()[i];
            let at_upper = state.is_upper(i);
            for (k, &kik) in row.iter().enumerate() {
                let q = y[i] * y[k] * kik;
                state.gradient[k] += alpha_i * q;
                if at_upper {
                    state.g_bar[k] += c_i * q;
                }
            }
        }
        Ok(())
    }

    fn select_working_set(
        &self,
        problem: &DualProblem,
        state: &SolverState,
        diag: &[f64],
    ) -> Result<Option<(usize, usize)>> {
        match problem.variant() {
            SolverVariant::Standard => self.select_standard(problem.y(), state, diag),
            SolverVariant::Nu => self.select_nu(problem.y(), state, diag),
        }
    }

    /// Selection score of pairing `i` with `t`; lower is better
    fn pair_score(&self, row_i: Option<&[f64]>, diag: &[f64], i: usize, t: usize, grad_diff: f64) -> f64 {
        match row_i {
            Some(k_i) => {
                let quad = diag[i] + diag[t] - 2.0 * k_i[t];
                let quad = if quad > 0.0 { quad } else { TAU };
                -(grad_diff * grad_diff) / quad
            }
            None => -grad_diff,
        }
    }

    fn row_for_selection(&self, i: usize) -> Result<Option<Arc<[f64]>>> {
        match self.strategy {
            WorkingSetStrategy::SecondOrder => self.kernel.row(i).map(Some),
            WorkingSetStrategy::MaximalViolatingPair => Ok(None),
        }
    }

    /// i: maximal violator in I_up; j: best partner in I_low
    fn select_standard(
        &self,
        y: &[f64],
        state: &SolverState,
        diag: &[f64],
    ) -> Result<Option<(usize, usize)>> {
        let g = &state.gradient;

        let mut gmax = f64::NEG_INFINITY;
        let mut selected_i = None;
        for &t in &state.active {
            let candidate = if y[t] > 0.0 {
                (!state.is_upper(t)).then(|| -g[t])
            } else {
                (!state.is_lower(t)).then(|| g[t])
            };
            if let Some(value) = candidate {
                if value >= gmax {
                    gmax = value;
                    selected_i = Some(t);
                }
            }
        }
        let Some(i) = selected_i else {
            return Ok(None);
        };

        let row_i = self.row_for_selection(i)?;
        let mut gmax2 = f64::NEG_INFINITY;
        let mut best = f64::INFINITY;
        let mut selected_j = None;
        for &t in &state.active {
            let (in_low, value) = if y[t] > 0.0 {
                (!state.is_lower(t), g[t])
            } else {
                (!state.is_upper(t), -g[t])
            };
            if !in_low {
                continue;
            }
            gmax2 = gmax2.max(value);
            let grad_diff = gmax + value;
            if grad_diff > 0.0 {
                let score = self.pair_score(row_i.as_deref(), diag, i, t, grad_diff);
                if score <= best {
                    best = score;
                    selected_j = Some(t);
                }
            }
        }

        if gmax + gmax2 < self.epsilon {
            return Ok(None);
        }
        Ok(selected_j.map(|j| (i, j)))
    }

    /// Same rule applied within each class; the pair always shares a label
    fn select_nu(
        &self,
        y: &[f64],
        state: &SolverState,
        diag: &[f64],
    ) -> Result<Option<(usize, usize)>> {
        let g = &state.gradient;

        let mut gmax_pos = f64::NEG_INFINITY;
        let mut gmax_neg = f64::NEG_INFINITY;
        let mut i_pos = None;
        let mut i_neg = None;
        for &t in &state.active {
            if y[t] > 0.0 {
                if !state.is_upper(t) && -g[t] >= gmax_pos {
                    gmax_pos = -g[t];
                    i_pos = Some(t);
                }
            } else if !state.is_lower(t) && g[t] >= gmax_neg {
                gmax_neg = g[t];
                i_neg = Some(t);
            }
        }

        let row_pos = match i_pos {
            Some(i) => self.row_for_selection(i)?,
            None => None,
        };
        let row_neg = match i_neg {
            Some(i) => self.row_for_selection(i)?,
            None => None,
        };

        let mut gmax_pos2 = f64::NEG_INFINITY;
        let mut gmax_neg2 = f64::NEG_INFINITY;
        let mut best = f64::INFINITY;
        let mut selected = None;
        for &t in &state.active {
            let (partner, row, grad_diff) = if y[t] > 0.0 {
                if state.is_lower(t) {
                    continue;
                }
                gmax_pos2 = gmax_pos2.max(g[t]);
                (i_pos, row_pos.as_deref(), gmax_pos + g[t])
            } else {
                if state.is_upper(t) {
                    continue;
                }
                gmax_neg2 = gmax_neg2.max(-g[t]);
                (i_neg, row_neg.as_deref(), gmax_neg - g[t])
            };
            let Some(i) = partner else {
                continue;
            };
            if grad_diff > 0.0 {
                let score = self.pair_score(row, diag, i, t, grad_diff);
                if score <= best {
                    best = score;
                    selected = Some((i, t));
                }
            }
        }

        if (gmax_pos + gmax_pos2).max(gmax_neg + gmax_neg2) < self.epsilon {
            return Ok(None);
        }
        Ok(selected)
    }

    /// Solve the two-variable subproblem on (i, j), clip to the box along
    /// the equality constraint and update G and G_bar.
    fn update_pair(
        &self,
        problem: &DualProblem,
        state: &mut SolverState,
        diag: &[f64],
        i: usize,
        j: usize,
    ) -> Result<()> {
        let y = problem.y();
        let row_i = self.kernel.row(i)?;
        let row_j = self.kernel.row(j)?;
        let c_i = problem.upper()[i];
        let c_j = problem.upper()[j];

        let old_alpha_i = state.alpha[i];
        let old_alpha_j = state.alpha[j];
        let (g_i, g_j) = (state.gradient[i], state.gradient[j]);

        let quad = diag[i] + diag[j] - 2.0 * row_i[j];
        let quad = if quad > 0.0 { quad } else { TAU };
        let (mut a_i, mut a_j) = (old_alpha_i, old_alpha_j);

        if y[i] != y[j] {
            let delta = (-g_i - g_j) / quad;
            let diff = a_i - a_j;
            a_i += delta;
            a_j += delta;

            if diff > 0.0 {
                if a_j < 0.0 {
                    a_j = 0.0;
                    a_i = diff;
                }
            } else if a_i < 0.0 {
                a_i = 0.0;
                a_j = -diff;
            }
            if diff > c_i - c_j {
                if a_i > c_i {
                    a_i = c_i;
                    a_j = c_i - diff;
                }
            } else if a_j > c_j {
                a_j = c_j;
                a_i = c_j + diff;
            }
        } else {
            let delta = (g_i - g_j) / quad;
            let sum = a_i + a_j;
            a_i -= delta;
            a_j += delta;

            if sum > c_i {
                if a_i > c_i {
                    a_i = c_i;
                    a_j = sum - c_i;
                }
            } else if a_j < 0.0 {
                a_j = 0.0;
                a_i = sum;
            }
            if sum > c_j {
                if a_j > c_j {
                    a_j = c_j;
                    a_i = sum - c_j;
                }
            } else if a_i < 0.0 {
                a_i = 0.0;
                a_j = sum;
            }
        }

        state.alpha[i] = a_i;
        state.alpha[j] = a_j;

        let delta_i = a_i - old_alpha_i;
        let delta_j = a_j - old_alpha_j;
        for &k in &state.active {
            state.gradient[k] +=
                y[k] * (y[i] * row_i[k] * delta_i + y[j] * row_j[k] * delta_j);
        }

        let was_upper_i = state.is_upper(i);
        let was_upper_j = state.is_upper(j);
        state.update_alpha_status(i, c_i);
        state.update_alpha_status(j, c_j);

        for (t, row, was_upper, c) in [(i, &row_i, was_upper_i, c_i), (j, &row_j, was_upper_j, c_j)] {
            let now_upper = state.is_upper(t);
            if was_upper == now_upper {
                continue;
            }
            let sign = if now_upper { c } else { -c };
            for (k, g_bar) in state.g_bar.iter_mut().enumerate() {
                *g_bar += sign * y[t] * y[k] * row[k];
            }
        }

        Ok(())
    }

    fn shrink(
        &self,
        problem: &DualProblem,
        state: &mut SolverState,
        shrinker: &mut ShrinkingStrategy,
    ) -> Result<()> {
        let y = problem.y();
        let variant = problem.variant();
        let bounds = ViolationBounds::over(state, y, state.active.clone());

        if shrinker.needs_unshrink(&bounds, variant, self.epsilon) {
            self.unshrink(problem, state)?;
        }
        shrinker.shrink(state, y, &bounds, variant);
        Ok(())
    }

    /// Rebuild the gradient of inactive variables and reactivate all
    ///
    /// For inactive k: G_k = G_bar_k + p_k + Σ_{j free} αⱼ Qⱼₖ.
    fn unshrink(&self, problem: &DualProblem, state: &mut SolverState) -> Result<()> {
        let n = problem.len();
        let mut is_active = vec![false; n];
        for &k in &state.active {
            is_active[k] = true;
        }
        let inactive: Vec<usize> = (0..n).filter(|&k| !is_active[k]).collect();

        if !inactive.is_empty() {
            let y = problem.y();
            for &k in &inactive {
                state.gradient[k] = state.g_bar[k] + problem.p()[k];
            }
            for j in 0..n {
                if !state.is_free(j) {
                    continue;
                }
                let row = self.kernel.row(j)?;
                let alpha_j = state.alpha[j];
                for &k in &inactive {
                    state.gradient[k] += alpha_j * y[j] * y[k] * row[k];
                }
            }
            debug!("SMO: reconstructed gradient of {} shrunk variables", inactive.len());
        }

        state.active = (0..n).collect();
        Ok(())
    }
}

/// Midpoint of the feasible interval, tolerating an open side
fn midpoint(ub: f64, lb: f64) -> f64 {
    match (ub.is_finite(), lb.is_finite()) {
        (true, true) => (ub + lb) / 2.0,
        (true, false) => ub,
        (false, true) => lb,
        (false, false) => 0.0,
    }
}

/// Average of y·G over free variables, else the midpoint of the bounds
fn calculate_rho(state: &SolverState, y: &[f64]) -> f64 {
    let mut ub = f64::INFINITY;
    let mut lb = f64::NEG_INFINITY;
    let mut free_count = 0usize;
    let mut free_sum = 0.0;

    for (i, &yi) in y.iter().enumerate() {
        let yg = yi * state.gradient[i];
        if state.is_upper(i) {
            if yi < 0.0 {
                ub = ub.min(yg);
            } else {
                lb = lb.max(yg);
            }
        } else if state.is_lower(i) {
            if yi > 0.0 {
                ub = ub.min(yg);
            } else {
                lb = lb.max(yg);
            }
        } else {
            free_count += 1;
            free_sum += yg;
        }
    }

    if free_count > 0 {
        free_sum / free_count as f64
    } else {
        midpoint(ub, lb)
    }
}

/// Per-class thresholds r₁ (positive) and r₂ (negative);
/// returns (rho, r) = ((r₁ − r₂)/2, (r₁ + r₂)/2)
fn calculate_rho_nu(state: &SolverState, y: &[f64]) -> (f64, f64) {
    let class_threshold = |positive: bool| {
        let mut ub = f64::INFINITY;
        let mut lb = f64::NEG_INFINITY;
        let mut free_count = 0usize;
        let mut free_sum = 0.0;

        for (i, &yi) in y.iter().enumerate() {
            if (yi > 0.0) != positive {
                continue;
            }
            let g = state.gradient[i];
            if state.is_upper(i) {
                lb = lb.max(g);
            } else if state.is_lower(i) {
                ub = ub.min(g);
            } else {
                free_count += 1;
                free_sum += g;
            }
        }

        if free_count > 0 {
            free_sum / free_count as f64
        } else {
            midpoint(ub, lb)
        }
    };

    let r1 = class_threshold(true);
    let r2 = class_threshold(false);
    ((r1 - r2) / 2.0, (r1 + r2) / 2.0)
}
