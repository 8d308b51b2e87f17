//! Decomposition solver for the SVM dual problem
//!
//! [`DualProblem`] describes the quadratic program, [`SMOSolver`] runs
//! pairwise SMO updates over a cached kernel with optional shrinking.

pub mod problem;
pub mod shrinking;
pub mod smo;

pub use self::problem::*;
pub use self::shrinking::*;
pub use self::smo::*;
