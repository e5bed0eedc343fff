//! Solver policy.

use crate::error::{MixError, MixResult};
use mx_core::Real;
use serde::{Deserialize, Serialize};

/// What to do when the damped Newton iteration stalls or hits its cap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Report `PteConvergenceFailure` immediately.
    None,
    /// Bisect on pressure, solving temperature from energy conservation at
    /// each trial pressure.
    #[default]
    PressureBisection,
}

/// PTE solver configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PteConfig {
    /// Maximum Newton iterations before falling back
    pub max_iterations: usize,
    /// Tolerance on each normalized residual
    pub residual_tol: Real,
    /// Tolerance on the relative Newton step
    pub step_tol: Real,
    /// Lower bound on P and T after a step, as a fraction of the current value
    pub min_fraction: Real,
    /// Upper bound on the relative increase of P or T in one step
    pub max_relative_step: Real,
    /// Line search backtracking factor
    pub line_search_beta: Real,
    /// Maximum line search iterations
    pub max_line_search_iters: usize,
    pub fallback: FallbackPolicy,
    /// Evaluation budget for each bracketed 1-D solve
    pub max_bisection_iterations: usize,
}

impl Default for PteConfig {
    fn default() -> Self {
        Self {
            max_iterations: 64,
            residual_tol: 1e-8,
            step_tol: 1e-6,
            min_fraction: 0.1,
            max_relative_step: 4.0,
            line_search_beta: 0.5,
            max_line_search_iters: 20,
            fallback: FallbackPolicy::PressureBisection,
            max_bisection_iterations: 200,
        }
    }
}

impl PteConfig {
    /// Reject settings the solver cannot work with.
    pub fn validate(&self) -> MixResult<()> {
        if self.max_iterations == 0 {
            return Err(MixError::InvalidConfig {
                what: "max_iterations must be at least 1",
            });
        }
        if !(self.residual_tol > 0.0 && self.residual_tol < 1.0) {
            return Err(MixError::InvalidConfig {
                what: "residual_tol must lie in (0, 1)",
            });
        }
        if !(self.step_tol > 0.0 && self.step_tol < 1.0) {
            return Err(MixError::InvalidConfig {
                what: "step_tol must lie in (0, 1)",
            });
        }
        if !(self.min_fraction > 0.0 && self.min_fraction < 1.0) {
            return Err(MixError::InvalidConfig {
                what: "min_fraction must lie in (0, 1)",
            });
        }
        if !(self.max_relative_step.is_finite() && self.max_relative_step > 0.0) {
            return Err(MixError::InvalidConfig {
                what: "max_relative_step must be positive",
            });
        }
        if !(self.line_search_beta > 0.0 && self.line_search_beta < 1.0) {
            return Err(MixError::InvalidConfig {
                what: "line_search_beta must lie in (0, 1)",
            });
        }
        if self.max_bisection_iterations == 0 {
            return Err(MixError::InvalidConfig {
                what: "max_bisection_iterations must be at least 1",
            });
        }
        Ok(())
    }
}
