//! Small numerical solvers behind quantile inversion and curve fitting.
//!
//! Both routines run a bounded number of iterations. Curve fitting is
//! delegated to `argmin`; quantile inversion is a bracketing bisection.

use argmin::core::{CostFunction, Executor, State, TerminationReason, TerminationStatus};
use argmin::solver::neldermead::NelderMead;

use crate::error::{Error, Result};

/// Maximum number of doublings/halvings while bracketing a root.
const MAX_EXPANSIONS: usize = 64;

/// Maximum number of bisection steps once a root is bracketed.
const MAX_BISECTIONS: usize = 200;

/// Relative bracket width at which bisection stops.
const BISECTION_RTOL: f64 = 1e-13;

/// Return the smallest `x >= 0` with `f(x) >= target` for a non-decreasing `f`.
///
/// This minimizes `(f(x) - target)^2` over `x >= 0`: the bracket is grown
/// geometrically from `seed` and then bisected. If `f` never reaches
/// `target` within the expansion budget, the last upper bracket is returned.
pub(crate) fn invert_monotone<F: Fn(f64) -> f64>(f: F, target: f64, seed: f64) -> f64 {
    if f(0.0) >= target {
        return 0.0;
    }
    let seed = if seed.is_finite() && seed > 0.0 {
        seed
    } else {
        1.0
    };

    // Invariant from here on: f(lo) < target <= f(hi).
    let (mut lo, mut hi) = if f(seed) >= target {
        let mut hi = seed;
        let mut lo = seed / 2.0;
        let mut expand = 0;
        while f(lo) >= target && expand < MAX_EXPANSIONS {
            hi = lo;
            lo /= 2.0;
            expand += 1;
        }
        if f(lo) >= target {
            lo = 0.0;
        }
        (lo, hi)
    } else {
        let mut lo = seed;
        let mut hi = seed * 2.0;
        let mut expand = 0;
        while f(hi) < target && expand < MAX_EXPANSIONS {
            lo = hi;
            hi *= 2.0;
            expand += 1;
        }
        if f(hi) < target {
            return hi;
        }
        (lo, hi)
    };

    for _ in 0..MAX_BISECTIONS {
        let mid = 0.5 * (lo + hi);
        if f(mid) >= target {
            hi = mid;
        } else {
            lo = mid;
        }
        if hi - lo <= BISECTION_RTOL * hi.max(1.0) {
            break;
        }
    }
    hi
}

/// Configuration for the least-squares solver.
#[derive(Clone, Debug)]
pub struct LeastSquaresConfig {
    /// Maximum number of simplex iterations.
    pub max_iter: u64,
    /// The solve stops once the standard deviation of the costs across the
    /// simplex drops below this value.
    pub tol: f64,
    /// Relative size of the starting simplex around the initial point.
    pub initial_step: f64,
}

impl Default for LeastSquaresConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tol: 1e-20,
            initial_step: 0.2,
        }
    }
}

/// Outcome of a least-squares solve.
#[derive(Clone, Debug)]
pub struct LeastSquaresReport {
    /// Best parameters found.
    pub params: Vec<f64>,
    /// Sum of squared residuals at `params`.
    pub cost: f64,
    /// Number of iterations run.
    pub n_iter: u64,
    /// Whether the simplex converged before the iteration cap.
    pub converged: bool,
}

/// Adapts a residual function to argmin's cost interface.
struct SumOfSquares<F> {
    residuals: F,
}

impl<F> CostFunction for SumOfSquares<F>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, params: &Self::Param) -> core::result::Result<Self::Output, argmin::core::Error> {
        Ok(sum_of_squares(&(self.residuals)(params.as_slice())))
    }
}

/// Minimize the sum of squared `residuals` starting from `x0`.
///
/// Runs argmin's Nelder-Mead simplex, which needs no derivatives. Residual
/// vectors containing NaN count as infinitely costly, so the simplex never
/// settles in a parameter region where the model is undefined.
///
/// # Errors
///
/// Returns `Error::Solver` if argmin rejects the configuration or aborts
/// the run.
pub fn least_squares<F>(
    residuals: F,
    x0: &[f64],
    config: &LeastSquaresConfig,
) -> Result<LeastSquaresReport>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let solver = NelderMead::new(initial_simplex(x0, config.initial_step))
        .with_sd_tolerance(config.tol)
        .map_err(|e| Error::Solver(format!("invalid configuration: {e}")))?;

    let res = Executor::new(SumOfSquares { residuals }, solver)
        .configure(|state| state.max_iters(config.max_iter))
        .run()
        .map_err(|e| Error::Solver(e.to_string()))?;

    let state = res.state();
    let params = state
        .get_best_param()
        .cloned()
        .ok_or_else(|| Error::Solver("no parameters were evaluated".to_owned()))?;
    let converged = matches!(
        state.get_termination_status(),
        TerminationStatus::Terminated(TerminationReason::SolverConverged)
    );
    Ok(LeastSquaresReport {
        params,
        cost: state.get_best_cost(),
        n_iter: state.get_iter(),
        converged,
    })
}

/// `x0` plus one vertex per coordinate, offset by `step` relative to it.
fn initial_simplex(x0: &[f64], step: f64) -> Vec<Vec<f64>> {
    let mut simplex = vec![x0.to_vec()];
    for i in 0..x0.len() {
        let mut vertex = x0.to_vec();
        vertex[i] += step * x0[i].abs().max(1.0);
        simplex.push(vertex);
    }
    simplex
}

fn sum_of_squares(r: &[f64]) -> f64 {
    let s: f64 = r.iter().map(|v| v * v).sum();
    if s.is_nan() { f64::INFINITY } else { s }
}
