use super::Distribution;
use crate::error::{Error, Result};
use crate::solver::{LeastSquaresConfig, least_squares};

/// Log-logistic distribution with scale `alpha` and shape `beta`.
///
/// This family fits the time cost of many software tasks well: it is skewed
/// with a long right tail, and its cdf, pdf and quantile function are all
/// algebraic, so fitting it to a two-point estimate and querying it
/// afterwards are both cheap.
///
/// See <https://en.wikipedia.org/wiki/Log-logistic_distribution>.
///
/// # Examples
///
/// ```
/// use estimate::distribution::{Distribution, LogLogistic};
///
/// // "8 hours at the 10th percentile, 40 at the 75th."
/// let d = LogLogistic::fit(0.1, 8.0, 0.75, 40.0).unwrap();
/// assert!((d.quantile(0.1) - 8.0).abs() < 1.0);
/// assert!((d.quantile(0.75) - 40.0).abs() < 1.0);
/// ```
#[derive(Clone, Debug)]
pub struct LogLogistic {
    alpha: f64,
    beta: f64,
}

impl LogLogistic {
    /// Creates a log-logistic distribution from its parameters.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` unless both `alpha` and `beta` are
    /// finite and positive.
    pub fn new(alpha: f64, beta: f64) -> Result<Self> {
        if !alpha.is_finite() || alpha <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "alpha",
                value: alpha,
            });
        }
        if !beta.is_finite() || beta <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "beta",
                value: beta,
            });
        }
        Ok(Self { alpha, beta })
    }

    /// Fits a curve through two quantile observations `(p1, x1)`, `(p2, x2)`.
    ///
    /// The parameters are found by nonlinear least squares on the cdf
    /// residuals `cdf(x1) - p1` and `cdf(x2) - p2`, starting from
    /// `alpha = (x1 + x2) / 2`, `beta = 1`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidFitInput` unless `0 < p1 < p2 < 1` and
    /// `0 < x1 < x2`.
    /// Returns `Error::FitFailed` if the solver settles on a non-positive
    /// `alpha` or a negative `beta`, and `Error::Solver` if the solver
    /// aborts.
    pub fn fit(p1: f64, x1: f64, p2: f64, x2: f64) -> Result<Self> {
        let ordered = 0.0 < p1 && p1 < p2 && p2 < 1.0 && 0.0 < x1 && x1 < x2;
        if !ordered || !x2.is_finite() {
            return Err(Error::InvalidFitInput { p1, x1, p2, x2 });
        }

        let residuals = |params: &[f64]| {
            let (alpha, beta) = (params[0], params[1]);
            vec![
                cdf_of(alpha, beta, x1) - p1,
                cdf_of(alpha, beta, x2) - p2,
            ]
        };
        let report = least_squares(
            residuals,
            &[(x1 + x2) / 2.0, 1.0],
            &LeastSquaresConfig::default(),
        )?;
        let (alpha, beta) = (report.params[0], report.params[1]);
        trace_debug!(
            alpha,
            beta,
            cost = report.cost,
            n_iter = report.n_iter,
            converged = report.converged,
            "fitted log-logistic curve"
        );

        if !alpha.is_finite() || !beta.is_finite() || alpha <= 0.0 || beta < 0.0 {
            return Err(Error::FitFailed { alpha, beta });
        }
        // beta == 0 is a flat cdf of 1/2 everywhere and cannot be queried.
        Self::new(alpha, beta).map_err(|_| Error::FitFailed { alpha, beta })
    }

    /// The scale parameter (also the median).
    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// The shape parameter.
    #[must_use]
    pub fn beta(&self) -> f64 {
        self.beta
    }
}

/// Log-logistic cdf for arbitrary parameters.
///
/// Returns NaN outside the parameter domain, which the fitting solver treats
/// as an infeasible point.
fn cdf_of(a: f64, b: f64, x: f64) -> f64 {
    if a <= 0.0 {
        return f64::NAN;
    }
    if x <= 0.0 {
        return 0.0;
    }
    1.0 / (1.0 + (x / a).powf(-b))
}

// Names 'x', 'a' and 'b' follow the usual notation for this distribution.
impl Distribution for LogLogistic {
    fn pdf(&self, x: f64) -> f64 {
        let (a, b) = (self.alpha, self.beta);
        if x <= 0.0 {
            return 0.0;
        }
        (b / a) * (x / a).powf(b - 1.0) / (1.0 + (x / a).powf(b)).powi(2)
    }

    fn cdf(&self, x: f64) -> f64 {
        cdf_of(self.alpha, self.beta, x)
    }

    fn point_on_curve(&self) -> f64 {
        self.alpha
    }

    fn quantile(&self, p: f64) -> f64 {
        let (a, b) = (self.alpha, self.beta);
        a * (p / (1.0 - p)).powf(1.0 / b)
    }
}
