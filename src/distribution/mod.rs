//! Probability distributions of a non-negative resource (time, money, ...).
//!
//! Every distribution implements [`Distribution`], a small capability
//! contract: `cdf`, `pdf`, `quantile`, a point of positive density to seed
//! numerical solvers, and a flag for Dirac point masses. Distributions are
//! passed around as shared [`Dist`] handles so that combinators and the cost
//! tree can hold on to them cheaply.
//!
//! - [`PointDistribution`] - discrete atoms
//! - [`UniformDistribution`] - flat density over an interval
//! - [`LogLogistic`] - long-tailed parametric curve fitted from two quantiles
//! - [`NumericDistribution`] - bucketed density produced by numeric operations

mod log_logistic;
mod numeric;
mod point;
mod uniform;

use core::fmt::Debug;
use std::sync::{Arc, LazyLock};

pub use log_logistic::LogLogistic;
pub use numeric::NumericDistribution;
pub use point::PointDistribution;
pub use uniform::UniformDistribution;

/// A random variable over the non-negative reals.
///
/// Implementations must keep these invariants:
///
/// - `cdf` is non-decreasing, zero for all `x < 0`, and approaches 1 at its
///   upper limit.
/// - `pdf` is non-negative, zero for all `x < 0`, and approaches 0 at its
///   upper limit (point masses may report an infinite density at the atom).
/// - `quantile` and `cdf` are approximate inverses on `(0, 1)`.
pub trait Distribution: Debug + Send + Sync {
    /// Cumulative probability at `x`: the fraction of the distribution `<= x`.
    fn cdf(&self, x: f64) -> f64;

    /// Probability density at `x`.
    ///
    /// Discretized distributions may return the average density of the
    /// bucket containing `x`.
    fn pdf(&self, x: f64) -> f64;

    /// Any point where `pdf` is positive, used to seed numerical solvers.
    fn point_on_curve(&self) -> f64;

    /// Resource level below which probability `p` of the distribution lies.
    ///
    /// The default searches numerically for the smallest `x >= 0` at which
    /// `cdf(x)` reaches `p`, starting at [`point_on_curve`](Self::point_on_curve).
    /// Distributions with a closed-form inverse should override it.
    ///
    /// # Panics
    ///
    /// Panics if the density at `point_on_curve()` is zero, which means the
    /// implementation broke its own contract.
    fn quantile(&self, p: f64) -> f64 {
        let start = self.point_on_curve();
        assert!(
            self.pdf(start) > 0.0,
            "pdf is zero at seed point {start} of {self:?}"
        );
        crate::solver::invert_monotone(|x| self.cdf(x), p, start)
    }

    /// Whether the distribution holds Dirac point masses.
    ///
    /// Derivative and quantile checks have to be relaxed near an atom.
    fn contains_point_masses(&self) -> bool {
        false
    }

    /// Whether this is the [`zero`] distribution ("no cost").
    fn is_zero(&self) -> bool {
        false
    }

    /// Draw a value by inverse-transform sampling.
    fn sample(&self, rng: &mut fastrand::Rng) -> f64 {
        self.quantile(rng.f64())
    }
}

/// Shared handle to a distribution.
pub type Dist = Arc<dyn Distribution>;

/// All probability at exactly zero: the cost of doing nothing.
///
/// This is the identity of [`dist_add`](crate::ops::dist_add) and absorbs
/// [`dist_scale`](crate::ops::dist_scale) and
/// [`dist_truncate`](crate::ops::dist_truncate).
#[derive(Clone, Copy, Debug, Default)]
pub struct Zero;

impl Distribution for Zero {
    fn cdf(&self, x: f64) -> f64 {
        if x >= 0.0 { 1.0 } else { 0.0 }
    }

    #[allow(clippy::float_cmp)]
    fn pdf(&self, x: f64) -> f64 {
        if x == 0.0 { f64::INFINITY } else { 0.0 }
    }

    fn point_on_curve(&self) -> f64 {
        0.0
    }

    fn quantile(&self, _p: f64) -> f64 {
        0.0
    }

    fn contains_point_masses(&self) -> bool {
        true
    }

    fn is_zero(&self) -> bool {
        true
    }
}

static ZERO: LazyLock<Dist> = LazyLock::new(|| Arc::new(Zero));

/// The shared "no cost" distribution.
#[must_use]
pub fn zero() -> Dist {
    Arc::clone(&ZERO)
}
