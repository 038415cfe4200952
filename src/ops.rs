//! Operations that build new distributions out of existing ones.
//!
//! Sums, scalings and truncations are free functions over [`Dist`] handles;
//! distributions themselves carry no arithmetic operators.

use std::sync::Arc;

use crate::distribution::{Dist, Distribution, NumericDistribution, zero};
use crate::error::{Error, Result};

/// Maximum number of samples taken from each addend in [`dist_add`].
///
/// Caps a convolution at `ADD_RESOLUTION^2` cdf-difference products no matter
/// how wide the addends are; wider domains are subsampled with a uniform step.
pub const ADD_RESOLUTION: i64 = 100;

/// Default tail probability clipped from each addend in [`dist_add`].
pub const DEFAULT_EPSILON: f64 = 0.01;

/// Offset used to read bucket masses as half-open `[x, x + 1)` intervals.
///
/// Reading `cdf(x + 1) - cdf(x)` would attribute an atom sitting exactly on
/// an integer to the bucket below it, which the domain scan never visits.
const BUCKET_EDGE: f64 = 1e-9;

/// Distribution of the sum of independent variables drawn from `l` and `r`.
///
/// Equivalent to [`dist_add_with_epsilon`] with [`DEFAULT_EPSILON`].
///
/// # Errors
///
/// See [`dist_add_with_epsilon`].
pub fn dist_add(l: &Dist, r: &Dist) -> Result<Dist> {
    dist_add_with_epsilon(l, r, DEFAULT_EPSILON)
}

/// Distribution of the sum of independent variables drawn from `l` and `r`.
///
/// The density of a sum is the convolution of the addends' densities. Both
/// addends are discretized over `[floor(quantile(epsilon)),
/// ceil(quantile(1 - epsilon))]` and convolved numerically; the result is a
/// [`NumericDistribution`] which normalizes away the clipped tails.
///
/// Adding [`zero`] returns the other operand unchanged.
///
/// # Errors
///
/// Returns `Error::InvalidProbability` unless `0 < epsilon < 0.5`.
/// Returns `Error::EmptyDistribution` if the sampled addends carry no mass.
#[allow(clippy::cast_possible_truncation)]
pub fn dist_add_with_epsilon(l: &Dist, r: &Dist, epsilon: f64) -> Result<Dist> {
    if l.is_zero() {
        return Ok(Arc::clone(r));
    }
    if r.is_zero() {
        return Ok(Arc::clone(l));
    }
    if !(epsilon > 0.0 && epsilon < 0.5) {
        return Err(Error::InvalidProbability(epsilon));
    }

    // Discretized convolution is slightly subtle: the mass of a unit interval
    // of l and a unit interval of r lands on a two-unit interval of the sum
    // (l in [0, 1) and r in [0, 1) give l + r in [0, 2)), so every product is
    // deposited into two adjacent output buckets.
    let (l_min, l_max) = domain(l.as_ref(), epsilon);
    let (r_min, r_max) = domain(r.as_ref(), epsilon);
    let y_min = l_min + r_min;
    let y_max = l_max + r_max;
    let l_step = ((l_max - l_min) / ADD_RESOLUTION).max(1);
    let r_step = ((r_max - r_min) / ADD_RESOLUTION).max(1);

    #[allow(clippy::cast_sign_loss)]
    let mut y_values = vec![0.0; (y_max - y_min + 2) as usize];

    // Sample r once; its masses are reused for every sample of l.
    let r_samples: Vec<(i64, f64)> = step_range(r_min, r_max, r_step)
        .map(|x_r| (x_r, bucket_mass(r.as_ref(), x_r)))
        .collect();

    for x_l in step_range(l_min, l_max, l_step) {
        let l_prob = bucket_mass(l.as_ref(), x_l);
        if l_prob <= 0.0 {
            continue;
        }
        for &(x_r, r_prob) in &r_samples {
            let mass = l_prob * r_prob;
            #[allow(clippy::cast_sign_loss)]
            let y = (x_l + x_r - y_min) as usize;
            y_values[y] += mass;
            y_values[y + 1] += mass;
        }
    }

    trace_debug!(
        l_min,
        l_max,
        r_min,
        r_max,
        l_step,
        r_step,
        buckets = y_values.len(),
        "convolved distributions"
    );

    Ok(Arc::new(NumericDistribution::new(y_values, y_min)?))
}

/// Integer domain `[floor(q(epsilon)), ceil(q(1 - epsilon))]` of `d`.
#[allow(clippy::cast_possible_truncation)]
fn domain(d: &dyn Distribution, epsilon: f64) -> (i64, i64) {
    let lo = d.quantile(epsilon).floor().max(0.0) as i64;
    let hi = d.quantile(1.0 - epsilon).ceil().max(0.0) as i64;
    (lo, hi.max(lo))
}

/// Probability mass of `d` in `[x, x + 1)`.
#[allow(clippy::cast_precision_loss)]
fn bucket_mass(d: &dyn Distribution, x: i64) -> f64 {
    let x = x as f64;
    (d.cdf(x + 1.0 - BUCKET_EDGE) - d.cdf(x - BUCKET_EDGE)).max(0.0)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn step_range(lo: i64, hi: i64, step: i64) -> impl Iterator<Item = i64> {
    (lo..=hi).step_by(step as usize)
}

/// A distribution stretched along its x axis by a positive factor.
#[derive(Debug)]
pub struct ScaledDistribution {
    inner: Dist,
    factor: f64,
}

impl Distribution for ScaledDistribution {
    fn cdf(&self, x: f64) -> f64 {
        self.inner.cdf(x / self.factor)
    }

    fn pdf(&self, x: f64) -> f64 {
        self.inner.pdf(x / self.factor) / self.factor
    }

    fn point_on_curve(&self) -> f64 {
        self.inner.point_on_curve() * self.factor
    }

    fn quantile(&self, p: f64) -> f64 {
        self.inner.quantile(p) * self.factor
    }

    fn contains_point_masses(&self) -> bool {
        self.inner.contains_point_masses()
    }
}

/// Returns `dist` with every value multiplied by `factor`.
///
/// Scaling by zero (or scaling [`zero`]) yields [`zero`].
///
/// # Errors
///
/// Returns `Error::InvalidScale` if `factor` is negative or not finite.
pub fn dist_scale(dist: &Dist, factor: f64) -> Result<Dist> {
    if !factor.is_finite() || factor < 0.0 {
        return Err(Error::InvalidScale(factor));
    }
    if factor == 0.0 || dist.is_zero() {
        return Ok(zero());
    }
    Ok(Arc::new(ScaledDistribution {
        inner: Arc::clone(dist),
        factor,
    }))
}

/// A distribution clipped at `max_value`, with the clipped tail collected
/// into a point mass at `max_value`.
#[derive(Debug)]
pub struct TruncatedDistribution {
    inner: Dist,
    max_value: f64,
}

impl Distribution for TruncatedDistribution {
    fn cdf(&self, x: f64) -> f64 {
        if x >= self.max_value {
            1.0
        } else {
            self.inner.cdf(x)
        }
    }

    #[allow(clippy::float_cmp)]
    fn pdf(&self, x: f64) -> f64 {
        if x == self.max_value {
            f64::INFINITY
        } else if x > self.max_value {
            0.0
        } else {
            self.inner.pdf(x)
        }
    }

    fn point_on_curve(&self) -> f64 {
        self.inner.point_on_curve().min(self.max_value)
    }

    fn quantile(&self, p: f64) -> f64 {
        self.inner.quantile(p).min(self.max_value)
    }

    // Truncation always creates an atom, even if it holds negligible mass.
    fn contains_point_masses(&self) -> bool {
        true
    }
}

/// Returns `dist` with every value above `max_value` moved to `max_value`.
///
/// Truncating at zero (or truncating [`zero`]) yields [`zero`].
///
/// # Errors
///
/// Returns `Error::InvalidTruncation` if `max_value` is negative or NaN.
pub fn dist_truncate(dist: &Dist, max_value: f64) -> Result<Dist> {
    if max_value.is_nan() || max_value < 0.0 {
        return Err(Error::InvalidTruncation(max_value));
    }
    if max_value == 0.0 || dist.is_zero() {
        return Ok(zero());
    }
    Ok(Arc::new(TruncatedDistribution {
        inner: Arc::clone(dist),
        max_value,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::{PointDistribution, UniformDistribution};

    fn uniform(min: f64, max: f64) -> Dist {
        Arc::new(UniformDistribution::new(min, max).unwrap())
    }

    #[test]
    fn test_add_zero_is_identity() {
        let u = uniform(0.0, 1.0);
        assert!(Arc::ptr_eq(&dist_add(&u, &zero()).unwrap(), &u));
        assert!(Arc::ptr_eq(&dist_add(&zero(), &u).unwrap(), &u));
    }

    #[test]
    fn test_add_integer_atoms() {
        let two: Dist = Arc::new(PointDistribution::single(2.0).unwrap());
        let three: Dist = Arc::new(PointDistribution::single(3.0).unwrap());
        let sum = dist_add(&two, &three).unwrap();
        // Each atom is smeared over one bucket; the pair over two.
        assert!(sum.cdf(4.99) < 1e-6);
        assert!((sum.cdf(6.0) - 0.5).abs() < 1e-6);
        assert!((sum.cdf(7.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_add_rejects_bad_epsilon() {
        let u = uniform(0.0, 1.0);
        assert!(matches!(
            dist_add_with_epsilon(&u, &u, 0.0),
            Err(Error::InvalidProbability(_))
        ));
        assert!(matches!(
            dist_add_with_epsilon(&u, &u, 0.7),
            Err(Error::InvalidProbability(_))
        ));
    }

    #[test]
    fn test_scale_by_zero_is_zero() {
        assert!(dist_scale(&uniform(0.0, 1.0), 0.0).unwrap().is_zero());
        assert!(dist_scale(&zero(), 3.0).unwrap().is_zero());
    }

    #[test]
    fn test_scale_rejects_negative() {
        assert!(matches!(
            dist_scale(&uniform(0.0, 1.0), -2.0),
            Err(Error::InvalidScale(_))
        ));
        assert!(matches!(
            dist_scale(&uniform(0.0, 1.0), f64::NAN),
            Err(Error::InvalidScale(_))
        ));
    }

    #[test]
    fn test_scale_keeps_point_mass_flag() {
        let p: Dist = Arc::new(PointDistribution::single(2.0).unwrap());
        assert!(dist_scale(&p, 2.0).unwrap().contains_point_masses());
        assert!(!dist_scale(&uniform(0.0, 1.0), 2.0).unwrap().contains_point_masses());
    }

    #[test]
    fn test_truncate_at_zero_is_zero() {
        assert!(dist_truncate(&uniform(1.0, 5.0), 0.0).unwrap().is_zero());
        assert!(dist_truncate(&zero(), 4.0).unwrap().is_zero());
    }

    #[test]
    fn test_truncate_rejects_negative() {
        assert!(matches!(
            dist_truncate(&uniform(1.0, 5.0), -1.0),
            Err(Error::InvalidTruncation(_))
        ));
    }

    #[test]
    fn test_truncate_always_has_point_mass() {
        let t = dist_truncate(&uniform(1.0, 5.0), 100.0).unwrap();
        assert!(t.contains_point_masses());
    }
}
