use super::Distribution;
use crate::error::{Error, Result};

/// A distribution that takes only a finite set of values.
///
/// Each value carries a probability; probabilities that do not sum to 1 are
/// rescaled. A point estimate such as `{8}` becomes a single atom.
///
/// # Examples
///
/// ```
/// use estimate::distribution::{Distribution, PointDistribution};
///
/// let d = PointDistribution::new([(2.0, 1.0), (6.0, 3.0)]).unwrap();
/// assert_eq!(d.cdf(2.0), 0.25);
/// assert_eq!(d.quantile(0.5), 6.0);
/// ```
#[derive(Clone, Debug)]
pub struct PointDistribution {
    /// Distinct values in ascending order.
    values: Vec<f64>,
    /// Normalized probability of each entry of `values`.
    probabilities: Vec<f64>,
}

impl PointDistribution {
    /// Creates a distribution from `(value, probability)` pairs.
    ///
    /// Repeated values have their probabilities merged.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` if a value is negative or not finite,
    /// or a probability is negative or not finite.
    /// Returns `Error::EmptyDistribution` if there are no pairs or the total
    /// probability is zero.
    pub fn new(value_probabilities: impl IntoIterator<Item = (f64, f64)>) -> Result<Self> {
        let mut pairs: Vec<(f64, f64)> = value_probabilities.into_iter().collect();
        for &(value, probability) in &pairs {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidParameter { name: "value", value });
            }
            if !probability.is_finite() || probability < 0.0 {
                return Err(Error::InvalidParameter {
                    name: "probability",
                    value: probability,
                });
            }
        }
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let total: f64 = pairs.iter().map(|&(_, p)| p).sum();
        if pairs.is_empty() || total <= 0.0 {
            return Err(Error::EmptyDistribution);
        }

        let mut values: Vec<f64> = Vec::with_capacity(pairs.len());
        let mut probabilities: Vec<f64> = Vec::with_capacity(pairs.len());
        for (value, probability) in pairs {
            if values.last() == Some(&value) {
                if let Some(last) = probabilities.last_mut() {
                    *last += probability / total;
                }
            } else {
                values.push(value);
                probabilities.push(probability / total);
            }
        }
        Ok(Self {
            values,
            probabilities,
        })
    }

    /// A single atom holding all of the probability.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` if `value` is negative or not finite.
    pub fn single(value: f64) -> Result<Self> {
        Self::new([(value, 1.0)])
    }

    /// The distinct values this distribution can take, ascending.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

impl Distribution for PointDistribution {
    fn pdf(&self, x: f64) -> f64 {
        if self.values.contains(&x) {
            f64::INFINITY
        } else {
            0.0
        }
    }

    fn cdf(&self, x: f64) -> f64 {
        let mut total = 0.0;
        for (&value, &probability) in self.values.iter().zip(&self.probabilities) {
            if x < value {
                return total;
            }
            total += probability;
        }
        1.0
    }

    /// The most probable atom.
    fn point_on_curve(&self) -> f64 {
        self.values
            .iter()
            .zip(&self.probabilities)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map_or(0.0, |(&value, _)| value)
    }

    fn quantile(&self, p: f64) -> f64 {
        let mut total = 0.0;
        for (&value, &probability) in self.values.iter().zip(&self.probabilities) {
            total += probability;
            if total >= p {
                return value;
            }
        }
        self.values.last().copied().unwrap_or(0.0)
    }

    fn contains_point_masses(&self) -> bool {
        true
    }
}
