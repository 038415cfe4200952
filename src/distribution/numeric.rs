use super::Distribution;
use crate::error::{Error, Result};

/// A discretized distribution over unit-width buckets.
///
/// Bucket `i` holds the (unnormalized) weight of outcomes in
/// `[offset + i, offset + i + 1)`. Weights are never rescaled in place: every
/// query divides by their total, so repeated discretizations do not compound
/// rounding error. This is what numeric operations without a closed form
/// (such as [`dist_add`](crate::ops::dist_add)) produce.
#[derive(Clone, Debug)]
pub struct NumericDistribution {
    values: Vec<f64>,
    /// `cumulative[i]` is the total weight of buckets before `i`.
    cumulative: Vec<f64>,
    total: f64,
    offset: i64,
}

impl NumericDistribution {
    /// Creates a discretized distribution from bucket weights.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` if `offset` is negative or a weight
    /// is negative or not finite.
    /// Returns `Error::EmptyDistribution` if the weights sum to zero.
    #[allow(clippy::cast_precision_loss)]
    pub fn new(values: Vec<f64>, offset: i64) -> Result<Self> {
        if offset < 0 {
            return Err(Error::InvalidParameter {
                name: "offset",
                value: offset as f64,
            });
        }
        if let Some(&bad) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(Error::InvalidParameter {
                name: "weight",
                value: bad,
            });
        }

        let mut cumulative = Vec::with_capacity(values.len());
        let mut total = 0.0;
        for &v in &values {
            cumulative.push(total);
            total += v;
        }
        if total <= 0.0 {
            return Err(Error::EmptyDistribution);
        }
        Ok(Self {
            values,
            cumulative,
            total,
            offset,
        })
    }

    /// Left edge of the first bucket.
    #[must_use]
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Number of buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no buckets (never true for a constructed value).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Locate the bucket holding `x`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    fn bucket(&self, x: f64) -> Bucket {
        if x < self.offset as f64 {
            return Bucket::Before;
        }
        let index = x.floor() - self.offset as f64;
        if index >= self.values.len() as f64 {
            return Bucket::After;
        }
        Bucket::At(index as usize)
    }
}

enum Bucket {
    Before,
    At(usize),
    After,
}

impl Distribution for NumericDistribution {
    fn pdf(&self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        match self.bucket(x) {
            Bucket::At(i) => self.values[i] / self.total,
            Bucket::Before | Bucket::After => 0.0,
        }
    }

    fn cdf(&self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        match self.bucket(x) {
            Bucket::Before => 0.0,
            Bucket::After => 1.0,
            Bucket::At(i) => {
                let point_in_bucket = x - x.floor();
                (self.cumulative[i] + self.values[i] * point_in_bucket) / self.total
            }
        }
    }

    /// The centre of the heaviest bucket.
    #[allow(clippy::cast_precision_loss)]
    fn point_on_curve(&self) -> f64 {
        let heaviest = self
            .values
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map_or(0, |(i, _)| i);
        self.offset as f64 + heaviest as f64 + 0.5
    }

    // The default quantile search is fast enough: cdf is O(1) here.
}
