use super::Distribution;
use crate::error::{Error, Result};

/// A distribution in which every value of `[min, max]` is equally likely.
#[derive(Clone, Debug)]
pub struct UniformDistribution {
    min: f64,
    max: f64,
    density: f64,
}

impl UniformDistribution {
    /// Creates a uniform distribution over `[min, max]`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidBounds` unless `0 <= min < max` and both bounds
    /// are finite.
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !(min.is_finite() && max.is_finite() && min >= 0.0 && min < max) {
            return Err(Error::InvalidBounds { min, max });
        }
        Ok(Self {
            min,
            max,
            density: 1.0 / (max - min),
        })
    }
}

impl Distribution for UniformDistribution {
    fn pdf(&self, x: f64) -> f64 {
        if (self.min..=self.max).contains(&x) {
            self.density
        } else {
            0.0
        }
    }

    fn cdf(&self, x: f64) -> f64 {
        if x < self.min {
            0.0
        } else if x > self.max {
            1.0
        } else {
            self.density * (x - self.min)
        }
    }

    fn quantile(&self, p: f64) -> f64 {
        self.min + p.clamp(0.0, 1.0) / self.density
    }

    fn point_on_curve(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}
