//! Reading `{...}` estimate tokens out of node text.
//!
//! A token is either a single value, `{12}`, meaning a known cost, or a
//! range, `{8-40}`, read as "10% chance of finishing by 8, 75% by 40" and
//! fitted with a [`LogLogistic`] curve.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::distribution::{Dist, LogLogistic, PointDistribution};
use crate::error::{Error, Result};

/// Cumulative probability assigned to the low end of a range estimate.
pub const RANGE_LOW_QUANTILE: f64 = 0.1;

/// Cumulative probability assigned to the high end of a range estimate.
pub const RANGE_HIGH_QUANTILE: f64 = 0.75;

/// Finds the estimate token in `text` and turns it into a distribution.
///
/// Returns `Ok(None)` when `text` holds no token.
///
/// # Errors
///
/// Returns `Error::MultipleEstimates` if more than one token is present and
/// `Error::MalformedEstimate` if the token cannot be read.
///
/// # Examples
///
/// ```
/// use estimate::distribution::Distribution;
/// use estimate::estimate::parse_estimate;
///
/// let d = parse_estimate("Write the parser {8-40}").unwrap().unwrap();
/// assert!((d.quantile(0.1) - 8.0).abs() < 1.0);
/// assert!(parse_estimate("No estimate here").unwrap().is_none());
/// ```
pub fn parse_estimate(text: &str) -> Result<Option<Dist>> {
    let tokens = find_tokens(text)?;
    match tokens.as_slice() {
        [] => Ok(None),
        [token] => make_distribution(token).map(Some),
        _ => Err(Error::MultipleEstimates {
            tokens: tokens.iter().map(|t| (*t).to_owned()).collect(),
        }),
    }
}

/// An opening brace up to the next closing brace, or to the end of the text
/// when the brace is never closed.
static ESTIMATE_TOKEN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\{[^}]*\}?").ok());

/// Every `{...}` group of `text`, braces included.
fn find_tokens(text: &str) -> Result<Vec<&str>> {
    let Some(re) = ESTIMATE_TOKEN.as_ref() else {
        return Ok(Vec::new());
    };
    re.find_iter(text)
        .map(|m| {
            let token = m.as_str();
            if token.ends_with('}') {
                Ok(token)
            } else {
                Err(malformed(token, "unclosed brace"))
            }
        })
        .collect()
}

/// Builds the distribution described by one token, e.g. `{3}` or `{8-40}`.
fn make_distribution(token: &str) -> Result<Dist> {
    let inner = &token[1..token.len() - 1];
    let values = inner
        .split('-')
        .map(|part| parse_value(token, part))
        .collect::<Result<Vec<f64>>>()?;

    match values.as_slice() {
        [value] => Ok(Arc::new(
            PointDistribution::single(*value).map_err(|e| malformed(token, &e.to_string()))?,
        )),
        [low, high] => {
            let fitted =
                LogLogistic::fit(RANGE_LOW_QUANTILE, *low, RANGE_HIGH_QUANTILE, *high)
                    .map_err(|e| malformed(token, &e.to_string()))?;
            Ok(Arc::new(fitted))
        }
        _ => Err(malformed(token, "expected a value or a low-high range")),
    }
}

fn parse_value(token: &str, part: &str) -> Result<f64> {
    let part = part.trim();
    if part.is_empty() {
        return Err(malformed(token, "missing number"));
    }
    let value: f64 = part
        .parse()
        .map_err(|_| malformed(token, &format!("'{part}' is not a number")))?;
    if !value.is_finite() || value < 0.0 {
        return Err(malformed(
            token,
            &format!("'{part}' must be finite and non-negative"),
        ));
    }
    Ok(value)
}

fn malformed(token: &str, reason: &str) -> Error {
    Error::MalformedEstimate {
        token: token.to_owned(),
        reason: reason.to_owned(),
    }
}
