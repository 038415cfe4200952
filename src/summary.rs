//! Numeric and textual summaries of distributions for report and plot hosts.

use core::fmt;

use crate::distribution::Distribution;
use crate::error::Result;
use crate::tree::{CostConfig, CostTree, NodeId};

/// Quantiles listed in a five-point summary row.
pub const REPORT_QUANTILES: [f64; 5] = [0.1, 0.25, 0.5, 0.75, 0.9];

/// The 10th, 50th and 90th percentiles of a distribution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuantileSummary {
    /// 10th percentile.
    pub p10: f64,
    /// Median.
    pub p50: f64,
    /// 90th percentile.
    pub p90: f64,
}

impl QuantileSummary {
    /// Summarizes `dist`.
    #[must_use]
    pub fn of(dist: &dyn Distribution) -> Self {
        Self {
            p10: dist.quantile(0.1),
            p50: dist.quantile(0.5),
            p90: dist.quantile(0.9),
        }
    }
}

impl fmt::Display for QuantileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.0},{:.0},{:.0})", self.p10, self.p50, self.p90)
    }
}

/// [`REPORT_QUANTILES`] of `dist`, rounded and joined as `a : b : c : d : e`.
#[must_use]
pub fn quantile_row(dist: &dyn Distribution) -> String {
    REPORT_QUANTILES
        .iter()
        .map(|&q| format!("{:.0}", dist.quantile(q).round()))
        .collect::<Vec<_>>()
        .join(" : ")
}

/// Horizontal extent `(0, q95 + q95 / 10)` over which to plot `dist`.
#[must_use]
pub fn plot_bounds(dist: &dyn Distribution) -> (f64, f64) {
    let q95 = dist.quantile(0.95);
    (0.0, q95 + q95 / 10.0)
}

/// `n` evenly spaced `(x, cdf(x))` points spanning [`plot_bounds`].
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn cdf_series(dist: &dyn Distribution, n: usize) -> Vec<(f64, f64)> {
    let (lo, hi) = plot_bounds(dist);
    match n {
        0 => Vec::new(),
        1 => vec![(lo, dist.cdf(lo))],
        _ => {
            let step = (hi - lo) / (n - 1) as f64;
            (0..n)
                .map(|i| {
                    let x = lo + step * i as f64;
                    (x, dist.cdf(x))
                })
                .collect()
        }
    }
}

/// Indented listing of the top `levels` levels of `tree`.
///
/// Each node gets a line with its tag, own `(p10,p50,p90)` and text,
/// followed by a [`quantile_row`] of its final cost under `config`. The dump
/// ends with a `TOTAL:` row for the root.
///
/// # Errors
///
/// Returns any error raised while computing final costs.
pub fn structure_dump(
    tree: &CostTree,
    levels: usize,
    config: Option<&CostConfig>,
) -> Result<String> {
    let mut out = String::new();
    dump_node(tree, tree.root(), 0, 0, levels, config, &mut out)?;
    let total = tree.final_cost(tree.root(), config)?;
    out.push_str("TOTAL:\n");
    out.push_str(&quantile_row(total.as_ref()));
    out.push('\n');
    Ok(out)
}

fn dump_node(
    tree: &CostTree,
    id: NodeId,
    indent: usize,
    level: usize,
    levels: usize,
    config: Option<&CostConfig>,
    out: &mut String,
) -> Result<()> {
    if level >= levels {
        return Ok(());
    }
    let node = tree.node(id)?;
    let own = tree.format_distribution(id)?;
    out.push_str(&format!("{:indent$}{} : {own} {}\n", "", node.tag, node.data));
    let cost = tree.final_cost(id, config)?;
    let row = quantile_row(cost.as_ref());
    out.push_str(&format!("{:width$}{row}\n", "", width = indent + 1));
    for &child in &node.children {
        dump_node(tree, child, indent + 2, level + 1, levels, config, out)?;
    }
    Ok(())
}
