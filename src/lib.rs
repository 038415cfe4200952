#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Probabilistic cost estimation over trees of estimated tasks.
//!
//! Each task is described by a probability distribution over its cost (in
//! hours, dollars, or any other non-negative resource). Distributions are
//! fitted from two-point range estimates, combined with sums, scalings and
//! truncations, and aggregated bottom-up over a tree of tasks to give the
//! distribution of the total.
//!
//! # Getting Started
//!
//! ```
//! use estimate::prelude::*;
//!
//! let mut tree = CostTree::new();
//! let root = tree.root();
//! tree.add_child(root, Node::new("item", "Design the schema {4-12}")).unwrap();
//! tree.add_child(root, Node::new("item", "Write the migration {8-40}")).unwrap();
//! tree.process_estimates().unwrap();
//!
//! let total = tree.final_cost(root, None).unwrap();
//! println!("total: {}", QuantileSummary::of(total.as_ref()));
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`Distribution`](distribution::Distribution) | Capability contract: `cdf`, `pdf`, `quantile`, point-mass flag. |
//! | [`LogLogistic`](distribution::LogLogistic) | Long-tailed curve fitted from a `{low-high}` estimate. |
//! | [`dist_add`](ops::dist_add) | Distribution of a sum, by discretized convolution. |
//! | [`CostTree`](tree::CostTree) | Arena of estimate nodes with memoized cost aggregation. |
//! | [`CostConfig`](tree::CostConfig) | Per-resource multipliers converting node costs into one unit. |
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `serde` | `Serialize`/`Deserialize` on [`CostConfig`](tree::CostConfig) and [`NodeId`](tree::NodeId) | off |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) during fitting, convolution and aggregation | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

pub mod distribution;
mod error;
pub mod estimate;
pub mod ops;
pub mod solver;
pub mod summary;
pub mod text;
pub mod tree;

pub use error::{Error, Result};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use estimate::prelude::*;
/// ```
pub mod prelude {
    pub use crate::distribution::{
        Dist, Distribution, LogLogistic, NumericDistribution, PointDistribution,
        UniformDistribution, zero,
    };
    pub use crate::error::{Error, Result};
    pub use crate::estimate::parse_estimate;
    pub use crate::ops::{dist_add, dist_scale, dist_truncate};
    pub use crate::summary::{QuantileSummary, quantile_row};
    pub use crate::tree::{CostConfig, CostTree, Node, NodeId};
}
