use crate::tree::NodeId;

/// Errors produced while building distributions or aggregating trees.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a uniform distribution's bounds are unordered or negative.
    #[error("invalid bounds: min ({min}) must be non-negative and less than max ({max})")]
    InvalidBounds {
        /// The lower bound value.
        min: f64,
        /// The upper bound value.
        max: f64,
    },

    /// Returned when a probability or tail mass lies outside its allowed range.
    #[error("invalid probability: {0}")]
    InvalidProbability(f64),

    /// Returned when a distribution parameter is out of its domain.
    #[error("invalid parameter '{name}': {value}")]
    InvalidParameter {
        /// The name of the parameter.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// Returned when a distribution would carry no probability mass at all.
    #[error("distribution has no probability mass")]
    EmptyDistribution,

    /// Returned when a two-point fit is requested with unordered or
    /// out-of-range quantile pairs.
    #[error(
        "invalid fit input: need 0 < p1 < p2 < 1 and 0 < x1 < x2, got ({p1}, {x1}), ({p2}, {x2})"
    )]
    InvalidFitInput {
        /// Probability of the first quantile.
        p1: f64,
        /// Value of the first quantile.
        x1: f64,
        /// Probability of the second quantile.
        p2: f64,
        /// Value of the second quantile.
        x2: f64,
    },

    /// Returned when curve fitting converges to an unusable parameter pair.
    #[error("curve fit converged to invalid parameters alpha={alpha}, beta={beta}")]
    FitFailed {
        /// The converged scale parameter.
        alpha: f64,
        /// The converged shape parameter.
        beta: f64,
    },

    /// Returned when the numerical solver rejects its setup or aborts.
    #[error("solver failed: {0}")]
    Solver(String),

    /// Returned when a distribution is scaled by a negative or non-finite factor.
    #[error("invalid scale factor: {0} must be finite and non-negative")]
    InvalidScale(f64),

    /// Returned when a distribution is truncated at a negative or NaN point.
    #[error("invalid truncation point: {0} must be non-negative")]
    InvalidTruncation(f64),

    /// Returned when an estimate token cannot be read.
    #[error("malformed estimate '{token}': {reason}")]
    MalformedEstimate {
        /// The offending token, braces included.
        token: String,
        /// Why the token was rejected.
        reason: String,
    },

    /// Returned when one block of text carries more than one estimate token.
    #[error("multiple estimates found in one block: {}", tokens.join(", "))]
    MultipleEstimates {
        /// Every token found in the block.
        tokens: Vec<String>,
    },

    /// Wraps an estimate error with the node it was found in.
    #[error("in node {node} (\"{text}\"): {source}")]
    EstimateInNode {
        /// The node whose text failed to parse.
        node: NodeId,
        /// The text of that node.
        text: String,
        /// The underlying estimate error.
        #[source]
        source: Box<Error>,
    },

    /// Returned when a node id does not refer to a node of the tree.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// Returned when a child does not point back at the node holding it.
    #[error("node {child} is held by {parent} but its parent is {actual}")]
    ParentMismatch {
        /// The node holding the child.
        parent: NodeId,
        /// The child with the bad back-reference.
        child: NodeId,
        /// What the child's parent pointer actually says.
        actual: String,
    },

    /// Returned when a node is reachable along more than one path.
    #[error("node {0} is reachable more than once (shared child or cycle)")]
    DuplicateNode(NodeId),

    /// Returned when the root of a tree claims to have a parent.
    #[error("root node {0} has a parent")]
    RootHasParent(NodeId),
}

/// Convenience alias for `core::result::Result<T, Error>`.
pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    /// Attach node context to an estimate error.
    pub(crate) fn in_node(self, node: NodeId, text: &str) -> Self {
        Error::EstimateInNode {
            node,
            text: text.to_owned(),
            source: Box::new(self),
        }
    }
}
