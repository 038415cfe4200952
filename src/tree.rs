//! Estimate trees and bottom-up cost aggregation.
//!
//! A [`CostTree`] is an arena of [`Node`]s addressed by [`NodeId`]. Each node
//! may carry a directly estimated distribution and a resource label; the cost
//! of a node is its own (resource-weighted) distribution summed with the costs
//! of all of its children.
//!
//! [`CostTree::cost`] recomputes on every call and is safe while the tree is
//! still being edited. [`CostTree::final_cost`] memoizes per node and per
//! [`CostConfig`], for use once the tree is complete; any `&mut` access to a
//! node clears every memo.

use core::fmt;
use core::hash::{Hash, Hasher};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::distribution::{Dist, zero};
use crate::error::{Error, Result};
use crate::estimate::parse_estimate;
use crate::ops::{dist_add, dist_scale};

/// Maps each node's resource to the units being aggregated.
///
/// For example, a config with unit `"dollars"` might map `"engineer"` to
/// `150.0` (dollars per engineer-hour) and `"contractor"` to `90.0`. A node
/// whose resource is missing from the map, or maps to a non-positive
/// multiplier, contributes nothing of its own (its children still count).
///
/// Configs compare and hash by value, so two equal configs share memoized
/// results.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CostConfig {
    /// Name of the cost unit, e.g. `"hours"` or `"dollars"`.
    pub unit_name: String,
    /// Cost units per unit of each resource.
    pub resource_costs: BTreeMap<String, f64>,
}

impl CostConfig {
    /// Creates a config from a unit name and `(resource, multiplier)` pairs.
    #[must_use]
    pub fn new<I, K>(unit_name: impl Into<String>, resource_costs: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        Self {
            unit_name: unit_name.into(),
            resource_costs: resource_costs
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        }
    }

    /// The positive multiplier for `resource`, if there is one.
    #[must_use]
    pub fn multiplier(&self, resource: &str) -> Option<f64> {
        self.resource_costs
            .get(resource)
            .copied()
            .filter(|&m| m > 0.0)
    }
}

impl PartialEq for CostConfig {
    fn eq(&self, other: &Self) -> bool {
        self.unit_name == other.unit_name
            && self.resource_costs.len() == other.resource_costs.len()
            && self
                .resource_costs
                .iter()
                .zip(&other.resource_costs)
                .all(|((ka, va), (kb, vb))| ka == kb && va.to_bits() == vb.to_bits())
    }
}

impl Eq for CostConfig {}

impl Hash for CostConfig {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.unit_name.hash(state);
        for (k, v) in &self.resource_costs {
            k.hash(state);
            v.to_bits().hash(state);
        }
    }
}

/// Handle to a node of a [`CostTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One point of an estimate tree.
#[derive(Debug, Default)]
pub struct Node {
    /// Kind of node, as assigned by the parser (e.g. `"heading"`).
    pub tag: String,
    /// Free text of the node, possibly holding an estimate token.
    pub data: String,
    /// Directly estimated distribution of this node's own work.
    pub distribution: Option<Dist>,
    /// Resource label used to weight `distribution` under a [`CostConfig`].
    pub resource: String,
    /// Children, in document order.
    pub children: Vec<NodeId>,
    /// The node holding this one; `None` for the root.
    pub parent: Option<NodeId>,
    /// Memoized `final_cost` results, keyed by config.
    memo: Mutex<HashMap<Option<CostConfig>, Dist>>,
}

impl Node {
    /// Creates a detached node with the given tag and text.
    #[must_use]
    pub fn new(tag: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            data: data.into(),
            ..Self::default()
        }
    }

    /// Sets the directly estimated distribution.
    #[must_use]
    pub fn with_distribution(mut self, distribution: Dist) -> Self {
        self.distribution = Some(distribution);
        self
    }

    /// Sets the resource label.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    fn clear_memo(&mut self) {
        self.memo.get_mut().clear();
    }
}

/// Column limit of [`CostTree::pretty_print`] lines.
const PRETTY_WIDTH: usize = 78;

/// An arena-backed tree of estimate nodes.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use estimate::distribution::{Distribution, LogLogistic};
/// use estimate::tree::{CostTree, Node};
///
/// let mut tree = CostTree::new();
/// let root = tree.root();
/// let task = Arc::new(LogLogistic::fit(0.1, 8.0, 0.75, 40.0).unwrap());
/// tree.add_child(root, Node::new("item", "write parser").with_distribution(task.clone())).unwrap();
/// tree.add_child(root, Node::new("item", "write tests").with_distribution(task)).unwrap();
///
/// let total = tree.final_cost(root, None).unwrap();
/// assert!(total.quantile(0.5) > 20.0);
/// ```
#[derive(Debug)]
pub struct CostTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for CostTree {
    fn default() -> Self {
        Self::new()
    }
}

impl CostTree {
    /// Creates a tree holding only a root node tagged `"root"`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new("root", "")],
            root: NodeId(0),
        }
    }

    /// Builds a tree from nodes assembled elsewhere (e.g. by a parser).
    ///
    /// `nodes[root.0]` is the root; children and parent links must already
    /// be consistent.
    ///
    /// # Errors
    ///
    /// Returns the first structural error found by [`CostTree::check_valid`].
    pub fn from_nodes(nodes: Vec<Node>, root: NodeId) -> Result<Self> {
        if root.0 >= nodes.len() {
            return Err(Error::UnknownNode(root));
        }
        if nodes[root.0].parent.is_some() {
            return Err(Error::RootHasParent(root));
        }
        let tree = Self { nodes, root };
        tree.check_valid(root)?;
        Ok(tree)
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty (never true: there is always a root).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Borrow a node.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownNode` if `id` is not in this tree.
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.0).ok_or(Error::UnknownNode(id))
    }

    /// Mutably borrow a node. Clears every memoized final cost.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownNode` if `id` is not in this tree.
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        if id.0 >= self.nodes.len() {
            return Err(Error::UnknownNode(id));
        }
        self.invalidate();
        Ok(&mut self.nodes[id.0])
    }

    /// Appends `node` as the last child of `parent` and returns its id.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownNode` if `parent` is not in this tree.
    pub fn add_child(&mut self, parent: NodeId, mut node: Node) -> Result<NodeId> {
        if parent.0 >= self.nodes.len() {
            return Err(Error::UnknownNode(parent));
        }
        self.invalidate();
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    /// Children of `id`, in document order.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownNode` if `id` is not in this tree.
    pub fn children(&self, id: NodeId) -> Result<&[NodeId]> {
        Ok(&self.node(id)?.children)
    }

    /// Parent of `id`, or `None` for the root.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownNode` if `id` is not in this tree.
    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node(id)?.parent)
    }

    /// Whether `id` is the root of this tree.
    #[must_use]
    pub fn is_root(&self, id: NodeId) -> bool {
        id == self.root
    }

    fn invalidate(&mut self) {
        for node in &mut self.nodes {
            node.clear_memo();
        }
    }

    /// Checks that every node below `id` is held by exactly one parent and
    /// points back at it.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownNode`, `Error::ParentMismatch` or
    /// `Error::DuplicateNode` on the first inconsistency found.
    pub fn check_valid(&self, id: NodeId) -> Result<()> {
        self.node(id)?;
        let mut seen = vec![false; self.nodes.len()];
        seen[id.0] = true;
        let mut stack = vec![id];
        while let Some(holder) = stack.pop() {
            for &child in &self.nodes[holder.0].children {
                let child_node = self.node(child)?;
                if child_node.parent != Some(holder) {
                    return Err(Error::ParentMismatch {
                        parent: holder,
                        child,
                        actual: child_node
                            .parent
                            .map_or_else(|| "none".to_owned(), |p| p.to_string()),
                    });
                }
                if seen[child.0] {
                    return Err(Error::DuplicateNode(child));
                }
                seen[child.0] = true;
                stack.push(child);
            }
        }
        Ok(())
    }

    /// Total cost distribution of the subtree rooted at `id`.
    ///
    /// Without a config every resource counts with multiplier 1.
    ///
    /// # Errors
    ///
    /// Returns a structural error if the subtree is inconsistent, or any
    /// error raised while combining distributions.
    pub fn cost(&self, id: NodeId, config: Option<&CostConfig>) -> Result<Dist> {
        self.check_valid(id)?;
        self.cost_raw(id, config, false)
    }

    /// Like [`cost`](Self::cost), but memoizes the result of every node in
    /// the subtree for `config`.
    ///
    /// Calling it twice with equal configs returns the same `Arc`.
    ///
    /// # Errors
    ///
    /// Same as [`cost`](Self::cost).
    pub fn final_cost(&self, id: NodeId, config: Option<&CostConfig>) -> Result<Dist> {
        self.check_valid(id)?;
        self.cost_raw(id, config, true)
    }

    fn cost_raw(&self, id: NodeId, config: Option<&CostConfig>, memoize: bool) -> Result<Dist> {
        let node = &self.nodes[id.0];
        if memoize {
            if let Some(hit) = node.memo.lock().get(&config.cloned()) {
                trace_debug!(node = id.0, "final cost memo hit");
                return Ok(Arc::clone(hit));
            }
        }

        let mut total = match (&node.distribution, config) {
            (None, _) => None,
            (Some(dist), None) => Some(Arc::clone(dist)),
            (Some(dist), Some(config)) => match config.multiplier(&node.resource) {
                Some(multiplier) => Some(dist_scale(dist, multiplier)?),
                None => None,
            },
        };
        for &child in &node.children {
            let child_cost = self.cost_raw(child, config, memoize)?;
            total = Some(match total {
                None => child_cost,
                Some(so_far) => dist_add(&so_far, &child_cost)?,
            });
        }
        let result = total.unwrap_or_else(zero);

        if memoize {
            trace_debug!(node = id.0, "final cost memo miss");
            let mut memo = node.memo.lock();
            // Keep the first stored value so every caller sees the same Arc.
            return Ok(Arc::clone(memo.entry(config.cloned()).or_insert(result)));
        }
        Ok(result)
    }

    /// Sum of the final costs of several nodes, starting from zero.
    ///
    /// Used to total a set of related nodes, such as every predecessor of a
    /// task at one point in its history.
    ///
    /// # Errors
    ///
    /// Same as [`final_cost`](Self::final_cost).
    pub fn sum_final_costs(&self, ids: &[NodeId], config: Option<&CostConfig>) -> Result<Dist> {
        let mut total = zero();
        for &id in ids {
            total = dist_add(&total, &self.final_cost(id, config)?)?;
        }
        Ok(total)
    }

    /// Attaches a distribution to every node whose text holds an estimate.
    ///
    /// Nodes without an estimate token are left unchanged.
    ///
    /// # Errors
    ///
    /// Returns `Error::EstimateInNode` naming the first node whose estimate
    /// is malformed or duplicated.
    pub fn process_estimates(&mut self) -> Result<()> {
        self.invalidate();
        for (i, node) in self.nodes.iter_mut().enumerate() {
            if let Some(dist) =
                parse_estimate(&node.data).map_err(|e| e.in_node(NodeId(i), &node.data))?
            {
                node.distribution = Some(dist);
            }
        }
        trace_info!(
            estimated = self.nodes.iter().filter(|n| n.distribution.is_some()).count(),
            nodes = self.nodes.len(),
            "attached estimates"
        );
        Ok(())
    }

    /// Returns a copy of the tree without empty structure.
    ///
    /// A node is empty when it has neither text nor a distribution. Empty
    /// nodes with nothing but empty nodes below them are dropped, and empty
    /// nodes with a single child are replaced by that child. Node ids are
    /// renumbered.
    ///
    /// # Errors
    ///
    /// Returns a structural error if the tree is inconsistent.
    pub fn collapse_empty(self) -> Result<Self> {
        self.check_valid(self.root)?;
        let Self { nodes, root } = self;
        let mut slots: Vec<Option<Node>> = nodes.into_iter().map(Some).collect();
        let mut out = Vec::new();
        let new_root = Self::collapse_into(&mut slots, root, None, &mut out);
        Ok(Self {
            nodes: out,
            root: new_root,
        })
    }

    /// Moves `id` and its surviving descendants into `out`; returns the new id.
    fn collapse_into(
        slots: &mut [Option<Node>],
        id: NodeId,
        parent: Option<NodeId>,
        out: &mut Vec<Node>,
    ) -> NodeId {
        let mut node = slots[id.0].take().unwrap_or_default();
        let old_children = core::mem::take(&mut node.children);
        let new_id = NodeId(out.len());
        node.parent = parent;
        node.clear_memo();
        out.push(node);

        for child in old_children {
            let Some(target) = Self::surviving(slots, child) else {
                continue;
            };
            let new_child = Self::collapse_into(slots, target, Some(new_id), out);
            out[new_id.0].children.push(new_child);
        }
        new_id
    }

    /// The node that stands in for `id` after collapsing, if any.
    ///
    /// A blank node is spliced out when exactly one of its children survives
    /// collapsing; empty siblings do not count.
    fn surviving(slots: &[Option<Node>], id: NodeId) -> Option<NodeId> {
        let node = slots[id.0].as_ref()?;
        if !Self::has_content(slots, id) {
            return None;
        }
        if Self::is_blank(node) {
            let mut kept = node
                .children
                .iter()
                .filter_map(|&c| Self::surviving(slots, c));
            if let (Some(only), None) = (kept.next(), kept.next()) {
                return Some(only);
            }
        }
        Some(id)
    }

    /// Whether any non-empty node remains at or below `id`.
    fn has_content(slots: &[Option<Node>], id: NodeId) -> bool {
        let Some(node) = slots[id.0].as_ref() else {
            return false;
        };
        !Self::is_blank(node) || node.children.iter().any(|&c| Self::has_content(slots, c))
    }

    fn is_blank(node: &Node) -> bool {
        node.data.is_empty() && node.distribution.is_none()
    }

    /// `(p10,p50,p90)` of the node's own distribution, or an empty string.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownNode` if `id` is not in this tree.
    pub fn format_distribution(&self, id: NodeId) -> Result<String> {
        Ok(self
            .node(id)?
            .distribution
            .as_ref()
            .map(|d| crate::summary::QuantileSummary::of(d.as_ref()).to_string())
            .unwrap_or_default())
    }

    /// Human-readable outline of the tree, one node per line.
    ///
    /// The root is marked `* `, nodes with siblings `+ ` and only children
    /// `- `; lines are indented two spaces per level and cut at 78 columns.
    ///
    /// # Errors
    ///
    /// Returns a structural error if the tree is inconsistent.
    pub fn pretty_print(&self) -> Result<String> {
        self.check_valid(self.root)?;
        let mut out = String::new();
        self.pretty_print_node(self.root, "", &mut out);
        Ok(out)
    }

    fn pretty_print_node(&self, id: NodeId, prefix: &str, out: &mut String) {
        let node = &self.nodes[id.0];
        let marker = match node.parent {
            None => "* ",
            Some(parent) if self.nodes[parent.0].children.len() > 1 => "+ ",
            Some(_) => "- ",
        };
        let head = format!("{prefix}{marker}{{{}}} ", node.tag);
        let room = PRETTY_WIDTH.saturating_sub(head.chars().count());
        out.push_str(&head);
        if node.data.chars().count() <= room {
            out.push_str(&node.data);
        } else {
            out.extend(node.data.chars().take(room.saturating_sub(3)));
            out.push_str("...");
        }
        out.push('\n');

        let child_prefix = format!("{prefix}  ");
        for &child in &node.children {
            self.pretty_print_node(child, &child_prefix, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::{Distribution, PointDistribution};

    fn point(v: f64) -> Dist {
        Arc::new(PointDistribution::single(v).unwrap())
    }

    #[test]
    fn test_empty_root_costs_zero() {
        let tree = CostTree::new();
        assert!(tree.cost(tree.root(), None).unwrap().is_zero());
    }

    #[test]
    fn test_single_child_passes_through() {
        let mut tree = CostTree::new();
        let d = point(4.0);
        tree.add_child(tree.root(), Node::new("item", "x").with_distribution(Arc::clone(&d)))
            .unwrap();
        let total = tree.cost(tree.root(), None).unwrap();
        assert!(Arc::ptr_eq(&total, &d));
    }

    #[test]
    fn test_config_equality_by_value() {
        let a = CostConfig::new("dollars", [("eng", 100.0), ("qa", 50.0)]);
        let b = CostConfig::new("dollars", [("qa", 50.0), ("eng", 100.0)]);
        let c = CostConfig::new("dollars", [("eng", 100.0)]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_multiplier_filters_non_positive() {
        let config = CostConfig::new("hours", [("eng", 1.0), ("free", 0.0), ("odd", -2.0)]);
        assert_eq!(config.multiplier("eng"), Some(1.0));
        assert_eq!(config.multiplier("free"), None);
        assert_eq!(config.multiplier("odd"), None);
        assert_eq!(config.multiplier("missing"), None);
    }

    #[test]
    fn test_check_valid_detects_bad_parent() {
        let mut tree = CostTree::new();
        let a = tree.add_child(tree.root(), Node::new("item", "a")).unwrap();
        let b = tree.add_child(tree.root(), Node::new("item", "b")).unwrap();
        tree.node_mut(b).unwrap().parent = Some(a);
        assert!(matches!(
            tree.cost(tree.root(), None),
            Err(Error::ParentMismatch { child, .. }) if child == b
        ));
    }

    #[test]
    fn test_check_valid_detects_shared_child() {
        let mut tree = CostTree::new();
        let a = tree.add_child(tree.root(), Node::new("item", "a")).unwrap();
        let root = tree.root();
        tree.node_mut(root).unwrap().children.push(a);
        assert!(matches!(
            tree.check_valid(root),
            Err(Error::DuplicateNode(id)) if id == a
        ));
    }

    #[test]
    fn test_node_mut_clears_memo() {
        let mut tree = CostTree::new();
        let a = tree
            .add_child(tree.root(), Node::new("item", "a").with_distribution(point(3.0)))
            .unwrap();
        let before = tree.final_cost(tree.root(), None).unwrap();
        tree.node_mut(a).unwrap().distribution = Some(point(9.0));
        let after = tree.final_cost(tree.root(), None).unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.quantile(0.5), 9.0);
    }

    #[test]
    fn test_pretty_print_markers() {
        let mut tree = CostTree::new();
        let h = tree.add_child(tree.root(), Node::new("heading", "Plan")).unwrap();
        tree.add_child(h, Node::new("item", "only child")).unwrap();
        tree.add_child(tree.root(), Node::new("item", "sibling")).unwrap();
        let text = tree.pretty_print().unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "* {root} ");
        assert_eq!(lines[1], "  + {heading} Plan");
        assert_eq!(lines[2], "    - {item} only child");
        assert_eq!(lines[3], "  + {item} sibling");
    }

    #[test]
    fn test_pretty_print_truncates_long_text() {
        let mut tree = CostTree::new();
        tree.add_child(tree.root(), Node::new("item", "x".repeat(200)))
            .unwrap();
        let text = tree.pretty_print().unwrap();
        let line = text.lines().nth(1).unwrap();
        assert_eq!(line.chars().count(), 78);
        assert!(line.ends_with("..."));
    }
}
