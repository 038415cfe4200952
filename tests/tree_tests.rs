use std::sync::Arc;

use estimate::distribution::{Dist, Distribution, LogLogistic, PointDistribution};
use estimate::tree::{CostConfig, CostTree, Node, NodeId};
use estimate::Error;

fn point(value: f64) -> Dist {
    Arc::new(PointDistribution::single(value).unwrap())
}

fn fitted() -> Dist {
    Arc::new(LogLogistic::fit(0.1, 8.0, 0.75, 40.0).unwrap())
}

#[test]
fn two_children_cost_more_than_one() {
    let mut tree = CostTree::new();
    let root = tree.root();
    tree.add_child(root, Node::new("item", "a").with_distribution(fitted()))
        .unwrap();
    tree.add_child(root, Node::new("item", "b").with_distribution(fitted()))
        .unwrap();

    let single = fitted();
    let total = tree.cost(root, None).unwrap();
    assert!(total.quantile(0.1) > single.quantile(0.1));
    assert!(total.quantile(0.75) > single.quantile(0.75));
}

#[test]
fn final_cost_is_memoized() {
    let mut tree = CostTree::new();
    let root = tree.root();
    tree.add_child(root, Node::new("item", "a").with_distribution(fitted()))
        .unwrap();
    tree.add_child(root, Node::new("item", "b").with_distribution(fitted()))
        .unwrap();

    let first = tree.final_cost(root, None).unwrap();
    let second = tree.final_cost(root, None).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.quantile(0.5).to_bits(), second.quantile(0.5).to_bits());

    // Unmemoized cost builds a fresh distribution each time.
    let fresh = tree.cost(root, None).unwrap();
    assert!(!Arc::ptr_eq(&first, &fresh));
}

#[test]
fn memo_is_keyed_by_config_value() {
    let mut tree = CostTree::new();
    let root = tree.root();
    tree.add_child(
        root,
        Node::new("item", "a")
            .with_distribution(point(2.0))
            .with_resource("eng"),
    )
    .unwrap();

    let hours = CostConfig::new("hours", [("eng", 1.0)]);
    let dollars = CostConfig::new("dollars", [("eng", 150.0)]);

    let in_hours = tree.final_cost(root, Some(&hours)).unwrap();
    let in_dollars = tree.final_cost(root, Some(&dollars)).unwrap();
    assert!((in_hours.quantile(0.5) - 2.0).abs() < 1e-9);
    assert!((in_dollars.quantile(0.5) - 300.0).abs() < 1e-9);

    let same_dollars = dollars.clone();
    let again = tree.final_cost(root, Some(&same_dollars)).unwrap();
    assert!(Arc::ptr_eq(&in_dollars, &again));
}

#[test]
fn unpriced_resources_contribute_nothing() {
    let mut tree = CostTree::new();
    let root = tree.root();
    tree.add_child(
        root,
        Node::new("item", "paid")
            .with_distribution(point(4.0))
            .with_resource("eng"),
    )
    .unwrap();
    tree.add_child(
        root,
        Node::new("item", "free")
            .with_distribution(point(10.0))
            .with_resource("volunteer"),
    )
    .unwrap();
    let unknown = tree
        .add_child(
            root,
            Node::new("heading", "unpriced parent")
                .with_distribution(point(100.0))
                .with_resource("mystery"),
        )
        .unwrap();
    tree.add_child(
        unknown,
        Node::new("item", "priced child")
            .with_distribution(point(3.0))
            .with_resource("eng"),
    )
    .unwrap();

    let config = CostConfig::new("hours", [("eng", 1.0), ("volunteer", 0.0)]);

    let free = tree.node(root).unwrap().children[1];
    assert!(tree.cost(free, Some(&config)).unwrap().is_zero());

    // The parent's own estimate is dropped but its child still counts.
    let parent_cost = tree.cost(unknown, Some(&config)).unwrap();
    assert!((parent_cost.quantile(0.5) - 3.0).abs() < 1e-9);

    // 4 + 3, smeared over unit buckets by the convolution.
    let total = tree.cost(root, Some(&config)).unwrap();
    let median = total.quantile(0.5);
    assert!((7.0..=9.0).contains(&median), "median {median}");
}

#[test]
fn without_config_every_resource_counts_once() {
    let mut tree = CostTree::new();
    let root = tree.root();
    tree.add_child(
        root,
        Node::new("item", "a")
            .with_distribution(point(4.0))
            .with_resource("eng"),
    )
    .unwrap();
    tree.add_child(
        root,
        Node::new("item", "b")
            .with_distribution(point(10.0))
            .with_resource("volunteer"),
    )
    .unwrap();

    let median = tree.cost(root, None).unwrap().quantile(0.5);
    assert!((14.0..=16.0).contains(&median), "median {median}");
}

#[test]
fn empty_tree_costs_zero() {
    let mut tree = CostTree::new();
    let root = tree.root();
    let heading = tree.add_child(root, Node::new("heading", "Plan")).unwrap();
    tree.add_child(heading, Node::new("item", "unestimated"))
        .unwrap();
    assert!(tree.cost(root, None).unwrap().is_zero());
    assert!(tree.final_cost(heading, None).unwrap().is_zero());
}

#[test]
fn sum_final_costs_starts_from_zero() {
    let mut tree = CostTree::new();
    let root = tree.root();
    let a = tree
        .add_child(root, Node::new("item", "a").with_distribution(point(5.0)))
        .unwrap();

    assert!(tree.sum_final_costs(&[], None).unwrap().is_zero());
    let only = tree.sum_final_costs(&[a], None).unwrap();
    assert!(Arc::ptr_eq(&only, &tree.final_cost(a, None).unwrap()));
}

#[test]
fn from_nodes_rejects_bad_parent_link() {
    let mut root = Node::new("root", "");
    root.children = vec![NodeId(1), NodeId(2)];
    let mut a = Node::new("item", "a");
    a.parent = Some(NodeId(0));
    let mut b = Node::new("item", "b");
    b.parent = Some(NodeId(1));

    let err = CostTree::from_nodes(vec![root, a, b], NodeId(0)).unwrap_err();
    assert!(matches!(
        err,
        Error::ParentMismatch { parent: NodeId(0), child: NodeId(2), .. }
    ));
}

#[test]
fn from_nodes_rejects_cycles_and_unknown_ids() {
    let mut root = Node::new("root", "");
    root.children = vec![NodeId(1)];
    let mut a = Node::new("item", "a");
    a.parent = Some(NodeId(0));
    a.children = vec![NodeId(7)];
    assert!(matches!(
        CostTree::from_nodes(vec![root, a], NodeId(0)),
        Err(Error::UnknownNode(NodeId(7)))
    ));

    let mut root = Node::new("root", "");
    root.parent = Some(NodeId(0));
    assert!(matches!(
        CostTree::from_nodes(vec![root], NodeId(0)),
        Err(Error::RootHasParent(NodeId(0)))
    ));
}

#[test]
fn from_nodes_accepts_consistent_tree() {
    let mut root = Node::new("root", "");
    root.children = vec![NodeId(1)];
    let mut a = Node::new("item", "a");
    a.parent = Some(NodeId(0));
    a.distribution = Some(point(6.0));

    let tree = CostTree::from_nodes(vec![root, a], NodeId(0)).unwrap();
    assert_eq!(tree.len(), 2);
    assert!(tree.is_root(NodeId(0)));
    assert_eq!(tree.parent(NodeId(1)).unwrap(), Some(NodeId(0)));
    assert_eq!(tree.children(NodeId(0)).unwrap(), &[NodeId(1)]);
    assert!((tree.final_cost(NodeId(0), None).unwrap().quantile(0.5) - 6.0).abs() < 1e-9);
}

#[test]
fn collapse_removes_empty_structure() {
    let mut tree = CostTree::new();
    let root = tree.root();
    let wrapper = tree.add_child(root, Node::new("div", "")).unwrap();
    tree.add_child(wrapper, Node::new("item", "real work {3}"))
        .unwrap();
    tree.add_child(root, Node::new("li", "")).unwrap();

    let collapsed = tree.collapse_empty().unwrap();
    assert_eq!(collapsed.len(), 2);
    let children = collapsed.children(collapsed.root()).unwrap();
    assert_eq!(children.len(), 1);
    let only = collapsed.node(children[0]).unwrap();
    assert_eq!(only.data, "real work {3}");
    assert_eq!(only.parent, Some(collapsed.root()));
    collapsed.check_valid(collapsed.root()).unwrap();
}

#[test]
fn format_distribution_rounds_quantiles() {
    let mut tree = CostTree::new();
    let root = tree.root();
    let a = tree
        .add_child(root, Node::new("item", "a").with_distribution(point(12.0)))
        .unwrap();
    assert_eq!(tree.format_distribution(a).unwrap(), "(12,12,12)");
    assert_eq!(tree.format_distribution(root).unwrap(), "");
}

#[test]
fn unknown_node_is_an_error() {
    let tree = CostTree::new();
    assert!(matches!(
        tree.cost(NodeId(42), None),
        Err(Error::UnknownNode(NodeId(42)))
    ));
}

#[test]
fn collapse_keeps_estimated_nodes_without_text() {
    let mut tree = CostTree::new();
    let root = tree.root();
    tree.add_child(root, Node::new("li", "").with_distribution(point(2.0)))
        .unwrap();

    let collapsed = tree.collapse_empty().unwrap();
    assert_eq!(collapsed.len(), 2);
    let median = collapsed
        .final_cost(collapsed.root(), None)
        .unwrap()
        .quantile(0.5);
    assert!((median - 2.0).abs() < 1e-9);
}

#[test]
fn collapse_splices_wrapper_with_one_surviving_child() {
    let mut tree = CostTree::new();
    let root = tree.root();
    let para = tree.add_child(root, Node::new("para", "")).unwrap();
    tree.add_child(para, Node::new("text", "real {3}")).unwrap();
    tree.add_child(para, Node::new("text", "")).unwrap();

    let collapsed = tree.collapse_empty().unwrap();
    assert_eq!(collapsed.len(), 2);
    let children = collapsed.children(collapsed.root()).unwrap();
    assert_eq!(children.len(), 1);
    let only = collapsed.node(children[0]).unwrap();
    assert_eq!(only.tag, "text");
    assert_eq!(only.data, "real {3}");
    collapsed.check_valid(collapsed.root()).unwrap();
}

#[test]
fn unmemoized_cost_leaves_memo_empty() {
    let mut tree = CostTree::new();
    let root = tree.root();
    tree.add_child(
        root,
        Node::new("item", "a")
            .with_distribution(fitted())
            .with_resource("eng"),
    )
    .unwrap();
    let config = CostConfig::new("hours", [("eng", 2.0)]);

    let first = tree.cost(root, Some(&config)).unwrap();
    let second = tree.cost(root, Some(&config)).unwrap();
    assert!(!Arc::ptr_eq(&first, &second));

    let memoized = tree.final_cost(root, Some(&config)).unwrap();
    assert!(!Arc::ptr_eq(&first, &memoized));
    assert!(Arc::ptr_eq(
        &memoized,
        &tree.final_cost(root, Some(&config)).unwrap()
    ));
}
