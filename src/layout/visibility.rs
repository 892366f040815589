//! Visible forest resolution.
//!
//! A node is visible only while every ancestor is expanded. Resolution is a
//! breadth-first walk from every root that never descends into a collapsed
//! node, so collapse is transitive without any flag on the descendants.
//! Orphans (dangling `parent_id`) are never reached and stay invisible.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;

use crate::map::{EdgeRecord, NodeId, NodeRecord};

/// The visible subset of a node collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleForest {
    /// Authoritative membership test.
    pub visible_ids: HashSet<NodeId>,
    /// Visible nodes in breadth-first order.
    pub visible_nodes: Vec<NodeRecord>,
}

impl VisibleForest {
    /// Whether `id` is visible.
    #[inline]
    pub fn contains(&self, id: &NodeId) -> bool {
        self.visible_ids.contains(id)
    }

    /// Number of visible nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.visible_ids.len()
    }

    /// True when nothing is visible.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.visible_ids.is_empty()
    }

    /// Edges whose endpoints are both visible (what the renderer draws).
    pub fn visible_edges<'a>(&self, edges: &'a [EdgeRecord]) -> Vec<&'a EdgeRecord> {
        edges
            .iter()
            .filter(|e| self.contains(&e.source) && self.contains(&e.target))
            .collect()
    }

    /// Whether both forests show exactly the same node ids.
    pub fn same_ids(&self, ids: &HashSet<NodeId>) -> bool {
        self.visible_ids.len() == ids.len() && self.visible_ids.iter().all(|id| ids.contains(id))
    }
}

/// Compute the visible forest of `nodes`.
pub fn resolve_visible(nodes: &[NodeRecord]) -> VisibleForest {
    let mut children: HashMap<&NodeId, Vec<&NodeRecord>> = HashMap::new();
    for node in nodes {
        if let Some(parent) = &node.parent_id {
            children.entry(parent).or_default().push(node);
        }
    }

    let mut queue: VecDeque<&NodeRecord> = nodes.iter().filter(|n| n.is_root()).collect();
    let mut forest = VisibleForest::default();

    while let Some(node) = queue.pop_front() {
        // Duplicate ids in a malformed snapshot must not enqueue a subtree twice.
        if !forest.visible_ids.insert(node.id.clone()) {
            continue;
        }
        forest.visible_nodes.push(node.clone());

        if !node.collapsed {
            if let Some(kids) = children.get(&node.id) {
                queue.extend(kids.iter().copied());
            }
        }
    }

    forest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{EdgeStyle, NodeStyle, TopicId};
    use proptest::prelude::*;

    fn node(id: &str, parent: Option<&str>, collapsed: bool) -> NodeRecord {
        NodeRecord {
            id: NodeId::new(id),
            parent_id: parent.map(NodeId::new),
            collapsed,
            ..NodeRecord::new(TopicId::new("t"), None, id, "", NodeStyle::Nyt)
        }
    }

    fn ids(forest: &VisibleForest) -> Vec<&str> {
        let mut out: Vec<_> = forest.visible_ids.iter().map(|id| id.as_str()).collect();
        out.sort_unstable();
        out
    }

    #[test]
    fn test_empty() {
        let forest = resolve_visible(&[]);
        assert!(forest.is_empty());
        assert!(forest.visible_nodes.is_empty());
    }

    #[test]
    fn test_collapsed_node_hides_children() {
        // R → A, B, C; A → D, E; A collapsed.
        let nodes = [
            node("R", None, false),
            node("A", Some("R"), true),
            node("B", Some("R"), false),
            node("C", Some("R"), false),
            node("D", Some("A"), false),
            node("E", Some("A"), false),
        ];
        let forest = resolve_visible(&nodes);
        assert_eq!(ids(&forest), ["A", "B", "C", "R"]);
    }

    #[test]
    fn test_collapse_is_transitive() {
        // D is expanded but sits under collapsed A, so F stays hidden too.
        let nodes = [
            node("R", None, false),
            node("A", Some("R"), true),
            node("D", Some("A"), false),
            node("F", Some("D"), false),
        ];
        let forest = resolve_visible(&nodes);
        assert_eq!(ids(&forest), ["A", "R"]);
    }

    #[test]
    fn test_orphan_is_invisible() {
        let nodes = [node("R", None, false), node("X", Some("missing"), false)];
        let forest = resolve_visible(&nodes);
        assert_eq!(ids(&forest), ["R"]);
    }

    #[test]
    fn test_breadth_first_order() {
        let nodes = [
            node("D", Some("A"), false),
            node("A", Some("R"), false),
            node("R", None, false),
            node("B", Some("R"), false),
        ];
        let forest = resolve_visible(&nodes);
        let order: Vec<_> = forest.visible_nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(order, ["R", "A", "B", "D"]);
    }

    #[test]
    fn test_visible_edges() {
        let r = node("R", None, false);
        let a = node("A", Some("R"), true);
        let d = node("D", Some("A"), false);
        let edges = [
            EdgeRecord::link(&r, &a, EdgeStyle::Bezier),
            EdgeRecord::link(&a, &d, EdgeStyle::Bezier),
        ];
        let forest = resolve_visible(&[r, a, d]);
        let drawn = forest.visible_edges(&edges);
        assert_eq!(drawn.len(), 1);
        assert_eq!(drawn[0].target.as_str(), "A");
    }

    #[test]
    fn test_same_ids() {
        let nodes = [node("R", None, false), node("A", Some("R"), false)];
        let forest = resolve_visible(&nodes);
        let mut other: HashSet<NodeId> = [NodeId::new("A"), NodeId::new("R")].into();
        assert!(forest.same_ids(&other));
        other.remove(&NodeId::new("A"));
        other.insert(NodeId::new("B"));
        assert!(!forest.same_ids(&other));
    }

    /// Random forest: node `i` hangs off some earlier node, or is a root.
    fn arb_forest() -> impl Strategy<Value = Vec<NodeRecord>> {
        prop::collection::vec((any::<prop::sample::Index>(), any::<bool>(), any::<bool>()), 1..40)
            .prop_map(|shape| {
                shape.into_iter()
                    .enumerate()
                    .map(|(i, (parent, root, collapsed))| {
                        let parent = if i == 0 || (root && i % 7 == 0) {
                            None
                        } else {
                            Some(format!("n{}", parent.index(i)))
                        };
                        node(&format!("n{i}"), parent.as_deref(), collapsed)
                    })
                    .collect()
            })
    }

    proptest! {
        #[test]
        fn prop_no_descendant_of_collapsed_is_visible(nodes in arb_forest()) {
            let forest = resolve_visible(&nodes);
            let by_id: HashMap<&NodeId, &NodeRecord> = nodes.iter().map(|n| (&n.id, n)).collect();

            for node in &nodes {
                // Walk up: visible iff every proper ancestor exists and is expanded.
                let mut expected = true;
                let mut current = node.parent_id.as_ref();
                while let Some(parent_id) = current {
                    match by_id.get(parent_id) {
                        Some(parent) if !parent.collapsed => current = parent.parent_id.as_ref(),
                        _ => {
                            expected = false;
                            break;
                        }
                    }
                }
                prop_assert_eq!(forest.contains(&node.id), expected, "node {}", node.id);
            }
        }
    }
}
