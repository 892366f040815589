//! Read snapshots and atomic write batches.
//!
//! The layout core never talks to the store directly: it reads a
//! [`MapSnapshot`] and the editing layer answers with a [`WriteBatch`] that
//! the store applies in one transaction.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::edge::{EdgeId, EdgeRecord};
use super::node::{NodeId, NodeRecord};
use super::topic::TopicRecord;
use crate::layout::LayoutPosition;

/// Everything stored for one topic, in creation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapSnapshot {
    pub topic: TopicRecord,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

impl MapSnapshot {
    /// Look up a node by id.
    pub fn node(&self, id: &NodeId) -> Option<&NodeRecord> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// Direct children of `id`, in creation order.
    pub fn children_of<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a NodeRecord> + 'a {
        self.nodes
            .iter()
            .filter(move |n| n.parent_id.as_ref() == Some(id))
    }

    /// Whether `id` has at least one child.
    pub fn has_children(&self, id: &NodeId) -> bool {
        self.children_of(id).next().is_some()
    }

    /// Path from the root down to `id` (inclusive).
    ///
    /// Stops early on a dangling parent pointer and never loops on a
    /// malformed parent cycle.
    pub fn lineage(&self, id: &NodeId) -> Vec<&NodeRecord> {
        let by_id: HashMap<&NodeId, &NodeRecord> = self.nodes.iter().map(|n| (&n.id, n)).collect();
        let mut path = Vec::new();
        let mut seen = HashSet::new();
        let mut current = by_id.get(id).copied();
        while let Some(node) = current {
            if !seen.insert(&node.id) {
                break;
            }
            path.push(node);
            current = node.parent_id.as_ref().and_then(|p| by_id.get(p).copied());
        }
        path.reverse();
        path
    }

    /// `id` and all of its descendants, breadth first.
    pub fn subtree_ids(&self, id: &NodeId) -> Vec<NodeId> {
        let mut children: HashMap<&NodeId, Vec<&NodeId>> = HashMap::new();
        for node in &self.nodes {
            if let Some(parent) = &node.parent_id {
                children.entry(parent).or_default().push(&node.id);
            }
        }

        let mut out = Vec::new();
        let mut seen: HashSet<&NodeId> = HashSet::new();
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            out.push(current.clone());
            if let Some(kids) = children.get(current) {
                queue.extend(kids.iter().copied());
            }
        }
        out
    }
}

/// A set of writes applied atomically by a [`MapStore`](super::MapStore).
///
/// Apply order is: topic, edge deletes, node deletes (cascading to their
/// edges), node puts, position moves, edge puts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteBatch {
    pub topic: Option<TopicRecord>,
    pub delete_edges: Vec<EdgeId>,
    pub delete_nodes: Vec<NodeId>,
    pub put_nodes: Vec<NodeRecord>,
    /// Position-only updates; other fields of the stored node are kept.
    pub move_nodes: Vec<LayoutPosition>,
    pub put_edges: Vec<EdgeRecord>,
}

impl WriteBatch {
    /// A batch that only moves nodes.
    pub fn positions(moves: Vec<LayoutPosition>) -> Self {
        Self {
            move_nodes: moves,
            ..Default::default()
        }
    }

    /// True when committing would change nothing.
    pub fn is_empty(&self) -> bool {
        self.topic.is_none()
            && self.delete_edges.is_empty()
            && self.delete_nodes.is_empty()
            && self.put_nodes.is_empty()
            && self.move_nodes.is_empty()
            && self.put_edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{NodeStyle, TopicId, TopicStyle};

    fn node(id: &str, parent: Option<&str>) -> NodeRecord {
        NodeRecord {
            id: NodeId::new(id),
            parent_id: parent.map(NodeId::new),
            ..NodeRecord::new(TopicId::new("t"), None, id, "", NodeStyle::Nyt)
        }
    }

    fn snapshot(nodes: Vec<NodeRecord>) -> MapSnapshot {
        let (topic, _) = TopicRecord::seed("t", "", TopicStyle::default());
        MapSnapshot {
            topic,
            nodes,
            edges: Vec::new(),
        }
    }

    #[test]
    fn test_lineage_is_root_first() {
        let snap = snapshot(vec![
            node("r", None),
            node("a", Some("r")),
            node("d", Some("a")),
        ]);
        let titles: Vec<_> = snap
            .lineage(&NodeId::new("d"))
            .iter()
            .map(|n| n.title.as_str())
            .collect();
        assert_eq!(titles, ["r", "a", "d"]);
    }

    #[test]
    fn test_lineage_survives_parent_cycle() {
        let snap = snapshot(vec![node("a", Some("b")), node("b", Some("a"))]);
        assert_eq!(snap.lineage(&NodeId::new("a")).len(), 2);
    }

    #[test]
    fn test_subtree_ids() {
        let snap = snapshot(vec![
            node("r", None),
            node("a", Some("r")),
            node("b", Some("r")),
            node("d", Some("a")),
            node("e", Some("d")),
        ]);
        let ids = snap.subtree_ids(&NodeId::new("a"));
        assert_eq!(ids, vec![NodeId::new("a"), NodeId::new("d"), NodeId::new("e")]);
        assert!(snap.has_children(&NodeId::new("r")));
        assert!(!snap.has_children(&NodeId::new("b")));
    }

    #[test]
    fn test_empty_batch() {
        assert!(WriteBatch::default().is_empty());
        assert!(WriteBatch::positions(Vec::new()).is_empty());
        let batch = WriteBatch::positions(vec![LayoutPosition::new(NodeId::new("a"), 1.0, 2.0)]);
        assert!(!batch.is_empty());
    }
}
