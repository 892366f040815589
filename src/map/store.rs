//! Persistence seam and the in-memory store.
//!
//! [`MapStore`] is the interface the editing layer needs from persistence:
//! a topic-scoped read and an atomic batch write. [`MemoryStore`] keeps the
//! topology in petgraph's StableGraph (node/edge records as weights) with
//! id → index maps, the same way a browser-side IndexedDB table would be
//! keyed by record id and indexed by topic.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use async_trait::async_trait;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::{Directed, Direction};

use super::edge::{EdgeId, EdgeRecord};
use super::node::{NodeId, NodeRecord};
use super::snapshot::{MapSnapshot, WriteBatch};
use super::topic::{TopicId, TopicRecord};
use crate::error::StoreError;

/// Transactional persistence for topics, nodes and edges.
///
/// `commit` must be all-or-nothing: a reader never observes new child nodes
/// without their edges.
#[async_trait(?Send)]
pub trait MapStore {
    /// Read everything stored for a topic, nodes and edges in creation order.
    async fn load(&self, topic_id: &TopicId) -> Result<MapSnapshot, StoreError>;

    /// Apply a batch atomically.
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;
}

/// Store state. Cloned for staging so a failed batch leaves no trace.
#[derive(Clone, Default)]
struct Tables {
    /// Parent→child topology; weights are the records themselves.
    graph: StableGraph<NodeRecord, EdgeRecord, Directed>,

    /// Map from stable NodeId to petgraph NodeIndex
    node_index: HashMap<NodeId, NodeIndex>,

    /// Map from stable EdgeId to petgraph EdgeIndex
    edge_index: HashMap<EdgeId, EdgeIndex>,

    /// Insertion sequence per node; StableGraph reuses vacant slots, so
    /// index order is not creation order.
    node_seq: HashMap<NodeId, u64>,

    /// Insertion sequence per edge.
    edge_seq: HashMap<EdgeId, u64>,

    next_seq: u64,

    topics: HashMap<TopicId, TopicRecord>,
}

impl Tables {
    fn bump(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn delete_edge(&mut self, id: &EdgeId) {
        if let Some(index) = self.edge_index.remove(id) {
            self.graph.remove_edge(index);
            self.edge_seq.remove(id);
        }
    }

    /// Remove a node and every edge touching it (incoming and outgoing).
    fn delete_node(&mut self, id: &NodeId) {
        let Some(index) = self.node_index.remove(id) else {
            return;
        };
        let touching: Vec<EdgeId> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .chain(self.graph.edges_directed(index, Direction::Incoming))
            .map(|e| e.weight().id.clone())
            .collect();
        for edge_id in touching {
            self.edge_index.remove(&edge_id);
            self.edge_seq.remove(&edge_id);
        }
        self.graph.remove_node(index);
        self.node_seq.remove(id);
    }

    fn put_node(&mut self, node: NodeRecord) {
        match self.node_index.get(&node.id) {
            Some(&index) => {
                if let Some(slot) = self.graph.node_weight_mut(index) {
                    *slot = node;
                }
            }
            None => {
                let seq = self.bump();
                self.node_seq.insert(node.id.clone(), seq);
                let id = node.id.clone();
                let index = self.graph.add_node(node);
                self.node_index.insert(id, index);
            }
        }
    }

    fn move_node(&mut self, id: &NodeId, x: f64, y: f64) -> Result<(), StoreError> {
        let node = self
            .node_index
            .get(id)
            .and_then(|&index| self.graph.node_weight_mut(index))
            .ok_or_else(|| StoreError::UnknownNode(id.clone()))?;
        node.x = x;
        node.y = y;
        Ok(())
    }

    fn put_edge(&mut self, edge: EdgeRecord) -> Result<(), StoreError> {
        let source = *self
            .node_index
            .get(&edge.source)
            .ok_or_else(|| StoreError::UnknownNode(edge.source.clone()))?;
        let target = *self
            .node_index
            .get(&edge.target)
            .ok_or_else(|| StoreError::UnknownNode(edge.target.clone()))?;

        let mirrors_parent = self
            .graph
            .node_weight(target)
            .is_some_and(|t| t.parent_id.as_ref() == Some(&edge.source));
        if !mirrors_parent {
            return Err(StoreError::InconsistentEdge {
                edge: edge.id.clone(),
                source_id: edge.source.clone(),
                target: edge.target.clone(),
            });
        }

        // Replace rather than duplicate.
        self.delete_edge(&edge.id);
        let seq = self.bump();
        self.edge_seq.insert(edge.id.clone(), seq);
        let id = edge.id.clone();
        let index = self.graph.add_edge(source, target, edge);
        self.edge_index.insert(id, index);
        Ok(())
    }

    fn apply(&mut self, batch: WriteBatch) -> Result<(), StoreError> {
        if let Some(topic) = batch.topic {
            self.topics.insert(topic.id.clone(), topic);
        }
        for id in &batch.delete_edges {
            self.delete_edge(id);
        }
        for id in &batch.delete_nodes {
            self.delete_node(id);
        }
        for node in batch.put_nodes {
            self.put_node(node);
        }
        for position in &batch.move_nodes {
            self.move_node(&position.id, position.x, position.y)?;
        }
        for edge in batch.put_edges {
            self.put_edge(edge)?;
        }
        Ok(())
    }

    fn snapshot(&self, topic_id: &TopicId) -> Result<MapSnapshot, StoreError> {
        let topic = self
            .topics
            .get(topic_id)
            .cloned()
            .ok_or_else(|| StoreError::UnknownTopic(topic_id.clone()))?;

        let mut nodes: Vec<(u64, NodeRecord)> = self
            .graph
            .node_weights()
            .filter(|n| &n.topic_id == topic_id)
            .map(|n| (self.node_seq.get(&n.id).copied().unwrap_or(u64::MAX), n.clone()))
            .collect();
        nodes.sort_by_key(|(seq, _)| *seq);

        let mut edges: Vec<(u64, EdgeRecord)> = self
            .graph
            .edge_weights()
            .filter(|e| &e.topic_id == topic_id)
            .map(|e| (self.edge_seq.get(&e.id).copied().unwrap_or(u64::MAX), e.clone()))
            .collect();
        edges.sort_by_key(|(seq, _)| *seq);

        Ok(MapSnapshot {
            topic,
            nodes: nodes.into_iter().map(|(_, n)| n).collect(),
            edges: edges.into_iter().map(|(_, e)| e).collect(),
        })
    }
}

/// In-memory [`MapStore`] for single-threaded hosts and tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: RefCell<Tables>,
    commits: Cell<usize>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful commits so far.
    pub fn commit_count(&self) -> usize {
        self.commits.get()
    }

    /// Number of stored nodes across all topics.
    pub fn node_count(&self) -> usize {
        self.tables.borrow().graph.node_count()
    }

    /// Number of stored edges across all topics.
    pub fn edge_count(&self) -> usize {
        self.tables.borrow().graph.edge_count()
    }
}

#[async_trait(?Send)]
impl MapStore for MemoryStore {
    async fn load(&self, topic_id: &TopicId) -> Result<MapSnapshot, StoreError> {
        self.tables.borrow().snapshot(topic_id)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut staged = self.tables.borrow().clone();
        staged.apply(batch)?;
        *self.tables.borrow_mut() = staged;
        self.commits.set(self.commits.get() + 1);
        Ok(())
    }
}
