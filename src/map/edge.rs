//! Edge type and related structures.
//!
//! Edges mirror the parent pointers of the node tree for the renderer. Each
//! edge has:
//! - A stable unique identifier
//! - Source (parent) and target (child) node IDs
//! - Rendering style

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::node::{NodeId, NodeRecord};
use super::topic::TopicId;

/// Stable edge identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub String);

impl EdgeId {
    /// Wrap an existing identifier.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the raw string.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Edge({})", self.0)
    }
}

/// How the renderer draws an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeStyle {
    #[default]
    Bezier,
    Step,
}

/// A persisted parent→child link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRecord {
    pub id: EdgeId,
    #[serde(default)]
    pub topic_id: TopicId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default)]
    pub edge_style: EdgeStyle,
    #[serde(default)]
    pub created_at: f64,
}

impl EdgeRecord {
    /// Create the edge that mirrors `child.parent_id == parent.id`.
    pub fn link(parent: &NodeRecord, child: &NodeRecord, edge_style: EdgeStyle) -> Self {
        Self {
            id: EdgeId::generate(),
            topic_id: child.topic_id.clone(),
            source: parent.id.clone(),
            target: child.id.clone(),
            edge_style,
            created_at: super::now_millis(),
        }
    }

    /// Whether this edge touches `id` at either end.
    #[inline]
    pub fn touches(&self, id: &NodeId) -> bool {
        &self.source == id || &self.target == id
    }
}
