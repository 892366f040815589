//! Node type and related structures.
//!
//! Nodes are the concepts in a mind map. Each node has:
//! - A stable unique identifier (survives every other mutation)
//! - A parent pointer (`None` for the topic root)
//! - Last computed layout position (x, y)
//! - Text content whose length drives size estimation
//! - Collapsed state (hides the whole subtree from layout)

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::topic::TopicId;

/// Stable node identifier.
///
/// Opaque string; freshly created nodes get a UUID v4.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
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

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

impl From<&str> for NodeId {
    #[inline]
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for NodeId {
    #[inline]
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Visual node style. Only affects size estimation inside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStyle {
    /// Wide headline card.
    #[default]
    Nyt,
    /// Narrow card with description text.
    Compact,
}

/// Color highlight a user can attach to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTag {
    Ink,
    Amber,
    Sky,
    Mint,
}

/// A persisted mind-map node.
///
/// Field names follow the stored camelCase schema so records pass through
/// the JS boundary and the store unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: NodeId,
    #[serde(default)]
    pub topic_id: TopicId,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub node_style: NodeStyle,
    #[serde(default)]
    pub color_tag: Option<ColorTag>,
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default)]
    pub created_at: f64,
}

impl NodeRecord {
    /// Create a node with a fresh id at the placeholder position (0, 0).
    pub fn new(
        topic_id: TopicId,
        parent_id: Option<NodeId>,
        title: impl Into<String>,
        description: impl Into<String>,
        node_style: NodeStyle,
    ) -> Self {
        Self {
            id: NodeId::generate(),
            topic_id,
            parent_id,
            title: title.into(),
            description: description.into(),
            x: 0.0,
            y: 0.0,
            node_style,
            color_tag: None,
            collapsed: false,
            created_at: super::now_millis(),
        }
    }

    /// True for the topic root (no parent).
    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Current stored position.
    #[inline]
    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id() {
        let id = NodeId::new("abc");
        assert_eq!(id.as_str(), "abc");
        assert_eq!(format!("{}", id), "Node(abc)");
        assert_eq!(NodeId::from("abc"), id);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(NodeId::generate(), NodeId::generate());
    }

    #[test]
    fn test_new_node_starts_at_origin() {
        let node = NodeRecord::new(
            TopicId::new("t"),
            Some(NodeId::new("p")),
            "Coffee",
            "",
            NodeStyle::Compact,
        );
        assert_eq!(node.position(), (0.0, 0.0));
        assert!(!node.is_root());
        assert!(!node.collapsed);
    }

    #[test]
    fn test_deserialize_stored_record() {
        let json = r#"{
            "id": "n1",
            "topicId": "t1",
            "parentId": null,
            "title": "Root",
            "description": "",
            "x": 10.5,
            "y": -3,
            "nodeStyle": "compact",
            "colorTag": "amber",
            "createdAt": 1700000000000
        }"#;
        let node: NodeRecord = serde_json::from_str(json).unwrap();
        assert!(node.is_root());
        assert_eq!(node.node_style, NodeStyle::Compact);
        assert_eq!(node.color_tag, Some(ColorTag::Amber));
        // Records written before the collapse feature have no flag.
        assert!(!node.collapsed);
    }
}
