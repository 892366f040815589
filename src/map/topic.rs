//! Topics own a node forest and its edges.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::edge::EdgeStyle;
use super::node::{NodeRecord, NodeStyle};

/// Stable topic identifier; the secondary index of every node and edge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicId(pub String);

impl TopicId {
    /// Wrap an existing identifier.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Topic({})", self.0)
    }
}

/// Per-topic style applied to newly created nodes and edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicStyle {
    #[serde(default)]
    pub edge_style: EdgeStyle,
    #[serde(default)]
    pub node_style: NodeStyle,
}

/// A persisted topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicRecord {
    pub id: TopicId,
    pub root_keyword: String,
    #[serde(default)]
    pub description: String,
    /// Scope the user pinned for every generation request in this topic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_constraints: Option<String>,
    #[serde(default)]
    pub style_config: TopicStyle,
    #[serde(default)]
    pub created_at: f64,
    #[serde(default)]
    pub updated_at: f64,
}

impl TopicRecord {
    /// Create a topic together with its root node at (0, 0).
    pub fn seed(
        root_keyword: impl Into<String>,
        description: impl Into<String>,
        style_config: TopicStyle,
    ) -> (Self, NodeRecord) {
        let now = super::now_millis();
        let topic = Self {
            id: TopicId::generate(),
            root_keyword: root_keyword.into(),
            description: description.into(),
            global_constraints: None,
            style_config,
            created_at: now,
            updated_at: now,
        };
        let root = NodeRecord::new(
            topic.id.clone(),
            None,
            topic.root_keyword.clone(),
            topic.description.clone(),
            style_config.node_style,
        );
        (topic, root)
    }

    /// Topic context for generation: the constraints when set, else the
    /// description.
    pub fn generation_context(&self) -> &str {
        match self.global_constraints.as_deref() {
            Some(c) if !c.trim().is_empty() => c,
            _ => &self.description,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_creates_root() {
        let style = TopicStyle {
            edge_style: EdgeStyle::Step,
            node_style: NodeStyle::Compact,
        };
        let (topic, root) = TopicRecord::seed("Coffee", "history and culture", style);

        assert!(root.is_root());
        assert_eq!(root.topic_id, topic.id);
        assert_eq!(root.title, "Coffee");
        assert_eq!(root.node_style, NodeStyle::Compact);
        assert_eq!(root.position(), (0.0, 0.0));
    }

    #[test]
    fn test_style_defaults_when_missing() {
        let topic: TopicRecord =
            serde_json::from_str(r#"{ "id": "t", "rootKeyword": "Tea" }"#).unwrap();
        assert_eq!(topic.style_config, TopicStyle::default());
        assert_eq!(topic.description, "");
        assert_eq!(topic.global_constraints, None);
    }

    #[test]
    fn test_generation_context_prefers_constraints() {
        let (mut topic, _) = TopicRecord::seed("Coffee", "history", TopicStyle::default());
        assert_eq!(topic.generation_context(), "history");

        topic.global_constraints = Some("  ".into());
        assert_eq!(topic.generation_context(), "history");

        topic.global_constraints = Some("Only before 1900".into());
        assert_eq!(topic.generation_context(), "Only before 1900");

        let json = serde_json::to_value(&topic).unwrap();
        assert_eq!(json["globalConstraints"], "Only before 1900");
    }
}
