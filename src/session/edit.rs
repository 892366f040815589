//! Map edits as pure snapshot → batch functions.
//!
//! Nothing here touches the store. Each function validates against a
//! [`MapSnapshot`] and describes its writes as a [`WriteBatch`]; the session
//! commits the batch and reconciles positions afterwards.

use crate::error::MapError;
use crate::layout::LayoutPosition;
use crate::map::{
    ColorTag, EdgeRecord, EdgeStyle, MapSnapshot, NodeId, NodeRecord, NodeStyle, WriteBatch,
    now_millis,
};
use crate::navigation::selection_after_delete;

fn find<'a>(snapshot: &'a MapSnapshot, id: &NodeId) -> Result<&'a NodeRecord, MapError> {
    snapshot
        .node(id)
        .ok_or_else(|| MapError::UnknownNode(id.clone()))
}

/// Rewrite one node record.
fn update_node(
    snapshot: &MapSnapshot,
    id: &NodeId,
    f: impl FnOnce(&mut NodeRecord),
) -> Result<WriteBatch, MapError> {
    let mut node = find(snapshot, id)?.clone();
    f(&mut node);
    Ok(WriteBatch {
        put_nodes: vec![node],
        ..Default::default()
    })
}

/// A new child of `parent` using the topic's styles, plus its edge.
pub fn new_child(
    snapshot: &MapSnapshot,
    parent: &NodeRecord,
    title: impl Into<String>,
    description: impl Into<String>,
) -> (NodeRecord, EdgeRecord) {
    let style = snapshot.topic.style_config;
    let child = NodeRecord::new(
        snapshot.topic.id.clone(),
        Some(parent.id.clone()),
        title,
        description,
        style.node_style,
    );
    let edge = EdgeRecord::link(parent, &child, style.edge_style);
    (child, edge)
}

/// Create a child under `parent` at the placeholder position.
pub fn add_child(
    snapshot: &MapSnapshot,
    parent: &NodeId,
    title: impl Into<String>,
    description: impl Into<String>,
) -> Result<(NodeRecord, EdgeRecord), MapError> {
    let parent = find(snapshot, parent)?;
    Ok(new_child(snapshot, parent, title, description))
}

pub fn set_collapsed(
    snapshot: &MapSnapshot,
    id: &NodeId,
    collapsed: bool,
) -> Result<WriteBatch, MapError> {
    update_node(snapshot, id, |n| n.collapsed = collapsed)
}

pub fn toggle_collapsed(snapshot: &MapSnapshot, id: &NodeId) -> Result<WriteBatch, MapError> {
    update_node(snapshot, id, |n| n.collapsed = !n.collapsed)
}

pub fn set_color(
    snapshot: &MapSnapshot,
    id: &NodeId,
    color: Option<ColorTag>,
) -> Result<WriteBatch, MapError> {
    update_node(snapshot, id, |n| n.color_tag = color)
}

pub fn update_text(
    snapshot: &MapSnapshot,
    id: &NodeId,
    title: impl Into<String>,
    description: impl Into<String>,
) -> Result<WriteBatch, MapError> {
    let (title, description) = (title.into(), description.into());
    update_node(snapshot, id, |n| {
        n.title = title;
        n.description = description;
    })
}

/// Manual reposition (drag end).
pub fn move_node(
    snapshot: &MapSnapshot,
    id: &NodeId,
    x: f64,
    y: f64,
) -> Result<WriteBatch, MapError> {
    find(snapshot, id)?;
    Ok(WriteBatch::positions(vec![LayoutPosition::new(id.clone(), x, y)]))
}

/// Delete `id` with its whole subtree and every edge touching it.
///
/// Returns the batch and the node to select next.
pub fn delete_subtree(
    snapshot: &MapSnapshot,
    id: &NodeId,
) -> Result<(WriteBatch, Option<NodeId>), MapError> {
    let target = find(snapshot, id)?;
    if target.is_root() {
        return Err(MapError::RootDeletion(id.clone()));
    }

    let next = selection_after_delete(&snapshot.nodes, id);
    let doomed = snapshot.subtree_ids(id);
    let delete_edges = snapshot
        .edges
        .iter()
        .filter(|e| doomed.iter().any(|d| e.touches(d)))
        .map(|e| e.id.clone())
        .collect();

    Ok((
        WriteBatch {
            delete_edges,
            delete_nodes: doomed,
            ..Default::default()
        },
        next,
    ))
}

/// Switch every node of the topic, and the topic default, to `style`.
pub fn restyle_nodes(snapshot: &MapSnapshot, style: NodeStyle) -> WriteBatch {
    let mut topic = snapshot.topic.clone();
    topic.style_config.node_style = style;
    topic.updated_at = now_millis();
    WriteBatch {
        topic: Some(topic),
        put_nodes: snapshot
            .nodes
            .iter()
            .map(|n| NodeRecord {
                node_style: style,
                ..n.clone()
            })
            .collect(),
        ..Default::default()
    }
}

/// Switch every edge of the topic, and the topic default, to `style`.
pub fn restyle_edges(snapshot: &MapSnapshot, style: EdgeStyle) -> WriteBatch {
    let mut topic = snapshot.topic.clone();
    topic.style_config.edge_style = style;
    topic.updated_at = now_millis();
    WriteBatch {
        topic: Some(topic),
        put_edges: snapshot
            .edges
            .iter()
            .map(|e| EdgeRecord {
                edge_style: style,
                ..e.clone()
            })
            .collect(),
        ..Default::default()
    }
}
