//! Keyboard navigation over the mind map.
//!
//! Navigation is pure: given the node list, the current selection and a key,
//! it decides what should happen. Applying the action (changing selection,
//! collapsing, expanding, deleting) is up to the caller.

use std::cmp::Ordering;

use serde::Serialize;

use crate::map::{NodeId, NodeRecord};

/// Keys the map reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Left,
    Right,
    Up,
    Down,
    Enter,
    Delete,
    Escape,
}

impl NavKey {
    /// Map a DOM `KeyboardEvent.key` value.
    pub fn from_dom_key(key: &str) -> Option<Self> {
        Some(match key {
            "ArrowLeft" => NavKey::Left,
            "ArrowRight" => NavKey::Right,
            "ArrowUp" => NavKey::Up,
            "ArrowDown" => NavKey::Down,
            "Enter" => NavKey::Enter,
            "Delete" | "Backspace" => NavKey::Delete,
            "Escape" | "Esc" => NavKey::Escape,
            _ => return None,
        })
    }
}

/// What a key press asks for.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NavAction {
    /// Nothing to do (no sibling in that direction, unknown selection).
    None,
    /// Move the selection.
    Select { id: NodeId },
    /// Clear the selection.
    Deselect,
    /// Collapse or expand a node in place.
    SetCollapsed { id: NodeId, collapsed: bool },
    /// Generate children for a node.
    Expand { id: NodeId },
    /// Delete a node and its subtree.
    Delete { id: NodeId },
}

fn by_y(a: &&NodeRecord, b: &&NodeRecord) -> Ordering {
    a.y.total_cmp(&b.y)
}

/// Siblings of `node` (sharing its parent, roots included) ordered by y.
fn siblings_by_y<'a>(nodes: &'a [NodeRecord], node: &NodeRecord) -> Vec<&'a NodeRecord> {
    let mut siblings: Vec<_> = nodes
        .iter()
        .filter(|n| n.parent_id == node.parent_id)
        .collect();
    siblings.sort_by(by_y);
    siblings
}

/// Decide the action for `key` with `selected` focused.
pub fn navigate(nodes: &[NodeRecord], selected: &NodeId, key: NavKey) -> NavAction {
    let Some(current) = nodes.iter().find(|n| &n.id == selected) else {
        return NavAction::None;
    };

    match key {
        NavKey::Left => {
            let has_children = nodes
                .iter()
                .any(|n| n.parent_id.as_ref() == Some(&current.id));
            if has_children && !current.collapsed {
                NavAction::SetCollapsed {
                    id: current.id.clone(),
                    collapsed: true,
                }
            } else if let Some(parent) = &current.parent_id {
                NavAction::Select { id: parent.clone() }
            } else {
                NavAction::None
            }
        }
        NavKey::Right => {
            if current.collapsed {
                return NavAction::SetCollapsed {
                    id: current.id.clone(),
                    collapsed: false,
                };
            }
            let mut children: Vec<_> = nodes
                .iter()
                .filter(|n| n.parent_id.as_ref() == Some(&current.id))
                .collect();
            children.sort_by(by_y);
            match children.get(children.len() / 2) {
                Some(middle) => NavAction::Select {
                    id: middle.id.clone(),
                },
                None => NavAction::None,
            }
        }
        NavKey::Up | NavKey::Down => {
            let siblings = siblings_by_y(nodes, current);
            let Some(index) = siblings.iter().position(|n| n.id == current.id) else {
                return NavAction::None;
            };
            let target = if key == NavKey::Up {
                index.checked_sub(1).and_then(|i| siblings.get(i))
            } else {
                siblings.get(index + 1)
            };
            match target {
                Some(n) => NavAction::Select { id: n.id.clone() },
                None => NavAction::None,
            }
        }
        NavKey::Enter => NavAction::Expand {
            id: current.id.clone(),
        },
        NavKey::Delete => NavAction::Delete {
            id: current.id.clone(),
        },
        NavKey::Escape => NavAction::Deselect,
    }
}

/// Selection after deleting `deleted`: the next sibling by y, else the
/// previous one, else the parent. `None` for a root.
pub fn selection_after_delete(nodes: &[NodeRecord], deleted: &NodeId) -> Option<NodeId> {
    let target = nodes.iter().find(|n| &n.id == deleted)?;
    let parent = target.parent_id.as_ref()?;
    let siblings = siblings_by_y(nodes, target);
    let index = siblings.iter().position(|n| &n.id == deleted)?;

    siblings
        .get(index + 1)
        .or_else(|| index.checked_sub(1).and_then(|i| siblings.get(i)))
        .map(|n| n.id.clone())
        .or_else(|| Some(parent.clone()))
}
