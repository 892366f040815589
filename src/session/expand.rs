//! Child generation for "expand node".
//!
//! The generation service is an external collaborator behind
//! [`ChildGenerator`]. This module builds its request from the node's
//! lineage, turns suggestions into records, and tracks which nodes have a
//! request outstanding.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::edit::new_child;
use crate::error::{GenerationError, MapError};
use crate::map::{EdgeRecord, MapSnapshot, NodeId, NodeRecord};

/// Title and description of one ancestor on the path to the expanded node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathDetail {
    pub title: String,
    pub description: String,
}

/// Context sent to the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub root_topic: String,
    pub topic_description: String,
    /// Non-empty titles from the root down to the expanded node.
    pub path_context: Vec<String>,
    pub path_details: Vec<PathDetail>,
    /// Titles already present under the node, so the service can avoid them.
    pub existing_children: Vec<String>,
    pub count: usize,
}

impl GenerationRequest {
    /// Build the request for expanding `node`.
    pub fn for_node(snapshot: &MapSnapshot, node: &NodeId, count: usize) -> Self {
        let lineage = snapshot.lineage(node);
        let titled = lineage.iter().filter(|n| !n.title.is_empty());
        Self {
            root_topic: snapshot.topic.root_keyword.clone(),
            topic_description: snapshot.topic.generation_context().to_string(),
            path_context: titled.clone().map(|n| n.title.clone()).collect(),
            path_details: titled
                .map(|n| PathDetail {
                    title: n.title.clone(),
                    description: n.description.clone(),
                })
                .collect(),
            existing_children: snapshot
                .children_of(node)
                .map(|n| n.title.clone())
                .collect(),
            count,
        }
    }
}

/// One proposed child concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildSuggestion {
    pub title: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default, alias = "depthThought")]
    pub depth_thought: String,
}

impl ChildSuggestion {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            reason: String::new(),
            depth_thought: String::new(),
        }
    }

    /// Node description: reason and follow-up thought, blank-line separated.
    pub fn description(&self) -> String {
        [self.reason.trim(), self.depth_thought.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// External text-generation service.
#[async_trait(?Send)]
pub trait ChildGenerator {
    async fn generate_children(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<ChildSuggestion>, GenerationError>;
}

/// New records for `suggestions` under `parent`, all at the placeholder
/// position. Suggestions with a blank title are dropped.
pub fn plan_children(
    snapshot: &MapSnapshot,
    parent: &NodeRecord,
    suggestions: &[ChildSuggestion],
) -> (Vec<NodeRecord>, Vec<EdgeRecord>) {
    suggestions
        .iter()
        .filter(|s| !s.title.trim().is_empty())
        .map(|s| new_child(snapshot, parent, s.title.trim(), s.description()))
        .unzip()
}

/// Ids of nodes with a generation request in flight.
#[derive(Debug, Clone, Default)]
pub struct PendingSet {
    ids: Rc<RefCell<HashSet<NodeId>>>,
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` in flight, or fail if it already is.
    ///
    /// The mark is cleared when the returned guard drops, whether the
    /// expansion succeeded or not.
    pub fn begin(&self, id: &NodeId) -> Result<PendingGuard, MapError> {
        if !self.ids.borrow_mut().insert(id.clone()) {
            return Err(MapError::ExpansionInFlight(id.clone()));
        }
        Ok(PendingGuard {
            ids: Rc::clone(&self.ids),
            id: id.clone(),
        })
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.ids.borrow().contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.borrow().is_empty()
    }
}

/// Clears a node's in-flight mark on drop.
#[derive(Debug)]
pub struct PendingGuard {
    ids: Rc<RefCell<HashSet<NodeId>>>,
    id: NodeId,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.ids.borrow_mut().remove(&self.id);
    }
}
