//! Editing session for one topic.
//!
//! [`MapSession`] ties the pieces together: every operation reads a fresh
//! snapshot from the store, describes its writes as a batch, commits it, and
//! then reconciles positions against the new visible forest. Layout runs
//! synchronously between the awaits; no borrow of session state is held
//! across one, so independent operations may interleave on a
//! single-threaded executor.

pub mod edit;
pub mod expand;

use std::cell::RefCell;

use log::{debug, info};
use serde::Serialize;

pub use expand::{
    ChildGenerator, ChildSuggestion, GenerationRequest, PathDetail, PendingGuard, PendingSet,
    plan_children,
};

use crate::error::MapError;
use crate::layout::{
    LayoutPosition, PositionReconciler, Reconciliation, SizeEstimator, StyleSizeEstimator,
    TreeLayoutEngine, pre_place, resolve_visible,
};
use crate::map::{
    ColorTag, EdgeRecord, EdgeStyle, MapSnapshot, MapStore, NodeId, NodeRecord, NodeStyle,
    TopicId, TopicRecord, TopicStyle, WriteBatch,
};

/// Create a topic and its root node.
pub async fn seed_topic<S: MapStore + ?Sized>(
    store: &S,
    root_keyword: impl Into<String>,
    description: impl Into<String>,
    style: TopicStyle,
) -> Result<TopicRecord, MapError> {
    let (topic, root) = TopicRecord::seed(root_keyword, description, style);
    store
        .commit(WriteBatch {
            topic: Some(topic.clone()),
            put_nodes: vec![root],
            ..Default::default()
        })
        .await?;
    info!("seeded {} ({})", topic.id, topic.root_keyword);
    Ok(topic)
}

/// Result of [`MapSession::expand_node`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ExpansionOutcome {
    /// The node was collapsed; it was expanded in place without generating.
    Uncollapsed,
    /// New children were generated and written at their final positions.
    Generated {
        children: Vec<NodeId>,
        /// Existing nodes moved to make room.
        moved: usize,
    },
}

/// One topic's editing session.
pub struct MapSession<S, G, E = StyleSizeEstimator> {
    store: S,
    generator: G,
    topic_id: TopicId,
    reconciler: RefCell<PositionReconciler<E>>,
    pending: PendingSet,
}

impl<S, G, E> MapSession<S, G, E>
where
    S: MapStore,
    G: ChildGenerator,
    E: SizeEstimator,
{
    /// Create a session. Positions are not reconciled until the first edit
    /// or [`sync`](Self::sync).
    pub fn new(store: S, generator: G, topic_id: TopicId, engine: TreeLayoutEngine<E>) -> Self {
        Self {
            store,
            generator,
            topic_id,
            reconciler: RefCell::new(PositionReconciler::new(engine)),
            pending: PendingSet::new(),
        }
    }

    /// Create a session and bring stored positions up to date.
    pub async fn open(
        store: S,
        generator: G,
        topic_id: TopicId,
        engine: TreeLayoutEngine<E>,
    ) -> Result<Self, MapError> {
        let session = Self::new(store, generator, topic_id, engine);
        session.sync().await?;
        Ok(session)
    }

    pub fn topic_id(&self) -> &TopicId {
        &self.topic_id
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether a generation request for `id` is outstanding.
    pub fn is_expanding(&self, id: &NodeId) -> bool {
        self.pending.contains(id)
    }

    /// Current stored state of the topic.
    pub async fn snapshot(&self) -> Result<MapSnapshot, MapError> {
        Ok(self.store.load(&self.topic_id).await?)
    }

    /// Reconcile stored positions with the current visible forest and write
    /// back anything that moved. The baseline only advances once the write
    /// succeeds; after a failed write the next call lays out again.
    pub async fn sync(&self) -> Result<Reconciliation, MapError> {
        let snapshot = self.snapshot().await?;
        let plan = self.reconciler.borrow().plan(&snapshot.nodes);
        if !plan.updates().is_empty() {
            self.store
                .commit(WriteBatch::positions(plan.updates().to_vec()))
                .await?;
        }
        Ok(self.reconciler.borrow_mut().adopt(plan))
    }

    /// Commit `batch`, then reconcile.
    pub async fn apply(&self, batch: WriteBatch) -> Result<Reconciliation, MapError> {
        if !batch.is_empty() {
            self.store.commit(batch).await?;
        }
        self.sync().await
    }

    /// Add a child under `parent`, placed before it is written.
    pub async fn add_child(
        &self,
        parent: &NodeId,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<NodeId, MapError> {
        let snapshot = self.snapshot().await?;
        let (child, edge) = edit::add_child(&snapshot, parent, title, description)?;
        let id = child.id.clone();
        let batch = self.placed_batch(&snapshot, vec![child], vec![edge]);
        self.apply(batch).await?;
        Ok(id)
    }

    pub async fn set_collapsed(
        &self,
        id: &NodeId,
        collapsed: bool,
    ) -> Result<Reconciliation, MapError> {
        let snapshot = self.snapshot().await?;
        self.apply(edit::set_collapsed(&snapshot, id, collapsed)?)
            .await
    }

    pub async fn toggle_collapsed(&self, id: &NodeId) -> Result<Reconciliation, MapError> {
        let snapshot = self.snapshot().await?;
        self.apply(edit::toggle_collapsed(&snapshot, id)?).await
    }

    pub async fn set_color(&self, id: &NodeId, color: Option<ColorTag>) -> Result<(), MapError> {
        let snapshot = self.snapshot().await?;
        self.apply(edit::set_color(&snapshot, id, color)?).await?;
        Ok(())
    }

    pub async fn update_text(
        &self,
        id: &NodeId,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<(), MapError> {
        let snapshot = self.snapshot().await?;
        self.apply(edit::update_text(&snapshot, id, title, description)?)
            .await?;
        Ok(())
    }

    /// Persist a manual drag. The next visibility change re-lays it out.
    pub async fn move_node(&self, id: &NodeId, x: f64, y: f64) -> Result<(), MapError> {
        let snapshot = self.snapshot().await?;
        self.store
            .commit(edit::move_node(&snapshot, id, x, y)?)
            .await?;
        Ok(())
    }

    /// Delete `id` and its subtree. Returns the node to select next.
    pub async fn delete_node(&self, id: &NodeId) -> Result<Option<NodeId>, MapError> {
        let snapshot = self.snapshot().await?;
        let (batch, next) = edit::delete_subtree(&snapshot, id)?;
        debug!("deleting {} nodes under {id}", batch.delete_nodes.len());
        self.apply(batch).await?;
        Ok(next)
    }

    /// Re-layout every visible node and write all positions.
    pub async fn auto_arrange(&self) -> Result<Vec<LayoutPosition>, MapError> {
        let snapshot = self.snapshot().await?;
        let plan = self.reconciler.borrow().plan_arrange(&snapshot.nodes);
        if !plan.updates().is_empty() {
            self.store
                .commit(WriteBatch::positions(plan.updates().to_vec()))
                .await?;
        }
        Ok(self.reconciler.borrow_mut().adopt(plan).into_updates())
    }

    /// Restyle every node; sizes change, so the map is re-arranged.
    pub async fn set_node_style(
        &self,
        style: NodeStyle,
    ) -> Result<Vec<LayoutPosition>, MapError> {
        let snapshot = self.snapshot().await?;
        self.store
            .commit(edit::restyle_nodes(&snapshot, style))
            .await?;
        self.auto_arrange().await
    }

    pub async fn set_edge_style(&self, style: EdgeStyle) -> Result<(), MapError> {
        let snapshot = self.snapshot().await?;
        self.store
            .commit(edit::restyle_edges(&snapshot, style))
            .await?;
        Ok(())
    }

    /// Expand `id`.
    ///
    /// A collapsed node is simply expanded. Otherwise the generator is asked
    /// for children, which are laid out together with the visible forest and
    /// written in one batch with any existing node that had to move, so the
    /// follow-up reconcile has nothing left to write.
    pub async fn expand_node(&self, id: &NodeId) -> Result<ExpansionOutcome, MapError> {
        let snapshot = self.snapshot().await?;
        let node = snapshot
            .node(id)
            .ok_or_else(|| MapError::UnknownNode(id.clone()))?;
        if node.collapsed {
            self.apply(edit::set_collapsed(&snapshot, id, false)?)
                .await?;
            return Ok(ExpansionOutcome::Uncollapsed);
        }

        let _guard = self.pending.begin(id)?;
        let count = self.reconciler.borrow().engine().config().expansion_count;
        let request = GenerationRequest::for_node(&snapshot, id, count);
        let suggestions = self.generator.generate_children(&request).await?;

        // The map may have changed while the generator ran.
        let snapshot = self.snapshot().await?;
        let parent = snapshot
            .node(id)
            .ok_or_else(|| MapError::UnknownNode(id.clone()))?;
        let (nodes, edges) = plan_children(&snapshot, parent, &suggestions);
        if nodes.is_empty() {
            return Ok(ExpansionOutcome::Generated {
                children: Vec::new(),
                moved: 0,
            });
        }

        let children = nodes.iter().map(|n| n.id.clone()).collect();
        let batch = self.placed_batch(&snapshot, nodes, edges);
        let moved = batch.move_nodes.len();
        debug!(
            "expanded {id}: {} children, {moved} existing nodes moved",
            batch.put_nodes.len()
        );
        self.apply(batch).await?;
        Ok(ExpansionOutcome::Generated { children, moved })
    }

    /// Batch writing `nodes` and `edges` with the new nodes already at their
    /// laid-out positions, plus the existing visible nodes they displace.
    ///
    /// New nodes under a hidden or collapsed parent stay at the placeholder
    /// position; they are laid out when the branch becomes visible.
    fn placed_batch(
        &self,
        snapshot: &MapSnapshot,
        mut nodes: Vec<NodeRecord>,
        edges: Vec<EdgeRecord>,
    ) -> WriteBatch {
        let forest = resolve_visible(&snapshot.nodes);
        let shown = nodes.iter().all(|n| {
            n.parent_id
                .as_ref()
                .and_then(|p| snapshot.node(p))
                .is_some_and(|p| forest.contains(&p.id) && !p.collapsed)
        });

        let move_nodes = if shown {
            let reconciler = self.reconciler.borrow();
            let engine = reconciler.engine();
            pre_place(
                engine,
                &forest.visible_nodes,
                &mut nodes,
                engine.config().placement_epsilon,
            )
        } else {
            Vec::new()
        };

        WriteBatch {
            put_nodes: nodes,
            move_nodes,
            put_edges: edges,
            ..Default::default()
        }
    }
}
