//! Position reconciliation.
//!
//! Decides after each mutation whether layout must run and which positions
//! need persisting. Layout only runs when the set of visible ids changes;
//! text edits, recolouring and collapsing a leaf leave it untouched.

use std::collections::{HashMap, HashSet};

use log::debug;

use super::size::{SizeEstimator, StyleSizeEstimator};
use super::tidy_tree::{LayoutPosition, TreeLayoutEngine};
use super::visibility::resolve_visible;
use crate::map::{NodeId, NodeRecord};

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// Visible id set unchanged; nothing to lay out or write.
    Unchanged,
    /// Layout ran; `updates` holds the positions that moved meaningfully.
    Relaid { updates: Vec<LayoutPosition> },
}

impl Reconciliation {
    /// Positions to persist (empty when unchanged).
    pub fn updates(&self) -> &[LayoutPosition] {
        match self {
            Reconciliation::Unchanged => &[],
            Reconciliation::Relaid { updates } => updates,
        }
    }

    /// Consume into the positions to persist.
    pub fn into_updates(self) -> Vec<LayoutPosition> {
        match self {
            Reconciliation::Unchanged => Vec::new(),
            Reconciliation::Relaid { updates } => updates,
        }
    }
}

/// Keep only computed positions that differ from the stored ones by more
/// than `epsilon` on either axis. Ids missing from `stored` are kept.
pub fn meaningful_updates(
    stored: &[NodeRecord],
    computed: Vec<LayoutPosition>,
    epsilon: f64,
) -> Vec<LayoutPosition> {
    let current: HashMap<&NodeId, (f64, f64)> =
        stored.iter().map(|n| (&n.id, n.position())).collect();
    computed
        .into_iter()
        .filter(|p| match current.get(&p.id) {
            Some(&(x, y)) => p.moved_from(x, y, epsilon),
            None => true,
        })
        .collect()
}

/// Stateful driver around [`TreeLayoutEngine`] that remembers the last
/// visible id set it laid out.
#[derive(Debug)]
pub struct PositionReconciler<E = StyleSizeEstimator> {
    engine: TreeLayoutEngine<E>,
    baseline: HashSet<NodeId>,
}

impl<E: SizeEstimator> PositionReconciler<E> {
    pub fn new(engine: TreeLayoutEngine<E>) -> Self {
        Self {
            engine,
            baseline: HashSet::new(),
        }
    }

    pub fn engine(&self) -> &TreeLayoutEngine<E> {
        &self.engine
    }

    /// The visible ids recorded by the last layout.
    pub fn baseline(&self) -> &HashSet<NodeId> {
        &self.baseline
    }

    /// Forget the baseline so the next call lays out unconditionally.
    pub fn reset(&mut self) {
        self.baseline.clear();
    }

    /// Re-layout if the visible id set changed since the last call.
    ///
    /// The first call after construction or [`reset`](Self::reset) always
    /// lays out unless nothing is visible. Adopts the new baseline
    /// immediately; callers that persist the updates should use
    /// [`plan`](Self::plan) and [`adopt`](Self::adopt) instead.
    pub fn reconcile(&mut self, nodes: &[NodeRecord]) -> Reconciliation {
        let plan = self.plan(nodes);
        self.adopt(plan)
    }

    /// Lay out every visible node regardless of the baseline and return all
    /// positions.
    pub fn auto_arrange(&mut self, nodes: &[NodeRecord]) -> Vec<LayoutPosition> {
        let plan = self.plan_arrange(nodes);
        self.adopt(plan).into_updates()
    }

    /// Compute a reconciliation pass without touching the baseline.
    pub fn plan(&self, nodes: &[NodeRecord]) -> ReconcilePlan {
        let forest = resolve_visible(nodes);
        if forest.same_ids(&self.baseline) {
            return ReconcilePlan {
                outcome: Reconciliation::Unchanged,
                visible_ids: None,
            };
        }

        let computed = self.engine.layout(&forest.visible_nodes);
        let updates = meaningful_updates(
            &forest.visible_nodes,
            computed,
            self.engine.config().reposition_epsilon,
        );
        debug!(
            "reconcile: {} visible (was {}), {} positions changed",
            forest.len(),
            self.baseline.len(),
            updates.len()
        );
        ReconcilePlan {
            outcome: Reconciliation::Relaid { updates },
            visible_ids: Some(forest.visible_ids),
        }
    }

    /// Like [`plan`](Self::plan), but lays out unconditionally and keeps
    /// every position.
    pub fn plan_arrange(&self, nodes: &[NodeRecord]) -> ReconcilePlan {
        let forest = resolve_visible(nodes);
        let updates = self.engine.layout(&forest.visible_nodes);
        debug!("auto-arrange: {} nodes", updates.len());
        ReconcilePlan {
            outcome: Reconciliation::Relaid { updates },
            visible_ids: Some(forest.visible_ids),
        }
    }

    /// Accept a plan whose updates have been persisted.
    pub fn adopt(&mut self, plan: ReconcilePlan) -> Reconciliation {
        if let Some(ids) = plan.visible_ids {
            self.baseline = ids;
        }
        plan.outcome
    }
}

/// A reconciliation pass not yet accepted as the new baseline.
///
/// Dropping a plan leaves the baseline where it was, so the next pass lays
/// out again.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct ReconcilePlan {
    outcome: Reconciliation,
    visible_ids: Option<HashSet<NodeId>>,
}

impl ReconcilePlan {
    pub fn outcome(&self) -> &Reconciliation {
        &self.outcome
    }

    /// Positions to persist before adopting.
    pub fn updates(&self) -> &[LayoutPosition] {
        self.outcome.updates()
    }
}

/// Place freshly created nodes before their first write.
///
/// Lays out `visible` followed by `new_nodes` in one pass, writes the result
/// into `new_nodes` in place, and returns the existing visible nodes that had
/// to move by more than `epsilon` to make room. Writing both in one batch
/// leaves nothing for the next [`PositionReconciler::reconcile`] to persist.
pub fn pre_place<E: SizeEstimator>(
    engine: &TreeLayoutEngine<E>,
    visible: &[NodeRecord],
    new_nodes: &mut [NodeRecord],
    epsilon: f64,
) -> Vec<LayoutPosition> {
    let merged: Vec<NodeRecord> = visible.iter().chain(new_nodes.iter()).cloned().collect();
    let positions = engine.layout(&merged);

    let fresh: HashSet<&NodeId> = new_nodes.iter().map(|n| &n.id).collect();
    let (placed, existing): (Vec<LayoutPosition>, Vec<LayoutPosition>) =
        positions.into_iter().partition(|p| fresh.contains(&p.id));

    let placed: HashMap<NodeId, (f64, f64)> =
        placed.into_iter().map(|p| (p.id, (p.x, p.y))).collect();
    for node in new_nodes.iter_mut() {
        if let Some(&(x, y)) = placed.get(&node.id) {
            node.x = x;
            node.y = y;
        }
    }

    meaningful_updates(visible, existing, epsilon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{NodeStyle, TopicId};

    fn node(id: &str, parent: Option<&str>) -> NodeRecord {
        NodeRecord {
            id: NodeId::new(id),
            parent_id: parent.map(NodeId::new),
            ..NodeRecord::new(TopicId::new("t"), None, id, "", NodeStyle::Nyt)
        }
    }

    fn apply(nodes: &mut [NodeRecord], updates: &[LayoutPosition]) {
        for p in updates {
            if let Some(n) = nodes.iter_mut().find(|n| n.id == p.id) {
                n.x = p.x;
                n.y = p.y;
            }
        }
    }

    fn reconciler() -> PositionReconciler {
        PositionReconciler::new(TreeLayoutEngine::with_defaults())
    }

    fn scenario() -> Vec<NodeRecord> {
        vec![
            node("R", None),
            node("A", Some("R")),
            node("B", Some("R")),
            node("C", Some("R")),
            node("D", Some("A")),
            node("E", Some("A")),
        ]
    }

    #[test]
    fn test_first_reconcile_lays_out() {
        let mut rec = reconciler();
        let nodes = scenario();
        let outcome = rec.reconcile(&nodes);
        // R stays at the origin, everything else moves.
        assert_eq!(outcome.updates().len(), 5);
        assert_eq!(rec.baseline().len(), 6);
    }

    #[test]
    fn test_second_reconcile_is_unchanged() {
        let mut rec = reconciler();
        let mut nodes = scenario();
        let updates = rec.reconcile(&nodes).into_updates();
        apply(&mut nodes, &updates);
        assert_eq!(rec.reconcile(&nodes), Reconciliation::Unchanged);
    }

    #[test]
    fn test_text_edit_does_not_relayout() {
        let mut rec = reconciler();
        let mut nodes = scenario();
        rec.reconcile(&nodes);
        nodes[2].title = "a much longer title than before, spanning lines".into();
        assert_eq!(rec.reconcile(&nodes), Reconciliation::Unchanged);
    }

    #[test]
    fn test_collapsing_leaf_triggers_nothing() {
        let mut rec = reconciler();
        let mut nodes = scenario();
        rec.reconcile(&nodes);
        // C is a leaf: hiding its (zero) children leaves the visible set intact.
        nodes[3].collapsed = true;
        assert_eq!(rec.reconcile(&nodes), Reconciliation::Unchanged);
    }

    #[test]
    fn test_collapsing_hides_subtree_and_relays() {
        let mut rec = reconciler();
        let mut nodes = scenario();
        let updates = rec.reconcile(&nodes).into_updates();
        apply(&mut nodes, &updates);

        nodes[1].collapsed = true;
        let outcome = rec.reconcile(&nodes);
        assert!(matches!(outcome, Reconciliation::Relaid { .. }));
        assert!(outcome.updates().iter().all(|p| p.id.as_str() != "D" && p.id.as_str() != "E"));
        assert_eq!(rec.baseline().len(), 4);
    }

    #[test]
    fn test_same_size_different_members_relays() {
        let mut rec = reconciler();
        let mut nodes = vec![node("R", None), node("A", Some("R"))];
        rec.reconcile(&nodes);
        nodes[1] = node("B", Some("R"));
        assert!(matches!(rec.reconcile(&nodes), Reconciliation::Relaid { .. }));
    }

    #[test]
    fn test_epsilon_filter() {
        let stored = [node("A", None), node("B", None), node("C", None)];
        let computed = vec![
            LayoutPosition::new(NodeId::new("A"), 0.5, 0.0),
            LayoutPosition::new(NodeId::new("B"), 0.0, 1.5),
            LayoutPosition::new(NodeId::new("C"), 1.0, -1.0),
            LayoutPosition::new(NodeId::new("Z"), 0.0, 0.0),
        ];
        let kept: Vec<_> = meaningful_updates(&stored, computed, 1.0)
            .into_iter()
            .map(|p| p.id.0)
            .collect();
        // Exactly 1.0 is not "more than" epsilon; unknown ids always pass.
        assert_eq!(kept, ["B", "Z"]);
    }

    #[test]
    fn test_reset_forces_relayout() {
        let mut rec = reconciler();
        let mut nodes = scenario();
        let updates = rec.reconcile(&nodes).into_updates();
        apply(&mut nodes, &updates);
        rec.reset();
        // Positions already match, so layout runs but nothing is written.
        assert_eq!(
            rec.reconcile(&nodes),
            Reconciliation::Relaid { updates: Vec::new() }
        );
    }

    #[test]
    fn test_auto_arrange_returns_everything() {
        let mut rec = reconciler();
        let mut nodes = scenario();
        let updates = rec.reconcile(&nodes).into_updates();
        apply(&mut nodes, &updates);
        nodes[1].collapsed = true;
        assert_eq!(rec.auto_arrange(&nodes).len(), 4);
        assert_eq!(rec.reconcile(&nodes), Reconciliation::Unchanged);
    }

    #[test]
    fn test_expand_pre_placement_needs_no_second_write() {
        let mut rec = reconciler();
        let mut nodes = scenario();
        let updates = rec.reconcile(&nodes).into_updates();
        apply(&mut nodes, &updates);

        // Expand A: three generated children join D and E at the origin.
        let visible = resolve_visible(&nodes).visible_nodes;
        let mut fresh: Vec<NodeRecord> =
            ["F", "G", "H"].iter().map(|id| node(id, Some("A"))).collect();
        let moved = pre_place(rec.engine(), &visible, &mut fresh, 0.1);
        apply(&mut nodes, &moved);
        nodes.extend(fresh);

        let at = |id: &str| {
            nodes
                .iter()
                .find(|n| n.id.as_str() == id)
                .map(|n| n.position())
                .unwrap()
        };
        let height = NodeStyle::Nyt.size_policy().height;

        // Same column as the existing children, after them in input order.
        let column = at("D").0;
        assert!(column > 0.0);
        let kids: Vec<(f64, f64)> =
            ["D", "E", "F", "G", "H"].into_iter().map(|id| at(id)).collect();
        assert!(kids.iter().all(|&(x, _)| x == column));
        for pair in kids.windows(2) {
            assert!(pair[1].1 - pair[0].1 >= height - 1e-6, "siblings overlap: {kids:?}");
        }

        // A's siblings still clear each other and A stays centred on its children.
        let (a, b, c) = (at("A").1, at("B").1, at("C").1);
        assert!(b - a >= height - 1e-6 && c - b >= height - 1e-6);
        assert!((a - (kids[0].1 + kids[4].1) / 2.0).abs() < 1e-6);

        let second = rec.reconcile(&nodes);
        assert!(second.updates().is_empty(), "second pass wrote {:?}", second.updates());
    }

    /// R → A → {D, E, F, G}, B → {H}: B is pushed down by A's subtree.
    fn wide_left() -> Vec<NodeRecord> {
        let mut nodes = vec![node("R", None), node("A", Some("R")), node("B", Some("R"))];
        nodes.extend(["D", "E", "F", "G"].iter().map(|id| node(id, Some("A"))));
        nodes.push(node("H", Some("B")));
        nodes
    }

    #[test]
    fn test_dropped_plan_keeps_baseline() {
        let mut rec = reconciler();
        let mut nodes = wide_left();
        let updates = rec.reconcile(&nodes).into_updates();
        apply(&mut nodes, &updates);

        nodes[1].collapsed = true;
        let plan = rec.plan(&nodes);
        assert!(plan.updates().iter().any(|p| p.id.as_str() == "B"));
        // Writing the plan failed; it is never adopted.
        drop(plan);
        assert_eq!(rec.baseline().len(), 8);

        let retry = rec.plan(&nodes);
        assert!(retry.updates().iter().any(|p| p.id.as_str() == "B"));
        let updates = rec.adopt(retry).into_updates();
        apply(&mut nodes, &updates);
        assert_eq!(rec.baseline().len(), 4);
        assert_eq!(rec.reconcile(&nodes), Reconciliation::Unchanged);
    }

    #[test]
    fn test_plan_arrange_keeps_every_position() {
        let rec = reconciler();
        let plan = rec.plan_arrange(&wide_left());
        assert_eq!(plan.updates().len(), 8);
        assert!(rec.baseline().is_empty());
    }
}
