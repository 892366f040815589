//! Buchheim-Junger-Leipert tidy tree layout for the visible forest.
//!
//! Implements the O(n) algorithm from "Improving Walker's Algorithm to Run in
//! Linear Time" (Buchheim, Junger, Leipert, 2002), in the formulation used by
//! d3-hierarchy's `tree()`: fixed node size per axis plus a pairwise
//! separation function.
//!
//! # Algorithm Overview
//!
//! 1. **Partition:** rebuild parent → children from `parent_id`. A node whose
//!    parent is not in the input is a root. Root and child order follow input
//!    order.
//! 2. **First walk (post-order):** assign preliminary breadth coordinates by
//!    merging subtree contours. Threads keep contour traversal O(1) amortized.
//! 3. **Second walk (pre-order):** apply accumulated modifiers.
//! 4. **Coordinate transform:** depth → rendered x (columns, left to right),
//!    breadth → rendered y (rows). Root `k` is pushed down by
//!    `k * row_gap * root_stack_rows`.
//!
//! Separation is measured in row gaps:
//! `max(h(a), h(b)) / row_gap`, plus `cousin_gap` when `a` and `b` have
//! different parents. Every depth level is one column wide, where a column is
//! the single widest node in the input plus `column_padding`.

use std::collections::{HashMap, HashSet};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::size::{SizeEstimator, StyleSizeEstimator};
use crate::config::LayoutConfig;
use crate::error::ConfigError;
use crate::map::{NodeId, NodeRecord};

/// Computed position for one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutPosition {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
}

impl LayoutPosition {
    /// Create a position entry.
    pub fn new(id: NodeId, x: f64, y: f64) -> Self {
        Self { id, x, y }
    }

    /// Whether this position differs from `(x, y)` by more than `epsilon`
    /// on either axis.
    #[inline]
    pub fn moved_from(&self, x: f64, y: f64, epsilon: f64) -> bool {
        (self.x - x).abs() > epsilon || (self.y - y).abs() > epsilon
    }
}

/// Internal node data used during the Buchheim algorithm.
#[derive(Debug)]
struct LayoutNode {
    /// Index into the (deduplicated) input slice; `None` for the virtual root.
    source: Option<usize>,
    /// Depth in the tree (root = 0).
    depth: u32,
    /// Parent layout index (`None` only for the virtual root).
    parent: Option<usize>,
    /// Children in input order.
    children: Vec<usize>,
    /// Left-to-right index among siblings.
    number: usize,
    /// Estimated extent along the breadth axis.
    height: f64,
    /// Preliminary breadth coordinate (first walk).
    prelim: f64,
    /// Subtree shift accumulated in the first walk, applied in the second.
    modifier: f64,
    /// Change value for even spacing of intermediate children.
    change: f64,
    /// Shift value for even spacing of intermediate children.
    shift: f64,
    /// Contour thread.
    thread: Option<usize>,
    /// Ancestor pointer used by apportion.
    ancestor: usize,
    /// Default ancestor for this node's children.
    default_ancestor: Option<usize>,
}

impl LayoutNode {
    fn new(
        idx: usize,
        source: Option<usize>,
        parent: Option<usize>,
        depth: u32,
        height: f64,
    ) -> Self {
        Self {
            source,
            depth,
            parent,
            children: Vec::new(),
            number: 0,
            height,
            prelim: 0.0,
            modifier: 0.0,
            change: 0.0,
            shift: 0.0,
            thread: None,
            ancestor: idx,
            default_ancestor: None,
        }
    }
}

/// The tree layout engine.
///
/// Stateless between calls: output is a pure function of the input order,
/// the node sizes and the configuration.
#[derive(Debug, Clone)]
pub struct TreeLayoutEngine<E = StyleSizeEstimator> {
    config: LayoutConfig,
    estimator: E,
}

impl TreeLayoutEngine<StyleSizeEstimator> {
    /// Create an engine with the style-based size estimator.
    pub fn new(config: LayoutConfig) -> Result<Self, ConfigError> {
        Self::with_estimator(config, StyleSizeEstimator)
    }

    /// Create an engine with default configuration.
    pub fn with_defaults() -> Self {
        Self {
            config: LayoutConfig::default(),
            estimator: StyleSizeEstimator,
        }
    }
}

impl<E: SizeEstimator> TreeLayoutEngine<E> {
    /// Create an engine with a custom size estimator.
    ///
    /// The configuration is validated here so that layout itself can never
    /// fail (in particular, the separation function never divides by a zero
    /// row gap).
    pub fn with_estimator(config: LayoutConfig, estimator: E) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, estimator })
    }

    /// The active configuration.
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// The size estimator.
    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    /// Column spacing for `nodes`: widest estimated node plus padding.
    pub fn column_width(&self, nodes: &[NodeRecord]) -> f64 {
        self.column_width_of(nodes.iter())
    }

    fn column_width_of<'a>(&self, nodes: impl Iterator<Item = &'a NodeRecord>) -> f64 {
        let widest = nodes
            .map(|n| self.estimator.estimate_width(n))
            .fold(0.0_f64, f64::max);
        widest + self.config.column_padding
    }

    /// Compute positions for `nodes`.
    ///
    /// Returns one entry per laid-out node: roots in input order, each tree
    /// in pre-order. Nodes not in `nodes` are not touched. Duplicate ids keep
    /// their first occurrence; members of a parent cycle have no root and are
    /// left out.
    pub fn layout(&self, nodes: &[NodeRecord]) -> Vec<LayoutPosition> {
        if nodes.is_empty() {
            return Vec::new();
        }

        // Deduplicate by id, keeping input order.
        let mut seen: HashSet<&NodeId> = HashSet::with_capacity(nodes.len());
        let nodes: Vec<&NodeRecord> = nodes.iter().filter(|n| seen.insert(&n.id)).collect();

        let present: HashSet<&NodeId> = nodes.iter().map(|n| &n.id).collect();
        let mut children_map: HashMap<&NodeId, Vec<usize>> = HashMap::new();
        let mut roots: Vec<usize> = Vec::new();
        for (i, node) in nodes.iter().enumerate() {
            match &node.parent_id {
                Some(parent) if present.contains(parent) => {
                    children_map.entry(parent).or_default().push(i)
                }
                _ => roots.push(i),
            }
        }

        let column_width = self.column_width_of(nodes.iter().copied());
        let root_stride = self.config.row_gap * self.config.root_stack_rows;

        let mut positions = Vec::with_capacity(nodes.len());
        for (k, &root) in roots.iter().enumerate() {
            let (layout_nodes, breadth) = self.layout_tree(root, &nodes, &children_map);
            let y_offset = k as f64 * root_stride;
            for (node, b) in layout_nodes.iter().zip(&breadth) {
                if let Some(source) = node.source {
                    positions.push(LayoutPosition::new(
                        nodes[source].id.clone(),
                        node.depth as f64 * column_width,
                        b * self.config.row_gap + y_offset,
                    ));
                }
            }
        }

        if positions.len() < nodes.len() {
            warn!(
                "tree layout: {} of {} nodes unreachable from any root (parent cycle)",
                nodes.len() - positions.len(),
                nodes.len()
            );
        }
        debug!(
            "tree layout: {} nodes, {} roots, column width {column_width}",
            positions.len(),
            roots.len()
        );

        positions
    }

    /// Lay out one tree. Returns the arena (pre-order, virtual root first)
    /// and the final breadth coordinate of each arena entry in row gaps.
    fn layout_tree(
        &self,
        root: usize,
        nodes: &[&NodeRecord],
        children_map: &HashMap<&NodeId, Vec<usize>>,
    ) -> (Vec<LayoutNode>, Vec<f64>) {
        let mut layout_nodes = Self::build_layout_tree(root, nodes, children_map, &self.estimator);

        // Post-order over the real tree: children before parents, siblings
        // left to right.
        let pre_order = Self::pre_order(&layout_nodes, 1);
        let mut post_order = Vec::with_capacity(pre_order.len());
        let mut stack = vec![1usize];
        while let Some(v) = stack.pop() {
            post_order.push(v);
            stack.extend(layout_nodes[v].children.iter().copied());
        }
        post_order.reverse();

        for &v in &post_order {
            self.first_walk(v, &mut layout_nodes);
        }

        // The virtual root's modifier re-centres the real root on 0.
        layout_nodes[0].modifier = -layout_nodes[1].prelim;
        let mut breadth = vec![0.0; layout_nodes.len()];
        for &v in &pre_order {
            Self::second_walk(v, &mut layout_nodes, &mut breadth);
        }

        (layout_nodes, breadth)
    }

    /// Build the arena: index 0 is a virtual parent of the real root at 1.
    fn build_layout_tree(
        root: usize,
        nodes: &[&NodeRecord],
        children_map: &HashMap<&NodeId, Vec<usize>>,
        estimator: &E,
    ) -> Vec<LayoutNode> {
        let mut layout_nodes = vec![LayoutNode::new(0, None, None, 0, 0.0)];
        layout_nodes[0].children.push(1);
        layout_nodes.push(LayoutNode::new(
            1,
            Some(root),
            Some(0),
            0,
            estimator.estimate_height(nodes[root]),
        ));

        let mut stack = vec![1usize];
        while let Some(v) = stack.pop() {
            let Some(source) = layout_nodes[v].source else {
                continue;
            };
            let Some(kids) = children_map.get(&nodes[source].id) else {
                continue;
            };
            let depth = layout_nodes[v].depth + 1;
            let mut child_indices = Vec::with_capacity(kids.len());
            for (number, &kid) in kids.iter().enumerate() {
                let idx = layout_nodes.len();
                let mut child = LayoutNode::new(
                    idx,
                    Some(kid),
                    Some(v),
                    depth,
                    estimator.estimate_height(nodes[kid]),
                );
                child.number = number;
                layout_nodes.push(child);
                child_indices.push(idx);
            }
            stack.extend(child_indices.iter().copied());
            layout_nodes[v].children = child_indices;
        }

        layout_nodes
    }

    fn pre_order(nodes: &[LayoutNode], start: usize) -> Vec<usize> {
        let mut order = Vec::with_capacity(nodes.len());
        let mut stack = vec![start];
        while let Some(v) = stack.pop() {
            order.push(v);
            stack.extend(nodes[v].children.iter().rev().copied());
        }
        order
    }

    /// Separation between two neighbouring nodes, in row gaps.
    fn separation(&self, a: usize, b: usize, nodes: &[LayoutNode]) -> f64 {
        let base = nodes[a].height.max(nodes[b].height) / self.config.row_gap;
        if nodes[a].parent == nodes[b].parent {
            base
        } else {
            base + self.config.cousin_gap
        }
    }

    /// Buchheim first walk for one node; its children are already placed.
    fn first_walk(&self, v: usize, nodes: &mut [LayoutNode]) {
        let Some(parent) = nodes[v].parent else {
            return;
        };
        let number = nodes[v].number;
        let left_sibling = (number > 0).then(|| nodes[parent].children[number - 1]);

        if let (Some(&first), Some(&last)) = (nodes[v].children.first(), nodes[v].children.last()) {
            self.execute_shifts(v, nodes);
            let midpoint = (nodes[first].prelim + nodes[last].prelim) / 2.0;
            match left_sibling {
                Some(w) => {
                    nodes[v].prelim = nodes[w].prelim + self.separation(v, w, nodes);
                    nodes[v].modifier = nodes[v].prelim - midpoint;
                }
                None => nodes[v].prelim = midpoint,
            }
        } else if let Some(w) = left_sibling {
            nodes[v].prelim = nodes[w].prelim + self.separation(v, w, nodes);
        }

        let ancestor = nodes[parent]
            .default_ancestor
            .unwrap_or(nodes[parent].children[0]);
        let ancestor = self.apportion(v, left_sibling, ancestor, nodes);
        nodes[parent].default_ancestor = Some(ancestor);
    }

    /// Get the next node on the left contour of a subtree.
    fn next_left(v: usize, nodes: &[LayoutNode]) -> Option<usize> {
        nodes[v].children.first().copied().or(nodes[v].thread)
    }

    /// Get the next node on the right contour of a subtree.
    fn next_right(v: usize, nodes: &[LayoutNode]) -> Option<usize> {
        nodes[v].children.last().copied().or(nodes[v].thread)
    }

    /// The greatest distinct ancestor of `v_inner_left` among `v`'s siblings,
    /// or the default ancestor.
    fn next_ancestor(
        v_inner_left: usize,
        v: usize,
        ancestor: usize,
        nodes: &[LayoutNode],
    ) -> usize {
        let candidate = nodes[v_inner_left].ancestor;
        if nodes[candidate].parent == nodes[v].parent {
            candidate
        } else {
            ancestor
        }
    }

    /// Apportion: push `v`'s subtree right until it clears every subtree to
    /// its left, and thread the contours.
    ///
    /// Naming follows the paper: `v_inner_right`/`v_outer_right` walk the
    /// inside/outside contour of `v`'s subtree, `v_inner_left`/`v_outer_left`
    /// those of the forest to its left; the `s_*` values are modifier sums.
    fn apportion(
        &self,
        v: usize,
        left_sibling: Option<usize>,
        mut default_ancestor: usize,
        nodes: &mut [LayoutNode],
    ) -> usize {
        let Some(w) = left_sibling else {
            return default_ancestor;
        };
        let Some(parent) = nodes[v].parent else {
            return default_ancestor;
        };

        let mut v_inner_right = v;
        let mut v_outer_right = v;
        let mut v_inner_left = w;
        let mut v_outer_left = nodes[parent].children[0];

        let mut s_inner_right = nodes[v_inner_right].modifier;
        let mut s_outer_right = nodes[v_outer_right].modifier;
        let mut s_inner_left = nodes[v_inner_left].modifier;
        let mut s_outer_left = nodes[v_outer_left].modifier;

        let mut next_inner_left = Self::next_right(v_inner_left, nodes);
        let mut next_inner_right = Self::next_left(v_inner_right, nodes);

        while let (Some(il), Some(ir)) = (next_inner_left, next_inner_right) {
            v_inner_left = il;
            v_inner_right = ir;
            if let Some(next) = Self::next_left(v_outer_left, nodes) {
                v_outer_left = next;
            }
            if let Some(next) = Self::next_right(v_outer_right, nodes) {
                v_outer_right = next;
            }
            nodes[v_outer_right].ancestor = v;

            let shift = nodes[v_inner_left].prelim + s_inner_left
                - nodes[v_inner_right].prelim
                - s_inner_right
                + self.separation(v_inner_left, v_inner_right, nodes);
            if shift > 0.0 {
                let wm = Self::next_ancestor(v_inner_left, v, default_ancestor, nodes);
                Self::move_subtree(wm, v, shift, nodes);
                s_inner_right += shift;
                s_outer_right += shift;
            }

            s_inner_left += nodes[v_inner_left].modifier;
            s_inner_right += nodes[v_inner_right].modifier;
            s_outer_left += nodes[v_outer_left].modifier;
            s_outer_right += nodes[v_outer_right].modifier;

            next_inner_left = Self::next_right(v_inner_left, nodes);
            next_inner_right = Self::next_left(v_inner_right, nodes);
        }

        // Left forest is deeper: thread v's right contour into it.
        if let Some(il) = next_inner_left {
            if Self::next_right(v_outer_right, nodes).is_none() {
                nodes[v_outer_right].thread = Some(il);
                nodes[v_outer_right].modifier += s_inner_left - s_outer_right;
            }
        }
        // v's subtree is deeper: thread the left forest's contour into it.
        if let Some(ir) = next_inner_right {
            if Self::next_left(v_outer_left, nodes).is_none() {
                nodes[v_outer_left].thread = Some(ir);
                nodes[v_outer_left].modifier += s_inner_right - s_outer_left;
                default_ancestor = v;
            }
        }

        default_ancestor
    }

    /// Shift subtree `wr` right and record the spread for the siblings
    /// between `wl` and `wr`.
    fn move_subtree(wl: usize, wr: usize, shift: f64, nodes: &mut [LayoutNode]) {
        let subtrees = (nodes[wr].number as f64 - nodes[wl].number as f64).max(1.0);
        let per_subtree = shift / subtrees;

        nodes[wr].change -= per_subtree;
        nodes[wr].shift += shift;
        nodes[wl].change += per_subtree;
        nodes[wr].prelim += shift;
        nodes[wr].modifier += shift;
    }

    /// Execute accumulated shifts for children of node v.
    fn execute_shifts(&self, v: usize, nodes: &mut [LayoutNode]) {
        let mut shift = 0.0;
        let mut change = 0.0;
        for i in (0..nodes[v].children.len()).rev() {
            let child = nodes[v].children[i];
            nodes[child].prelim += shift;
            nodes[child].modifier += shift;
            change += nodes[child].change;
            shift += nodes[child].shift + change;
        }
    }

    /// Second walk: resolve the final breadth of `v` from its parent's
    /// accumulated modifier. Must run in pre-order.
    fn second_walk(v: usize, nodes: &mut [LayoutNode], breadth: &mut [f64]) {
        let parent_modifier = nodes[v].parent.map_or(0.0, |p| nodes[p].modifier);
        breadth[v] = nodes[v].prelim + parent_modifier;
        nodes[v].modifier += parent_modifier;
    }
}
