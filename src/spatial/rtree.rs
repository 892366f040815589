//! R-tree based spatial index using the rstar crate.
//!
//! Indexes the laid-out rectangle of every node so the renderer can resolve
//! pointer hits and marquee selections without scanning the whole map:
//! - Point-in-node
//! - Nearest node
//! - Rectangle intersection

use rstar::{AABB, Envelope, PointDistance, RTree, RTreeObject};

use crate::layout::SizeEstimator;
use crate::map::{NodeId, NodeRecord};

/// A node's footprint. `(x, y)` is the top-left corner, as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRect {
    pub id: NodeId,
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl NodeRect {
    /// Footprint of `node` at its stored position.
    pub fn of<E: SizeEstimator>(node: &NodeRecord, estimator: &E) -> Self {
        let (x, y) = node.position();
        Self {
            id: node.id.clone(),
            min: [x, y],
            max: [
                x + estimator.estimate_width(node),
                y + estimator.estimate_height(node),
            ],
        }
    }

    /// Centre point.
    pub fn center(&self) -> [f64; 2] {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
        ]
    }
}

impl RTreeObject for NodeRect {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.min, self.max)
    }
}

impl PointDistance for NodeRect {
    /// Squared distance to the rectangle; zero inside it.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        Envelope::distance_2(&self.envelope(), point)
    }

    fn contains_point(&self, point: &[f64; 2]) -> bool {
        Envelope::contains_point(&self.envelope(), point)
    }
}

/// Spatial index over node rectangles.
///
/// Uses an R*-tree, bulk loaded after each layout.
pub struct SpatialIndex {
    tree: RTree<NodeRect>,
}

impl SpatialIndex {
    /// Create a new empty spatial index.
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Index `nodes` at their stored positions.
    pub fn from_nodes<E: SizeEstimator>(nodes: &[NodeRecord], estimator: &E) -> Self {
        let mut index = Self::new();
        index.rebuild(nodes, estimator);
        index
    }

    /// Replace the contents with `nodes`.
    ///
    /// Bulk loading is cheaper than incremental inserts after a re-layout.
    pub fn rebuild<E: SizeEstimator>(&mut self, nodes: &[NodeRecord], estimator: &E) {
        let rects: Vec<_> = nodes.iter().map(|n| NodeRect::of(n, estimator)).collect();
        self.tree = RTree::bulk_load(rects);
    }

    /// The node whose rectangle contains `(x, y)`.
    ///
    /// Laid-out nodes never overlap; if they do (stale positions) the
    /// smallest containing rectangle wins.
    pub fn node_at(&self, x: f64, y: f64) -> Option<&NodeId> {
        self.tree
            .locate_all_at_point(&[x, y])
            .min_by(|a, b| a.envelope().area().total_cmp(&b.envelope().area()))
            .map(|rect| &rect.id)
    }

    /// Find the nearest node to a point (distance to its rectangle).
    pub fn nearest(&self, x: f64, y: f64) -> Option<&NodeId> {
        self.tree.nearest_neighbor(&[x, y]).map(|rect| &rect.id)
    }

    /// Find the nearest node within a maximum distance.
    pub fn nearest_within(&self, x: f64, y: f64, max_distance: f64) -> Option<&NodeId> {
        let max_distance_sq = max_distance * max_distance;
        self.tree
            .nearest_neighbor(&[x, y])
            .filter(|rect| rect.distance_2(&[x, y]) <= max_distance_sq)
            .map(|rect| &rect.id)
    }

    /// Find all nodes whose rectangle intersects the given rectangle.
    pub fn in_rect(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<&NodeId> {
        let envelope = AABB::from_corners([min_x, min_y], [max_x, max_y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|rect| &rect.id)
            .collect()
    }

    /// Clear all nodes from the index.
    pub fn clear(&mut self) {
        self.tree = RTree::new();
    }

    /// Get the number of nodes in the index.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}
