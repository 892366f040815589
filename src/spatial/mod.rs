//! Spatial indexing for O(log n) hit testing.
//!
//! This module provides an R-tree based spatial index over laid-out node
//! rectangles for pointer hits, nearest-node and marquee queries.

mod rtree;

pub use rtree::{NodeRect, SpatialIndex};
