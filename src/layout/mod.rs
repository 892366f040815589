//! Layout pipeline for the mind map.
//!
//! Positions are computed CPU-side from the flat node list in three steps:
//! resolve which nodes are visible, lay the visible forest out as a tidy tree,
//! then reconcile the result against stored positions so only meaningful
//! moves are written back.

pub mod reconcile;
pub mod size;
pub mod tidy_tree;
pub mod visibility;

pub use reconcile::{
    PositionReconciler, ReconcilePlan, Reconciliation, meaningful_updates, pre_place,
};
pub use size::{SizeEstimator, SizePolicy, StyleSizeEstimator};
pub use tidy_tree::{LayoutPosition, TreeLayoutEngine};
pub use visibility::{VisibleForest, resolve_visible};
