//! Error types.
//!
//! The layout core itself is infallible on valid input; everything here
//! belongs either to startup configuration or to the collaborators around
//! the core (store, generation service) and the editing operations that
//! drive them.

use thiserror::Error;

use crate::map::{EdgeId, NodeId, TopicId};

/// Invalid [`LayoutConfig`](crate::config::LayoutConfig) values.
///
/// These are rejected when an engine is constructed, never during layout.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The row gap is the unit of the separation function and must be > 0.
    #[error("row gap must be a positive finite number, got {0}")]
    InvalidRowGap(f64),

    /// Column padding is added to the widest node and must be >= 0.
    #[error("column padding must be a non-negative finite number, got {0}")]
    InvalidColumnPadding(f64),

    /// A non-negative spacing factor was negative or not finite.
    #[error("{name} must be a non-negative finite number, got {value}")]
    InvalidFactor {
        /// Config field name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },

    /// A change-detection epsilon was not strictly positive.
    #[error("{name} must be a positive finite number, got {value}")]
    InvalidEpsilon {
        /// Config field name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },

    /// Expansion would ask the generator for zero children.
    #[error("expansion count must be at least 1")]
    ZeroExpansionCount,
}

/// Failures reported by a [`MapStore`](crate::map::MapStore).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// No topic with this id exists.
    #[error("unknown topic {0}")]
    UnknownTopic(TopicId),

    /// A batch referenced a node that does not exist.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// An edge did not mirror its target's parent pointer.
    #[error("edge {edge} ({source_id} -> {target}) does not match the target's parent")]
    InconsistentEdge {
        /// Edge being written.
        edge: EdgeId,
        /// Declared source.
        source_id: NodeId,
        /// Declared target.
        target: NodeId,
    },

    /// Backend-specific failure (I/O, quota, transaction abort).
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Failures reported by a [`ChildGenerator`](crate::session::ChildGenerator).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    /// The service could not be reached or returned an error status.
    #[error("generation service failed: {0}")]
    Service(String),

    /// The service answered but the payload could not be used.
    #[error("generation service returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors from map editing operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapError {
    /// The operation targeted a node that is not in the topic.
    #[error("node {0} not found")]
    UnknownNode(NodeId),

    /// The topic root cannot be deleted.
    #[error("node {0} is the topic root and cannot be deleted")]
    RootDeletion(NodeId),

    /// A generation call for this node is still outstanding.
    #[error("node {0} is already being expanded")]
    ExpansionInFlight(NodeId),

    /// Configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The store rejected a read or a batch.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The generation service failed.
    #[error(transparent)]
    Generation(#[from] GenerationError),
}
