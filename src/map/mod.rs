//! Mind-map records and persistence.
//!
//! Nodes, edges and topics are stored flat and keyed by id; the parent →
//! children adjacency is always derived from `parent_id` on demand rather
//! than held as object references.

mod edge;
mod node;
mod snapshot;
mod store;
mod topic;

pub use edge::{EdgeId, EdgeRecord, EdgeStyle};
pub use node::{ColorTag, NodeId, NodeRecord, NodeStyle};
pub use snapshot::{MapSnapshot, WriteBatch};
pub use store::{MapStore, MemoryStore};
pub use topic::{TopicId, TopicRecord, TopicStyle};

/// Milliseconds since the Unix epoch.
#[cfg(target_arch = "wasm32")]
pub(crate) fn now_millis() -> f64 {
    js_sys::Date::now()
}

/// Milliseconds since the Unix epoch.
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn now_millis() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}
