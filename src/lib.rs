//! Mind Map Layout - WASM Module
//!
//! Incremental tree layout for a mind-map editor. Nodes are stored flat and
//! keyed by id; after every edit the visible forest is resolved, laid out as a
//! tidy tree (depth left to right, siblings top to bottom), and only the
//! positions that actually moved are written back.
//!
//! # Architecture
//!
//! - `map`: node/edge/topic records, snapshots, write batches and the store seam
//! - `layout`: visibility, size estimation, tidy tree layout, reconciliation
//! - `session`: map edits and node expansion against a store and a generator
//! - `navigation`: keyboard navigation over the tree
//! - `spatial`: R-tree over node rectangles for hit testing
//!
//! The JavaScript surface is [`MindMapLayoutWasm`]; records cross the
//! boundary as plain camelCase objects.

use log::Level;
use serde::Serialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;

pub mod config;
pub mod error;
pub mod layout;
pub mod map;
pub mod navigation;
pub mod session;
pub mod spatial;

pub use config::LayoutConfig;
pub use error::{ConfigError, GenerationError, MapError, StoreError};
pub use layout::{
    LayoutPosition, PositionReconciler, Reconciliation, SizeEstimator, StyleSizeEstimator,
    TreeLayoutEngine, VisibleForest, resolve_visible,
};
pub use map::{EdgeRecord, MapSnapshot, MapStore, MemoryStore, NodeId, NodeRecord, WriteBatch};
pub use session::{ChildGenerator, ExpansionOutcome, MapSession, seed_topic};

use layout::pre_place;
use navigation::{NavKey, navigate};
use spatial::SpatialIndex;

/// Initialize the WASM module: panic messages and `log` output go to the
/// browser console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(Level::Debug);
}

fn js_error(err: impl std::fmt::Display) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(js_error)
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(js_error)
}

/// Result of `reconcile` as seen from JavaScript.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReconcileResult {
    /// False when the visible id set did not change and layout was skipped.
    relaid: bool,
    updates: Vec<LayoutPosition>,
}

/// Result of `placeNewChildren`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Placement {
    /// The new nodes with their final positions filled in.
    placed: Vec<NodeRecord>,
    /// Existing nodes that had to move.
    moved: Vec<LayoutPosition>,
}

/// Layout entry point for the renderer.
///
/// Holds the reconciliation baseline between calls and a spatial index over
/// the last indexed nodes.
#[wasm_bindgen]
pub struct MindMapLayoutWasm {
    reconciler: PositionReconciler,
    index: SpatialIndex,
}

#[wasm_bindgen]
impl MindMapLayoutWasm {
    /// Create a layout engine from a (partial) config object.
    ///
    /// `undefined` or `null` selects the defaults. Invalid values throw.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<MindMapLayoutWasm, JsValue> {
        let config: LayoutConfig = if config.is_undefined() || config.is_null() {
            LayoutConfig::default()
        } else {
            from_js(config)?
        };
        let engine = TreeLayoutEngine::new(config).map_err(js_error)?;
        Ok(Self {
            reconciler: PositionReconciler::new(engine),
            index: SpatialIndex::new(),
        })
    }

    /// The effective configuration.
    #[wasm_bindgen(getter)]
    pub fn config(&self) -> Result<JsValue, JsValue> {
        to_js(self.reconciler.engine().config())
    }

    // =========================================================================
    // Layout
    // =========================================================================

    /// `{ visibleIds, visibleNodes }` for a node array.
    #[wasm_bindgen(js_name = resolveVisible)]
    pub fn resolve_visible(&self, nodes: JsValue) -> Result<JsValue, JsValue> {
        let nodes: Vec<NodeRecord> = from_js(nodes)?;
        to_js(&resolve_visible(&nodes))
    }

    /// Edges whose endpoints are both visible.
    #[wasm_bindgen(js_name = visibleEdges)]
    pub fn visible_edges(&self, nodes: JsValue, edges: JsValue) -> Result<JsValue, JsValue> {
        let nodes: Vec<NodeRecord> = from_js(nodes)?;
        let edges: Vec<EdgeRecord> = from_js(edges)?;
        to_js(&resolve_visible(&nodes).visible_edges(&edges))
    }

    /// Positions for exactly the given nodes (callers pass visible nodes).
    pub fn layout(&self, nodes: JsValue) -> Result<JsValue, JsValue> {
        let nodes: Vec<NodeRecord> = from_js(nodes)?;
        to_js(&self.reconciler.engine().layout(&nodes))
    }

    /// Column spacing the layout would use for these nodes.
    #[wasm_bindgen(js_name = columnWidth)]
    pub fn column_width(&self, nodes: JsValue) -> Result<f64, JsValue> {
        let nodes: Vec<NodeRecord> = from_js(nodes)?;
        Ok(self.reconciler.engine().column_width(&nodes))
    }

    /// Re-layout if the visible id set changed since the last call.
    ///
    /// Returns `{ relaid, updates }`; `updates` holds only the positions that
    /// moved by more than the reposition epsilon.
    pub fn reconcile(&mut self, nodes: JsValue) -> Result<JsValue, JsValue> {
        let nodes: Vec<NodeRecord> = from_js(nodes)?;
        let result = match self.reconciler.reconcile(&nodes) {
            Reconciliation::Unchanged => ReconcileResult {
                relaid: false,
                updates: Vec::new(),
            },
            Reconciliation::Relaid { updates } => ReconcileResult {
                relaid: true,
                updates,
            },
        };
        to_js(&result)
    }

    /// Lay out every visible node and return all positions.
    #[wasm_bindgen(js_name = autoArrange)]
    pub fn auto_arrange(&mut self, nodes: JsValue) -> Result<JsValue, JsValue> {
        let nodes: Vec<NodeRecord> = from_js(nodes)?;
        to_js(&self.reconciler.auto_arrange(&nodes))
    }

    /// Place freshly generated nodes before their first write.
    ///
    /// Returns `{ placed, moved }`: write both in one transaction and the
    /// next `reconcile` has nothing to update.
    #[wasm_bindgen(js_name = placeNewChildren)]
    pub fn place_new_children(
        &self,
        visible_nodes: JsValue,
        new_nodes: JsValue,
    ) -> Result<JsValue, JsValue> {
        let visible: Vec<NodeRecord> = from_js(visible_nodes)?;
        let mut placed: Vec<NodeRecord> = from_js(new_nodes)?;
        let engine = self.reconciler.engine();
        let moved = pre_place(
            engine,
            &visible,
            &mut placed,
            engine.config().placement_epsilon,
        );
        to_js(&Placement { placed, moved })
    }

    /// Forget the reconciliation baseline (topic switch).
    pub fn reset(&mut self) {
        self.reconciler.reset();
        self.index.clear();
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Action for a DOM key press with `selected_id` focused, or `null` for
    /// keys the map ignores.
    pub fn navigate(
        &self,
        nodes: JsValue,
        selected_id: &str,
        key: &str,
    ) -> Result<JsValue, JsValue> {
        let Some(key) = NavKey::from_dom_key(key) else {
            return Ok(JsValue::NULL);
        };
        let nodes: Vec<NodeRecord> = from_js(nodes)?;
        to_js(&navigate(&nodes, &NodeId::new(selected_id), key))
    }

    // =========================================================================
    // Spatial Queries
    // =========================================================================

    /// Rebuild the hit-testing index from nodes at their stored positions.
    #[wasm_bindgen(js_name = indexNodes)]
    pub fn index_nodes(&mut self, nodes: JsValue) -> Result<u32, JsValue> {
        let nodes: Vec<NodeRecord> = from_js(nodes)?;
        self.index
            .rebuild(&nodes, self.reconciler.engine().estimator());
        Ok(self.index.len() as u32)
    }

    /// Id of the node under `(x, y)`.
    #[wasm_bindgen(js_name = nodeAt)]
    pub fn node_at(&self, x: f64, y: f64) -> Option<String> {
        self.index.node_at(x, y).map(|id| id.0.clone())
    }

    /// Id of the node nearest to `(x, y)`, optionally within a distance.
    #[wasm_bindgen(js_name = nearestNode)]
    pub fn nearest_node(&self, x: f64, y: f64, max_distance: Option<f64>) -> Option<String> {
        match max_distance {
            Some(d) => self.index.nearest_within(x, y, d),
            None => self.index.nearest(x, y),
        }
        .map(|id| id.0.clone())
    }

    /// Ids of the nodes intersecting a rectangle.
    #[wasm_bindgen(js_name = nodesInRect)]
    pub fn nodes_in_rect(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<String> {
        self.index
            .in_rect(min_x, min_y, max_x, max_y)
            .into_iter()
            .map(|id| id.0.clone())
            .collect()
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    fn node(id: &str, parent: Option<&str>) -> NodeRecord {
        NodeRecord {
            id: NodeId::new(id),
            parent_id: parent.map(NodeId::new),
            ..NodeRecord::new(Default::default(), None, id, "", Default::default())
        }
    }

    fn nodes() -> JsValue {
        to_js(&vec![
            node("R", None),
            node("A", Some("R")),
            node("B", Some("R")),
        ])
        .unwrap()
    }

    #[wasm_bindgen_test]
    fn test_partial_config() {
        let config = js_sys::JSON::parse(r#"{ "rowGap": 80 }"#).unwrap();
        let wasm = MindMapLayoutWasm::new(config).unwrap();
        let config: LayoutConfig = from_js(wasm.config().unwrap()).unwrap();
        assert_eq!(config.row_gap, 80.0);
        assert_eq!(config.column_padding, 120.0);
    }

    #[wasm_bindgen_test]
    fn test_invalid_config_throws() {
        let config = js_sys::JSON::parse(r#"{ "rowGap": 0 }"#).unwrap();
        assert!(MindMapLayoutWasm::new(config).is_err());
    }

    #[wasm_bindgen_test]
    fn test_layout_round_trip() {
        let wasm = MindMapLayoutWasm::new(JsValue::UNDEFINED).unwrap();
        let positions: Vec<LayoutPosition> = from_js(wasm.layout(nodes()).unwrap()).unwrap();
        assert_eq!(positions.len(), 3);
        assert_eq!(positions[0], LayoutPosition::new(NodeId::new("R"), 0.0, 0.0));
    }

    #[wasm_bindgen_test]
    fn test_reconcile_then_unchanged() {
        let mut wasm = MindMapLayoutWasm::new(JsValue::UNDEFINED).unwrap();
        let first = wasm.reconcile(nodes()).unwrap();
        let relaid = js_sys::Reflect::get(&first, &"relaid".into()).unwrap();
        assert_eq!(relaid.as_bool(), Some(true));

        let second = wasm.reconcile(nodes()).unwrap();
        let relaid = js_sys::Reflect::get(&second, &"relaid".into()).unwrap();
        assert_eq!(relaid.as_bool(), Some(false));
    }

    #[wasm_bindgen_test]
    fn test_navigate_ignores_unknown_keys() {
        let wasm = MindMapLayoutWasm::new(JsValue::UNDEFINED).unwrap();
        assert!(wasm.navigate(nodes(), "R", "q").unwrap().is_null());
        assert!(wasm.navigate(nodes(), "R", "ArrowRight").unwrap().is_object());
    }

    #[wasm_bindgen_test]
    fn test_hit_testing() {
        let mut wasm = MindMapLayoutWasm::new(JsValue::UNDEFINED).unwrap();
        let laid_out: Vec<NodeRecord> = {
            let positions: Vec<LayoutPosition> = from_js(wasm.layout(nodes()).unwrap()).unwrap();
            let mut records: Vec<NodeRecord> = from_js(nodes()).unwrap();
            for (record, p) in records.iter_mut().zip(positions) {
                record.x = p.x;
                record.y = p.y;
            }
            records
        };
        assert_eq!(wasm.index_nodes(to_js(&laid_out).unwrap()).unwrap(), 3);
        assert_eq!(wasm.node_at(10.0, 10.0).as_deref(), Some("R"));
    }
}
