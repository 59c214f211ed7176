//! # Node Flow Engine
//!
//! The geometry and interaction core of a node-link diagram editor: nodes
//! connected by routed edges on a pannable, zoomable canvas. The crate does no
//! rendering; adapters feed it pointer, wheel and resize input and draw what it
//! computes.
//!
//! ## Features
//!
//! - **Nested nodes** - Absolute positions and z-order resolved through parent chains
//! - **Edge paths** - Straight, bezier, simple bezier, step and smooth-step SVG paths with label anchors
//! - **Viewport** - Pan/zoom transform with zoom bounds, translate extent and animated transitions
//! - **Drag and resize** - Grid snapping, extent clamping and parent expansion
//! - **Connections** - Strict/loose validation with pluggable validators and click-to-connect
//! - **Change-sets** - Minimal add/remove/replace/select/position/dimensions deltas, in managed or controlled mode
//!
//! ## Quick Start
//!
//! ```
//! use node_flow_engine::{Edge, FlowConfig, FlowController, Node};
//!
//! let mut flow = FlowController::new(FlowConfig::default());
//! flow.set_nodes(vec![
//!     Node::new("a", 0.0, 0.0).with_size(120.0, 40.0),
//!     Node::new("b", 240.0, 120.0).with_size(120.0, 40.0),
//! ])
//! .unwrap();
//! flow.set_edges(vec![Edge::new("a-b", "a", "b")]);
//!
//! let renders = flow.edge_renders(false);
//! assert_eq!(renders.len(), 1);
//! assert!(renders[0].path.starts_with("M 60 40"));
//! ```
//!
//! ## Modules
//!
//! - [`FlowController`] - The engine object; start here
//! - [`hierarchy::resolve`] - Node hierarchy resolution
//! - [`path::compute_path`] - Edge path geometry
//! - [`viewport::Viewport`] - Pan/zoom state
//! - [`drag::NodeDrag`] / [`resize::NodeResize`] - Pointer-driven node changes
//! - [`connection::PendingConnection`] - The connection gesture
//! - [`changes`] - Change-sets and list reconciliation
//! - [`selection`] - Click and marquee selection

pub mod batch;
pub mod changes;
pub mod config;
pub mod connection;
pub mod controller;
pub mod drag;
pub mod edges;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod grid;
pub mod hierarchy;
pub mod node;
pub mod path;
pub mod registry;
pub mod resize;
pub mod selection;
pub mod tracking;
pub mod viewport;

#[cfg(feature = "slint")]
pub mod adapter;

pub use changes::{apply_edge_changes, apply_node_changes, ChangeSet, EdgeChange, NodeChange};
pub use config::{FlowConfig, FlowMode};
pub use connection::{
    CompositeValidator, ConnectionMode, ConnectionValidator, HandleRef, HandleTypeValidator, NoDuplicatesValidator,
    PredicateValidator, ValidationError, ValidationResult,
};
pub use controller::{FlowController, FlowEvent};
pub use edges::{Edge, EdgeRender};
pub use error::{FlowError, FlowIssue, IssueKind, Result};
pub use geometry::{CoordinateExtent, Dimensions, Point, Rect, Transform};
pub use graph::Connection;
pub use hierarchy::{resolve, NodeLookup};
pub use node::{HandleType, InternalNode, Node, NodeExtent, Position};
pub use path::{compute_path, EdgePath, PathVariant};
pub use selection::{SelectionManager, SelectionMode};
pub use tracking::{Measurement, MeasurementTracker};
