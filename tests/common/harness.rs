//! Test harness around a managed `FlowController`.
//!
//! Wraps the controller with issue tracking and helpers that replay the
//! pointer sequences an adapter would send.

#![allow(dead_code)]

use super::{init_tracing, IssueTracker};
use node_flow_engine::resize::ResizeControl;
use node_flow_engine::{
    Edge, EdgeChange, FlowConfig, FlowController, FlowEvent, HandleType, Node, NodeChange, Point,
};

pub struct FlowHarness {
    pub flow: FlowController,
    pub issues: IssueTracker,
    now_ms: f64,
}

impl FlowHarness {
    /// Default configuration without drag auto-pan, so pointer paths near
    /// the container edge map 1:1 to flow space.
    pub fn config() -> FlowConfig {
        FlowConfig { auto_pan_on_node_drag: false, ..Default::default() }
    }

    /// Two 100x50 nodes side by side, `a` at the origin and `b` at (300, 0).
    pub fn new() -> Self {
        Self::with_elements(
            Self::config(),
            vec![
                Node::new("a", 0.0, 0.0).with_size(100.0, 50.0),
                Node::new("b", 300.0, 0.0).with_size(100.0, 50.0),
            ],
            Vec::new(),
        )
    }

    pub fn with_elements(config: FlowConfig, nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        init_tracing();
        let issues = IssueTracker::new();
        let mut flow = FlowController::new(config);
        flow.on_issue(issues.handler());
        flow.set_nodes(nodes).expect("test nodes must resolve");
        flow.set_edges(edges);
        flow.set_container_size(800.0, 600.0);
        flow.drain_events();
        Self { flow, issues, now_ms: 0.0 }
    }

    /// Runs one frame, one tick (16 ms) after the previous.
    pub fn frame(&mut self) {
        self.now_ms += 16.0;
        self.flow.frame(self.now_ms).expect("frame must commit");
    }

    /// Presses on `id` at `from`, moves through `path` one frame per point, releases.
    pub fn drag_node(&mut self, id: &str, from: (f32, f32), path: &[(f32, f32)]) {
        self.flow
            .pointer_down_node(id, from.into(), false, None)
            .expect("node exists");
        for &point in path {
            self.flow.pointer_move(point.into());
            self.frame();
        }
        let end = path.last().copied().unwrap_or(from);
        self.flow.pointer_up(end.into()).expect("drop must commit");
    }

    pub fn resize_node(&mut self, id: &str, control: ResizeControl, from: (f32, f32), to: (f32, f32)) {
        self.flow
            .pointer_down_resize(id, control, from.into())
            .expect("node exists");
        self.flow.pointer_move(to.into());
        self.frame();
        self.flow.pointer_up(to.into()).expect("resize must commit");
    }

    pub fn marquee(&mut self, from: (f32, f32), to: (f32, f32), additive: bool) {
        self.flow.pointer_down_pane(from.into(), true, additive).unwrap();
        self.flow.pointer_move(to.into());
        self.frame();
        self.flow.pointer_up(to.into()).unwrap();
    }

    /// Drags a connection from a handle to `to` (screen space) and releases.
    pub fn connect_drag(&mut self, node: &str, handle: Option<&str>, handle_type: HandleType, from: (f32, f32), to: (f32, f32)) {
        self.flow
            .pointer_down_handle(node, handle, handle_type, from.into())
            .unwrap();
        self.flow.pointer_move(to.into());
        self.frame();
        self.flow.pointer_up(to.into()).unwrap();
    }

    pub fn position(&self, id: &str) -> Point {
        self.flow.lookup().get(id).expect("node exists").position_absolute
    }

    pub fn local_position(&self, id: &str) -> Point {
        self.flow.lookup().get(id).expect("node exists").node.position
    }

    pub fn selected_nodes(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .flow
            .nodes()
            .iter()
            .filter(|node| node.selected)
            .map(|node| node.id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn selected_edges(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .flow
            .edges()
            .iter()
            .filter(|edge| edge.selected)
            .map(|edge| edge.id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Drains events and returns all node changes, in order.
    pub fn node_changes(&mut self) -> Vec<NodeChange> {
        self.flow
            .drain_events()
            .into_iter()
            .filter_map(|event| match event {
                FlowEvent::NodesChanged(changes) => Some(changes),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Drains events and returns all edge changes, in order.
    pub fn edge_changes(&mut self) -> Vec<EdgeChange> {
        self.flow
            .drain_events()
            .into_iter()
            .filter_map(|event| match event {
                FlowEvent::EdgesChanged(changes) => Some(changes),
                _ => None,
            })
            .flatten()
            .collect()
    }
}
