//! The engine object.
//!
//! [`FlowController`] owns the node and edge lists, the derived lookup, the
//! viewport and the state of the active pointer gesture. Adapters feed it raw
//! input and read back geometry and change events.
//!
//! All mutations go through one commit step: interaction code produces a
//! [`ChangeSet`], and the commit applies it (managed mode) and re-resolves the
//! hierarchy, or only emits it (controlled mode). Pointer moves are parked and
//! processed on the next [`frame`](FlowController::frame), so any number of
//! moves between two frames costs one geometry update.
//!
//! # Example
//!
//! ```
//! use node_flow_engine::{FlowConfig, FlowController, FlowEvent, Node, Point};
//!
//! let mut flow = FlowController::new(FlowConfig::default());
//! flow.set_container_size(800.0, 600.0);
//! flow.set_nodes(vec![Node::new("a", 200.0, 200.0).with_size(100.0, 40.0)]).unwrap();
//!
//! flow.pointer_down_node("a", Point::new(210.0, 210.0), false, None).unwrap();
//! flow.pointer_move(Point::new(260.0, 230.0));
//! flow.frame(16.0).unwrap();
//! flow.pointer_up(Point::new(260.0, 230.0)).unwrap();
//!
//! assert_eq!(flow.lookup().get("a").unwrap().position_absolute, Point::new(250.0, 220.0));
//! assert!(flow
//!     .drain_events()
//!     .iter()
//!     .any(|event| matches!(event, FlowEvent::NodesChanged(_))));
//! ```

use crate::batch::PendingBatch;
use crate::changes::{apply_edge_changes, apply_node_changes, diff_edges, diff_nodes, ChangeSet, EdgeChange, NodeChange};
use crate::config::{FlowConfig, FlowMode};
use crate::connection::{
    handle_anchor, ConnectionContext, ConnectionState, ConnectionValidator, HandleRef, PendingConnection,
    ValidationError, ValidationResult,
};
use crate::drag::NodeDrag;
use crate::edges::{compute_edge_renders, Edge, EdgeRender, EdgeRenderContext};
use crate::error::{Diagnostics, FlowError, FlowIssue, Result};
use crate::geometry::{Dimensions, Point, Rect, Transform};
use crate::graph::{connection_exists, edge_id, get_elements_to_remove, reconnect_edge, Connection, Removal};
use crate::hierarchy::{resolve, NodeLookup};
use crate::hit_test::{find_edge_at, find_handle_at, find_node_at, DEFAULT_EDGE_HIT_DISTANCE, DEFAULT_HANDLE_HIT_RADIUS};
use crate::node::{HandleType, Node};
use crate::path::EdgePath;
use crate::registry::{EdgeTypeRegistry, NodeTypeRegistry};
use crate::resize::{NodeResize, ResizeControl};
use crate::selection::{select_all, unselect_all, Marquee, SelectionManager};
use crate::tracking::{Measurement, MeasurementTracker};
use crate::viewport::{calc_auto_pan, Viewport, ViewportPatch, WheelEvent};

/// Something observers of the controller need to know about.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    NodesChanged(Vec<NodeChange>),
    EdgesChanged(Vec<EdgeChange>),
    /// A connection gesture produced a new edge.
    Connect(Connection),
    ViewportChanged(Transform),
}

/// The pointer gesture in progress.
#[derive(Debug, Default)]
enum Gesture {
    #[default]
    Idle,
    Drag(NodeDrag),
    Resize(NodeResize),
    /// Dragging from a handle; the state lives in `FlowController::connection`.
    Connect,
    Marquee(Marquee),
    Pan {
        last: Point,
        moved: bool,
    },
}

/// Explicit engine instance, one per diagram.
pub struct FlowController {
    config: FlowConfig,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    lookup: NodeLookup,
    viewport: Viewport,
    edge_types: EdgeTypeRegistry,
    node_types: NodeTypeRegistry,
    validator: Option<Box<dyn ConnectionValidator>>,
    diagnostics: Diagnostics,
    gesture: Gesture,
    connection: ConnectionState,
    pointer: PendingBatch<Point>,
    changes: PendingBatch<ChangeSet>,
    measurements: MeasurementTracker,
    events: Vec<FlowEvent>,
}

impl Default for FlowController {
    fn default() -> Self {
        Self::new(FlowConfig::default())
    }
}

impl FlowController {
    /// Creates an empty diagram.
    ///
    /// Inconsistent configuration values are repaired and logged.
    pub fn new(mut config: FlowConfig) -> Self {
        let mut diagnostics = Diagnostics::new();
        diagnostics.report_all(config.validate());

        let mut viewport = Viewport::new(
            config.default_viewport,
            config.min_zoom,
            config.max_zoom,
            config.translate_extent.unwrap_or_default(),
        );
        viewport.set_container_size(config.fallback_container_size, config.fallback_container_size);

        Self {
            config,
            nodes: Vec::new(),
            edges: Vec::new(),
            lookup: NodeLookup::default(),
            viewport,
            edge_types: EdgeTypeRegistry::default(),
            node_types: NodeTypeRegistry::default(),
            validator: None,
            diagnostics,
            gesture: Gesture::Idle,
            connection: ConnectionState::Idle,
            pointer: PendingBatch::new(),
            changes: PendingBatch::new(),
            measurements: MeasurementTracker::new(),
            events: Vec::new(),
        }
    }

    // === Setup ===

    /// Installs the structured issue callback.
    pub fn on_issue(&mut self, handler: impl FnMut(&FlowIssue) + 'static) {
        self.diagnostics.set_handler(Box::new(handler));
    }

    /// Installs a validator consulted after the built-in connection rules.
    pub fn set_validator(&mut self, validator: impl ConnectionValidator + 'static) {
        self.validator = Some(Box::new(validator));
    }

    pub fn edge_types_mut(&mut self) -> &mut EdgeTypeRegistry {
        &mut self.edge_types
    }

    pub fn node_types_mut(&mut self) -> &mut NodeTypeRegistry {
        &mut self.node_types
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Replaces the node list, returning the minimal diff against the previous one.
    ///
    /// A pure reorder has an empty diff but is still taken over, since input
    /// order breaks render order ties. On a broken parent chain the previous
    /// list stays in place.
    pub fn set_nodes(&mut self, nodes: Vec<Node>) -> Result<Vec<NodeChange>> {
        let diff = diff_nodes(&self.nodes, &nodes);
        if diff.is_empty() && same_order(&self.nodes, &nodes, |node| &node.id) {
            return Ok(diff);
        }
        let lookup = self.resolve_nodes(&nodes)?;
        tracing::debug!(nodes = nodes.len(), changes = diff.len(), "node list replaced");
        self.nodes = nodes;
        self.lookup = lookup;
        Ok(diff)
    }

    /// Replaces the edge list, returning the minimal diff against the previous one.
    pub fn set_edges(&mut self, edges: Vec<Edge>) -> Vec<EdgeChange> {
        let diff = diff_edges(&self.edges, &edges);
        if !diff.is_empty() || !same_order(&self.edges, &edges, |edge| &edge.id) {
            tracing::debug!(edges = edges.len(), changes = diff.len(), "edge list replaced");
            self.edges = edges;
        }
        diff
    }

    // === State ===

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn lookup(&self) -> &NodeLookup {
        &self.lookup
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn transform(&self) -> Transform {
        self.viewport.transform()
    }

    /// Takes every event emitted since the last call.
    pub fn drain_events(&mut self) -> Vec<FlowEvent> {
        std::mem::take(&mut self.events)
    }

    /// True while a pointer gesture is active.
    pub fn is_gesture_active(&self) -> bool {
        !matches!(self.gesture, Gesture::Idle)
    }

    pub fn connection_state(&self) -> &ConnectionState {
        &self.connection
    }

    /// The in-progress connection, for handle highlighting.
    pub fn pending_connection(&self) -> Option<&PendingConnection> {
        self.connection.pending()
    }

    /// Path from the origin handle to the pointer or the snapped candidate.
    pub fn connection_line(&self) -> Option<EdgePath> {
        self.connection
            .line_path(self.config.connection_line_type, &self.config.default_edge_options)
    }

    /// Marquee rectangle in screen space.
    pub fn marquee_rect(&self) -> Option<Rect> {
        match &self.gesture {
            Gesture::Marquee(marquee) => Some(marquee.rect()),
            _ => None,
        }
    }

    /// Render geometry of every visible edge, in z order.
    ///
    /// With `only_visible`, edges entirely outside the viewport are skipped.
    pub fn edge_renders(&mut self, only_visible: bool) -> Vec<EdgeRender> {
        let mut issues = Vec::new();
        let context = EdgeRenderContext {
            edge_types: &self.edge_types,
            node_types: &self.node_types,
            connection_mode: self.config.connection_mode,
            elevate_on_select: self.config.elevate_edges_on_select,
            default_edge_type: &self.config.default_edge_type,
            visible_rect: only_visible.then(|| self.viewport.visible_flow_rect()),
        };
        let renders = compute_edge_renders(&self.edges, &self.lookup, &context, &mut issues);
        self.diagnostics.report_all(issues);
        renders
    }

    // === Hit testing (screen space) ===

    pub fn node_at(&self, screen: Point) -> Option<&str> {
        let flow = self.viewport.screen_to_flow(screen, None);
        find_node_at(flow, &self.lookup).map(|node| node.id())
    }

    pub fn handle_at(&mut self, screen: Point) -> Option<HandleRef> {
        let flow = self.viewport.screen_to_flow(screen, None);
        let radius = DEFAULT_HANDLE_HIT_RADIUS / self.viewport.zoom();
        let mut issues = Vec::new();
        let found = find_handle_at(flow, &self.lookup, &self.node_types, radius, &mut issues);
        self.diagnostics.report_all(issues);
        found
    }

    pub fn edge_at(&mut self, screen: Point) -> Option<String> {
        let flow = self.viewport.screen_to_flow(screen, None);
        let tolerance = DEFAULT_EDGE_HIT_DISTANCE / self.viewport.zoom();
        let renders = self.edge_renders(false);
        find_edge_at(flow, &renders, tolerance).map(str::to_owned)
    }

    // === Viewport ===

    /// Records the container size; a zero size falls back to the configured default.
    pub fn set_container_size(&mut self, width: f32, height: f32) {
        let before = self.viewport.transform();
        if let Some(issue) = self
            .viewport
            .set_container_size(Dimensions::new(width, height), self.config.fallback_container_size)
        {
            self.diagnostics.report(issue);
        }
        self.viewport_changed_from(before);
    }

    pub fn set_viewport(&mut self, patch: ViewportPatch, duration_ms: f64) {
        if self.viewport.set_viewport(patch, duration_ms) {
            self.push_viewport_event();
        }
    }

    pub fn pan_by(&mut self, delta: Point) {
        if self.viewport.pan_by(delta) {
            self.push_viewport_event();
        }
    }

    pub fn zoom_by(&mut self, factor: f32, anchor: Option<Point>) {
        if self.viewport.scale_by(factor, anchor) {
            self.push_viewport_event();
        }
    }

    pub fn wheel(&mut self, event: &WheelEvent) {
        if self.viewport.handle_wheel(event, &self.config.wheel_options()) {
            self.push_viewport_event();
        }
    }

    /// Fits all visible nodes into the container.
    ///
    /// Returns `false` when there is nothing to fit.
    pub fn fit_view(&mut self, duration_ms: f64) -> bool {
        let Some(bounds) = self.lookup.visible_bounds() else {
            return false;
        };
        let (changed, issue) = self.viewport.fit_bounds(&bounds, self.config.fit_view_padding, duration_ms);
        if let Some(issue) = issue {
            self.diagnostics.report(issue);
        }
        if changed {
            self.push_viewport_event();
        }
        true
    }

    // === Measurement ===

    /// Queues a size (and optionally handle) measurement for the next frame.
    pub fn report_measurement(&self, measurement: Measurement) {
        self.measurements.report(measurement);
    }

    /// Callback `(node_id, width, height)` for resize observers.
    pub fn measurement_callback(&self) -> impl Fn(&str, f32, f32) + Clone {
        self.measurements.size_callback()
    }

    // === Selection ===

    /// Click selection of a node; `multi` toggles instead of replacing.
    pub fn click_node(&mut self, id: &str, multi: bool) -> Result<()> {
        let node = self.lookup.get(id).ok_or_else(|| FlowError::NodeNotFound(id.to_string()))?;
        if !self.config.elements_selectable || !node.node.is_selectable(true) {
            return Ok(());
        }
        let changes = self.selection_changes(Some(id), None, multi);
        self.commit(changes)
    }

    /// Click selection of an edge; `multi` toggles instead of replacing.
    pub fn click_edge(&mut self, id: &str, multi: bool) -> Result<()> {
        let Some(edge) = self.edges.iter().find(|edge| edge.id == id) else {
            return Ok(());
        };
        if !self.config.elements_selectable || !edge.is_selectable(self.config.edges_selectable) {
            return Ok(());
        }
        let changes = self.selection_changes(None, Some(id), multi);
        self.commit(changes)
    }

    pub fn select_all(&mut self) -> Result<()> {
        let changes = select_all(
            &self.lookup,
            &self.edges,
            self.config.elements_selectable,
            self.config.elements_selectable && self.config.edges_selectable,
        );
        self.commit(changes)
    }

    pub fn unselect_all(&mut self) -> Result<()> {
        let changes = unselect_all(&self.lookup, &self.edges);
        self.commit(changes)
    }

    /// Removes the selected nodes and edges, plus descendants and touching edges.
    pub fn delete_selected(&mut self) -> Result<Removal> {
        let nodes: Vec<String> = self.nodes.iter().filter(|n| n.selected).map(|n| n.id.clone()).collect();
        let edges: Vec<String> = self.edges.iter().filter(|e| e.selected).map(|e| e.id.clone()).collect();
        self.delete_elements(nodes.iter().map(String::as_str), edges.iter().map(String::as_str))
    }

    /// Removes the given nodes and edges, plus descendants and touching edges.
    pub fn delete_elements<'n, 'e>(
        &mut self,
        nodes: impl IntoIterator<Item = &'n str>,
        edges: impl IntoIterator<Item = &'e str>,
    ) -> Result<Removal> {
        let removal = get_elements_to_remove(&self.lookup, &self.edges, nodes, edges);
        if removal.is_empty() {
            return Ok(removal);
        }
        let changes = ChangeSet {
            nodes: removal.nodes.iter().map(|id| NodeChange::Remove { id: id.clone() }).collect(),
            edges: removal.edges.iter().map(|id| EdgeChange::Remove { id: id.clone() }).collect(),
        };
        tracing::debug!(nodes = removal.nodes.len(), edges = removal.edges.len(), "elements removed");
        self.commit(changes)?;
        Ok(removal)
    }

    // === Connections ===

    /// Adds the edge for `connection` unless the same handles are already joined.
    ///
    /// Returns `false` for a suppressed duplicate, which is reported as a
    /// `ConstraintViolation`. In controlled mode only [`FlowEvent::Connect`] is
    /// emitted; the owner adds the edge.
    pub fn connect(&mut self, connection: Connection) -> Result<bool> {
        if connection_exists(&connection, &self.edges) {
            self.diagnostics.report(
                FlowIssue::from(ValidationError::DuplicateConnection).with_id(edge_id(&connection)),
            );
            return Ok(false);
        }
        tracing::debug!(source = %connection.source, target = %connection.target, "connected");
        let edge = connection.to_edge();
        self.events.push(FlowEvent::Connect(connection));
        if self.config.mode == FlowMode::Managed {
            self.commit(vec![EdgeChange::Add { item: edge, index: None }].into())?;
        }
        Ok(true)
    }

    /// Moves an existing edge onto new handles.
    pub fn reconnect(&mut self, old_id: &str, connection: &Connection) -> Result<bool> {
        let mut edges = self.edges.clone();
        let Some(edge) = reconnect_edge(old_id, connection, false, &mut edges) else {
            return Ok(false);
        };
        let changes = vec![
            EdgeChange::Remove { id: old_id.to_string() },
            EdgeChange::Add { item: edge, index: None },
        ];
        self.commit(changes.into())?;
        Ok(true)
    }

    /// Click-to-connect: the first click arms a handle, the second connects.
    ///
    /// Clicking the armed handle again disarms it.
    pub fn click_handle(&mut self, node_id: &str, handle_id: Option<&str>, handle_type: HandleType) -> Result<()> {
        let handle = HandleRef::new(node_id, handle_id, handle_type);
        match std::mem::take(&mut self.connection) {
            ConnectionState::ClickPending(pending) => {
                if pending.from == handle {
                    tracing::debug!("click connection disarmed");
                    return Ok(());
                }
                let result = pending.connect_to(&handle, &self.connection_context());
                match result {
                    Ok(connection) => {
                        self.connect(connection)?;
                    }
                    Err(err) => self.diagnostics.report(err.into()),
                }
                Ok(())
            }
            _ => {
                let pointer = self.handle_anchor_or_origin(&handle);
                if let Some(pending) = self.begin_connection(handle, pointer) {
                    self.connection = ConnectionState::ClickPending(pending);
                }
                Ok(())
            }
        }
    }

    // === Pointer gestures ===

    /// Pointer-down on a node body.
    ///
    /// `scope` names the sub-region the adapter hit, matched against the
    /// node's drag handle.
    pub fn pointer_down_node(&mut self, id: &str, screen: Point, multi: bool, scope: Option<&str>) -> Result<()> {
        self.end_gesture()?;
        let node = self.lookup.get(id).ok_or_else(|| FlowError::NodeNotFound(id.to_string()))?;
        if !node.node.accepts_drag_from(scope) {
            return Ok(());
        }

        let was_selected = node.node.selected;
        let select_on_drag = self.config.select_nodes_on_drag
            && self.config.elements_selectable
            && node.node.is_selectable(true);
        if select_on_drag && !was_selected {
            let changes = self.selection_changes(Some(id), None, multi);
            self.commit(changes)?;
        }
        let include_selected = was_selected || (select_on_drag && multi);

        let flow = self.viewport.screen_to_flow(screen, None);
        if let Some(drag) = NodeDrag::new(&self.lookup, id, flow, screen, include_selected, &self.config.drag_options()) {
            self.gesture = Gesture::Drag(drag);
        }
        Ok(())
    }

    /// Pointer-down on a handle starts a connection drag.
    ///
    /// While a click-to-connect handle is armed the press belongs to the
    /// click and no drag starts.
    pub fn pointer_down_handle(
        &mut self,
        node_id: &str,
        handle_id: Option<&str>,
        handle_type: HandleType,
        screen: Point,
    ) -> Result<()> {
        self.end_gesture()?;
        if matches!(self.connection, ConnectionState::ClickPending(_)) {
            return Ok(());
        }
        let flow = self.viewport.screen_to_flow(screen, None);
        if let Some(pending) = self.begin_connection(HandleRef::new(node_id, handle_id, handle_type), flow) {
            self.connection = ConnectionState::Pending(pending);
            self.gesture = Gesture::Connect;
        }
        Ok(())
    }

    /// Pointer-down on empty canvas: a marquee when `select` is set, else a pan.
    ///
    /// An `additive` marquee keeps the current selection.
    pub fn pointer_down_pane(&mut self, screen: Point, select: bool, additive: bool) -> Result<()> {
        self.cancel_gesture()?;
        self.gesture = if select && self.config.elements_selectable {
            Gesture::Marquee(Marquee::new(screen, additive, &self.lookup, &self.edges))
        } else {
            Gesture::Pan { last: screen, moved: false }
        };
        Ok(())
    }

    /// Pointer-down on one of a node's resize controls.
    pub fn pointer_down_resize(&mut self, id: &str, control: ResizeControl, screen: Point) -> Result<()> {
        self.end_gesture()?;
        let flow = self.viewport.screen_to_flow(screen, None);
        let resize = NodeResize::new(&self.lookup, id, control, flow, &self.config.resize_options())
            .ok_or_else(|| FlowError::NodeNotFound(id.to_string()))?;
        self.gesture = Gesture::Resize(resize);
        Ok(())
    }

    /// Parks the latest pointer position for the next frame.
    ///
    /// Returns `true` if a frame must be requested.
    pub fn pointer_move(&mut self, screen: Point) -> bool {
        let needs_work = self.is_gesture_active() || self.connection.pending().is_some();
        needs_work && self.pointer.replace(screen)
    }

    /// Ends the active gesture at `screen`.
    pub fn pointer_up(&mut self, screen: Point) -> Result<()> {
        self.pointer.clear();
        self.process_pointer(screen);

        let mut finish = ChangeSet::default();
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => {}
            Gesture::Drag(drag) => finish.nodes = drag.finish(),
            Gesture::Resize(resize) => finish.nodes = resize.finish(),
            Gesture::Connect => {
                if let ConnectionState::Pending(pending) = std::mem::take(&mut self.connection) {
                    self.finish_connection(pending)?;
                }
            }
            Gesture::Marquee(marquee) => {
                let rect = marquee.rect();
                if rect.width == 0.0 && rect.height == 0.0 {
                    finish = self.pane_click_changes();
                }
            }
            Gesture::Pan { moved, .. } => {
                if !moved {
                    finish = self.pane_click_changes();
                }
            }
        }

        self.changes.push_changes(finish);
        self.flush_changes()
    }

    /// Aborts the active gesture.
    ///
    /// Positions already emitted by a drag or resize stay; only the
    /// `dragging`/`resizing` flags are reset. A pointer sample not yet
    /// processed is dropped.
    ///
    /// An armed click-to-connect handle is disarmed as well.
    pub fn cancel_gesture(&mut self) -> Result<()> {
        self.end_gesture()?;
        self.connection = ConnectionState::Idle;
        Ok(())
    }

    /// Processes everything queued since the last frame.
    ///
    /// Advances viewport transitions, the parked pointer sample, drag
    /// auto-pan and measurements, then commits all resulting changes as one
    /// change-set.
    pub fn frame(&mut self, now_ms: f64) -> Result<()> {
        if self.viewport.tick(now_ms) {
            self.push_viewport_event();
        }
        if let Some(screen) = self.pointer.take() {
            self.process_pointer(screen);
        }
        self.auto_pan();

        let mut issues = Vec::new();
        let flush = self.measurements.flush(&mut self.lookup, self.config.min_node_size, &mut issues);
        self.diagnostics.report_all(issues);
        if flush.handles_updated {
            tracing::trace!("handle bounds updated");
        }
        self.changes.push_changes(flush.changes.into());

        self.flush_changes()
    }

    // === Internals ===

    fn end_gesture(&mut self) -> Result<()> {
        self.pointer.clear();
        let mut finish = ChangeSet::default();
        match std::mem::take(&mut self.gesture) {
            Gesture::Drag(drag) => finish.nodes = drag.finish(),
            Gesture::Resize(resize) => finish.nodes = resize.finish(),
            Gesture::Connect => self.connection = ConnectionState::Idle,
            Gesture::Idle | Gesture::Marquee(_) | Gesture::Pan { .. } => {}
        }
        self.changes.push_changes(finish);
        self.flush_changes()
    }

    fn process_pointer(&mut self, screen: Point) {
        let flow = self.viewport.screen_to_flow(screen, None);
        if self.connection.pending().is_some() {
            self.update_connection(flow);
        }

        match &mut self.gesture {
            Gesture::Idle | Gesture::Connect => {}
            Gesture::Drag(drag) => {
                let changes = drag.update(&self.lookup, flow, screen, &self.config.drag_options());
                self.changes.push_changes(changes.into());
            }
            Gesture::Resize(resize) => {
                let changes = resize.update(&self.lookup, flow, &self.config.resize_options());
                self.changes.push_changes(changes.into());
            }
            Gesture::Marquee(marquee) => {
                let changes = marquee.update(
                    screen,
                    &self.lookup,
                    &self.edges,
                    &self.viewport.transform(),
                    &self.config.marquee_options(),
                );
                self.changes.push_changes(changes);
            }
            Gesture::Pan { last, moved } => {
                let delta = screen - *last;
                *last = screen;
                if delta != Point::ZERO {
                    *moved = true;
                    if self.viewport.pan_by(delta) {
                        self.events.push(FlowEvent::ViewportChanged(self.viewport.transform()));
                    }
                }
            }
        }
    }

    /// Pans while a started drag holds the pointer near the container edge.
    fn auto_pan(&mut self) {
        if !self.config.auto_pan_on_node_drag {
            return;
        }
        let Gesture::Drag(drag) = &self.gesture else {
            return;
        };
        if !drag.is_started() {
            return;
        }
        let screen = drag.last_screen();
        let step = calc_auto_pan(
            screen,
            self.viewport.container(),
            self.config.auto_pan_speed,
            self.config.auto_pan_distance(),
        );
        if step != Point::ZERO && self.viewport.pan_by(step) {
            tracing::trace!(x = step.x, y = step.y, "auto-pan");
            self.push_viewport_event();
            self.process_pointer(screen);
        }
    }

    fn connection_context(&self) -> ConnectionContext<'_> {
        ConnectionContext {
            lookup: &self.lookup,
            node_types: &self.node_types,
            edges: &self.edges,
            mode: self.config.connection_mode,
            radius: self.config.connection_radius,
            nodes_connectable: self.config.nodes_connectable,
            validator: self.validator.as_deref(),
        }
    }

    fn begin_connection(&mut self, from: HandleRef, pointer: Point) -> Option<PendingConnection> {
        let mut issues = Vec::new();
        let result = PendingConnection::begin(from, pointer, &self.connection_context(), &mut issues);
        self.diagnostics.report_all(issues);
        match result {
            Ok(pending) => Some(pending),
            Err(err) => {
                self.diagnostics.report(err.into());
                None
            }
        }
    }

    fn update_connection(&mut self, pointer: Point) {
        let mut state = std::mem::take(&mut self.connection);
        let mut issues = Vec::new();
        if let Some(pending) = state.pending_mut() {
            pending.update(pointer, &self.connection_context(), &mut issues);
        }
        self.connection = state;
        self.diagnostics.report_all(issues);
    }

    fn finish_connection(&mut self, pending: PendingConnection) -> Result<()> {
        if let Some(connection) = pending.connection() {
            self.connect(connection)?;
        } else if let Some(ValidationResult::Invalid(err)) = pending.result {
            self.diagnostics.report(err.into());
        } else {
            tracing::debug!("connection dropped on empty canvas");
        }
        Ok(())
    }

    fn handle_anchor_or_origin(&mut self, handle: &HandleRef) -> Point {
        let mut issues = Vec::new();
        let anchor = handle_anchor(handle, &self.lookup, &self.node_types, &mut issues);
        self.diagnostics.report_all(issues);
        anchor.map(|(point, _)| point).unwrap_or(Point::ZERO)
    }

    /// Click selection changes; a non-`multi` click clears the other kind.
    fn selection_changes(&self, node: Option<&str>, edge: Option<&str>, multi: bool) -> ChangeSet {
        let mut nodes = SelectionManager::from_ids(self.nodes.iter().filter(|n| n.selected).map(|n| n.id.as_str()));
        let mut edges = SelectionManager::from_ids(self.edges.iter().filter(|e| e.selected).map(|e| e.id.as_str()));
        if let Some(id) = node {
            nodes.handle_interaction(id, multi);
            if !multi {
                edges.clear();
            }
        }
        if let Some(id) = edge {
            edges.handle_interaction(id, multi);
            if !multi {
                nodes.clear();
            }
        }
        ChangeSet {
            nodes: nodes.node_changes(&self.lookup),
            edges: edges.edge_changes(&self.edges),
        }
    }

    fn pane_click_changes(&self) -> ChangeSet {
        if self.config.elements_selectable {
            unselect_all(&self.lookup, &self.edges)
        } else {
            ChangeSet::default()
        }
    }

    fn flush_changes(&mut self) -> Result<()> {
        match self.changes.take() {
            Some(changes) => self.commit(changes),
            None => Ok(()),
        }
    }

    /// The single write path.
    ///
    /// The change-set is applied as a whole or not at all.
    fn commit(&mut self, changes: ChangeSet) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }
        if self.config.mode == FlowMode::Managed {
            if !changes.nodes.is_empty() {
                let nodes = apply_node_changes(&changes.nodes, &self.nodes);
                let lookup = self.resolve_nodes(&nodes)?;
                self.nodes = nodes;
                self.lookup = lookup;
            }
            if !changes.edges.is_empty() {
                self.edges = apply_edge_changes(&changes.edges, &self.edges);
            }
        }
        tracing::trace!(nodes = changes.nodes.len(), edges = changes.edges.len(), "changes committed");
        if !changes.nodes.is_empty() {
            self.events.push(FlowEvent::NodesChanged(changes.nodes));
        }
        if !changes.edges.is_empty() {
            self.events.push(FlowEvent::EdgesChanged(changes.edges));
        }
        Ok(())
    }

    fn resolve_nodes(&mut self, nodes: &[Node]) -> Result<NodeLookup> {
        resolve(nodes, Some(&self.lookup), &self.config.resolve_options()).map_err(|err| {
            self.diagnostics.report(FlowIssue::from(&err));
            err
        })
    }

    fn push_viewport_event(&mut self) {
        self.events.push(FlowEvent::ViewportChanged(self.viewport.transform()));
    }

    fn viewport_changed_from(&mut self, before: Transform) {
        if self.viewport.transform() != before {
            self.push_viewport_event();
        }
    }
}

impl std::fmt::Debug for FlowController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowController")
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edges.len())
            .field("transform", &self.viewport.transform())
            .field("gesture", &self.gesture)
            .field("mode", &self.config.mode)
            .finish()
    }
}

fn same_order<T>(current: &[T], next: &[T], id: impl Fn(&T) -> &String) -> bool {
    current.len() == next.len() && current.iter().map(&id).eq(next.iter().map(&id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IssueKind;
    use crate::node::NodeExtent;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn controller() -> FlowController {
        let config = FlowConfig { auto_pan_on_node_drag: false, ..Default::default() };
        let mut flow = FlowController::new(config);
        flow.set_nodes(vec![
            Node::new("a", 0.0, 0.0).with_size(100.0, 50.0),
            Node::new("b", 300.0, 0.0).with_size(100.0, 50.0),
        ])
        .unwrap();
        flow
    }

    fn node_changes(events: &[FlowEvent]) -> Vec<NodeChange> {
        events
            .iter()
            .filter_map(|event| match event {
                FlowEvent::NodesChanged(changes) => Some(changes.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    // ========================================================================
    // Setup
    // ========================================================================

    #[test]
    fn test_set_nodes_returns_diff() {
        let mut flow = controller();
        let diff = flow
            .set_nodes(vec![Node::new("a", 0.0, 0.0).with_size(100.0, 50.0), Node::new("c", 1.0, 1.0)])
            .unwrap();
        assert_eq!(diff.len(), 2);
        assert!(flow.lookup().contains("c"));
        assert!(!flow.lookup().contains("b"));
    }

    #[test]
    fn test_set_nodes_takes_reordered_list() {
        let mut flow = controller();
        let mut reversed = flow.nodes().to_vec();
        reversed.reverse();

        assert!(flow.set_nodes(reversed).unwrap().is_empty());
        assert_eq!(flow.nodes()[0].id, "b");
        let order: Vec<&str> = flow.lookup().render_order().iter().map(|node| node.id()).collect();
        assert_eq!(order, vec!["b", "a"]);
    }

    #[test]
    fn test_set_edges_takes_reordered_list() {
        let mut flow = controller();
        flow.set_edges(vec![Edge::new("ab", "a", "b"), Edge::new("ba", "b", "a")]);
        assert!(flow.set_edges(vec![Edge::new("ba", "b", "a"), Edge::new("ab", "a", "b")]).is_empty());

        let ids: Vec<String> = flow.edge_renders(false).into_iter().map(|render| render.id).collect();
        assert_eq!(ids, vec!["ba", "ab"]);
    }

    #[test]
    fn test_set_nodes_rejects_missing_parent() {
        let mut flow = controller();
        let issues = Rc::new(RefCell::new(Vec::new()));
        let sink = issues.clone();
        flow.on_issue(move |issue| sink.borrow_mut().push(issue.clone()));

        let result = flow.set_nodes(vec![Node::new("x", 0.0, 0.0).with_parent("ghost")]);
        assert!(matches!(result, Err(FlowError::MissingParent { .. })));
        assert_eq!(flow.nodes().len(), 2);
        assert_eq!(issues.borrow().len(), 1);
        assert_eq!(issues.borrow()[0].kind, IssueKind::FatalConfiguration);
    }

    // ========================================================================
    // Drag
    // ========================================================================

    #[test]
    fn test_moves_coalesce_per_frame() {
        let mut flow = controller();
        flow.pointer_down_node("a", Point::new(10.0, 10.0), false, None).unwrap();
        assert!(flow.pointer_move(Point::new(20.0, 10.0)));
        assert!(!flow.pointer_move(Point::new(30.0, 10.0)));
        flow.frame(16.0).unwrap();

        let events = flow.drain_events();
        let positions: Vec<_> = node_changes(&events)
            .into_iter()
            .filter(|change| matches!(change, NodeChange::Position { .. }))
            .collect();
        assert_eq!(positions.len(), 1);
        assert_eq!(flow.lookup().get("a").unwrap().position_absolute, Point::new(20.0, 0.0));
        assert!(flow.nodes()[0].selected);
        assert!(flow.nodes()[0].dragging);

        flow.pointer_up(Point::new(30.0, 10.0)).unwrap();
        assert!(!flow.nodes()[0].dragging);
        assert!(!flow.is_gesture_active());
    }

    #[test]
    fn test_cancel_keeps_last_position() {
        let mut flow = controller();
        flow.pointer_down_node("a", Point::new(10.0, 10.0), false, None).unwrap();
        flow.pointer_move(Point::new(40.0, 10.0));
        flow.frame(16.0).unwrap();
        flow.pointer_move(Point::new(90.0, 10.0));
        flow.cancel_gesture().unwrap();

        assert_eq!(flow.lookup().get("a").unwrap().position_absolute, Point::new(30.0, 0.0));
        assert!(!flow.nodes()[0].dragging);
    }

    #[test]
    fn test_drag_clamps_to_parent() {
        let mut flow = FlowController::default();
        let mut child = Node::new("b", 20.0, 20.0).with_size(30.0, 30.0).with_parent("a");
        child.extent = Some(NodeExtent::Parent);
        flow.set_nodes(vec![Node::new("a", 0.0, 0.0).with_size(100.0, 100.0), child]).unwrap();

        flow.pointer_down_node("b", Point::new(30.0, 30.0), false, None).unwrap();
        flow.pointer_move(Point::new(-20.0, -20.0));
        flow.pointer_up(Point::new(-20.0, -20.0)).unwrap();

        let b = flow.lookup().get("b").unwrap();
        assert_eq!(b.position_absolute, Point::ZERO);
        assert_eq!(b.node.position, Point::ZERO);
    }

    #[test]
    fn test_drag_handle_scope() {
        let mut flow = controller();
        let mut nodes = flow.nodes().to_vec();
        nodes[0].drag_handle = Some("header".into());
        flow.set_nodes(nodes).unwrap();

        flow.pointer_down_node("a", Point::new(10.0, 10.0), false, Some("body")).unwrap();
        assert!(!flow.is_gesture_active());
        flow.pointer_down_node("a", Point::new(10.0, 10.0), false, Some("header")).unwrap();
        assert!(flow.is_gesture_active());
    }

    #[test]
    fn test_controlled_mode_only_emits() {
        let config = FlowConfig { mode: FlowMode::Controlled, ..Default::default() };
        let mut flow = FlowController::new(config);
        flow.set_nodes(vec![Node::new("a", 0.0, 0.0).with_size(10.0, 10.0)]).unwrap();
        flow.click_node("a", false).unwrap();

        assert!(!flow.nodes()[0].selected);
        assert_eq!(node_changes(&flow.drain_events()), vec![NodeChange::select("a", true)]);
    }

    // ========================================================================
    // Selection
    // ========================================================================

    #[test]
    fn test_click_node_replaces_selection() {
        let mut flow = controller();
        flow.click_node("a", false).unwrap();
        flow.click_node("b", false).unwrap();
        assert!(!flow.nodes()[0].selected);
        assert!(flow.nodes()[1].selected);

        flow.click_node("a", true).unwrap();
        assert!(flow.nodes()[0].selected && flow.nodes()[1].selected);

        flow.drain_events();
        flow.click_node("a", true).unwrap();
        assert_eq!(node_changes(&flow.drain_events()), vec![NodeChange::select("a", false)]);
    }

    #[test]
    fn test_pane_click_clears_selection() {
        let mut flow = controller();
        flow.select_all().unwrap();
        flow.pointer_down_pane(Point::new(200.0, 200.0), false, false).unwrap();
        flow.pointer_up(Point::new(200.0, 200.0)).unwrap();
        assert!(flow.nodes().iter().all(|node| !node.selected));
    }

    #[test]
    fn test_marquee_selects_and_reports_rect() {
        let mut flow = controller();
        flow.pointer_down_pane(Point::new(-10.0, -10.0), true, false).unwrap();
        flow.pointer_move(Point::new(150.0, 100.0));
        flow.frame(16.0).unwrap();
        assert_eq!(flow.marquee_rect(), Some(Rect::new(-10.0, -10.0, 160.0, 110.0)));
        flow.pointer_up(Point::new(150.0, 100.0)).unwrap();

        assert!(flow.nodes()[0].selected);
        assert!(!flow.nodes()[1].selected);
        assert_eq!(flow.marquee_rect(), None);
    }

    #[test]
    fn test_delete_selected_cascades() {
        let mut flow = FlowController::default();
        flow.set_nodes(vec![
            Node::new("p", 0.0, 0.0).with_size(100.0, 100.0).selected(true),
            Node::new("c", 10.0, 10.0).with_size(10.0, 10.0).with_parent("p"),
            Node::new("x", 300.0, 0.0).with_size(10.0, 10.0),
        ])
        .unwrap();
        flow.set_edges(vec![Edge::new("cx", "c", "x")]);

        let removal = flow.delete_selected().unwrap();
        assert_eq!(removal.nodes, vec!["p".to_string(), "c".to_string()]);
        assert_eq!(removal.edges, vec!["cx".to_string()]);
        assert_eq!(flow.nodes().len(), 1);
        assert!(flow.edges().is_empty());
    }

    // ========================================================================
    // Connections
    // ========================================================================

    #[test]
    fn test_connection_drag_creates_edge_once() {
        let mut flow = controller();
        // Default nodes: source at bottom center, target at top center.
        for _ in 0..2 {
            flow.pointer_down_handle("a", None, HandleType::Source, Point::new(50.0, 50.0)).unwrap();
            flow.pointer_move(Point::new(345.0, 5.0));
            flow.frame(16.0).unwrap();
            assert_eq!(flow.pending_connection().and_then(|p| p.is_valid()), Some(true));
            assert!(flow.connection_line().is_some());
            flow.pointer_up(Point::new(345.0, 5.0)).unwrap();
        }
        assert_eq!(flow.edges().len(), 1);
        assert_eq!(flow.edges()[0].id, "xy-edge__a-b");
        let connects = flow
            .drain_events()
            .into_iter()
            .filter(|event| matches!(event, FlowEvent::Connect(_)))
            .count();
        assert_eq!(connects, 1);
        assert!(flow.connection_state().is_idle());
    }

    #[test]
    fn test_click_to_connect() {
        let mut flow = controller();
        flow.click_handle("a", None, HandleType::Source).unwrap();
        assert!(matches!(flow.connection_state(), ConnectionState::ClickPending(_)));
        // The press of the second click must not replace the armed handle.
        flow.pointer_down_handle("b", None, HandleType::Target, Point::new(350.0, 0.0)).unwrap();
        flow.pointer_up(Point::new(350.0, 0.0)).unwrap();
        flow.click_handle("b", None, HandleType::Target).unwrap();
        assert_eq!(flow.edges().len(), 1);
        assert!(flow.connection_state().is_idle());
    }

    #[test]
    fn test_reconnect_moves_edge() {
        let mut flow = controller();
        flow.connect(Connection::new("a", "b")).unwrap();
        assert!(flow.reconnect("xy-edge__a-b", &Connection::new("b", "a")).unwrap());
        assert_eq!(flow.edges().len(), 1);
        assert_eq!(flow.edges()[0].id, "xy-edge__b-a");
    }

    // ========================================================================
    // Viewport and measurement
    // ========================================================================

    #[test]
    fn test_wheel_emits_viewport_event() {
        let mut flow = controller();
        flow.wheel(&WheelEvent {
            position: Point::new(100.0, 100.0),
            delta: Point::new(0.0, -100.0),
            delta_mode: crate::viewport::DeltaMode::Pixel,
            ctrl_key: false,
            shift_key: false,
        });
        let events = flow.drain_events();
        assert!(matches!(events.as_slice(), [FlowEvent::ViewportChanged(t)] if t.zoom > 1.0));
    }

    #[test]
    fn test_zero_container_falls_back() {
        let mut flow = controller();
        let issues = Rc::new(RefCell::new(Vec::new()));
        let sink = issues.clone();
        flow.on_issue(move |issue| sink.borrow_mut().push(issue.kind));
        flow.set_container_size(0.0, 300.0);
        assert_eq!(flow.viewport().container(), Dimensions::new(500.0, 500.0));
        assert_eq!(*issues.borrow(), vec![IssueKind::DegenerateInput]);
    }

    #[test]
    fn test_fit_view_on_unsized_node() {
        let mut flow = FlowController::default();
        flow.set_container_size(800.0, 600.0);
        flow.set_nodes(vec![Node::new("a", 100.0, 100.0)]).unwrap();
        let issues = Rc::new(RefCell::new(Vec::new()));
        let sink = issues.clone();
        flow.on_issue(move |issue| sink.borrow_mut().push(issue.kind));

        assert!(flow.fit_view(0.0));
        assert_eq!(flow.transform(), Transform::new(300.0, 200.0, 1.0));
        assert_eq!(*issues.borrow(), vec![IssueKind::DegenerateInput]);
    }

    #[test]
    fn test_measurements_flush_on_frame() {
        let mut flow = FlowController::default();
        flow.set_nodes(vec![Node::new("a", 0.0, 0.0)]).unwrap();
        let report = flow.measurement_callback();
        report("a", 80.0, 30.0);
        assert!(flow.lookup().get("a").unwrap().node.measured.is_none());
        flow.frame(0.0).unwrap();
        assert_eq!(flow.lookup().get("a").unwrap().dimensions(), Dimensions::new(80.0, 30.0));
    }
}
