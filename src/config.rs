//! Engine configuration.
//!
//! [`FlowConfig`] deserializes from the same camelCase JSON an adapter would
//! pass as component props. Every field has a default, so `{}` is a valid
//! configuration.

use crate::connection::ConnectionMode;
use crate::drag::DragOptions;
use crate::error::{FlowIssue, IssueKind, Result};
use crate::geometry::{CoordinateExtent, Dimensions, Transform};
use crate::grid::SnapGrid;
use crate::hierarchy::ResolveOptions;
use crate::node::NodeOrigin;
use crate::path::{PathOptions, PathVariant};
use crate::resize::ResizeOptions;
use crate::selection::{MarqueeOptions, SelectionMode};
use crate::viewport::{WheelOptions, DEFAULT_AUTO_PAN_DISTANCE};
use serde::{Deserialize, Serialize};

/// Who owns the node and edge lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowMode {
    /// The controller applies its own changes.
    #[default]
    Managed,
    /// Changes are only emitted; the owner re-supplies the lists.
    Controlled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlowConfig {
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub translate_extent: Option<CoordinateExtent>,
    pub node_extent: Option<CoordinateExtent>,
    pub node_origin: NodeOrigin,
    pub snap_to_grid: bool,
    pub snap_grid: SnapGrid,
    pub elevate_nodes_on_select: bool,
    pub elevate_edges_on_select: bool,
    pub connection_mode: ConnectionMode,
    /// Flow units around a handle that snap an in-progress connection.
    pub connection_radius: f32,
    pub connection_line_type: PathVariant,
    pub selection_mode: SelectionMode,
    pub nodes_draggable: bool,
    pub nodes_connectable: bool,
    pub elements_selectable: bool,
    pub nodes_focusable: bool,
    pub edges_selectable: bool,
    pub select_nodes_on_drag: bool,
    /// Screen pixels before a pointer-down on a node becomes a drag.
    pub node_drag_threshold: f32,
    pub auto_pan_on_node_drag: bool,
    pub auto_pan_speed: f32,
    pub pan_on_scroll: bool,
    pub pan_on_scroll_speed: f32,
    pub zoom_on_scroll: bool,
    pub zoom_on_pinch: bool,
    pub fit_view_padding: f32,
    pub default_viewport: Transform,
    /// Grow every `expandParent` ancestor, not only the direct parent.
    pub expand_parent_cascade: bool,
    pub default_edge_type: String,
    pub default_edge_options: PathOptions,
    /// Used when the container reports a zero size.
    pub fallback_container_size: Dimensions,
    /// Used when a node reports a zero size.
    pub min_node_size: f32,
    pub mode: FlowMode,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.5,
            max_zoom: 2.0,
            translate_extent: None,
            node_extent: None,
            node_origin: NodeOrigin::TOP_LEFT,
            snap_to_grid: false,
            snap_grid: SnapGrid::default(),
            elevate_nodes_on_select: true,
            elevate_edges_on_select: false,
            connection_mode: ConnectionMode::Strict,
            connection_radius: 20.0,
            connection_line_type: PathVariant::Bezier,
            selection_mode: SelectionMode::Full,
            nodes_draggable: true,
            nodes_connectable: true,
            elements_selectable: true,
            nodes_focusable: true,
            edges_selectable: true,
            select_nodes_on_drag: true,
            node_drag_threshold: 1.0,
            auto_pan_on_node_drag: true,
            auto_pan_speed: 15.0,
            pan_on_scroll: false,
            pan_on_scroll_speed: 0.5,
            zoom_on_scroll: true,
            zoom_on_pinch: true,
            fit_view_padding: 0.1,
            default_viewport: Transform::IDENTITY,
            expand_parent_cascade: true,
            default_edge_type: "default".to_string(),
            default_edge_options: PathOptions::default(),
            fallback_container_size: Dimensions::new(500.0, 500.0),
            min_node_size: 1.0,
            mode: FlowMode::Managed,
        }
    }
}

impl FlowConfig {
    /// Parses a JSON configuration; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Repairs inconsistent settings and reports what was changed.
    pub fn validate(&mut self) -> Vec<FlowIssue> {
        let mut issues = Vec::new();
        if self.min_zoom > self.max_zoom {
            issues.push(FlowIssue::new(
                IssueKind::DegenerateInput,
                format!("minZoom {} exceeds maxZoom {}, swapping", self.min_zoom, self.max_zoom),
            ));
            std::mem::swap(&mut self.min_zoom, &mut self.max_zoom);
        }
        if self.min_zoom <= 0.0 {
            issues.push(FlowIssue::new(
                IssueKind::DegenerateInput,
                format!("minZoom {} is not positive, using 0.1", self.min_zoom),
            ));
            self.min_zoom = 0.1;
            self.max_zoom = self.max_zoom.max(self.min_zoom);
        }
        if self.fallback_container_size.is_degenerate() {
            issues.push(FlowIssue::new(
                IssueKind::DegenerateInput,
                "fallbackContainerSize must be positive, using 500x500",
            ));
            self.fallback_container_size = Dimensions::new(500.0, 500.0);
        }
        if !(self.min_node_size > 0.0) {
            issues.push(FlowIssue::new(IssueKind::DegenerateInput, "minNodeSize must be positive, using 1"));
            self.min_node_size = 1.0;
        }
        issues
    }

    pub fn snap(&self) -> Option<SnapGrid> {
        self.snap_to_grid.then_some(self.snap_grid)
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            node_origin: self.node_origin,
            node_extent: self.node_extent.unwrap_or(CoordinateExtent::INFINITE),
            elevate_on_select: self.elevate_nodes_on_select,
        }
    }

    pub fn drag_options(&self) -> DragOptions {
        DragOptions {
            snap_grid: self.snap(),
            node_extent: self.node_extent.unwrap_or(CoordinateExtent::INFINITE),
            node_origin: self.node_origin,
            nodes_draggable: self.nodes_draggable,
            threshold: self.node_drag_threshold,
            expand_parent_cascade: self.expand_parent_cascade,
        }
    }

    pub fn resize_options(&self) -> ResizeOptions {
        ResizeOptions {
            snap_grid: self.snap(),
            node_origin: self.node_origin,
            expand_parent_cascade: self.expand_parent_cascade,
            ..ResizeOptions::default()
        }
    }

    pub fn wheel_options(&self) -> WheelOptions {
        WheelOptions {
            zoom_on_scroll: self.zoom_on_scroll,
            zoom_on_pinch: self.zoom_on_pinch,
            pan_on_scroll: self.pan_on_scroll,
            pan_on_scroll_speed: self.pan_on_scroll_speed,
        }
    }

    pub fn marquee_options(&self) -> MarqueeOptions {
        MarqueeOptions {
            mode: self.selection_mode,
            nodes_selectable: self.elements_selectable,
            edges_selectable: self.elements_selectable && self.edges_selectable,
        }
    }

    /// Distance from the container edge at which dragging starts to auto-pan.
    pub fn auto_pan_distance(&self) -> f32 {
        DEFAULT_AUTO_PAN_DISTANCE
    }
}
