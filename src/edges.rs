//! Edge records and the edge render pass.
//!
//! [`compute_edge_renders`] turns the edge list plus a resolved
//! [`NodeLookup`] into one [`EdgeRender`] per drawable edge: the path string,
//! label anchor, resolved endpoints, z and marker ids. Rendering adapters
//! consume these directly.
//!
//! # Example
//!
//! ```ignore
//! let mut issues = Vec::new();
//! let renders = compute_edge_renders(&edges, &lookup, &context, &mut issues);
//! for render in &renders {
//!     draw_svg_path(&render.path, render.z);
//! }
//! ```

use crate::connection::ConnectionMode;
use crate::error::{FlowIssue, IssueKind};
use crate::geometry::{Point, Rect};
use crate::hierarchy::{NodeLookup, ELEVATION_BONUS};
use crate::node::{HandleBound, HandleType, InternalNode, NodeHandleBounds, Position};
use crate::path::{Endpoints, PathOptions};
use crate::registry::{EdgeTypeRegistry, NodeTypeRegistry};
use serde::{Deserialize, Serialize};

/// Built-in arrowhead shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerType {
    Arrow,
    ArrowClosed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerSpec {
    #[serde(rename = "type")]
    pub marker_type: MarkerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orient: Option<String>,
}

impl MarkerSpec {
    pub fn new(marker_type: MarkerType) -> Self {
        Self {
            marker_type,
            color: None,
            width: None,
            height: None,
            stroke_width: None,
            orient: None,
        }
    }
}

/// Arrowhead at one end of an edge: a reference to a user-defined marker or
/// a built-in spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EdgeMarker {
    Named(String),
    Spec(MarkerSpec),
}

/// Stable id of a marker definition.
///
/// Named markers keep their name. Specs produce `key=value` pairs sorted by
/// key and joined with `&`, prefixed by `"{prefix}__"` when a prefix is given,
/// so equal specs share one definition.
pub fn marker_id(marker: &EdgeMarker, prefix: Option<&str>) -> String {
    let spec = match marker {
        EdgeMarker::Named(name) => return name.clone(),
        EdgeMarker::Spec(spec) => spec,
    };

    let pairs = match serde_json::to_value(spec) {
        Ok(serde_json::Value::Object(map)) => {
            let mut pairs: Vec<(String, String)> = map
                .into_iter()
                .map(|(key, value)| {
                    let value = match value {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    };
                    (key, value)
                })
                .collect();
            pairs.sort();
            pairs
                .into_iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect::<Vec<_>>()
                .join("&")
        }
        _ => String::new(),
    };

    match prefix {
        Some(prefix) => format!("{prefix}__{pairs}"),
        None => pairs,
    }
}

/// An edge between two node handles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    /// `None` means the node's first/only source handle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<String>,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub animated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selectable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_options: Option<PathOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_start: Option<EdgeMarker>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_end: Option<EdgeMarker>,
}

impl Edge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
            edge_type: None,
            selected: false,
            hidden: false,
            animated: false,
            selectable: None,
            z_index: None,
            label: None,
            data: serde_json::Value::Null,
            path_options: None,
            marker_start: None,
            marker_end: None,
        }
    }

    pub fn with_handles(mut self, source_handle: Option<&str>, target_handle: Option<&str>) -> Self {
        self.source_handle = source_handle.map(str::to_owned);
        self.target_handle = target_handle.map(str::to_owned);
        self
    }

    pub fn with_type(mut self, edge_type: impl Into<String>) -> Self {
        self.edge_type = Some(edge_type.into());
        self
    }

    pub fn is_selectable(&self, default: bool) -> bool {
        self.selectable.unwrap_or(default)
    }

    /// True if the edge starts or ends at `node_id`.
    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// Render z of an edge.
///
/// An explicit `z_index` is kept. Otherwise, with elevation enabled, the edge
/// inherits the higher z of its two nodes (which already carry their own
/// selection bonus). A selected edge is raised by the elevation bonus.
pub fn edge_z(edge: &Edge, source: &InternalNode, target: &InternalNode, elevate_on_select: bool) -> i32 {
    let base = match edge.z_index {
        Some(z) => z,
        None if elevate_on_select => source.z.max(target.z),
        None => 0,
    };
    if elevate_on_select && edge.selected {
        base + ELEVATION_BONUS
    } else {
        base
    }
}

/// Handle bounds of a node: measured, else predefined, else the type's defaults.
pub fn node_handle_bounds(
    node: &InternalNode,
    node_types: &NodeTypeRegistry,
    issues: &mut Vec<FlowIssue>,
) -> NodeHandleBounds {
    node.handles().unwrap_or_else(|| {
        node_types
            .resolve(node.node.node_type.as_deref(), node.id(), issues)
            .default_handles(&node.node, node.dimensions())
    })
}

/// Absolute attach point and facing side of a handle.
pub fn handle_endpoint(node: &InternalNode, handle: &HandleBound) -> (Point, Position) {
    (handle.anchor(node.position_absolute), handle.position)
}

/// Shared inputs of the edge render pass.
pub struct EdgeRenderContext<'a> {
    pub edge_types: &'a EdgeTypeRegistry,
    pub node_types: &'a NodeTypeRegistry,
    pub connection_mode: ConnectionMode,
    pub elevate_on_select: bool,
    /// Tag used for edges without a `type`.
    pub default_edge_type: &'a str,
    /// When set, edges whose node boxes miss this flow rectangle are skipped.
    pub visible_rect: Option<Rect>,
}

/// Geometry of one drawable edge.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRender {
    pub id: String,
    pub path: String,
    pub label: Point,
    pub source: Point,
    pub source_position: Position,
    pub target: Point,
    pub target_position: Position,
    pub z: i32,
    pub selected: bool,
    pub animated: bool,
    pub marker_start: Option<String>,
    pub marker_end: Option<String>,
    /// Approximation of the path, for hit testing.
    pub polyline: Vec<Point>,
}

/// Computes render geometry for every visible edge, sorted by z (stable).
///
/// Edges with a hidden endpoint node are skipped silently. Edges naming a
/// missing node or handle are skipped with a `ConstraintViolation` issue.
pub fn compute_edge_renders(
    edges: &[Edge],
    lookup: &NodeLookup,
    context: &EdgeRenderContext<'_>,
    issues: &mut Vec<FlowIssue>,
) -> Vec<EdgeRender> {
    let mut renders: Vec<EdgeRender> = edges
        .iter()
        .filter(|edge| !edge.hidden)
        .filter_map(|edge| render_edge(edge, lookup, context, issues))
        .collect();
    renders.sort_by_key(|render| render.z);
    renders
}

fn render_edge(
    edge: &Edge,
    lookup: &NodeLookup,
    context: &EdgeRenderContext<'_>,
    issues: &mut Vec<FlowIssue>,
) -> Option<EdgeRender> {
    let (Some(source), Some(target)) = (lookup.get(&edge.source), lookup.get(&edge.target)) else {
        issues.push(
            FlowIssue::new(
                IssueKind::ConstraintViolation,
                format!("edge references missing node `{}` or `{}`", edge.source, edge.target),
            )
            .with_id(edge.id.as_str()),
        );
        return None;
    };
    if source.node.hidden || target.node.hidden {
        return None;
    }
    if let Some(visible) = context.visible_rect {
        if !source.rect().union(&target.rect()).intersects(&visible) {
            return None;
        }
    }

    let source_bounds = node_handle_bounds(source, context.node_types, issues);
    let target_bounds = node_handle_bounds(target, context.node_types, issues);

    let source_handle = source_bounds.find(HandleType::Source, edge.source_handle.as_deref());
    let target_handle = match context.connection_mode {
        ConnectionMode::Strict => target_bounds.find(HandleType::Target, edge.target_handle.as_deref()),
        ConnectionMode::Loose => target_bounds
            .find(HandleType::Target, edge.target_handle.as_deref())
            .or_else(|| target_bounds.find(HandleType::Source, edge.target_handle.as_deref())),
    };
    let (Some(source_handle), Some(target_handle)) = (source_handle, target_handle) else {
        issues.push(
            FlowIssue::new(
                IssueKind::ConstraintViolation,
                format!(
                    "couldn't find handle `{}` -> `{}` for edge",
                    edge.source_handle.as_deref().unwrap_or("<first>"),
                    edge.target_handle.as_deref().unwrap_or("<first>")
                ),
            )
            .with_id(edge.id.as_str()),
        );
        return None;
    };

    let (source_point, source_position) = handle_endpoint(source, source_handle);
    let (target_point, target_position) = handle_endpoint(target, target_handle);
    let endpoints = Endpoints::new(source_point, source_position, target_point, target_position);

    let tag = edge.edge_type.as_deref().unwrap_or(context.default_edge_type);
    let geometry = context.edge_types.resolve(Some(tag), &edge.id, issues);
    let options = edge.path_options.unwrap_or_default();
    let path = geometry.path(&endpoints, &options);

    Some(EdgeRender {
        id: edge.id.clone(),
        path: path.path,
        label: path.label,
        source: source_point,
        source_position,
        target: target_point,
        target_position,
        z: edge_z(edge, source, target, context.elevate_on_select),
        selected: edge.selected,
        animated: edge.animated,
        marker_start: edge.marker_start.as_ref().map(|m| marker_id(m, None)),
        marker_end: edge.marker_end.as_ref().map(|m| marker_id(m, None)),
        polyline: path.polyline,
    })
}
