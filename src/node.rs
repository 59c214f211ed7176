//! Node records and the engine-owned [`InternalNode`] derived from them.

use crate::geometry::{Dimensions, Point, Rect};
use serde::{Deserialize, Serialize};

/// Side of a node a handle faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Left,
    Top,
    Right,
    Bottom,
}

impl Position {
    /// Unit vector pointing away from the node.
    pub fn direction(self) -> Point {
        match self {
            Position::Left => Point::new(-1.0, 0.0),
            Position::Top => Point::new(0.0, -1.0),
            Position::Right => Point::new(1.0, 0.0),
            Position::Bottom => Point::new(0.0, 1.0),
        }
    }

    pub fn opposite(self) -> Position {
        match self {
            Position::Left => Position::Right,
            Position::Top => Position::Bottom,
            Position::Right => Position::Left,
            Position::Bottom => Position::Top,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Position::Left | Position::Right)
    }
}

/// Whether a handle starts or ends edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleType {
    Source,
    Target,
}

impl HandleType {
    pub fn opposite(self) -> HandleType {
        match self {
            HandleType::Source => HandleType::Target,
            HandleType::Target => HandleType::Source,
        }
    }
}

/// Which point of a node's bounding box its `position` refers to.
///
/// `[0, 0]` is the top-left corner, `[0.5, 0.5]` the center.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeOrigin(pub f32, pub f32);

impl NodeOrigin {
    pub const TOP_LEFT: NodeOrigin = NodeOrigin(0.0, 0.0);

    /// Offset from the origin point to the top-left corner, negated.
    pub fn offset(&self, dimensions: Dimensions) -> Point {
        Point::new(dimensions.width * self.0, dimensions.height * self.1)
    }
}

/// Where a node may be moved to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeExtent {
    /// Keep the node inside its parent's bounds.
    Parent,
    /// Absolute region for root nodes, parent-relative for children.
    Rect(crate::geometry::CoordinateExtent),
}

/// Rectangle of one handle, relative to its node's top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleBound {
    /// `None` for a node's first/only handle of a type.
    pub id: Option<String>,
    pub handle_type: HandleType,
    pub position: Position,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl HandleBound {
    /// Handle centered on the `position` side of a box of `dimensions`.
    pub fn centered(handle_type: HandleType, position: Position, dimensions: Dimensions) -> Self {
        let (x, y) = match position {
            Position::Left => (0.0, dimensions.height / 2.0),
            Position::Right => (dimensions.width, dimensions.height / 2.0),
            Position::Top => (dimensions.width / 2.0, 0.0),
            Position::Bottom => (dimensions.width / 2.0, dimensions.height),
        };
        Self {
            id: None,
            handle_type,
            position,
            x,
            y,
            width: 0.0,
            height: 0.0,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Point on the facing side of the handle, given the node's absolute position.
    ///
    /// This is where edges attach.
    pub fn anchor(&self, node_position: Point) -> Point {
        let x = node_position.x + self.x;
        let y = node_position.y + self.y;
        match self.position {
            Position::Left => Point::new(x, y + self.height / 2.0),
            Position::Right => Point::new(x + self.width, y + self.height / 2.0),
            Position::Top => Point::new(x + self.width / 2.0, y),
            Position::Bottom => Point::new(x + self.width / 2.0, y + self.height),
        }
    }

    /// Center of the handle in absolute coordinates.
    pub fn center(&self, node_position: Point) -> Point {
        Point::new(
            node_position.x + self.x + self.width / 2.0,
            node_position.y + self.y + self.height / 2.0,
        )
    }
}

/// Handle rectangles of one node, split by type.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeHandleBounds {
    pub source: Vec<HandleBound>,
    pub target: Vec<HandleBound>,
}

impl NodeHandleBounds {
    pub fn from_handles(handles: impl IntoIterator<Item = HandleBound>) -> Self {
        let mut bounds = Self::default();
        for handle in handles {
            match handle.handle_type {
                HandleType::Source => bounds.source.push(handle),
                HandleType::Target => bounds.target.push(handle),
            }
        }
        bounds
    }

    pub fn of_type(&self, handle_type: HandleType) -> &[HandleBound] {
        match handle_type {
            HandleType::Source => &self.source,
            HandleType::Target => &self.target,
        }
    }

    /// Handle by id, falling back to the first handle of the type when `id` is `None`.
    pub fn find(&self, handle_type: HandleType, id: Option<&str>) -> Option<&HandleBound> {
        let handles = self.of_type(handle_type);
        match id {
            Some(id) => handles.iter().find(|h| h.id.as_deref() == Some(id)),
            None => handles.first(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &HandleBound> {
        self.source.iter().chain(self.target.iter())
    }
}

/// A node as supplied by the owner of the diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    /// Relative to the parent if `parent_id` is set, else to the flow origin.
    pub position: Point,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measured: Option<Dimensions>,
    /// Explicit width, written by resizing and parent expansion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<NodeOrigin>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extent: Option<NodeExtent>,
    #[serde(default)]
    pub expand_parent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub dragging: bool,
    #[serde(default)]
    pub resizing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draggable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selectable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connectable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focusable: Option<bool>,
    #[serde(default)]
    pub hidden: bool,
    /// Pointer target scope that may start a drag, e.g. `".drag-handle"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drag_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_position: Option<Position>,
    /// Predefined handles, used until the node has been measured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handles: Option<Vec<HandleBound>>,
}

impl Node {
    pub fn new(id: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            id: id.into(),
            position: Point::new(x, y),
            node_type: None,
            data: serde_json::Value::Null,
            measured: None,
            width: None,
            height: None,
            parent_id: None,
            origin: None,
            extent: None,
            expand_parent: false,
            z_index: None,
            selected: false,
            dragging: false,
            resizing: false,
            draggable: None,
            selectable: None,
            connectable: None,
            focusable: None,
            hidden: false,
            drag_handle: None,
            source_position: None,
            target_position: None,
            handles: None,
        }
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.measured = Some(Dimensions::new(width, height));
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_extent(mut self, extent: NodeExtent) -> Self {
        self.extent = Some(extent);
        self
    }

    pub fn with_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = Some(node_type.into());
        self
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    /// Measured size, else explicit size, else zero.
    pub fn dimensions(&self) -> Dimensions {
        match self.measured {
            Some(measured) => measured,
            None => Dimensions::new(self.width.unwrap_or(0.0), self.height.unwrap_or(0.0)),
        }
    }

    /// A node is initialized once it has a non-zero measured size.
    pub fn is_measured(&self) -> bool {
        self.measured.map_or(false, |m| !m.is_degenerate())
    }

    pub fn is_draggable(&self, default: bool) -> bool {
        self.draggable.unwrap_or(default)
    }

    pub fn is_selectable(&self, default: bool) -> bool {
        self.selectable.unwrap_or(default)
    }

    pub fn is_connectable(&self, default: bool) -> bool {
        self.connectable.unwrap_or(default)
    }

    pub fn is_focusable(&self, default: bool) -> bool {
        self.focusable.unwrap_or(default)
    }

    /// True when a pointer on `scope` may start a drag of this node.
    pub fn accepts_drag_from(&self, scope: Option<&str>) -> bool {
        match (&self.drag_handle, scope) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(handle), Some(scope)) => {
                handle.trim_start_matches('.') == scope.trim_start_matches('.')
            }
        }
    }
}

/// A node plus everything the engine derives from it.
#[derive(Debug, Clone, PartialEq)]
pub struct InternalNode {
    pub node: Node,
    /// Top-left corner in flow space, resolved through the parent chain.
    pub position_absolute: Point,
    /// Render order.
    pub z: i32,
    /// Number of ancestors.
    pub depth: usize,
    pub handle_bounds: Option<NodeHandleBounds>,
    /// True iff some node names this one as its parent.
    pub is_parent: bool,
}

impl InternalNode {
    pub fn id(&self) -> &str {
        &self.node.id
    }

    pub fn dimensions(&self) -> Dimensions {
        self.node.dimensions()
    }

    /// Absolute bounding rectangle.
    pub fn rect(&self) -> Rect {
        Rect::from_position(self.position_absolute, self.dimensions())
    }

    /// Measured handles, else the node's predefined handles.
    pub fn handles(&self) -> Option<NodeHandleBounds> {
        match &self.handle_bounds {
            Some(bounds) => Some(bounds.clone()),
            None => self
                .node
                .handles
                .as_ref()
                .map(|handles| NodeHandleBounds::from_handles(handles.iter().cloned())),
        }
    }
}
