//! Node resizing.
//!
//! Works like dragging but on a node's box instead of its position: the
//! pointer moves one edge or corner, the opposite edge stays fixed. Output is
//! a `Dimensions` change (with `set_attributes`, so the explicit size is
//! written) plus `Position` changes when the top or left edge moved. A node
//! with `expand_parent` grows its parent exactly like a dragged one.

use crate::changes::NodeChange;
use crate::drag::{expand_parents, ExpandChild};
use crate::geometry::{get_bounds_of_rects, Dimensions, Point, Rect};
use crate::grid::{snap_position, SnapGrid};
use crate::hierarchy::NodeLookup;
use crate::node::{NodeExtent, NodeOrigin};
use serde::{Deserialize, Serialize};

/// The grabbed part of the resize frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResizeControl {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl ResizeControl {
    pub const ALL: [ResizeControl; 8] = [
        ResizeControl::TopLeft,
        ResizeControl::Top,
        ResizeControl::TopRight,
        ResizeControl::Right,
        ResizeControl::BottomRight,
        ResizeControl::Bottom,
        ResizeControl::BottomLeft,
        ResizeControl::Left,
    ];

    /// Changes the width.
    pub fn is_horizontal(self) -> bool {
        !matches!(self, ResizeControl::Top | ResizeControl::Bottom)
    }

    /// Changes the height.
    pub fn is_vertical(self) -> bool {
        !matches!(self, ResizeControl::Left | ResizeControl::Right)
    }

    /// Moves the left edge.
    pub fn affects_x(self) -> bool {
        matches!(self, ResizeControl::TopLeft | ResizeControl::Left | ResizeControl::BottomLeft)
    }

    /// Moves the top edge.
    pub fn affects_y(self) -> bool {
        matches!(self, ResizeControl::TopLeft | ResizeControl::Top | ResizeControl::TopRight)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeOptions {
    pub min_width: f32,
    pub min_height: f32,
    pub max_width: f32,
    pub max_height: f32,
    pub keep_aspect_ratio: bool,
    pub snap_grid: Option<SnapGrid>,
    pub node_origin: NodeOrigin,
    /// Grow every ancestor with `expand_parent`, not just the direct parent.
    pub expand_parent_cascade: bool,
}

impl Default for ResizeOptions {
    fn default() -> Self {
        Self {
            min_width: 10.0,
            min_height: 10.0,
            max_width: f32::MAX,
            max_height: f32::MAX,
            keep_aspect_ratio: false,
            snap_grid: None,
            node_origin: NodeOrigin::TOP_LEFT,
            expand_parent_cascade: true,
        }
    }
}

/// State of one resize gesture.
#[derive(Debug, Clone)]
pub struct NodeResize {
    node_id: String,
    control: ResizeControl,
    origin: NodeOrigin,
    start_pointer: Point,
    /// Parent-relative top-left corner at gesture start.
    start_corner: Point,
    /// Absolute position of the parent's top-left corner at gesture start.
    start_parent: Point,
    parent_id: Option<String>,
    expand_parent: bool,
    start_dimensions: Dimensions,
    /// Parent size when the node is confined to its parent.
    parent_limit: Option<Dimensions>,
    /// Local bounds of children confined to this node.
    children_bounds: Option<Rect>,
    children: Vec<(String, Point)>,
    /// Absolute top-left corner as last emitted.
    last_corner: Point,
    last_dimensions: Dimensions,
    changed: bool,
}

impl NodeResize {
    /// Starts resizing `node_id` from `control`; `None` if the node is unknown.
    pub fn new(lookup: &NodeLookup, node_id: &str, control: ResizeControl, pointer: Point, options: &ResizeOptions) -> Option<Self> {
        let node = lookup.get(node_id)?;
        let dimensions = node.dimensions();
        let origin = node.node.origin.unwrap_or(options.node_origin);
        let corner = node.node.position - origin.offset(dimensions);

        let parent_limit = match (node.node.extent, lookup.parent(node_id)) {
            (Some(NodeExtent::Parent), Some(parent)) => Some(parent.dimensions()),
            _ => None,
        };

        let children: Vec<(String, Point)> = lookup
            .children(node_id)
            .iter()
            .filter_map(|id| lookup.get(id))
            .map(|child| (child.id().to_string(), child.node.position))
            .collect();
        let confined: Vec<Rect> = lookup
            .children(node_id)
            .iter()
            .filter_map(|id| lookup.get(id))
            .filter(|child| child.node.extent == Some(NodeExtent::Parent))
            .map(|child| Rect::from_position(child.position_absolute - node.position_absolute, child.dimensions()))
            .collect();

        tracing::debug!(node_id, ?control, "resize started");
        Some(Self {
            node_id: node_id.to_string(),
            control,
            origin,
            start_pointer: pointer,
            start_corner: corner,
            start_parent: node.position_absolute - corner,
            parent_id: node.node.parent_id.clone(),
            expand_parent: node.node.expand_parent,
            start_dimensions: dimensions,
            parent_limit,
            children_bounds: get_bounds_of_rects(&confined),
            children,
            last_corner: node.position_absolute,
            last_dimensions: dimensions,
            changed: false,
        })
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn control(&self) -> ResizeControl {
        self.control
    }

    /// Resizes towards `pointer` (flow space) and returns the changes.
    ///
    /// `lookup` supplies the parent's current position, which moves when an
    /// earlier step expanded it.
    pub fn update(&mut self, lookup: &NodeLookup, pointer: Point, options: &ResizeOptions) -> Vec<NodeChange> {
        let (corner, dimensions) = self.next_box(pointer, options);
        let corner = corner + self.start_parent;
        if corner == self.last_corner && dimensions == self.last_dimensions {
            return Vec::new();
        }

        let shift = corner - self.last_corner;
        self.last_corner = corner;
        self.last_dimensions = dimensions;
        self.changed = true;

        let parent = self.parent_id.as_deref().and_then(|id| lookup.get(id));
        let mut local = corner - parent.map_or(self.start_parent, |parent| parent.position_absolute);
        let mut expand = Vec::new();
        if let (true, Some(parent)) = (self.expand_parent, parent) {
            // The parent moves instead of the child leaving it.
            local = Point::new(local.x.max(0.0), local.y.max(0.0));
            expand.push(ExpandChild {
                id: self.node_id.clone(),
                parent_id: parent.id().to_string(),
                rect: Rect::from_position(corner, dimensions),
            });
        }

        let mut changes = vec![NodeChange::dimensions(self.node_id.clone(), dimensions, Some(true), true)];
        let position = local + self.origin.offset(dimensions);
        changes.push(NodeChange::position(self.node_id.clone(), position, None, None));

        // Children keep their absolute place when the top or left edge moves.
        if shift != Point::ZERO {
            for (id, child_position) in &mut self.children {
                *child_position = *child_position - shift;
                changes.push(NodeChange::position(id.clone(), *child_position, None, None));
            }
        }

        if !expand.is_empty() {
            changes.extend(expand_parents(&expand, lookup, options.node_origin, options.expand_parent_cascade));
        }
        changes
    }

    /// Closing change: final size with `resizing: false`.
    pub fn finish(&self) -> Vec<NodeChange> {
        if !self.changed {
            return Vec::new();
        }
        tracing::debug!(node_id = %self.node_id, "resize finished");
        vec![NodeChange::dimensions(self.node_id.clone(), self.last_dimensions, Some(false), true)]
    }

    fn next_box(&self, pointer: Point, options: &ResizeOptions) -> (Point, Dimensions) {
        let control = self.control;
        let start = self.start_dimensions;
        let corner = self.start_corner;
        let delta = pointer - self.start_pointer;

        // The edges under the pointer, snapped in flow space.
        let mut moving = Point::new(
            if control.affects_x() { corner.x } else { corner.x + start.width } + delta.x,
            if control.affects_y() { corner.y } else { corner.y + start.height } + delta.y,
        );
        if let Some(grid) = options.snap_grid {
            moving = snap_position(moving + self.start_parent, grid) - self.start_parent;
        }

        let mut width = start.width;
        let mut height = start.height;
        if control.is_horizontal() {
            width = if control.affects_x() { corner.x + start.width - moving.x } else { moving.x - corner.x };
        }
        if control.is_vertical() {
            height = if control.affects_y() { corner.y + start.height - moving.y } else { moving.y - corner.y };
        }

        // Upper limits from the parent, lower limits from confined children.
        let (mut max_width, mut max_height) = (options.max_width, options.max_height);
        let (mut min_width, mut min_height) = (options.min_width, options.min_height);
        if let Some(parent) = self.parent_limit {
            max_width = max_width.min(if control.affects_x() {
                self.start_corner.x + start.width
            } else {
                parent.width - self.start_corner.x
            });
            max_height = max_height.min(if control.affects_y() {
                self.start_corner.y + start.height
            } else {
                parent.height - self.start_corner.y
            });
        }
        if let Some(children) = self.children_bounds {
            min_width = min_width.max(if control.affects_x() {
                start.width - children.x
            } else {
                children.x + children.width
            });
            min_height = min_height.max(if control.affects_y() {
                start.height - children.y
            } else {
                children.y + children.height
            });
        }
        let max_width = max_width.max(min_width);
        let max_height = max_height.max(min_height);

        width = width.clamp(min_width, max_width);
        height = height.clamp(min_height, max_height);

        if options.keep_aspect_ratio && !start.is_degenerate() {
            let ratio = start.width / start.height;
            let diagonal = control.is_horizontal() && control.is_vertical();
            if (diagonal && width / height > ratio) || (control.is_horizontal() && !diagonal) {
                height = width / ratio;
            } else {
                width = height * ratio;
            }
            if height > max_height || height < min_height {
                height = height.clamp(min_height, max_height);
                width = height * ratio;
            }
            if width > max_width || width < min_width {
                width = width.clamp(min_width, max_width);
                height = width / ratio;
            }
        }

        let x = if control.affects_x() {
            self.start_corner.x + start.width - width
        } else {
            self.start_corner.x
        };
        let y = if control.affects_y() {
            self.start_corner.y + start.height - height
        } else {
            self.start_corner.y
        };
        (Point::new(x, y), Dimensions::new(width, height))
    }
}
