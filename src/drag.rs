//! Node dragging.
//!
//! A [`NodeDrag`] follows one drag gesture. It never touches node records:
//! each pointer step yields `Position` changes (plus parent expansion
//! changes) that go through the same apply path as every other mutation.
//!
//! Which nodes move: the grabbed node plus every other selected, draggable
//! node, minus nodes with a selected or grabbed ancestor (the ancestor
//! already carries them).

use crate::changes::NodeChange;
use crate::geometry::{clamp_position, get_bounds_of_rects, CoordinateExtent, Dimensions, Point, Rect};
use crate::grid::{snap_position, SnapGrid};
use crate::hierarchy::NodeLookup;
use crate::node::{InternalNode, NodeExtent, NodeOrigin};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Drag behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragOptions {
    pub snap_grid: Option<SnapGrid>,
    pub node_extent: CoordinateExtent,
    pub node_origin: NodeOrigin,
    /// Default for nodes without their own `draggable`.
    pub nodes_draggable: bool,
    /// Screen pixels the pointer must travel before the drag starts.
    pub threshold: f32,
    /// Grow every ancestor with `expand_parent`, not just the direct parent.
    pub expand_parent_cascade: bool,
}

impl Default for DragOptions {
    fn default() -> Self {
        Self {
            snap_grid: None,
            node_extent: CoordinateExtent::INFINITE,
            node_origin: NodeOrigin::TOP_LEFT,
            nodes_draggable: true,
            threshold: 1.0,
            expand_parent_cascade: true,
        }
    }
}

/// One moving node.
#[derive(Debug, Clone, PartialEq)]
pub struct DragItem {
    pub id: String,
    /// Local position as last emitted.
    pub position: Point,
    /// Top-left corner in flow space as last emitted.
    pub position_absolute: Point,
    /// Pointer offset from `position_absolute` at drag start.
    pub distance: Point,
    pub dimensions: Dimensions,
}

/// Nodes moved when `grabbed` is dragged.
///
/// `include_selected` adds the other selected nodes; callers pass `false`
/// when grabbing an unselected node replaces the selection.
pub fn get_drag_items(
    lookup: &NodeLookup,
    grabbed: &str,
    pointer: Point,
    include_selected: bool,
    nodes_draggable: bool,
) -> Vec<DragItem> {
    let moving = |node: &InternalNode| {
        node.id() == grabbed || (include_selected && node.node.selected)
    };
    lookup
        .iter()
        .filter(|&node| moving(node) && node.node.is_draggable(nodes_draggable))
        .filter(|&node| !lookup.has_ancestor(node.id(), &moving))
        .map(|node| DragItem {
            id: node.id().to_string(),
            position: node.node.position,
            position_absolute: node.position_absolute,
            distance: pointer - node.position_absolute,
            dimensions: node.dimensions(),
        })
        .collect()
}

/// Where a node may be placed given its extent settings.
///
/// `extent: parent` clamps to the parent's rectangle unless the node expands
/// its parent; a rectangle extent is relative to the parent.
fn resolve_extent(node: &InternalNode, parent: Option<&InternalNode>, fallback: CoordinateExtent) -> CoordinateExtent {
    let parent_position = parent.map_or(Point::ZERO, |p| p.position_absolute);
    match (node.node.extent, parent) {
        (Some(NodeExtent::Parent), Some(parent)) if !node.node.expand_parent => {
            let dims = parent.dimensions();
            if dims.is_degenerate() {
                fallback
            } else {
                CoordinateExtent::from_rect(&parent.rect())
            }
        }
        (Some(NodeExtent::Rect(extent)), _) => extent.translate(parent_position),
        _ => fallback,
    }
}

/// Local and absolute position of a node whose top-left would move to `next`.
pub fn calculate_node_position(
    node: &InternalNode,
    lookup: &NodeLookup,
    next: Point,
    node_extent: CoordinateExtent,
    node_origin: NodeOrigin,
) -> (Point, Point) {
    let parent = lookup.parent(node.id());
    let parent_position = parent.map_or(Point::ZERO, |p| p.position_absolute);
    let extent = resolve_extent(node, parent, node_extent);
    let dimensions = node.dimensions();
    let position_absolute = clamp_position(next, &extent, dimensions);

    let origin = node.node.origin.unwrap_or(node_origin);
    let position = position_absolute - parent_position + origin.offset(dimensions);
    (position, position_absolute)
}

/// State of one drag gesture.
#[derive(Debug, Clone)]
pub struct NodeDrag {
    grabbed: String,
    items: Vec<DragItem>,
    start_screen: Point,
    last_pointer: Point,
    last_screen: Point,
    started: bool,
}

impl NodeDrag {
    /// Prepares a drag of `grabbed`; `None` if nothing is draggable.
    ///
    /// `pointer` is in flow space, `screen` in container space.
    pub fn new(
        lookup: &NodeLookup,
        grabbed: &str,
        pointer: Point,
        screen: Point,
        include_selected: bool,
        options: &DragOptions,
    ) -> Option<Self> {
        let items = get_drag_items(lookup, grabbed, pointer, include_selected, options.nodes_draggable);
        if items.is_empty() {
            return None;
        }
        tracing::debug!(grabbed, items = items.len(), "drag prepared");
        Some(Self {
            grabbed: grabbed.to_string(),
            items,
            start_screen: screen,
            last_pointer: pointer,
            last_screen: screen,
            started: false,
        })
    }

    pub fn grabbed(&self) -> &str {
        &self.grabbed
    }

    pub fn items(&self) -> &[DragItem] {
        &self.items
    }

    /// True once the pointer passed the drag threshold.
    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn last_screen(&self) -> Point {
        self.last_screen
    }

    pub fn last_pointer(&self) -> Point {
        self.last_pointer
    }

    /// Moves the drag to `pointer` and returns the resulting changes.
    ///
    /// Nothing is emitted until the pointer has travelled past the
    /// threshold, or when no node actually moved.
    pub fn update(&mut self, lookup: &NodeLookup, pointer: Point, screen: Point, options: &DragOptions) -> Vec<NodeChange> {
        self.last_pointer = pointer;
        self.last_screen = screen;
        if !self.started {
            if self.start_screen.distance(screen) <= options.threshold {
                return Vec::new();
            }
            self.started = true;
            tracing::debug!(grabbed = %self.grabbed, "drag started");
        }

        // Multi-node drags clamp the selection box as a whole to the node extent.
        let rects: Vec<Rect> = self
            .items
            .iter()
            .map(|item| Rect::from_position(item.position_absolute, item.dimensions))
            .collect();
        let nodes_box = get_bounds_of_rects(&rects);

        let mut moved = false;
        let mut expand_children = Vec::new();
        for item in &mut self.items {
            let Some(node) = lookup.get(&item.id) else { continue };

            let mut next = pointer - item.distance;
            if let Some(grid) = options.snap_grid {
                next = snap_position(next, grid);
            }

            let mut extent = options.node_extent;
            if let (Some(bounds), true, None) = (nodes_box, rects.len() > 1, node.node.extent) {
                let bounds = bounds.to_box();
                extent = CoordinateExtent::new(
                    Point::new(
                        item.position_absolute.x - bounds.x + extent.min.x,
                        item.position_absolute.y - bounds.y + extent.min.y,
                    ),
                    Point::new(
                        item.position_absolute.x + item.dimensions.width - bounds.x2 + extent.max.x,
                        item.position_absolute.y + item.dimensions.height - bounds.y2 + extent.max.y,
                    ),
                );
            }

            let (mut position, position_absolute) =
                calculate_node_position(node, lookup, next, extent, options.node_origin);

            if node.node.expand_parent {
                if let Some(parent_id) = &node.node.parent_id {
                    position = Point::new(position.x.max(0.0), position.y.max(0.0));
                    expand_children.push(ExpandChild {
                        id: item.id.clone(),
                        parent_id: parent_id.clone(),
                        rect: Rect::from_position(position_absolute, item.dimensions),
                    });
                }
            }

            moved |= position != item.position || position_absolute != item.position_absolute;
            item.position = position;
            item.position_absolute = position_absolute;
        }

        if !moved {
            return Vec::new();
        }

        let mut changes: Vec<NodeChange> = self
            .items
            .iter()
            .map(|item| NodeChange::position(item.id.clone(), item.position, Some(item.position_absolute), Some(true)))
            .collect();
        changes.extend(expand_parents(&expand_children, lookup, options.node_origin, options.expand_parent_cascade));
        changes
    }

    /// Final changes of the gesture: last positions with `dragging: false`.
    ///
    /// Used for both a normal drop and a cancel; the last emitted positions
    /// stay authoritative.
    pub fn finish(&self) -> Vec<NodeChange> {
        if !self.started {
            return Vec::new();
        }
        tracing::debug!(grabbed = %self.grabbed, "drag finished");
        self.items
            .iter()
            .map(|item| NodeChange::position(item.id.clone(), item.position, Some(item.position_absolute), Some(false)))
            .collect()
    }
}

// ============================================================================
// Parent expansion
// ============================================================================

/// A child whose rectangle may grow its parent.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandChild {
    pub id: String,
    pub parent_id: String,
    /// Absolute rectangle the child wants to occupy.
    pub rect: Rect,
}

/// Grows parents so the given children fit.
///
/// A child left of or above its parent moves the parent by the (rounded)
/// overflow; the parent's other children are shifted back so they stay put.
/// With `cascade`, a grown parent that itself has `expand_parent` grows its
/// own parent in turn, up to the root.
pub fn expand_parents(
    children: &[ExpandChild],
    lookup: &NodeLookup,
    node_origin: NodeOrigin,
    cascade: bool,
) -> Vec<NodeChange> {
    let mut positions: IndexMap<String, Point> = IndexMap::new();
    let mut dimensions: IndexMap<String, Dimensions> = IndexMap::new();
    let mut level: Vec<ExpandChild> = children.to_vec();

    while !level.is_empty() {
        let mut expansions: IndexMap<&str, Rect> = IndexMap::new();
        for child in &level {
            let Some(parent) = lookup.get(&child.parent_id) else { continue };
            let current = match expansions.get(parent.id()) {
                Some(rect) => *rect,
                None => Rect::from_position(
                    parent.position_absolute,
                    dimensions.get(parent.id()).copied().unwrap_or_else(|| parent.dimensions()),
                ),
            };
            expansions.insert(parent.id(), current.union(&child.rect));
        }

        let level_ids: HashSet<&str> = level.iter().map(|c| c.id.as_str()).collect();
        let mut next_level = Vec::new();

        for (parent_id, expanded) in &expansions {
            let Some(parent) = lookup.get(parent_id) else { continue };
            let absolute = parent.position_absolute;
            let dims = dimensions.get(*parent_id).copied().unwrap_or_else(|| parent.dimensions());
            let origin = parent.node.origin.unwrap_or(node_origin);

            let x_change = if expanded.x < absolute.x { (absolute.x - expanded.x).round() } else { 0.0 };
            let y_change = if expanded.y < absolute.y { (absolute.y - expanded.y).round() } else { 0.0 };
            let new_width = dims.width.max(expanded.width.round());
            let new_height = dims.height.max(expanded.height.round());
            let width_change = (new_width - dims.width) * origin.0;
            let height_change = (new_height - dims.height) * origin.1;

            if x_change > 0.0 || y_change > 0.0 || width_change != 0.0 || height_change != 0.0 {
                let current = positions.get(*parent_id).copied().unwrap_or(parent.node.position);
                positions.insert(
                    parent_id.to_string(),
                    Point::new(current.x - x_change + width_change, current.y - y_change + height_change),
                );
                for sibling in lookup.children(parent_id) {
                    if level_ids.contains(sibling.as_str()) {
                        continue;
                    }
                    let Some(sibling_node) = lookup.get(sibling) else { continue };
                    let current = positions.get(sibling).copied().unwrap_or(sibling_node.node.position);
                    positions.insert(sibling.clone(), Point::new(current.x + x_change, current.y + y_change));
                }
            }

            if dims.width < expanded.width || dims.height < expanded.height || x_change != 0.0 || y_change != 0.0 {
                let width = new_width + if x_change != 0.0 { origin.0 * x_change - width_change } else { 0.0 };
                let height = new_height + if y_change != 0.0 { origin.1 * y_change - height_change } else { 0.0 };
                let grown = Dimensions::new(width, height);
                dimensions.insert(parent_id.to_string(), grown);

                if cascade && parent.node.expand_parent {
                    if let Some(grandparent) = &parent.node.parent_id {
                        if let Some(position) = positions.get_mut(*parent_id) {
                            *position = Point::new(position.x.max(0.0), position.y.max(0.0));
                        }
                        next_level.push(ExpandChild {
                            id: parent_id.to_string(),
                            parent_id: grandparent.clone(),
                            rect: Rect::new(absolute.x - x_change, absolute.y - y_change, grown.width, grown.height),
                        });
                    }
                }
            }
        }

        level = next_level;
    }

    let mut changes: Vec<NodeChange> = positions
        .into_iter()
        .map(|(id, position)| NodeChange::position(id, position, None, None))
        .collect();
    changes.extend(
        dimensions
            .into_iter()
            .map(|(id, dims)| NodeChange::dimensions(id, dims, None, true)),
    );
    changes
}
