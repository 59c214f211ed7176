//! Click and marquee selection.
//!
//! Selection state lives on the records (`Node::selected`, `Edge::selected`).
//! Everything here computes the next selected set and turns it into
//! `Select` changes for the ids whose state flips, never for the rest.

use crate::changes::{ChangeSet, EdgeChange, NodeChange};
use crate::edges::Edge;
use crate::geometry::{get_overlapping_area, rect_to_flow_rect, Point, Rect, Transform};
use crate::hierarchy::NodeLookup;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How much of a node a marquee must cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Any overlap selects.
    Partial,
    /// The node must be fully enclosed.
    #[default]
    Full,
}

#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct SelectionManager {
    selected: HashSet<String>,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            selected: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Handle selection of an item based on interaction modifiers
    ///
    /// Without `multi` the item becomes the only selected one; with `multi`
    /// it is toggled.
    pub fn handle_interaction(&mut self, id: &str, multi: bool) {
        if multi {
            if !self.selected.remove(id) {
                self.selected.insert(id.to_string());
            }
        } else {
            if self.selected.len() == 1 && self.selected.contains(id) {
                return;
            }
            self.selected.clear();
            self.selected.insert(id.to_string());
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Replace the current selection with a new set of ids
    pub fn replace_selection<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected.clear();
        self.selected.extend(ids.into_iter().map(Into::into));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.selected.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// `Select` changes turning the nodes' current state into this selection.
    pub fn node_changes(&self, lookup: &NodeLookup) -> Vec<NodeChange> {
        lookup
            .nodes()
            .filter(|node| node.selected != self.contains(&node.id))
            .map(|node| NodeChange::select(node.id.clone(), !node.selected))
            .collect()
    }

    /// `Select` changes turning the edges' current state into this selection.
    pub fn edge_changes(&self, edges: &[Edge]) -> Vec<EdgeChange> {
        edges
            .iter()
            .filter(|edge| edge.selected != self.contains(&edge.id))
            .map(|edge| EdgeChange::select(edge.id.clone(), !edge.selected))
            .collect()
    }
}

/// Nodes covered by `rect` (flow space).
///
/// Nodes without a measured size count as covered so they do not flicker
/// out of a selection while they are being laid out. Hidden nodes never are.
pub fn get_nodes_inside<'a>(
    lookup: &'a NodeLookup,
    rect: &Rect,
    mode: SelectionMode,
    selectable_only: Option<bool>,
) -> Vec<&'a str> {
    lookup
        .iter()
        .filter(|node| !node.node.hidden)
        .filter(|node| selectable_only.map_or(true, |default| node.node.is_selectable(default)))
        .filter(|node| {
            if !node.node.is_measured() {
                return true;
            }
            let node_rect = node.rect();
            let overlap = get_overlapping_area(rect, &node_rect);
            match mode {
                SelectionMode::Partial => overlap > 0.0,
                SelectionMode::Full => overlap >= node_rect.dimensions().area(),
            }
        })
        .map(|node| node.id())
        .collect()
}

/// Deselects everything that is selected.
pub fn unselect_all(lookup: &NodeLookup, edges: &[Edge]) -> ChangeSet {
    let none = SelectionManager::new();
    ChangeSet {
        nodes: none.node_changes(lookup),
        edges: none.edge_changes(edges),
    }
}

/// Selects every selectable node and edge.
pub fn select_all(lookup: &NodeLookup, edges: &[Edge], nodes_selectable: bool, edges_selectable: bool) -> ChangeSet {
    let nodes = SelectionManager::from_ids(
        lookup
            .nodes()
            .filter(|node| !node.hidden && node.is_selectable(nodes_selectable))
            .map(|node| node.id.as_str()),
    );
    let edges_selected = SelectionManager::from_ids(
        edges
            .iter()
            .filter(|edge| !edge.hidden && edge.is_selectable(edges_selectable))
            .map(|edge| edge.id.as_str()),
    );
    ChangeSet {
        nodes: nodes.node_changes(lookup),
        edges: edges_selected.edge_changes(edges),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarqueeOptions {
    pub mode: SelectionMode,
    pub nodes_selectable: bool,
    pub edges_selectable: bool,
}

impl Default for MarqueeOptions {
    fn default() -> Self {
        Self {
            mode: SelectionMode::Full,
            nodes_selectable: true,
            edges_selectable: true,
        }
    }
}

/// A marquee (rubber band) selection gesture.
///
/// Changes are diffed against what this gesture last emitted, so each update
/// only carries the ids that entered or left the rectangle.
#[derive(Debug, Clone)]
pub struct Marquee {
    start: Point,
    current: Point,
    additive: bool,
    initial_nodes: HashSet<String>,
    initial_edges: HashSet<String>,
    nodes: HashSet<String>,
    edges: HashSet<String>,
}

impl Marquee {
    /// Starts at `start` (screen space).
    ///
    /// An `additive` marquee keeps the selection that existed before it.
    pub fn new(start: Point, additive: bool, lookup: &NodeLookup, edges: &[Edge]) -> Self {
        let nodes: HashSet<String> = lookup.nodes().filter(|n| n.selected).map(|n| n.id.clone()).collect();
        let edges: HashSet<String> = edges.iter().filter(|e| e.selected).map(|e| e.id.clone()).collect();
        tracing::debug!(additive, "marquee started");
        Self {
            start,
            current: start,
            additive,
            initial_nodes: nodes.clone(),
            initial_edges: edges.clone(),
            nodes,
            edges,
        }
    }

    /// Current rectangle in screen space.
    pub fn rect(&self) -> Rect {
        Rect::new(
            self.start.x.min(self.current.x),
            self.start.y.min(self.current.y),
            (self.current.x - self.start.x).abs(),
            (self.current.y - self.start.y).abs(),
        )
    }

    pub fn selected_nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    /// Moves the free corner to `pointer` (screen space) and returns the flips.
    pub fn update(
        &mut self,
        pointer: Point,
        lookup: &NodeLookup,
        edges: &[Edge],
        transform: &Transform,
        options: &MarqueeOptions,
    ) -> ChangeSet {
        self.current = pointer;
        let flow_rect = rect_to_flow_rect(&self.rect(), transform);

        let inside = get_nodes_inside(lookup, &flow_rect, options.mode, Some(options.nodes_selectable));
        let mut next_nodes: HashSet<String> = inside.iter().map(|id| id.to_string()).collect();
        let mut next_edges: HashSet<String> = if options.edges_selectable {
            edges
                .iter()
                .filter(|edge| edge.is_selectable(true) && !edge.hidden)
                .filter(|edge| next_nodes.contains(&edge.source) || next_nodes.contains(&edge.target))
                .map(|edge| edge.id.clone())
                .collect()
        } else {
            HashSet::new()
        };
        if self.additive {
            next_nodes.extend(self.initial_nodes.iter().cloned());
            next_edges.extend(self.initial_edges.iter().cloned());
        }

        let nodes = flips(&self.nodes, &next_nodes, lookup.nodes().map(|n| n.id.as_str()))
            .map(|(id, selected)| NodeChange::select(id, selected))
            .collect();
        let edge_changes = flips(&self.edges, &next_edges, edges.iter().map(|e| e.id.as_str()))
            .map(|(id, selected)| EdgeChange::select(id, selected))
            .collect();

        self.nodes = next_nodes;
        self.edges = next_edges;
        ChangeSet { nodes, edges: edge_changes }
    }
}

/// Ids (in `order`) whose membership differs between `previous` and `next`.
fn flips<'a>(
    previous: &'a HashSet<String>,
    next: &'a HashSet<String>,
    order: impl Iterator<Item = &'a str> + 'a,
) -> impl Iterator<Item = (String, bool)> + 'a {
    order.filter_map(move |id| {
        let now = next.contains(id);
        (previous.contains(id) != now).then(|| (id.to_string(), now))
    })
}
