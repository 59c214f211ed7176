//! Change-sets: the only way node and edge lists are mutated.
//!
//! Gestures produce [`NodeChange`]/[`EdgeChange`] lists. In managed mode the
//! controller folds them in with [`apply_node_changes`]/[`apply_edge_changes`];
//! in controlled mode the owner folds them into its own state and hands the
//! result back, which [`diff_nodes`]/[`diff_edges`] reconcile.

use crate::edges::Edge;
use crate::geometry::{Dimensions, Point};
use crate::node::Node;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeChange {
    Add {
        item: Node,
        /// Insert position; appended when `None`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    Remove {
        id: String,
    },
    Replace {
        id: String,
        item: Node,
    },
    Select {
        id: String,
        selected: bool,
    },
    Position {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<Point>,
        #[serde(default, rename = "positionAbsolute", skip_serializing_if = "Option::is_none")]
        position_absolute: Option<Point>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dragging: Option<bool>,
    },
    Dimensions {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dimensions: Option<Dimensions>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        resizing: Option<bool>,
        /// Also write `width`/`height`, not only `measured`.
        #[serde(default, rename = "setAttributes")]
        set_attributes: bool,
    },
}

impl NodeChange {
    pub fn id(&self) -> &str {
        match self {
            NodeChange::Add { item, .. } => &item.id,
            NodeChange::Remove { id }
            | NodeChange::Replace { id, .. }
            | NodeChange::Select { id, .. }
            | NodeChange::Position { id, .. }
            | NodeChange::Dimensions { id, .. } => id,
        }
    }

    pub fn select(id: impl Into<String>, selected: bool) -> Self {
        NodeChange::Select { id: id.into(), selected }
    }

    pub fn position(id: impl Into<String>, position: Point, position_absolute: Option<Point>, dragging: Option<bool>) -> Self {
        NodeChange::Position {
            id: id.into(),
            position: Some(position),
            position_absolute,
            dragging,
        }
    }

    pub fn dimensions(id: impl Into<String>, dimensions: Dimensions, resizing: Option<bool>, set_attributes: bool) -> Self {
        NodeChange::Dimensions {
            id: id.into(),
            dimensions: Some(dimensions),
            resizing,
            set_attributes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EdgeChange {
    Add {
        item: Edge,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    Remove {
        id: String,
    },
    Replace {
        id: String,
        item: Edge,
    },
    Select {
        id: String,
        selected: bool,
    },
}

impl EdgeChange {
    pub fn id(&self) -> &str {
        match self {
            EdgeChange::Add { item, .. } => &item.id,
            EdgeChange::Remove { id } | EdgeChange::Replace { id, .. } | EdgeChange::Select { id, .. } => id,
        }
    }

    pub fn select(id: impl Into<String>, selected: bool) -> Self {
        EdgeChange::Select { id: id.into(), selected }
    }
}

/// Node and edge changes produced by one step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub nodes: Vec<NodeChange>,
    pub edges: Vec<EdgeChange>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn extend(&mut self, other: ChangeSet) {
        self.nodes.extend(other.nodes);
        self.edges.extend(other.edges);
    }
}

impl From<Vec<NodeChange>> for ChangeSet {
    fn from(nodes: Vec<NodeChange>) -> Self {
        Self { nodes, edges: Vec::new() }
    }
}

impl From<Vec<EdgeChange>> for ChangeSet {
    fn from(edges: Vec<EdgeChange>) -> Self {
        Self { nodes: Vec::new(), edges }
    }
}

// ============================================================================
// Apply
// ============================================================================

/// Records that change-sets can address by id.
trait Record: Clone {
    fn id(&self) -> &str;
}

impl Record for Node {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Edge {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Shared apply algorithm: removals drop, other changes mutate a copy in
/// order, additions land at their index or the end.
fn apply_changes<T, C>(
    changes: &[C],
    items: &[T],
    classify: impl Fn(&C) -> Applied<'_, T>,
    update: impl Fn(&mut T, &C),
) -> Vec<T>
where
    T: Record,
{
    let mut additions: Vec<(T, Option<usize>)> = Vec::new();
    let mut removed: HashSet<&str> = HashSet::new();
    let mut updates: HashMap<&str, Vec<&C>> = HashMap::new();
    for change in changes {
        match classify(change) {
            Applied::Add(item, index) => additions.push((item.clone(), index)),
            Applied::Remove(id) => {
                removed.insert(id);
            }
            Applied::Update(id) => updates.entry(id).or_default().push(change),
        }
    }

    let mut result = Vec::with_capacity(items.len() + additions.len());
    for item in items {
        if removed.contains(item.id()) {
            continue;
        }
        match updates.get(item.id()) {
            None => result.push(item.clone()),
            Some(changes) => {
                let mut updated = item.clone();
                for change in changes {
                    update(&mut updated, change);
                }
                result.push(updated);
            }
        }
    }

    for (item, index) in additions {
        match index {
            Some(index) if index < result.len() => result.insert(index, item),
            _ => result.push(item),
        }
    }
    result
}

enum Applied<'a, T> {
    Add(&'a T, Option<usize>),
    Remove(&'a str),
    Update(&'a str),
}

/// Applies node changes to a copy of `nodes`.
///
/// Changes naming unknown ids are ignored. The input is never modified, so a
/// caller can discard the result to reject the whole set.
pub fn apply_node_changes(changes: &[NodeChange], nodes: &[Node]) -> Vec<Node> {
    apply_changes(
        changes,
        nodes,
        |change| match change {
            NodeChange::Add { item, index } => Applied::Add(item, *index),
            NodeChange::Remove { id } => Applied::Remove(id),
            other => Applied::Update(other.id()),
        },
        apply_node_change,
    )
}

fn apply_node_change(node: &mut Node, change: &NodeChange) {
    match change {
        NodeChange::Replace { item, .. } => *node = item.clone(),
        NodeChange::Select { selected, .. } => node.selected = *selected,
        NodeChange::Position {
            position, dragging, ..
        } => {
            if let Some(position) = position {
                node.position = *position;
            }
            if let Some(dragging) = dragging {
                node.dragging = *dragging;
            }
        }
        NodeChange::Dimensions {
            dimensions,
            resizing,
            set_attributes,
            ..
        } => {
            if let Some(dimensions) = dimensions {
                node.measured = Some(*dimensions);
                if *set_attributes {
                    node.width = Some(dimensions.width);
                    node.height = Some(dimensions.height);
                }
            }
            if let Some(resizing) = resizing {
                node.resizing = *resizing;
            }
        }
        NodeChange::Add { .. } | NodeChange::Remove { .. } => {}
    }
}

/// Applies edge changes to a copy of `edges`.
pub fn apply_edge_changes(changes: &[EdgeChange], edges: &[Edge]) -> Vec<Edge> {
    apply_changes(
        changes,
        edges,
        |change| match change {
            EdgeChange::Add { item, index } => Applied::Add(item, *index),
            EdgeChange::Remove { id } => Applied::Remove(id),
            other => Applied::Update(other.id()),
        },
        |edge, change| match change {
            EdgeChange::Replace { item, .. } => *edge = item.clone(),
            EdgeChange::Select { selected, .. } => edge.selected = *selected,
            EdgeChange::Add { .. } | EdgeChange::Remove { .. } => {}
        },
    )
}

// ============================================================================
// Reconciliation
// ============================================================================

fn diff_records<T, C>(
    current: &[T],
    incoming: &[T],
    add: impl Fn(&T, usize) -> C,
    replace: impl Fn(&T) -> C,
    remove: impl Fn(&str) -> C,
) -> Vec<C>
where
    T: Record + PartialEq,
{
    let existing: HashMap<&str, &T> = current.iter().map(|item| (item.id(), item)).collect();
    let incoming_ids: HashSet<&str> = incoming.iter().map(Record::id).collect();

    let mut changes = Vec::new();
    for (index, item) in incoming.iter().enumerate() {
        match existing.get(item.id()) {
            None => changes.push(add(item, index)),
            Some(&old) if old != item => changes.push(replace(item)),
            Some(_) => {}
        }
    }
    for item in current {
        if !incoming_ids.contains(item.id()) {
            changes.push(remove(item.id()));
        }
    }
    changes
}

/// Minimal changes turning `current` into `incoming`.
///
/// Each incoming record is an `Add` (new id), a `Replace` (different value)
/// or skipped (equal); ids missing from `incoming` become `Remove`.
pub fn diff_nodes(current: &[Node], incoming: &[Node]) -> Vec<NodeChange> {
    diff_records(
        current,
        incoming,
        |item, index| NodeChange::Add { item: item.clone(), index: Some(index) },
        |item| NodeChange::Replace { id: item.id.clone(), item: item.clone() },
        |id| NodeChange::Remove { id: id.to_string() },
    )
}

pub fn diff_edges(current: &[Edge], incoming: &[Edge]) -> Vec<EdgeChange> {
    diff_records(
        current,
        incoming,
        |item, index| EdgeChange::Add { item: item.clone(), index: Some(index) },
        |item| EdgeChange::Replace { id: item.id.clone(), item: item.clone() },
        |id| EdgeChange::Remove { id: id.to_string() },
    )
}
