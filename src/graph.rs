//! Graph queries over nodes and edges.
//!
//! Pure helpers: nothing here mutates the controller's state. Functions taking
//! `&mut Vec<Edge>` operate on caller-owned lists.

use crate::edges::Edge;
use crate::hierarchy::NodeLookup;
use crate::node::Node;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A source/target handle pair, before it becomes an [`Edge`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub source: String,
    pub source_handle: Option<String>,
    pub target: String,
    pub target_handle: Option<String>,
}

impl Connection {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            source_handle: None,
            target: target.into(),
            target_handle: None,
        }
    }

    pub fn with_handles(mut self, source_handle: Option<&str>, target_handle: Option<&str>) -> Self {
        self.source_handle = source_handle.map(str::to_owned);
        self.target_handle = target_handle.map(str::to_owned);
        self
    }

    pub fn of_edge(edge: &Edge) -> Self {
        Self {
            source: edge.source.clone(),
            source_handle: edge.source_handle.clone(),
            target: edge.target.clone(),
            target_handle: edge.target_handle.clone(),
        }
    }

    /// True if `edge` joins exactly the same two handles.
    pub fn matches(&self, edge: &Edge) -> bool {
        edge.source == self.source
            && edge.target == self.target
            && edge.source_handle == self.source_handle
            && edge.target_handle == self.target_handle
    }

    /// New edge with the deterministic id of this connection.
    pub fn to_edge(&self) -> Edge {
        let mut edge = Edge::new(edge_id(self), self.source.clone(), self.target.clone());
        edge.source_handle = self.source_handle.clone();
        edge.target_handle = self.target_handle.clone();
        edge
    }
}

/// Deterministic edge id: `xy-edge__{source}{sourceHandle}-{target}{targetHandle}`.
///
/// Missing handles contribute nothing.
pub fn edge_id(connection: &Connection) -> String {
    format!(
        "xy-edge__{}{}-{}{}",
        connection.source,
        connection.source_handle.as_deref().unwrap_or(""),
        connection.target,
        connection.target_handle.as_deref().unwrap_or("")
    )
}

/// Check if an edge joining the same handles already exists
pub fn connection_exists<'a, I>(connection: &Connection, edges: I) -> bool
where
    I: IntoIterator<Item = &'a Edge>,
{
    edges.into_iter().any(|edge| connection.matches(edge))
}

/// Appends `edge` unless an edge with the same handles or id exists.
///
/// Returns `true` if the edge was added.
pub fn add_edge(edge: Edge, edges: &mut Vec<Edge>) -> bool {
    let connection = Connection::of_edge(&edge);
    if edges.iter().any(|e| e.id == edge.id || connection.matches(e)) {
        tracing::debug!(id = %edge.id, "duplicate edge suppressed");
        return false;
    }
    edges.push(edge);
    true
}

/// Moves `old_id` onto the handles of `connection`.
///
/// The edge gets the connection's deterministic id unless `keep_id` is set.
/// Returns the updated edge, or `None` if `old_id` is unknown or the target
/// handles are already joined by another edge.
pub fn reconnect_edge(old_id: &str, connection: &Connection, keep_id: bool, edges: &mut [Edge]) -> Option<Edge> {
    if edges.iter().any(|e| e.id != old_id && connection.matches(e)) {
        return None;
    }
    let edge = edges.iter_mut().find(|e| e.id == old_id)?;
    edge.source = connection.source.clone();
    edge.target = connection.target.clone();
    edge.source_handle = connection.source_handle.clone();
    edge.target_handle = connection.target_handle.clone();
    if !keep_id {
        edge.id = edge_id(connection);
    }
    Some(edge.clone())
}

/// Find all edges connected to any of the given nodes
pub fn get_connected_edges<'a, 'n>(
    node_ids: impl IntoIterator<Item = &'n str>,
    edges: &'a [Edge],
) -> Vec<&'a Edge> {
    let ids: HashSet<&str> = node_ids.into_iter().collect();
    edges
        .iter()
        .filter(|edge| ids.contains(edge.source.as_str()) || ids.contains(edge.target.as_str()))
        .collect()
}

/// Nodes with an edge into `node_id`.
pub fn get_incomers<'a>(node_id: &str, lookup: &'a NodeLookup, edges: &[Edge]) -> Vec<&'a Node> {
    let sources: HashSet<&str> = edges
        .iter()
        .filter(|edge| edge.target == node_id)
        .map(|edge| edge.source.as_str())
        .collect();
    lookup.nodes().filter(|node| sources.contains(node.id.as_str())).collect()
}

/// Nodes with an edge out of `node_id`.
pub fn get_outgoers<'a>(node_id: &str, lookup: &'a NodeLookup, edges: &[Edge]) -> Vec<&'a Node> {
    let targets: HashSet<&str> = edges
        .iter()
        .filter(|edge| edge.source == node_id)
        .map(|edge| edge.target.as_str())
        .collect();
    lookup.nodes().filter(|node| targets.contains(node.id.as_str())).collect()
}

/// Everything removed by a delete request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Removal {
    pub nodes: Vec<String>,
    pub edges: Vec<String>,
}

impl Removal {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// Expands a delete request.
///
/// Removing a node also removes its descendants and every edge touching any
/// removed node. Unknown ids are ignored. Output keeps lookup/edge order.
pub fn get_elements_to_remove<'n, 'e>(
    lookup: &NodeLookup,
    edges: &[Edge],
    nodes_to_remove: impl IntoIterator<Item = &'n str>,
    edges_to_remove: impl IntoIterator<Item = &'e str>,
) -> Removal {
    let mut node_ids: HashSet<String> = HashSet::new();
    for id in nodes_to_remove {
        if lookup.contains(id) && node_ids.insert(id.to_string()) {
            node_ids.extend(lookup.descendants(id));
        }
    }
    let requested_edges: HashSet<&str> = edges_to_remove.into_iter().collect();

    let nodes = lookup
        .iter()
        .map(|node| node.id())
        .filter(|id| node_ids.contains(*id))
        .map(str::to_owned)
        .collect();
    let edges = edges
        .iter()
        .filter(|edge| {
            requested_edges.contains(edge.id.as_str())
                || node_ids.contains(&edge.source)
                || node_ids.contains(&edge.target)
        })
        .map(|edge| edge.id.clone())
        .collect();

    Removal { nodes, edges }
}

// ============================================================================
// Tests
// ============================================================================
