//! Node hierarchy resolution.
//!
//! Nodes reference their parent by id only. [`resolve`] turns the flat list
//! into a [`NodeLookup`]: an id-indexed map of [`InternalNode`]s with absolute
//! positions, render z, depth and the derived `is_parent` flag, plus a
//! parent-to-children index. No owning tree is built; re-parenting a node is
//! just another resolve.

use crate::error::{FlowError, Result};
use crate::geometry::{clamp_position, get_bounds_of_rects, CoordinateExtent, Point, Rect};
use crate::node::{InternalNode, Node, NodeExtent, NodeHandleBounds, NodeOrigin};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

/// Added to a selected node's z when elevation on select is enabled.
pub const ELEVATION_BONUS: i32 = 1000;

/// Global inputs of a resolve pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolveOptions {
    pub node_origin: NodeOrigin,
    /// Clamp region for root nodes without their own extent.
    pub node_extent: CoordinateExtent,
    pub elevate_on_select: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            node_origin: NodeOrigin::TOP_LEFT,
            node_extent: CoordinateExtent::INFINITE,
            elevate_on_select: true,
        }
    }
}

/// Resolved nodes keyed by id, in input order.
#[derive(Debug, Clone, Default)]
pub struct NodeLookup {
    nodes: IndexMap<String, InternalNode>,
    children: HashMap<String, Vec<String>>,
}

#[derive(Clone, Copy)]
struct Resolved {
    position: Point,
    z: i32,
    depth: usize,
}

/// Resolves absolute geometry for every node.
///
/// `previous` supplies handle bounds to carry over; handle geometry only
/// changes through measurement, not through moves.
///
/// Fails with [`FlowError::MissingParent`] or [`FlowError::ParentCycle`] when a
/// parent chain is broken. No partial lookup is returned in that case.
pub fn resolve(
    nodes: &[Node],
    previous: Option<&NodeLookup>,
    options: &ResolveOptions,
) -> Result<NodeLookup> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        if index.insert(node.id.as_str(), i).is_some() {
            tracing::warn!(id = %node.id, "duplicate node id, later record wins");
        }
    }

    let mut children: HashMap<String, Vec<String>> = HashMap::new();
    for node in nodes {
        if let Some(parent_id) = &node.parent_id {
            children
                .entry(parent_id.clone())
                .or_default()
                .push(node.id.clone());
        }
    }

    let mut memo: Vec<Option<Resolved>> = vec![None; nodes.len()];
    let mut on_chain = vec![false; nodes.len()];
    let mut chain: Vec<usize> = Vec::new();

    for start in 0..nodes.len() {
        if memo[start].is_some() {
            continue;
        }

        // Walk up until a resolved ancestor or a root is found.
        let mut current = start;
        loop {
            if memo[current].is_some() {
                break;
            }
            if on_chain[current] {
                return Err(FlowError::ParentCycle {
                    node_id: nodes[start].id.clone(),
                });
            }
            on_chain[current] = true;
            chain.push(current);

            match &nodes[current].parent_id {
                None => break,
                Some(parent_id) => match index.get(parent_id.as_str()) {
                    Some(&parent) => current = parent,
                    None => {
                        return Err(FlowError::MissingParent {
                            node_id: nodes[current].id.clone(),
                            parent_id: parent_id.clone(),
                        })
                    }
                },
            }
        }

        while let Some(i) = chain.pop() {
            on_chain[i] = false;
            let node = &nodes[i];
            let parent = node
                .parent_id
                .as_deref()
                .and_then(|id| index.get(id))
                .and_then(|&p| memo[p]);
            memo[i] = Some(resolve_one(node, parent, options));
        }
    }

    let mut lookup = NodeLookup {
        nodes: IndexMap::with_capacity(nodes.len()),
        children,
    };
    for (i, node) in nodes.iter().enumerate() {
        let Some(resolved) = memo[i] else { continue };
        let handle_bounds = previous
            .and_then(|prev| prev.get(&node.id))
            .and_then(|prev| prev.handle_bounds.clone());
        let is_parent = lookup.children.contains_key(&node.id);
        lookup.nodes.insert(
            node.id.clone(),
            InternalNode {
                node: node.clone(),
                position_absolute: resolved.position,
                z: resolved.z,
                depth: resolved.depth,
                handle_bounds,
                is_parent,
            },
        );
    }

    tracing::trace!(nodes = lookup.len(), "resolved node hierarchy");
    Ok(lookup)
}

fn resolve_one(node: &Node, parent: Option<Resolved>, options: &ResolveOptions) -> Resolved {
    let dimensions = node.dimensions();
    let origin = node.origin.unwrap_or(options.node_origin);
    let local = node.position - origin.offset(dimensions);

    let mut z = node.z_index.unwrap_or(0);
    if node.selected && options.elevate_on_select {
        z += ELEVATION_BONUS;
    }

    match parent {
        Some(parent) => Resolved {
            position: parent.position + local,
            z: z.max(parent.z),
            depth: parent.depth + 1,
        },
        None => {
            let extent = match node.extent {
                Some(NodeExtent::Rect(extent)) => extent,
                _ => options.node_extent,
            };
            Resolved {
                position: clamp_position(local, &extent, dimensions),
                z,
                depth: 0,
            }
        }
    }
}

impl NodeLookup {
    pub fn get(&self, id: &str) -> Option<&InternalNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Internal nodes in input order.
    pub fn iter(&self) -> impl Iterator<Item = &InternalNode> {
        self.nodes.values()
    }

    /// The user records, in input order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().map(|internal| &internal.node)
    }

    /// Ids of the nodes naming `id` as their parent.
    pub fn children(&self, id: &str) -> &[String] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn parent(&self, id: &str) -> Option<&InternalNode> {
        let parent_id = self.get(id)?.node.parent_id.as_deref()?;
        self.get(parent_id)
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a InternalNode> + 'a {
        let mut current = self.parent(id);
        let mut remaining = self.len();
        std::iter::from_fn(move || {
            if remaining == 0 {
                return None;
            }
            remaining -= 1;
            let node = current?;
            current = self.parent(node.id());
            Some(node)
        })
    }

    /// True if any ancestor of `id` satisfies `predicate`.
    pub fn has_ancestor(&self, id: &str, predicate: impl Fn(&InternalNode) -> bool) -> bool {
        self.ancestors(id).any(predicate)
    }

    /// All transitive children of `id`.
    pub fn descendants(&self, id: &str) -> Vec<String> {
        let mut result = Vec::new();
        let mut seen = HashSet::new();
        let mut queue: Vec<&str> = vec![id];
        while let Some(current) = queue.pop() {
            for child in self.children(current) {
                if seen.insert(child.as_str()) {
                    result.push(child.clone());
                    queue.push(child);
                }
            }
        }
        result
    }

    /// Visible nodes sorted back to front.
    ///
    /// Ties on z are broken by depth so children draw over their parents,
    /// then by input order.
    pub fn render_order(&self) -> Vec<&InternalNode> {
        let mut visible: Vec<&InternalNode> = self.iter().filter(|n| !n.node.hidden).collect();
        visible.sort_by_key(|n| (n.z, n.depth));
        visible
    }

    /// Bounding rectangle of the given nodes, or `None` if none of them exist.
    pub fn get_nodes_bounds<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> Option<Rect> {
        let rects: Vec<Rect> = ids
            .into_iter()
            .filter_map(|id| self.get(id))
            .map(InternalNode::rect)
            .collect();
        get_bounds_of_rects(&rects)
    }

    /// Bounding rectangle of all visible nodes.
    pub fn visible_bounds(&self) -> Option<Rect> {
        let rects: Vec<Rect> = self
            .iter()
            .filter(|n| !n.node.hidden)
            .map(InternalNode::rect)
            .collect();
        get_bounds_of_rects(&rects)
    }

    pub(crate) fn set_handle_bounds(&mut self, id: &str, bounds: NodeHandleBounds) -> bool {
        match self.nodes.get_mut(id) {
            Some(node) => {
                node.handle_bounds = Some(bounds);
                true
            }
            None => false,
        }
    }
}
