//! Type-tag registries with a mandatory default entry.
//!
//! Nodes and edges name their renderer with a free-form `type` string. A
//! registry maps those tags to handlers; an unknown tag falls back to the
//! default handler and is reported as [`IssueKind::MissingType`].

use crate::error::{FlowIssue, IssueKind};
use crate::geometry::Dimensions;
use crate::node::{HandleBound, HandleType, Node, NodeHandleBounds, Position};
use crate::path::{compute_path, EdgePath, Endpoints, PathOptions, PathVariant};
use std::collections::HashMap;
use std::fmt;

pub struct TypeRegistry<T> {
    default: T,
    entries: HashMap<String, T>,
}

impl<T> TypeRegistry<T> {
    pub fn new(default: T) -> Self {
        Self {
            default,
            entries: HashMap::new(),
        }
    }

    /// Registers `handler` for `tag`, returning the handler it replaced.
    pub fn register(&mut self, tag: impl Into<String>, handler: T) -> Option<T> {
        self.entries.insert(tag.into(), handler)
    }

    pub fn get(&self, tag: &str) -> Option<&T> {
        self.entries.get(tag)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.entries.contains_key(tag)
    }

    pub fn default_handler(&self) -> &T {
        &self.default
    }

    /// Handler for `tag`; `None` selects the default silently.
    ///
    /// An unknown tag selects the default and pushes a `MissingType` issue.
    pub fn resolve(&self, tag: Option<&str>, id: &str, issues: &mut Vec<FlowIssue>) -> &T {
        let Some(tag) = tag else {
            return &self.default;
        };
        match self.entries.get(tag) {
            Some(handler) => handler,
            None => {
                issues.push(
                    FlowIssue::new(IssueKind::MissingType, format!("no handler registered for type `{tag}`, using default"))
                        .with_id(id),
                );
                &self.default
            }
        }
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl<T> fmt::Debug for TypeRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&str> = self.tags().collect();
        tags.sort_unstable();
        f.debug_struct("TypeRegistry").field("tags", &tags).finish()
    }
}

// ============================================================================
// Edges
// ============================================================================

/// Geometry behaviour of an edge type.
pub trait EdgeGeometry {
    fn path(&self, endpoints: &Endpoints, options: &PathOptions) -> EdgePath;
}

/// Built-in edge geometry for one [`PathVariant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantEdge(pub PathVariant);

impl EdgeGeometry for VariantEdge {
    fn path(&self, endpoints: &Endpoints, options: &PathOptions) -> EdgePath {
        compute_path(self.0, endpoints, options)
    }
}

impl<F> EdgeGeometry for F
where
    F: Fn(&Endpoints, &PathOptions) -> EdgePath,
{
    fn path(&self, endpoints: &Endpoints, options: &PathOptions) -> EdgePath {
        self(endpoints, options)
    }
}

pub type EdgeTypeRegistry = TypeRegistry<Box<dyn EdgeGeometry>>;

impl EdgeTypeRegistry {
    /// Registry with the built-in edge types; `default` and `bezier` both map to bezier.
    pub fn with_builtin_edges() -> Self {
        let mut registry: EdgeTypeRegistry = TypeRegistry::new(Box::new(VariantEdge(PathVariant::Bezier)));
        for (tag, variant) in [
            ("default", PathVariant::Bezier),
            ("bezier", PathVariant::Bezier),
            ("straight", PathVariant::Straight),
            ("step", PathVariant::Step),
            ("smoothstep", PathVariant::SmoothStep),
            ("simplebezier", PathVariant::SimpleBezier),
        ] {
            registry.register(tag, Box::new(VariantEdge(variant)));
        }
        registry
    }
}

impl Default for EdgeTypeRegistry {
    fn default() -> Self {
        Self::with_builtin_edges()
    }
}

// ============================================================================
// Nodes
// ============================================================================

/// Behaviour of a node type: which handles it offers before being measured.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeTypeSpec {
    pub handles: Vec<HandleType>,
}

impl NodeTypeSpec {
    pub fn new(handles: impl IntoIterator<Item = HandleType>) -> Self {
        Self {
            handles: handles.into_iter().collect(),
        }
    }

    /// Handles centred on the node's source/target sides.
    pub fn default_handles(&self, node: &Node, dimensions: Dimensions) -> NodeHandleBounds {
        NodeHandleBounds::from_handles(self.handles.iter().map(|&handle_type| {
            let position = match handle_type {
                HandleType::Source => node.source_position.unwrap_or(Position::Bottom),
                HandleType::Target => node.target_position.unwrap_or(Position::Top),
            };
            HandleBound::centered(handle_type, position, dimensions)
        }))
    }
}

pub type NodeTypeRegistry = TypeRegistry<NodeTypeSpec>;

impl NodeTypeRegistry {
    /// `input`, `output`, `default` and `group`; the default has both handle types.
    pub fn with_builtin_nodes() -> Self {
        let default = NodeTypeSpec::new([HandleType::Target, HandleType::Source]);
        let mut registry = TypeRegistry::new(default.clone());
        registry.register("default", default);
        registry.register("input", NodeTypeSpec::new([HandleType::Source]));
        registry.register("output", NodeTypeSpec::new([HandleType::Target]));
        registry.register("group", NodeTypeSpec::default());
        registry
    }
}

impl Default for NodeTypeRegistry {
    fn default() -> Self {
        Self::with_builtin_nodes()
    }
}
