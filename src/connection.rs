//! Edge creation gestures and connection validation.
//!
//! A connection starts on a handle (pointer-down, or the first click of
//! click-to-connect), follows the pointer while the handle closest to it is
//! re-evaluated, and ends either in a [`Connection`] or in nothing. Validity
//! during the move is only a flag; edges are created by the caller from the
//! committed connection.
//!
//! Rules are checked in this order:
//! 1. the candidate is not the origin handle itself,
//! 2. the candidate's node is connectable,
//! 3. in [`ConnectionMode::Strict`], handle types are opposite,
//! 4. the caller's [`ConnectionValidator`], if any.

use crate::edges::{node_handle_bounds, Edge};
use crate::error::{FlowIssue, IssueKind};
use crate::geometry::Point;
use crate::graph::{connection_exists, Connection};
use crate::hierarchy::NodeLookup;
use crate::node::{HandleBound, HandleType, Position};
use crate::path::{compute_path, EdgePath, Endpoints, PathOptions, PathVariant};
use crate::registry::NodeTypeRegistry;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which handle pairs may be connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// Source handles only connect to target handles.
    #[default]
    Strict,
    /// Any two distinct handles connect.
    Loose,
}

/// Identifies one handle of one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleRef {
    pub node_id: String,
    pub handle_id: Option<String>,
    pub handle_type: HandleType,
}

impl HandleRef {
    pub fn new(node_id: impl Into<String>, handle_id: Option<&str>, handle_type: HandleType) -> Self {
        Self {
            node_id: node_id.into(),
            handle_id: handle_id.map(str::to_owned),
            handle_type,
        }
    }

    /// Connection from this handle to `to`, oriented source to target.
    ///
    /// A gesture started on a target handle is flipped so that the other
    /// end becomes the source.
    pub fn connection_to(&self, to: &HandleRef) -> Connection {
        let (source, target) = match self.handle_type {
            HandleType::Target => (to, self),
            HandleType::Source => (self, to),
        };
        Connection::new(source.node_id.clone(), target.node_id.clone())
            .with_handles(source.handle_id.as_deref(), target.handle_id.as_deref())
    }
}

// ============================================================================
// Validation framework
// ============================================================================

/// Result of connection validation with optional rejection reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(ValidationError),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// Combine two results (AND logic): returns first error if any
    pub fn and(self, other: ValidationResult) -> ValidationResult {
        match self {
            ValidationResult::Valid => other,
            invalid => invalid,
        }
    }

    pub fn into_result(self) -> Result<(), ValidationError> {
        match self {
            ValidationResult::Valid => Ok(()),
            ValidationResult::Invalid(error) => Err(error),
        }
    }
}

/// Reasons why a connection was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The node or handle does not exist
    HandleNotFound { node_id: String, handle_id: Option<String> },
    /// Cannot connect a handle to itself
    SameHandle,
    /// The node does not accept connections
    NotConnectable(String),
    /// Both handles are sources or both are targets
    IncompatibleDirection,
    /// An edge between these handles already exists
    DuplicateConnection,
    /// Custom validation failure
    Custom(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HandleNotFound { node_id, handle_id } => match handle_id {
                Some(handle_id) => write!(f, "Handle {}:{} not found", node_id, handle_id),
                None => write!(f, "Node {} has no handle of that type", node_id),
            },
            Self::SameHandle => write!(f, "Cannot connect handle to itself"),
            Self::NotConnectable(id) => write!(f, "Node {} is not connectable", id),
            Self::IncompatibleDirection => write!(f, "Must connect source to target"),
            Self::DuplicateConnection => write!(f, "Connection already exists"),
            Self::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl From<ValidationError> for FlowIssue {
    fn from(error: ValidationError) -> Self {
        FlowIssue::new(IssueKind::ConstraintViolation, error.to_string())
    }
}

/// Everything a validator may look at.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionAttempt<'a> {
    pub from: &'a HandleRef,
    pub to: &'a HandleRef,
    /// `from` to `to`, already oriented source to target.
    pub connection: &'a Connection,
    pub mode: ConnectionMode,
    pub edges: &'a [Edge],
}

/// Trait for custom connection validation logic.
///
/// Compose several with [`CompositeValidator`].
pub trait ConnectionValidator {
    fn validate(&self, attempt: &ConnectionAttempt<'_>) -> ValidationResult;
}

/// Rejects same-type pairs in strict mode.
#[derive(Clone, Copy, Debug, Default)]
pub struct HandleTypeValidator;

impl ConnectionValidator for HandleTypeValidator {
    fn validate(&self, attempt: &ConnectionAttempt<'_>) -> ValidationResult {
        if attempt.mode == ConnectionMode::Strict && attempt.from.handle_type == attempt.to.handle_type {
            ValidationResult::Invalid(ValidationError::IncompatibleDirection)
        } else {
            ValidationResult::Valid
        }
    }
}

/// Validator that prevents duplicate edges
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDuplicatesValidator;

impl ConnectionValidator for NoDuplicatesValidator {
    fn validate(&self, attempt: &ConnectionAttempt<'_>) -> ValidationResult {
        if connection_exists(attempt.connection, attempt.edges) {
            ValidationResult::Invalid(ValidationError::DuplicateConnection)
        } else {
            ValidationResult::Valid
        }
    }
}

/// Caller-supplied veto over otherwise valid connections.
pub struct PredicateValidator<F> {
    predicate: F,
    message: String,
}

impl<F> PredicateValidator<F>
where
    F: Fn(&Connection) -> bool,
{
    pub fn new(predicate: F) -> Self {
        Self {
            predicate,
            message: "Connection rejected".to_string(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl<F> ConnectionValidator for PredicateValidator<F>
where
    F: Fn(&Connection) -> bool,
{
    fn validate(&self, attempt: &ConnectionAttempt<'_>) -> ValidationResult {
        if (self.predicate)(attempt.connection) {
            ValidationResult::Valid
        } else {
            ValidationResult::Invalid(ValidationError::Custom(self.message.clone()))
        }
    }
}

/// Composite validator that combines multiple validators
///
/// All validators must return Valid for the connection to be valid (AND
/// logic). Returns the first error encountered.
#[derive(Default)]
pub struct CompositeValidator {
    validators: Vec<Box<dyn ConnectionValidator>>,
}

impl CompositeValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validators are checked in the order they were added.
    pub fn add<V: ConnectionValidator + 'static>(mut self, validator: V) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl ConnectionValidator for CompositeValidator {
    fn validate(&self, attempt: &ConnectionAttempt<'_>) -> ValidationResult {
        for validator in &self.validators {
            let result = validator.validate(attempt);
            if !result.is_valid() {
                return result;
            }
        }
        ValidationResult::Valid
    }
}

impl fmt::Debug for CompositeValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeValidator")
            .field("validators", &self.validators.len())
            .finish()
    }
}

// ============================================================================
// Gesture
// ============================================================================

/// Read-only inputs of connection evaluation.
#[derive(Clone, Copy)]
pub struct ConnectionContext<'a> {
    pub lookup: &'a NodeLookup,
    pub node_types: &'a NodeTypeRegistry,
    pub edges: &'a [Edge],
    pub mode: ConnectionMode,
    /// Snap distance in flow units.
    pub radius: f32,
    /// Default for nodes without their own `connectable`.
    pub nodes_connectable: bool,
    pub validator: Option<&'a dyn ConnectionValidator>,
}

/// A handle near the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct HandleCandidate {
    pub handle: HandleRef,
    /// Absolute attach point.
    pub anchor: Point,
    pub position: Position,
}

/// Validates connecting `from` to `to`.
pub fn validate_connection(from: &HandleRef, to: &HandleRef, context: &ConnectionContext<'_>) -> ValidationResult {
    if from == to {
        return ValidationResult::Invalid(ValidationError::SameHandle);
    }
    let Some(node) = context.lookup.get(&to.node_id) else {
        return ValidationResult::Invalid(ValidationError::HandleNotFound {
            node_id: to.node_id.clone(),
            handle_id: to.handle_id.clone(),
        });
    };
    if !node.node.is_connectable(context.nodes_connectable) {
        return ValidationResult::Invalid(ValidationError::NotConnectable(to.node_id.clone()));
    }

    let connection = from.connection_to(to);
    let attempt = ConnectionAttempt {
        from,
        to,
        connection: &connection,
        mode: context.mode,
        edges: context.edges,
    };
    let builtin = HandleTypeValidator.validate(&attempt);
    match context.validator {
        Some(validator) if builtin.is_valid() => validator.validate(&attempt),
        _ => builtin,
    }
}

/// Absolute anchor of a handle, or `None` if the node or handle is unknown.
pub fn handle_anchor(
    handle: &HandleRef,
    lookup: &NodeLookup,
    node_types: &NodeTypeRegistry,
    issues: &mut Vec<FlowIssue>,
) -> Option<(Point, Position)> {
    let node = lookup.get(&handle.node_id)?;
    let bounds = node_handle_bounds(node, node_types, issues);
    let bound = bounds.find(handle.handle_type, handle.handle_id.as_deref())?;
    Some((bound.anchor(node.position_absolute), bound.position))
}

/// The handle closest to `pointer` within `context.radius`.
///
/// Equally close handles are resolved in favour of the type opposite to
/// `from_type`.
pub fn get_closest_handle(
    pointer: Point,
    from_type: HandleType,
    context: &ConnectionContext<'_>,
    issues: &mut Vec<FlowIssue>,
) -> Option<HandleCandidate> {
    let radius = context.radius;
    let mut best: Option<(f32, HandleCandidate)> = None;

    for node in context.lookup.iter().filter(|n| !n.node.hidden) {
        let rect = node.rect();
        if pointer.x < rect.x - radius
            || pointer.x > rect.x + rect.width + radius
            || pointer.y < rect.y - radius
            || pointer.y > rect.y + rect.height + radius
        {
            continue;
        }
        let bounds = node_handle_bounds(node, context.node_types, issues);
        for bound in bounds.iter() {
            let distance = bound.center(node.position_absolute).distance(pointer);
            if distance > radius {
                continue;
            }
            let better = match &best {
                None => true,
                Some((best_distance, best_candidate)) => {
                    distance < *best_distance
                        || (distance == *best_distance
                            && bound.handle_type != from_type
                            && best_candidate.handle.handle_type == from_type)
                }
            };
            if better {
                best = Some((distance, candidate(node.id(), bound, node.position_absolute)));
            }
        }
    }
    best.map(|(_, candidate)| candidate)
}

fn candidate(node_id: &str, bound: &HandleBound, node_position: Point) -> HandleCandidate {
    HandleCandidate {
        handle: HandleRef::new(node_id, bound.id.as_deref(), bound.handle_type),
        anchor: bound.anchor(node_position),
        position: bound.position,
    }
}

/// An edge being drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingConnection {
    pub from: HandleRef,
    pub from_anchor: Point,
    pub from_position: Position,
    /// Current pointer in flow space.
    pub pointer: Point,
    /// Closest handle under the pointer, if any.
    pub to: Option<HandleCandidate>,
    /// Verdict for `to`.
    pub result: Option<ValidationResult>,
}

impl PendingConnection {
    /// Starts a connection at `from`.
    ///
    /// Fails if the handle does not exist or its node is not connectable.
    pub fn begin(
        from: HandleRef,
        pointer: Point,
        context: &ConnectionContext<'_>,
        issues: &mut Vec<FlowIssue>,
    ) -> Result<Self, ValidationError> {
        let not_found = || ValidationError::HandleNotFound {
            node_id: from.node_id.clone(),
            handle_id: from.handle_id.clone(),
        };
        let node = context.lookup.get(&from.node_id).ok_or_else(not_found)?;
        if !node.node.is_connectable(context.nodes_connectable) {
            return Err(ValidationError::NotConnectable(from.node_id.clone()));
        }
        let (from_anchor, from_position) =
            handle_anchor(&from, context.lookup, context.node_types, issues).ok_or_else(not_found)?;

        tracing::debug!(node_id = %from.node_id, handle_id = ?from.handle_id, "connection started");
        Ok(Self {
            from,
            from_anchor,
            from_position,
            pointer,
            to: None,
            result: None,
        })
    }

    /// Follows the pointer and re-evaluates the closest handle.
    pub fn update(&mut self, pointer: Point, context: &ConnectionContext<'_>, issues: &mut Vec<FlowIssue>) {
        self.pointer = pointer;
        self.to = get_closest_handle(pointer, self.from.handle_type, context, issues);
        self.result = self
            .to
            .as_ref()
            .map(|to| validate_connection(&self.from, &to.handle, context));
    }

    /// `Some(valid)` while a candidate handle is under the pointer.
    pub fn is_valid(&self) -> Option<bool> {
        self.result.as_ref().map(ValidationResult::is_valid)
    }

    /// The connection that releasing now would create.
    pub fn connection(&self) -> Option<Connection> {
        match (&self.to, &self.result) {
            (Some(to), Some(ValidationResult::Valid)) => Some(self.from.connection_to(&to.handle)),
            _ => None,
        }
    }

    /// Connects directly to `to`, as the second click of click-to-connect does.
    pub fn connect_to(&self, to: &HandleRef, context: &ConnectionContext<'_>) -> Result<Connection, ValidationError> {
        validate_connection(&self.from, to, context).into_result()?;
        Ok(self.from.connection_to(to))
    }

    /// End point of the connection line: the valid candidate's anchor, else the pointer.
    pub fn line_end(&self) -> (Point, Position) {
        match (&self.to, self.is_valid()) {
            (Some(to), Some(true)) => (to.anchor, to.position),
            _ => (self.pointer, self.from_position.opposite()),
        }
    }
}

/// Connection gesture state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    /// Dragging from a handle.
    Pending(PendingConnection),
    /// First click of click-to-connect done.
    ClickPending(PendingConnection),
}

impl ConnectionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, ConnectionState::Idle)
    }

    pub fn pending(&self) -> Option<&PendingConnection> {
        match self {
            ConnectionState::Idle => None,
            ConnectionState::Pending(pending) | ConnectionState::ClickPending(pending) => Some(pending),
        }
    }

    pub fn pending_mut(&mut self) -> Option<&mut PendingConnection> {
        match self {
            ConnectionState::Idle => None,
            ConnectionState::Pending(pending) | ConnectionState::ClickPending(pending) => Some(pending),
        }
    }

    /// Path of the in-progress connection line.
    pub fn line_path(&self, variant: PathVariant, options: &PathOptions) -> Option<EdgePath> {
        let pending = self.pending()?;
        let (end, end_position) = pending.line_end();
        let endpoints = Endpoints::new(pending.from_anchor, pending.from_position, end, end_position);
        Some(compute_path(variant, &endpoints, options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Dimensions;
    use crate::hierarchy::{resolve, ResolveOptions};
    use crate::node::Node;

    /// n1 has source handles `a` (right) and `s` (bottom), n2 target `b` (left)
    /// and source `c` (right).
    fn lookup() -> NodeLookup {
        let dims = Dimensions::new(100.0, 50.0);
        let mut n1 = Node::new("n1", 0.0, 0.0).with_size(100.0, 50.0);
        n1.handles = Some(vec![
            HandleBound::centered(HandleType::Source, Position::Right, dims).with_id("a"),
            HandleBound::centered(HandleType::Source, Position::Bottom, dims).with_id("s"),
        ]);
        let mut n2 = Node::new("n2", 200.0, 0.0).with_size(100.0, 50.0);
        n2.handles = Some(vec![
            HandleBound::centered(HandleType::Target, Position::Left, dims).with_id("b"),
            HandleBound::centered(HandleType::Source, Position::Right, dims).with_id("c"),
        ]);
        resolve(&[n1, n2], None, &ResolveOptions::default()).unwrap()
    }

    fn context<'a>(lookup: &'a NodeLookup, types: &'a NodeTypeRegistry, mode: ConnectionMode) -> ConnectionContext<'a> {
        ConnectionContext {
            lookup,
            node_types: types,
            edges: &[],
            mode,
            radius: 20.0,
            nodes_connectable: true,
            validator: None,
        }
    }

    fn source_a() -> HandleRef {
        HandleRef::new("n1", Some("a"), HandleType::Source)
    }

    // ========================================================================
    // Validity rules
    // ========================================================================

    #[test]
    fn test_strict_mode_source_to_target() {
        let (lookup, types) = (lookup(), NodeTypeRegistry::default());
        let ctx = context(&lookup, &types, ConnectionMode::Strict);
        let to_b = HandleRef::new("n2", Some("b"), HandleType::Target);
        let to_c = HandleRef::new("n2", Some("c"), HandleType::Source);
        assert!(validate_connection(&source_a(), &to_b, &ctx).is_valid());
        assert_eq!(
            validate_connection(&source_a(), &to_c, &ctx),
            ValidationResult::Invalid(ValidationError::IncompatibleDirection)
        );
    }

    #[test]
    fn test_loose_mode_allows_same_type() {
        let (lookup, types) = (lookup(), NodeTypeRegistry::default());
        let ctx = context(&lookup, &types, ConnectionMode::Loose);
        let to_c = HandleRef::new("n2", Some("c"), HandleType::Source);
        assert!(validate_connection(&source_a(), &to_c, &ctx).is_valid());
        assert_eq!(
            validate_connection(&source_a(), &source_a(), &ctx),
            ValidationResult::Invalid(ValidationError::SameHandle)
        );
        // Another handle on the same node is fine.
        let to_s = HandleRef::new("n1", Some("s"), HandleType::Source);
        assert!(validate_connection(&source_a(), &to_s, &ctx).is_valid());
    }

    #[test]
    fn test_not_connectable_target() {
        let mut nodes: Vec<Node> = lookup().nodes().cloned().collect();
        nodes[1].connectable = Some(false);
        let lookup = resolve(&nodes, None, &ResolveOptions::default()).unwrap();
        let types = NodeTypeRegistry::default();
        let ctx = context(&lookup, &types, ConnectionMode::Strict);
        let to_b = HandleRef::new("n2", Some("b"), HandleType::Target);
        assert_eq!(
            validate_connection(&source_a(), &to_b, &ctx),
            ValidationResult::Invalid(ValidationError::NotConnectable("n2".into()))
        );
    }

    #[test]
    fn test_custom_validators_run_after_builtin_rules() {
        let (lookup, types) = (lookup(), NodeTypeRegistry::default());
        let edges = vec![Connection::new("n1", "n2").with_handles(Some("a"), Some("b")).to_edge()];
        let validator = CompositeValidator::new()
            .add(NoDuplicatesValidator)
            .add(PredicateValidator::new(|c: &Connection| c.target != "n3").with_message("no n3"));
        let mut ctx = context(&lookup, &types, ConnectionMode::Strict);
        ctx.edges = &edges;
        ctx.validator = Some(&validator);

        let to_b = HandleRef::new("n2", Some("b"), HandleType::Target);
        assert_eq!(
            validate_connection(&source_a(), &to_b, &ctx),
            ValidationResult::Invalid(ValidationError::DuplicateConnection)
        );
        let to_c = HandleRef::new("n2", Some("c"), HandleType::Source);
        assert_eq!(
            validate_connection(&source_a(), &to_c, &ctx),
            ValidationResult::Invalid(ValidationError::IncompatibleDirection)
        );
        assert_eq!(validator.len(), 2);
    }

    #[test]
    fn test_connection_from_target_is_flipped() {
        let from = HandleRef::new("n2", Some("b"), HandleType::Target);
        let connection = from.connection_to(&source_a());
        assert_eq!(connection, Connection::new("n1", "n2").with_handles(Some("a"), Some("b")));
    }

    #[test]
    fn test_validation_result_and() {
        let invalid = ValidationResult::Invalid(ValidationError::SameHandle);
        assert_eq!(ValidationResult::Valid.and(invalid.clone()), invalid);
        assert_eq!(invalid.clone().and(ValidationResult::Valid), invalid);
        assert_eq!(ValidationError::SameHandle.to_string(), "Cannot connect handle to itself");
    }

    // ========================================================================
    // Closest handle
    // ========================================================================

    #[test]
    fn test_closest_handle_within_radius() {
        let (lookup, types) = (lookup(), NodeTypeRegistry::default());
        let ctx = context(&lookup, &types, ConnectionMode::Strict);
        let mut issues = Vec::new();
        // n2's target handle sits at (200, 25).
        let found = get_closest_handle(Point::new(190.0, 30.0), HandleType::Source, &ctx, &mut issues).unwrap();
        assert_eq!(found.handle, HandleRef::new("n2", Some("b"), HandleType::Target));
        assert_eq!(found.anchor, Point::new(200.0, 25.0));
        assert!(get_closest_handle(Point::new(150.0, 25.0), HandleType::Source, &ctx, &mut issues).is_none());
    }

    #[test]
    fn test_closest_handle_prefers_opposite_type_on_tie() {
        let dims = Dimensions::new(10.0, 10.0);
        let mut node = Node::new("n", 0.0, 0.0).with_size(10.0, 10.0);
        node.handles = Some(vec![
            HandleBound::centered(HandleType::Source, Position::Top, dims),
            HandleBound::centered(HandleType::Target, Position::Top, dims),
        ]);
        let lookup = resolve(&[node], None, &ResolveOptions::default()).unwrap();
        let types = NodeTypeRegistry::default();
        let ctx = context(&lookup, &types, ConnectionMode::Loose);
        let found = get_closest_handle(Point::new(5.0, 5.0), HandleType::Source, &ctx, &mut Vec::new()).unwrap();
        assert_eq!(found.handle.handle_type, HandleType::Target);
    }

    // ========================================================================
    // Gesture
    // ========================================================================

    #[test]
    fn test_pending_connection_flags_without_committing() {
        let (lookup, types) = (lookup(), NodeTypeRegistry::default());
        let ctx = context(&lookup, &types, ConnectionMode::Strict);
        let mut issues = Vec::new();
        let mut pending = PendingConnection::begin(source_a(), Point::new(100.0, 25.0), &ctx, &mut issues).unwrap();
        assert_eq!(pending.from_anchor, Point::new(100.0, 25.0));

        pending.update(Point::new(150.0, 25.0), &ctx, &mut issues);
        assert_eq!(pending.is_valid(), None);
        assert_eq!(pending.connection(), None);

        pending.update(Point::new(198.0, 25.0), &ctx, &mut issues);
        assert_eq!(pending.is_valid(), Some(true));
        assert_eq!(pending.connection(), Some(Connection::new("n1", "n2").with_handles(Some("a"), Some("b"))));

        // Near n2's source handle: a candidate, but not a valid one.
        pending.update(Point::new(300.0, 25.0), &ctx, &mut issues);
        assert_eq!(pending.is_valid(), Some(false));
        assert_eq!(pending.connection(), None);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_begin_on_missing_handle_fails() {
        let (lookup, types) = (lookup(), NodeTypeRegistry::default());
        let ctx = context(&lookup, &types, ConnectionMode::Strict);
        let missing = HandleRef::new("n1", Some("zz"), HandleType::Source);
        let err = PendingConnection::begin(missing, Point::ZERO, &ctx, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, ValidationError::HandleNotFound { .. }));
    }

    #[test]
    fn test_line_path_snaps_to_valid_candidate() {
        let (lookup, types) = (lookup(), NodeTypeRegistry::default());
        let ctx = context(&lookup, &types, ConnectionMode::Strict);
        let mut issues = Vec::new();
        let mut pending = PendingConnection::begin(source_a(), Point::ZERO, &ctx, &mut issues).unwrap();
        pending.update(Point::new(150.0, 40.0), &ctx, &mut issues);
        let state = ConnectionState::Pending(pending.clone());
        let line = state.line_path(PathVariant::Straight, &PathOptions::default()).unwrap();
        assert_eq!(line.path, "M 100 25 L 150 40");

        pending.update(Point::new(195.0, 30.0), &ctx, &mut issues);
        let state = ConnectionState::Pending(pending);
        let line = state.line_path(PathVariant::Straight, &PathOptions::default()).unwrap();
        assert_eq!(line.path, "M 100 25 L 200 25");
        assert!(ConnectionState::Idle.line_path(PathVariant::Straight, &PathOptions::default()).is_none());
    }
}
