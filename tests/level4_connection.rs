//! Level 4: Connection Tests
//!
//! Tests connection drags, click-to-connect, validation in strict and loose
//! mode, custom validators and duplicate suppression.

mod common;

use common::harness::FlowHarness;
use common::path_numbers;
use node_flow_engine::{
    Connection, FlowConfig, FlowEvent, FlowMode, HandleType, IssueKind, NoDuplicatesValidator, Node, Point,
    PredicateValidator,
};

// Default node handles: target at the top center, source at the bottom center.
// `a` source (50, 50), target (50, 0); `b` source (350, 50), target (350, 0).

fn edge_ids(harness: &FlowHarness) -> Vec<String> {
    harness.flow.edges().iter().map(|edge| edge.id.clone()).collect()
}

fn connects(harness: &mut FlowHarness) -> Vec<Connection> {
    harness
        .flow
        .drain_events()
        .into_iter()
        .filter_map(|event| match event {
            FlowEvent::Connect(connection) => Some(connection),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Connection drags
// ============================================================================

#[test]
fn test_source_to_target_drag() {
    let mut harness = FlowHarness::new();
    harness.flow.pointer_down_handle("a", None, HandleType::Source, Point::new(50.0, 50.0)).unwrap();
    harness.flow.pointer_move(Point::new(340.0, 8.0));
    harness.frame();

    // The line snaps to the valid candidate.
    let line = harness.flow.connection_line().unwrap();
    let numbers = path_numbers(&line.path);
    assert_eq!(&numbers[..2], &[50.0, 50.0]);
    assert_eq!(&numbers[numbers.len() - 2..], &[350.0, 0.0]);

    harness.flow.pointer_up(Point::new(340.0, 8.0)).unwrap();
    assert_eq!(edge_ids(&harness), vec!["xy-edge__a-b"]);
    assert_eq!(connects(&mut harness), vec![Connection::new("a", "b")]);
    assert!(harness.flow.connection_state().is_idle());
    assert_eq!(harness.issues.len(), 0);
}

#[test]
fn test_drag_from_target_is_flipped() {
    let mut harness = FlowHarness::new();
    harness.connect_drag("b", None, HandleType::Target, (350.0, 0.0), (52.0, 48.0));
    assert_eq!(edge_ids(&harness), vec!["xy-edge__a-b"]);
}

#[test]
fn test_strict_rejects_source_to_source() {
    let mut harness = FlowHarness::new();
    harness.flow.pointer_down_handle("a", None, HandleType::Source, Point::new(50.0, 50.0)).unwrap();
    harness.flow.pointer_move(Point::new(348.0, 52.0));
    harness.frame();

    assert_eq!(harness.flow.pending_connection().and_then(|p| p.is_valid()), Some(false));
    // An invalid candidate does not capture the line.
    let numbers = path_numbers(&harness.flow.connection_line().unwrap().path);
    assert_eq!(&numbers[numbers.len() - 2..], &[348.0, 52.0]);

    harness.flow.pointer_up(Point::new(348.0, 52.0)).unwrap();
    assert!(harness.flow.edges().is_empty());
    assert_eq!(harness.issues.count(IssueKind::ConstraintViolation), 1);
}

#[test]
fn test_strict_allows_same_node_source_to_target() {
    let mut harness = FlowHarness::new();
    harness.connect_drag("a", None, HandleType::Source, (50.0, 50.0), (50.0, 2.0));
    assert_eq!(edge_ids(&harness), vec!["xy-edge__a-a"]);
}

#[test]
fn test_loose_allows_source_to_source() {
    let config = FlowConfig {
        connection_mode: node_flow_engine::ConnectionMode::Loose,
        ..FlowHarness::config()
    };
    let mut harness = FlowHarness::with_elements(
        config,
        vec![
            Node::new("a", 0.0, 0.0).with_size(100.0, 50.0),
            Node::new("b", 300.0, 0.0).with_size(100.0, 50.0),
        ],
        Vec::new(),
    );
    harness.connect_drag("a", None, HandleType::Source, (50.0, 50.0), (348.0, 52.0));

    assert_eq!(edge_ids(&harness), vec!["xy-edge__a-b"]);
    assert_eq!(harness.issues.len(), 0);
}

#[test]
fn test_release_on_empty_canvas_does_nothing() {
    let mut harness = FlowHarness::new();
    harness.connect_drag("a", None, HandleType::Source, (50.0, 50.0), (200.0, 300.0));
    assert!(harness.flow.edges().is_empty());
    assert_eq!(harness.issues.len(), 0);
    assert!(connects(&mut harness).is_empty());
}

#[test]
fn test_cancel_connection_drag() {
    let mut harness = FlowHarness::new();
    harness.flow.pointer_down_handle("a", None, HandleType::Source, Point::new(50.0, 50.0)).unwrap();
    harness.flow.pointer_move(Point::new(345.0, 5.0));
    harness.frame();
    harness.flow.cancel_gesture().unwrap();

    assert!(harness.flow.connection_state().is_idle());
    assert!(harness.flow.connection_line().is_none());
    assert!(harness.flow.edges().is_empty());
}

#[test]
fn test_snap_radius_is_in_flow_units() {
    let mut harness = FlowHarness::new();
    // 30px above b's target: outside the 20 unit radius at zoom 1.
    harness.connect_drag("a", None, HandleType::Source, (50.0, 50.0), (350.0, -30.0));
    assert!(harness.flow.edges().is_empty());

    // At zoom 2 the same 30px are 15 flow units.
    harness.flow.zoom_by(2.0, Some(Point::ZERO));
    harness.connect_drag("a", None, HandleType::Source, (100.0, 100.0), (700.0, -30.0));
    assert_eq!(edge_ids(&harness), vec!["xy-edge__a-b"]);
}

// ============================================================================
// Validators
// ============================================================================

#[test]
fn test_predicate_veto() {
    let mut harness = FlowHarness::new();
    harness
        .flow
        .set_validator(PredicateValidator::new(|connection: &Connection| connection.target != "b").with_message("b is full"));

    harness.connect_drag("a", None, HandleType::Source, (50.0, 50.0), (345.0, 5.0));

    assert!(harness.flow.edges().is_empty());
    let issues = harness.issues.issues.borrow();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind, IssueKind::ConstraintViolation);
    assert_eq!(issues[0].message, "b is full");
}

#[test]
fn test_duplicate_connection_suppressed() {
    let mut harness = FlowHarness::new();
    assert!(harness.flow.connect(Connection::new("a", "b")).unwrap());
    assert!(!harness.flow.connect(Connection::new("a", "b")).unwrap());

    assert_eq!(edge_ids(&harness), vec!["xy-edge__a-b"]);
    assert_eq!(connects(&mut harness).len(), 1);
    let issues = harness.issues.issues.borrow();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].id.as_deref(), Some("xy-edge__a-b"));

    // Other handles on the same nodes are a different connection.
    drop(issues);
    assert!(harness
        .flow
        .connect(Connection::new("a", "b").with_handles(Some("x"), None))
        .unwrap());
}

#[test]
fn test_no_duplicates_validator_flags_during_drag() {
    let mut harness = FlowHarness::new();
    harness.flow.set_validator(NoDuplicatesValidator);
    harness.flow.connect(Connection::new("a", "b")).unwrap();

    harness.flow.pointer_down_handle("a", None, HandleType::Source, Point::new(50.0, 50.0)).unwrap();
    harness.flow.pointer_move(Point::new(345.0, 5.0));
    harness.frame();
    assert_eq!(harness.flow.pending_connection().and_then(|p| p.is_valid()), Some(false));
    harness.flow.pointer_up(Point::new(345.0, 5.0)).unwrap();

    assert_eq!(harness.flow.edges().len(), 1);
}

#[test]
fn test_non_connectable_nodes() {
    let mut b = Node::new("b", 300.0, 0.0).with_size(100.0, 50.0);
    b.connectable = Some(false);
    let mut harness = FlowHarness::with_elements(
        FlowHarness::config(),
        vec![Node::new("a", 0.0, 0.0).with_size(100.0, 50.0), b],
        Vec::new(),
    );

    harness.connect_drag("a", None, HandleType::Source, (50.0, 50.0), (345.0, 5.0));
    assert!(harness.flow.edges().is_empty());
    assert_eq!(harness.issues.count(IssueKind::ConstraintViolation), 1);

    // A drag cannot start on b at all.
    harness.flow.pointer_down_handle("b", None, HandleType::Source, Point::new(350.0, 50.0)).unwrap();
    assert!(!harness.flow.is_gesture_active());
    assert_eq!(harness.issues.count(IssueKind::ConstraintViolation), 2);
}

// ============================================================================
// Click-to-connect
// ============================================================================

#[test]
fn test_click_to_connect() {
    let mut harness = FlowHarness::new();
    harness.flow.click_handle("b", None, HandleType::Target).unwrap();
    assert!(!harness.flow.connection_state().is_idle());
    harness.flow.click_handle("a", None, HandleType::Source).unwrap();

    assert_eq!(edge_ids(&harness), vec!["xy-edge__a-b"]);
    assert!(harness.flow.connection_state().is_idle());
}

#[test]
fn test_click_same_handle_disarms() {
    let mut harness = FlowHarness::new();
    harness.flow.click_handle("a", None, HandleType::Source).unwrap();
    harness.flow.click_handle("a", None, HandleType::Source).unwrap();
    assert!(harness.flow.connection_state().is_idle());

    // Invalid second click: reported, nothing added, disarmed.
    harness.flow.click_handle("a", None, HandleType::Source).unwrap();
    harness.flow.click_handle("b", None, HandleType::Source).unwrap();
    assert!(harness.flow.edges().is_empty());
    assert_eq!(harness.issues.count(IssueKind::ConstraintViolation), 1);
    assert!(harness.flow.connection_state().is_idle());
}

// ============================================================================
// Modes and reconnection
// ============================================================================

#[test]
fn test_controlled_mode_emits_connect_only() {
    let config = FlowConfig { mode: FlowMode::Controlled, ..FlowHarness::config() };
    let mut harness = FlowHarness::with_elements(
        config,
        vec![
            Node::new("a", 0.0, 0.0).with_size(100.0, 50.0),
            Node::new("b", 300.0, 0.0).with_size(100.0, 50.0),
        ],
        Vec::new(),
    );
    assert!(harness.flow.connect(Connection::new("a", "b")).unwrap());

    assert!(harness.flow.edges().is_empty());
    let events = harness.flow.drain_events();
    assert!(matches!(events.as_slice(), [FlowEvent::Connect(connection)] if connection.target == "b"));
}

#[test]
fn test_reconnect_keeps_single_edge() {
    let mut harness = FlowHarness::new();
    harness.flow.connect(Connection::new("a", "b")).unwrap();
    assert!(harness.flow.reconnect("xy-edge__a-b", &Connection::new("b", "a")).unwrap());
    assert!(!harness.flow.reconnect("missing", &Connection::new("a", "b")).unwrap());

    assert_eq!(edge_ids(&harness), vec!["xy-edge__b-a"]);
}
