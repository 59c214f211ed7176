//! Level 6: Property Tests
//!
//! Randomized checks of the engine's core invariants: absolute positions,
//! coordinate round trips, selection idempotence, duplicate suppression, path
//! endpoints and anchored zoom.

mod common;

use common::harness::FlowHarness;
use common::path_numbers;
use node_flow_engine::geometry::approx_eq;
use node_flow_engine::hierarchy::ResolveOptions;
use node_flow_engine::path::{Endpoints, PathOptions};
use node_flow_engine::viewport::Viewport;
use node_flow_engine::{
    apply_node_changes, compute_path, resolve, Connection, CoordinateExtent, FlowConfig, FlowController, Node,
    NodeExtent, NodeLookup, PathVariant, Point, Position, SelectionManager, Transform,
};
use proptest::prelude::*;

const VARIANTS: [PathVariant; 5] = [
    PathVariant::Straight,
    PathVariant::Bezier,
    PathVariant::SimpleBezier,
    PathVariant::Step,
    PathVariant::SmoothStep,
];

fn position_strategy() -> impl Strategy<Value = Position> {
    prop_oneof![
        Just(Position::Left),
        Just(Position::Right),
        Just(Position::Top),
        Just(Position::Bottom),
    ]
}

/// `n0` is the root, every `n{i}` is a child of `n{i-1}`.
fn chain(locals: &[(f32, f32)]) -> Vec<Node> {
    locals
        .iter()
        .enumerate()
        .map(|(i, &(x, y))| {
            let node = Node::new(format!("n{i}"), x, y).with_size(40.0, 30.0);
            if i == 0 {
                node
            } else {
                node.with_parent(format!("n{}", i - 1))
            }
        })
        .collect()
}

fn close(a: f32, b: f32) -> bool {
    approx_eq(a, b, 1e-2 * (1.0 + b.abs()))
}

fn check_absolute_positions(lookup: &NodeLookup) -> Result<(), TestCaseError> {
    for node in lookup.iter() {
        let expected = match lookup.parent(node.id()) {
            Some(parent) => parent.position_absolute + node.node.position,
            None => node.node.position,
        };
        prop_assert!(
            close(node.position_absolute.x, expected.x) && close(node.position_absolute.y, expected.y),
            "{}: expected {:?}, got {:?}",
            node.id(),
            expected,
            node.position_absolute
        );
    }
    Ok(())
}

proptest! {
    // ========================================================================
    // Hierarchy
    // ========================================================================

    #[test]
    fn prop_absolute_position_is_parent_plus_local(
        locals in prop::collection::vec((-200.0f32..200.0, -200.0f32..200.0), 2..=6),
        mutated in 0usize..6,
        moved_to in (-300.0f32..300.0, -300.0f32..300.0),
    ) {
        let nodes = chain(&locals);
        let mut flow = FlowController::new(FlowConfig::default());
        flow.set_nodes(nodes.clone()).unwrap();
        check_absolute_positions(flow.lookup())?;

        // A single position mutation anywhere in the chain.
        let mut nodes = nodes;
        let index = mutated % nodes.len();
        nodes[index].position = Point::new(moved_to.0, moved_to.1);
        flow.set_nodes(nodes).unwrap();
        check_absolute_positions(flow.lookup())?;
    }

    #[test]
    fn prop_reparenting_keeps_positions_consistent(
        locals in prop::collection::vec((-200.0f32..200.0, -200.0f32..200.0), 3..=6),
    ) {
        // Move the leaf directly under the root.
        let mut nodes = chain(&locals);
        let last = nodes.len() - 1;
        nodes[last].parent_id = Some("n0".into());
        let lookup = resolve(&nodes, None, &ResolveOptions::default()).unwrap();
        check_absolute_positions(&lookup)?;
        prop_assert_eq!(lookup.get(&format!("n{last}")).unwrap().depth, 1);
    }

    // ========================================================================
    // Viewport
    // ========================================================================

    #[test]
    fn prop_screen_flow_round_trip(
        x in -1000.0f32..1000.0,
        y in -1000.0f32..1000.0,
        zoom in 0.5f32..2.0,
        px in -2000.0f32..2000.0,
        py in -2000.0f32..2000.0,
    ) {
        let mut viewport = Viewport::new(Transform::IDENTITY, 0.5, 2.0, CoordinateExtent::INFINITE);
        viewport.set_viewport(Transform::new(x, y, zoom).into(), 0.0);
        let point = Point::new(px, py);

        let back = viewport.screen_to_flow(viewport.flow_to_screen(point), None);
        prop_assert!(close(back.x, px) && close(back.y, py), "{:?} -> {:?}", point, back);
    }

    #[test]
    fn prop_zoom_keeps_anchor_fixed(
        pan in (-300.0f32..300.0, -300.0f32..300.0),
        anchor in (0.0f32..800.0, 0.0f32..600.0),
        factor in 0.5f32..2.0,
    ) {
        let mut flow = FlowController::new(FlowConfig::default());
        flow.set_container_size(800.0, 600.0);
        flow.pan_by(Point::new(pan.0, pan.1));
        let anchor = Point::new(anchor.0, anchor.1);

        let before = flow.viewport().screen_to_flow(anchor, None);
        flow.zoom_by(factor, Some(anchor));
        let after = flow.viewport().screen_to_flow(anchor, None);

        prop_assert!(close(after.x, before.x) && close(after.y, before.y), "{:?} vs {:?}", before, after);
    }

    // ========================================================================
    // Selection
    // ========================================================================

    #[test]
    fn prop_select_then_restore_is_idempotent(
        initial in prop::collection::vec(any::<bool>(), 1..8),
        chosen in prop::collection::vec(any::<bool>(), 8),
    ) {
        let nodes: Vec<Node> = initial
            .iter()
            .enumerate()
            .map(|(i, &selected)| Node::new(format!("n{i}"), i as f32 * 50.0, 0.0).with_size(10.0, 10.0).selected(selected))
            .collect();
        let options = ResolveOptions::default();
        let lookup = resolve(&nodes, None, &options).unwrap();

        let target = SelectionManager::from_ids(
            nodes.iter().zip(&chosen).filter(|(_, pick)| **pick).map(|(node, _)| node.id.as_str()),
        );
        let changes = target.node_changes(&lookup);
        let flipped = initial.iter().zip(&chosen).filter(|(a, b)| a != b).count();
        prop_assert_eq!(changes.len(), flipped);

        let selected = apply_node_changes(&changes, &nodes);
        let selected_lookup = resolve(&selected, None, &options).unwrap();
        prop_assert!(target.node_changes(&selected_lookup).is_empty());

        let original = SelectionManager::from_ids(nodes.iter().filter(|n| n.selected).map(|n| n.id.as_str()));
        let restored = apply_node_changes(&original.node_changes(&selected_lookup), &selected);
        prop_assert_eq!(restored, nodes);
    }

    // ========================================================================
    // Connections
    // ========================================================================

    #[test]
    fn prop_duplicate_connection_yields_one_edge(
        source in 0usize..3,
        target in 0usize..3,
        source_handle in proptest::option::of("[a-c]"),
        target_handle in proptest::option::of("[a-c]"),
    ) {
        let mut harness = FlowHarness::with_elements(
            FlowHarness::config(),
            (0..3).map(|i| Node::new(format!("n{i}"), i as f32 * 200.0, 0.0).with_size(100.0, 50.0)).collect(),
            Vec::new(),
        );
        let connection = Connection::new(format!("n{source}"), format!("n{target}"))
            .with_handles(source_handle.as_deref(), target_handle.as_deref());

        prop_assert!(harness.flow.connect(connection.clone()).unwrap());
        prop_assert!(!harness.flow.connect(connection).unwrap());
        prop_assert_eq!(harness.flow.edges().len(), 1);
    }

    // ========================================================================
    // Paths
    // ========================================================================

    #[test]
    fn prop_paths_start_and_end_at_handles(
        source in (-500.0f32..500.0, -500.0f32..500.0),
        target in (-500.0f32..500.0, -500.0f32..500.0),
        source_position in position_strategy(),
        target_position in position_strategy(),
    ) {
        let endpoints = Endpoints::new(
            Point::new(source.0, source.1),
            source_position,
            Point::new(target.0, target.1),
            target_position,
        );
        for variant in VARIANTS {
            let path = compute_path(variant, &endpoints, &PathOptions::default());
            let numbers = path_numbers(&path.path);
            let n = numbers.len();
            prop_assert!(n >= 4, "{:?}: {}", variant, path.path);
            prop_assert!(close(numbers[0], source.0) && close(numbers[1], source.1), "{:?}: {}", variant, path.path);
            prop_assert!(close(numbers[n - 2], target.0) && close(numbers[n - 1], target.1), "{:?}: {}", variant, path.path);
            prop_assert!(path.label.x.is_finite() && path.label.y.is_finite());
        }
    }

    // ========================================================================
    // Drag
    // ========================================================================

    #[test]
    fn prop_parent_extent_holds_for_any_drag(
        parent in (-200.0f32..200.0, -200.0f32..200.0),
        delta in (-400.0f32..400.0, -400.0f32..400.0),
    ) {
        let child = Node::new("B", 20.0, 20.0)
            .with_size(30.0, 30.0)
            .with_parent("A")
            .with_extent(NodeExtent::Parent);
        let mut harness = FlowHarness::with_elements(
            FlowHarness::config(),
            vec![Node::new("A", parent.0, parent.1).with_size(100.0, 100.0), child],
            Vec::new(),
        );
        // Pan so the whole scene sits inside the container.
        harness.flow.pan_by(Point::new(400.0, 300.0));

        let grab = (parent.0 + 435.0, parent.1 + 335.0);
        harness.drag_node("B", grab, &[(grab.0 + delta.0, grab.1 + delta.1)]);

        let local = harness.local_position("B");
        let inside = |v: f32| (-1e-3..=70.001).contains(&v);
        prop_assert!(inside(local.x) && inside(local.y), "{:?}", local);
    }
}

#[test]
fn test_zoom_to_two_anchored() {
    let mut flow = FlowController::new(FlowConfig::default());
    flow.set_container_size(800.0, 600.0);
    flow.zoom_by(2.0, Some(Point::new(100.0, 100.0)));

    assert_eq!(flow.transform(), Transform::new(-100.0, -100.0, 2.0));
    assert_eq!(flow.viewport().screen_to_flow(Point::new(100.0, 100.0), None), Point::new(100.0, 100.0));
}
