//! Common test utilities for integration tests.

#![allow(dead_code)]

pub mod harness;

use node_flow_engine::geometry::approx_eq;
use node_flow_engine::{FlowIssue, IssueKind, Point};
use std::cell::RefCell;
use std::rc::Rc;

/// Install a fmt subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Records every issue passed to `FlowController::on_issue`.
#[derive(Default, Clone)]
pub struct IssueTracker {
    pub issues: Rc<RefCell<Vec<FlowIssue>>>,
}

impl IssueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler to install with `on_issue`.
    pub fn handler(&self) -> impl FnMut(&FlowIssue) + 'static {
        let issues = self.issues.clone();
        move |issue| issues.borrow_mut().push(issue.clone())
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.borrow().iter().filter(|issue| issue.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.issues.borrow().len()
    }

    pub fn clear(&self) {
        self.issues.borrow_mut().clear();
    }
}

/// Numbers of an SVG path command string, in order.
pub fn path_numbers(path: &str) -> Vec<f32> {
    path.split(|c: char| c.is_ascii_alphabetic() || c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .filter_map(|token| token.parse().ok())
        .collect()
}

pub fn assert_point_eq(actual: Point, expected: Point) {
    assert!(
        approx_eq(actual.x, expected.x, 1e-3) && approx_eq(actual.y, expected.y, 1e-3),
        "expected {expected:?}, got {actual:?}"
    );
}
