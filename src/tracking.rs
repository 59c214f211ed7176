//! Measurement tracking.
//!
//! Renderers report node sizes (and optionally handle rectangles) whenever
//! their resize observer fires. [`MeasurementTracker`] queues these reports,
//! keeping only the latest per node, until the controller flushes them on the
//! next frame. Reports arrive through a cloneable callback so an adapter can
//! wire it once.
//!
//! # Example
//!
//! ```
//! use node_flow_engine::tracking::MeasurementTracker;
//!
//! let tracker = MeasurementTracker::new();
//! let report = tracker.size_callback();
//! report("n1", 120.0, 40.0);
//! report("n1", 130.0, 40.0);
//! assert_eq!(tracker.len(), 1);
//! ```

use crate::changes::NodeChange;
use crate::error::{FlowIssue, IssueKind};
use crate::geometry::Dimensions;
use crate::hierarchy::NodeLookup;
use crate::node::{HandleBound, NodeHandleBounds};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

/// One resize notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub id: String,
    pub dimensions: Dimensions,
    /// Handle rectangles relative to the node, when the renderer measured them.
    pub handles: Option<Vec<HandleBound>>,
}

impl Measurement {
    pub fn new(id: impl Into<String>, width: f32, height: f32) -> Self {
        Self {
            id: id.into(),
            dimensions: Dimensions::new(width, height),
            handles: None,
        }
    }

    pub fn with_handles(mut self, handles: Vec<HandleBound>) -> Self {
        self.handles = Some(handles);
        self
    }
}

/// Result of a flush.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementFlush {
    /// `Dimensions` changes for nodes whose measured size changed.
    pub changes: Vec<NodeChange>,
    /// True if any node's handle bounds were replaced.
    pub handles_updated: bool,
}

/// Coalescing queue of measurements.
///
/// Clones share the same queue.
#[derive(Debug, Clone, Default)]
pub struct MeasurementTracker {
    pending: Rc<RefCell<IndexMap<String, Measurement>>>,
}

impl MeasurementTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `measurement`, replacing an earlier one for the same node.
    pub fn report(&self, measurement: Measurement) {
        let mut pending = self.pending.borrow_mut();
        match pending.get_mut(&measurement.id) {
            // A size-only report must not drop handles measured earlier in the frame.
            Some(existing) if measurement.handles.is_none() => existing.dimensions = measurement.dimensions,
            _ => {
                pending.insert(measurement.id.clone(), measurement);
            }
        }
    }

    /// Get a callback for node size updates.
    ///
    /// The callback signature is `(node_id, width, height)`.
    pub fn size_callback(&self) -> impl Fn(&str, f32, f32) + Clone {
        let tracker = self.clone();
        move |id, width, height| tracker.report(Measurement::new(id, width, height))
    }

    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    /// Applies queued handle bounds to `lookup` and returns size changes.
    ///
    /// Zero or negative sizes are reported as `DegenerateInput` and replaced
    /// by `min_node_size` on the offending axis. Reports for unknown nodes
    /// are dropped.
    pub fn flush(&self, lookup: &mut NodeLookup, min_node_size: f32, issues: &mut Vec<FlowIssue>) -> MeasurementFlush {
        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        let mut flush = MeasurementFlush::default();

        for (id, measurement) in pending {
            let Some(node) = lookup.get(&id) else {
                tracing::trace!(%id, "measurement for unknown node dropped");
                continue;
            };

            let mut dimensions = measurement.dimensions;
            if dimensions.is_degenerate() {
                tracing::warn!(%id, width = dimensions.width, height = dimensions.height, "degenerate node size");
                issues.push(
                    FlowIssue::new(
                        IssueKind::DegenerateInput,
                        format!("node measured as {}x{}", dimensions.width, dimensions.height),
                    )
                    .with_id(id.as_str()),
                );
                dimensions = Dimensions::new(
                    positive_or(dimensions.width, min_node_size),
                    positive_or(dimensions.height, min_node_size),
                );
            }

            if node.node.measured != Some(dimensions) {
                flush.changes.push(NodeChange::dimensions(id.clone(), dimensions, None, false));
            }
            if let Some(handles) = measurement.handles {
                flush.handles_updated |= lookup.set_handle_bounds(&id, NodeHandleBounds::from_handles(handles));
            }
        }

        if !flush.changes.is_empty() {
            tracing::trace!(changes = flush.changes.len(), "measurements flushed");
        }
        flush
    }
}

fn positive_or(value: f32, fallback: f32) -> f32 {
    if value > 0.0 {
        value
    } else {
        fallback
    }
}
