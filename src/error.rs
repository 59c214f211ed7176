//! Error and issue reporting.
//!
//! Two channels exist:
//!
//! - [`FlowError`] is returned when the engine cannot produce geometry at all
//!   (a node references a missing or cyclic parent). The call that hit it is
//!   aborted and the previous state is kept.
//! - [`FlowIssue`] describes a recoverable problem (an illegal connection, a
//!   zero-sized container, an unknown renderer type). The engine degrades
//!   gracefully and hands the issue to the callback installed with
//!   [`FlowController::on_issue`](crate::FlowController::on_issue).

use std::fmt;

/// Fatal errors returned by the engine.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("node `{node_id}` references parent `{parent_id}` which does not exist")]
    MissingParent { node_id: String, parent_id: String },
    #[error("parent chain of node `{node_id}` contains a cycle")]
    ParentCycle { node_id: String },
    #[error("node `{0}` not found")]
    NodeNotFound(String),
    #[error(transparent)]
    InvalidConfig(#[from] serde_json::Error),
}

impl FlowError {
    /// Id of the node the error is about, if any.
    pub fn node_id(&self) -> Option<&str> {
        match self {
            Self::MissingParent { node_id, .. } | Self::ParentCycle { node_id } => Some(node_id),
            Self::NodeNotFound(id) => Some(id),
            Self::InvalidConfig(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;

/// Category of a reported [`FlowIssue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueKind {
    /// Resolution could not proceed for a subtree (mirrors a returned [`FlowError`]).
    FatalConfiguration,
    /// A gesture tried something illegal; it was not committed.
    ConstraintViolation,
    /// Zero-sized input was replaced by a fallback size.
    DegenerateInput,
    /// A type tag had no registered handler; the default was used.
    MissingType,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FatalConfiguration => "fatal-configuration",
            Self::ConstraintViolation => "constraint-violation",
            Self::DegenerateInput => "degenerate-input",
            Self::MissingType => "missing-type",
        };
        f.write_str(name)
    }
}

/// A structured, recoverable problem report.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowIssue {
    pub kind: IssueKind,
    pub message: String,
    /// Node or edge id the issue refers to.
    pub id: Option<String>,
}

impl FlowIssue {
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), id: None }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl From<&FlowError> for FlowIssue {
    fn from(err: &FlowError) -> Self {
        let issue = FlowIssue::new(IssueKind::FatalConfiguration, err.to_string());
        match err.node_id() {
            Some(id) => issue.with_id(id),
            None => issue,
        }
    }
}

impl fmt::Display for FlowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "[{}] {} ({})", self.kind, self.message, id),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

/// Callback receiving every reported issue.
pub type IssueHandler = Box<dyn FnMut(&FlowIssue)>;

/// Fan-out point for issues: logs through `tracing` and forwards to the
/// installed handler.
#[derive(Default)]
pub struct Diagnostics {
    handler: Option<IssueHandler>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_handler(&mut self, handler: IssueHandler) {
        self.handler = Some(handler);
    }

    pub fn report(&mut self, issue: FlowIssue) {
        match issue.kind {
            IssueKind::FatalConfiguration => tracing::error!(kind = %issue.kind, id = ?issue.id, "{}", issue.message),
            _ => tracing::warn!(kind = %issue.kind, id = ?issue.id, "{}", issue.message),
        }
        if let Some(handler) = self.handler.as_mut() {
            handler(&issue);
        }
    }

    pub fn report_all(&mut self, issues: impl IntoIterator<Item = FlowIssue>) {
        for issue in issues {
            self.report(issue);
        }
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("handler", &self.handler.is_some())
            .finish()
    }
}
