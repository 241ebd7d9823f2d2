use std::rc::Rc;

use thiserror::Error;

/// Errors surfaced while configuring trees.
///
/// Tick-time outcomes never use this type; they are expressed as `Status::Failure`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("invalid tree config: `{field}` {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, FlowError>;

/// Which recursion guard rejected a subtree invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowKind {
    /// The fixed-capacity call stack had no free frame.
    Capacity,
    /// The configured maximum call depth would have been exceeded.
    MaxDepth,
}

/// Diagnostic for a subtree invocation that was failed by the recursion guard.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("call stack overflow entering `{tree}` at depth {depth} ({kind:?} limit {limit})")]
pub struct CallStackOverflow {
    pub tree: Rc<str>,
    pub depth: usize,
    pub limit: usize,
    pub kind: OverflowKind,
}
