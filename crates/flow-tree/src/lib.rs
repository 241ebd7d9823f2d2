//! Recursive, tick-driven behavior tree runtime built on `flow-core`.
//!
//! A [`Tree`] owns one root [`Node`]; each frame the owner calls [`Tree::tick`] and the call
//! recurses synchronously through the node graph. Trees can invoke other trees (or themselves)
//! through [`nodes::SubTree`]; those invocations are bounded by the tree's call stack and
//! maximum call depth, and a runaway recursion fails the invocation instead of overflowing.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod context;
pub mod node;
pub mod nodes;
pub mod tree;

pub use context::Context;
pub use node::{Node, Status};
pub use tree::{Tree, TreeRef};

// Shared primitives, re-exported so most users only depend on this crate.
pub use flow_core::{
    BbKey, Blackboard, BlackboardAccess, CallStackOverflow, FlowError, ObjKey, OverflowKind,
    ScopedBlackboard, TreeConfig,
};
