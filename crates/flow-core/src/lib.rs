//! Deterministic, engine-agnostic primitives for the FlowTree behavior engine.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod blackboard;
pub mod call_stack;
pub mod config;
pub mod depth;
pub mod error;
pub mod rng;
pub mod scoped;

pub use blackboard::{BbKey, BbValue, Blackboard, BlackboardAccess, ObjKey};
pub use call_stack::{CallFrame, CallStack};
pub use config::TreeConfig;
pub use depth::DepthSlots;
pub use error::{CallStackOverflow, FlowError, OverflowKind, Result};
pub use rng::{shuffle, DeterministicRng, SplitMix64};
pub use scoped::ScopedBlackboard;
