//! Tooling primitives for FlowTree execution.
//!
//! Engine-agnostic on purpose: inspectors and renderers should consume [`TraceEvent`]s from
//! the blackboard rather than hook into the runtime.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod trace;

pub use trace::{
    emit, tags, LogTraceSink, NullTraceSink, PrefixSink, TraceEvent, TraceLog, TraceSink,
    VecTraceSink, TRACE_LOG, TRACE_SINK,
};
