#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use flow_core::{Blackboard, ObjKey};

/// Tags emitted by the FlowTree runtime.
///
/// `a` carries the call depth for every runtime tag. `b` carries a status code
/// (`Running = 0`, `Success = 1`, `Failure = 2`) except where noted.
pub mod tags {
    /// A subtree invocation started.
    pub const SUBTREE_ENTER: &str = "flow.subtree.enter";
    pub const SUBTREE_EXIT: &str = "flow.subtree.exit";
    /// The recursion guard failed a subtree invocation; `b` is the limit that was hit.
    pub const SUBTREE_OVERFLOW: &str = "flow.subtree.overflow";
    pub const SCOPE_ENTER: &str = "flow.scope.enter";
    pub const SCOPE_EXIT: &str = "flow.scope.exit";
    pub const RETURN: &str = "flow.return";

    /// Prefix shared by every runtime tag.
    pub const PREFIX: &str = "flow.";
}

/// One recorded step of a tree run.
///
/// Plain data so it can be recorded during a tick and rendered later by tooling.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceEvent {
    pub tick: u64,
    pub tag: Cow<'static, str>,
    pub a: u64,
    pub b: u64,
}

impl TraceEvent {
    pub fn new(tick: u64, tag: impl Into<Cow<'static, str>>) -> Self {
        Self {
            tick,
            tag: tag.into(),
            a: 0,
            b: 0,
        }
    }

    pub fn with_a(mut self, a: u64) -> Self {
        self.a = a;
        self
    }

    pub fn with_b(mut self, b: u64) -> Self {
        self.b = b;
        self
    }

    pub fn is_runtime(&self) -> bool {
        self.tag.starts_with(tags::PREFIX)
    }
}

pub trait TraceSink {
    fn emit(&mut self, event: TraceEvent);
}

#[derive(Debug, Default)]
pub struct NullTraceSink;

impl TraceSink for NullTraceSink {
    fn emit(&mut self, _event: TraceEvent) {}
}

#[derive(Debug, Default)]
pub struct VecTraceSink {
    pub events: Vec<TraceEvent>,
}

impl TraceSink for VecTraceSink {
    fn emit(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}

/// Forwards only events whose tag starts with `prefix`.
pub struct PrefixSink<S> {
    prefix: Cow<'static, str>,
    inner: S,
}

impl<S: TraceSink> PrefixSink<S> {
    pub fn new(prefix: impl Into<Cow<'static, str>>, inner: S) -> Self {
        Self {
            prefix: prefix.into(),
            inner,
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: TraceSink> TraceSink for PrefixSink<S> {
    fn emit(&mut self, event: TraceEvent) {
        if event.tag.starts_with(&*self.prefix) {
            self.inner.emit(event);
        }
    }
}

/// Re-emits every event as a `tracing` debug record (target `flow_tools::trace`).
#[derive(Debug, Default)]
pub struct LogTraceSink;

impl TraceSink for LogTraceSink {
    fn emit(&mut self, event: TraceEvent) {
        tracing::debug!(
            tick = event.tick,
            tag = %event.tag,
            a = event.a,
            b = event.b,
            "trace event"
        );
    }
}

/// In-memory event log, stored on the root blackboard under [`TRACE_LOG`].
#[derive(Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceLog {
    pub events: Vec<TraceEvent>,
}

impl TraceLog {
    pub fn push(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Events whose tag matches `tag`, in emission order.
    pub fn tagged<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a TraceEvent> + 'a {
        self.events.iter().filter(move |e| e.tag == tag)
    }

    /// Events recorded during tick `tick`.
    pub fn at_tick(&self, tick: u64) -> impl Iterator<Item = &TraceEvent> + '_ {
        self.events.iter().filter(move |e| e.tick == tick)
    }
}

/// Blackboard key for collecting events in-memory.
pub const TRACE_LOG: ObjKey<TraceLog> = ObjKey::new(0xF10E_7ACE_0000_0001);
/// Blackboard key for streaming events into a user-provided sink.
pub const TRACE_SINK: ObjKey<Box<dyn TraceSink>> = ObjKey::new(0xF10E_7ACE_0000_0002);

/// Record `event` in whichever of [`TRACE_LOG`] and [`TRACE_SINK`] are installed on `blackboard`.
pub fn emit(blackboard: &mut Blackboard, event: TraceEvent) {
    // Clone only when both destinations are installed.
    if !blackboard.contains_obj(TRACE_SINK) {
        if let Some(log) = blackboard.get_obj_mut(TRACE_LOG) {
            log.push(event);
        }
        return;
    }
    if let Some(log) = blackboard.get_obj_mut(TRACE_LOG) {
        log.push(event.clone());
    }
    if let Some(sink) = blackboard.get_obj_mut(TRACE_SINK) {
        sink.emit(event);
    }
}
