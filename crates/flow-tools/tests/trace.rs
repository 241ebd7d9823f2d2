use std::cell::RefCell;
use std::rc::Rc;

use flow_core::Blackboard;
use flow_tools::{
    emit, tags, LogTraceSink, PrefixSink, TraceEvent, TraceLog, TraceSink, VecTraceSink,
    TRACE_LOG, TRACE_SINK,
};

/// Sink whose events stay observable after it is moved onto the blackboard.
#[derive(Clone, Default)]
struct SharedSink(Rc<RefCell<Vec<TraceEvent>>>);

impl TraceSink for SharedSink {
    fn emit(&mut self, event: TraceEvent) {
        self.0.borrow_mut().push(event);
    }
}

fn runtime_event(tick: u64, tag: &'static str, depth: u64, status: u64) -> TraceEvent {
    TraceEvent::new(tick, tag).with_a(depth).with_b(status)
}

#[test]
fn nothing_installed_records_nothing() {
    let mut bb = Blackboard::new();
    emit(&mut bb, runtime_event(0, tags::RETURN, 0, 1));
    assert!(bb.is_empty());
}

#[test]
fn log_groups_events_by_tag_and_tick() {
    let mut bb = Blackboard::new();
    bb.set_obj(TRACE_LOG, TraceLog::default());

    emit(&mut bb, runtime_event(0, tags::SUBTREE_ENTER, 1, 0));
    emit(&mut bb, runtime_event(0, tags::SCOPE_ENTER, 1, 0));
    emit(&mut bb, runtime_event(1, tags::SCOPE_EXIT, 1, 1));
    emit(&mut bb, runtime_event(1, tags::SUBTREE_EXIT, 1, 1));

    let log = bb.get_obj(TRACE_LOG).expect("log installed");
    assert_eq!(log.len(), 4);
    assert_eq!(log.at_tick(0).count(), 2);

    let exit = log.tagged(tags::SUBTREE_EXIT).next().expect("exit recorded");
    assert_eq!((exit.tick, exit.a, exit.b), (1, 1, 1));
    assert_eq!(log.tagged(tags::SUBTREE_OVERFLOW).count(), 0);
}

#[test]
fn log_and_sink_both_receive_events() {
    let mut bb = Blackboard::new();
    let sink = SharedSink::default();
    bb.set_obj(TRACE_LOG, TraceLog::default());
    bb.set_obj(TRACE_SINK, Box::new(sink.clone()) as Box<dyn TraceSink>);

    emit(&mut bb, runtime_event(3, tags::SUBTREE_OVERFLOW, 65, 64));

    let log = bb.get_obj(TRACE_LOG).expect("log installed");
    assert_eq!(log.events, *sink.0.borrow());
    assert_eq!(sink.0.borrow()[0].b, 64);
}

#[test]
fn prefix_sink_keeps_runtime_events_only() {
    let mut sink = PrefixSink::new(tags::PREFIX, VecTraceSink::default());
    sink.emit(runtime_event(0, tags::SCOPE_ENTER, 0, 0));
    sink.emit(TraceEvent::new(0, "game.spawn").with_a(7));
    sink.emit(runtime_event(0, tags::SCOPE_EXIT, 0, 2));

    let events = sink.into_inner().events;
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(TraceEvent::is_runtime));
}

#[test]
fn log_sink_forwards_to_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let mut bb = Blackboard::new();
    bb.set_obj(TRACE_SINK, Box::new(LogTraceSink) as Box<dyn TraceSink>);
    emit(&mut bb, runtime_event(9, tags::RETURN, 2, 2));

    // The sink only logs; nothing is kept on the blackboard besides the sink itself.
    assert_eq!(bb.len(), 1);
}

#[test]
fn clearing_the_log_between_runs() {
    let mut log = TraceLog::default();
    log.push(runtime_event(0, tags::RETURN, 0, 1));
    assert!(!log.is_empty());
    log.clear();
    assert!(log.is_empty());
}
