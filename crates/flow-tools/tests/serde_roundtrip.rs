#![cfg(feature = "serde")]

use flow_tools::{tags, TraceEvent, TraceLog};

#[test]
fn recorded_run_survives_json() {
    let mut log = TraceLog::default();
    log.push(TraceEvent::new(4, tags::SUBTREE_ENTER).with_a(1));
    log.push(TraceEvent::new(4, tags::SUBTREE_EXIT).with_a(1).with_b(1));

    let json = serde_json::to_string(&log).expect("serialize");
    let back: TraceLog = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, log);
}

#[test]
fn external_tool_output_is_readable() {
    let json = r#"{ "events": [ { "tick": 2, "tag": "flow.return", "a": 3, "b": 2 } ] }"#;
    let log: TraceLog = serde_json::from_str(json).expect("deserialize");

    let event = log.tagged(tags::RETURN).next().expect("return event");
    assert!(event.is_runtime());
    assert_eq!((event.tick, event.a, event.b), (2, 3, 2));
}
