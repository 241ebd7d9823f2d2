use std::rc::Rc;

use flow_tools::{tags, TraceLog, TRACE_LOG};
use flow_tree::nodes::{LocalScope, Return, Scope, Sequence, SubTree, Yield};
use flow_tree::{Blackboard, Node, Status, Tree};

fn boxed(node: impl Node + 'static) -> Box<dyn Node> {
    Box::new(node)
}

fn traced_board() -> Blackboard {
    let mut board = Blackboard::new();
    board.set_obj(TRACE_LOG, TraceLog::default());
    board
}

fn recorded(board: &Blackboard) -> Vec<(u64, String, u64, u64)> {
    board
        .get_obj(TRACE_LOG)
        .map(|log| {
            log.events
                .iter()
                .map(|e| (e.tick, e.tag.to_string(), e.a, e.b))
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn scope_and_subtree_events_carry_depth_and_status() {
    let child = Rc::new(Tree::new(
        "child",
        boxed(Scope::new(boxed(Sequence::new(vec![
            boxed(Yield::new()),
            boxed(Return::failure()),
        ])))),
    ));
    let root = Tree::new("root", boxed(SubTree::new(child)));
    let mut board = traced_board();

    assert_eq!(root.tick(1.0, &mut board), Status::Running);
    assert_eq!(root.tick(1.0, &mut board), Status::Failure);

    let expected = vec![
        (0, tags::SUBTREE_ENTER.to_string(), 1, 0),
        (0, tags::SCOPE_ENTER.to_string(), 1, 0),
        (1, tags::RETURN.to_string(), 1, Status::Failure.code()),
        (1, tags::SCOPE_EXIT.to_string(), 1, Status::Failure.code()),
        (1, tags::SUBTREE_EXIT.to_string(), 1, Status::Failure.code()),
    ];
    assert_eq!(recorded(&board), expected);
}

#[test]
fn events_from_local_scope_reach_root_board() {
    let tree = Tree::new(
        "local",
        boxed(LocalScope::new(boxed(Scope::new(boxed(Yield::new()))))),
    );
    let mut board = traced_board();

    assert_eq!(tree.tick(1.0, &mut board), Status::Running);
    assert_eq!(tree.tick(1.0, &mut board), Status::Success);

    let log = board.get_obj(TRACE_LOG).expect("trace log");
    assert_eq!(log.tagged(tags::SCOPE_ENTER).count(), 1);
    assert_eq!(log.tagged(tags::SCOPE_EXIT).count(), 1);
    assert_eq!(tree.tick_count(), 2);
}
