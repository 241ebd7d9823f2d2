use std::cell::{Cell, RefCell};
use std::rc::Rc;

use flow_tree::nodes::{
    Action, Condition, Join, JoinPolicy, Parallel, ParallelPolicy, Race, ReactiveSelector,
    ReactiveSequence, Scope, Selector, Sequence, Wait,
};
use flow_tree::{BbKey, Blackboard, Context, Node, Status, Tree};

const GO: BbKey<bool> = BbKey::new(1);

type Log = Rc<RefCell<Vec<&'static str>>>;

fn boxed(node: impl Node + 'static) -> Box<dyn Node> {
    Box::new(node)
}

/// Logs `name` on every tick and replays `statuses`, repeating the last one.
fn script(log: &Log, name: &'static str, statuses: &[Status]) -> Box<dyn Node> {
    let log = Rc::clone(log);
    let statuses = statuses.to_vec();
    let next = Cell::new(0usize);
    boxed(Action::new(move |_ctx: &mut Context<'_>| {
        log.borrow_mut().push(name);
        let i = next.get();
        next.set(i + 1);
        statuses[i.min(statuses.len() - 1)]
    }))
}

/// A long wait whose cancellation is observable through `exits`.
fn cancellable(exits: &Rc<RefCell<Vec<Status>>>) -> Box<dyn Node> {
    let exits = Rc::clone(exits);
    boxed(Scope::new(boxed(Wait::new(10.0))).on_exit(move |s| exits.borrow_mut().push(s)))
}

#[test]
fn sequence_resumes_at_running_child() {
    let log = Log::default();
    let tree = Tree::new(
        "seq",
        boxed(Sequence::new(vec![
            script(&log, "a", &[Status::Success]),
            script(&log, "b", &[Status::Running, Status::Success]),
            script(&log, "c", &[Status::Success]),
        ])),
    );
    let mut board = Blackboard::new();

    assert_eq!(tree.tick(1.0, &mut board), Status::Running);
    assert_eq!(*log.borrow(), vec!["a", "b"]);

    assert_eq!(tree.tick(1.0, &mut board), Status::Success);
    assert_eq!(*log.borrow(), vec!["a", "b", "b", "c"]);
}

#[test]
fn sequence_stops_on_first_failure() {
    let log = Log::default();
    let tree = Tree::new(
        "seq",
        boxed(Sequence::new(vec![
            script(&log, "a", &[Status::Success]),
            script(&log, "b", &[Status::Failure]),
            script(&log, "c", &[Status::Success]),
        ])),
    );
    let mut board = Blackboard::new();

    assert_eq!(tree.tick(1.0, &mut board), Status::Failure);
    assert_eq!(*log.borrow(), vec!["a", "b"]);
}

#[test]
fn reset_restarts_sequence_from_first_child() {
    let log = Log::default();
    let tree = Tree::new(
        "seq",
        boxed(Sequence::new(vec![
            script(&log, "a", &[Status::Success]),
            script(&log, "b", &[Status::Running]),
        ])),
    );
    let mut board = Blackboard::new();

    assert_eq!(tree.tick(1.0, &mut board), Status::Running);
    tree.reset(false);
    assert_eq!(tree.tick(1.0, &mut board), Status::Running);
    assert_eq!(*log.borrow(), vec!["a", "b", "a", "b"]);
}

/// Ticks a fresh run, resumes it once, resets, and ticks again.
///
/// Returns the children ticked by the fresh tick, the resumed tick and the tick after reset.
fn run_reset_run(log: &Log, root: Box<dyn Node>) -> [Vec<&'static str>; 3] {
    let tree = Tree::new("reset", root);
    let mut board = Blackboard::new();
    let mut tick = || {
        assert_eq!(tree.tick(1.0, &mut board), Status::Running);
        std::mem::take(&mut *log.borrow_mut())
    };

    let fresh = tick();
    let resumed = tick();
    tree.reset(false);
    let replayed = tick();
    [fresh, resumed, replayed]
}

#[test]
fn reset_restarts_selector_from_first_child() {
    let log = Log::default();
    let root = boxed(Selector::new(vec![
        script(&log, "a", &[Status::Failure]),
        script(&log, "b", &[Status::Running]),
    ]));

    let [fresh, resumed, replayed] = run_reset_run(&log, root);
    assert_eq!(fresh, vec!["a", "b"]);
    assert_eq!(resumed, vec!["b"]);
    assert_eq!(replayed, fresh);
}

#[test]
fn reset_forgets_finished_parallel_children() {
    let log = Log::default();
    let root = boxed(Parallel::new(
        ParallelPolicy::RequireAll,
        vec![
            script(&log, "a", &[Status::Success]),
            script(&log, "b", &[Status::Running]),
        ],
    ));

    let [fresh, resumed, replayed] = run_reset_run(&log, root);
    assert_eq!(fresh, vec!["a", "b"]);
    assert_eq!(resumed, vec!["b"]);
    assert_eq!(replayed, fresh);
}

#[test]
fn reset_forgets_finished_join_children() {
    let log = Log::default();
    let root = boxed(Join::new(
        JoinPolicy::RequireAll,
        vec![
            script(&log, "a", &[Status::Success]),
            script(&log, "b", &[Status::Running]),
        ],
    ));

    let [fresh, resumed, replayed] = run_reset_run(&log, root);
    assert_eq!(fresh, vec!["a", "b"]);
    assert_eq!(resumed, vec!["b"]);
    assert_eq!(replayed, fresh);
}

#[test]
fn reset_race_ticks_every_child_again() {
    let log = Log::default();
    let root = boxed(Race::new(vec![
        script(&log, "a", &[Status::Running]),
        script(&log, "b", &[Status::Running]),
    ]));

    let [fresh, _, replayed] = run_reset_run(&log, root);
    assert_eq!(fresh, vec!["a", "b"]);
    assert_eq!(replayed, fresh);
}

#[test]
fn reset_reactive_composites_replay_from_the_start() {
    let log = Log::default();
    let sequence = boxed(ReactiveSequence::new(vec![
        script(&log, "a", &[Status::Success]),
        script(&log, "b", &[Status::Running]),
    ]));
    let [fresh, _, replayed] = run_reset_run(&log, sequence);
    assert_eq!(fresh, vec!["a", "b"]);
    assert_eq!(replayed, fresh);

    let selector = boxed(ReactiveSelector::new(vec![
        script(&log, "c", &[Status::Failure]),
        script(&log, "d", &[Status::Running]),
    ]));
    let [fresh, _, replayed] = run_reset_run(&log, selector);
    assert_eq!(fresh, vec!["c", "d"]);
    assert_eq!(replayed, fresh);
}

#[test]
fn reset_with_exit_events_cancels_running_children() {
    let exits = Rc::new(RefCell::new(Vec::new()));
    let roots: Vec<Box<dyn Node>> = vec![
        boxed(Selector::new(vec![cancellable(&exits)])),
        boxed(ReactiveSequence::new(vec![cancellable(&exits)])),
        boxed(ReactiveSelector::new(vec![cancellable(&exits)])),
        boxed(Parallel::new(
            ParallelPolicy::RequireAll,
            vec![cancellable(&exits), cancellable(&exits)],
        )),
        boxed(Race::new(vec![cancellable(&exits), cancellable(&exits)])),
        boxed(Join::new(
            JoinPolicy::RequireAny,
            vec![cancellable(&exits), cancellable(&exits)],
        )),
    ];
    let mut board = Blackboard::new();

    for root in roots {
        let tree = Tree::new("cancel", root);
        assert_eq!(tree.tick(1.0, &mut board), Status::Running);
        tree.reset(true);
    }
    assert_eq!(*exits.borrow(), vec![Status::Running; 9]);
}

#[test]
fn selector_is_the_dual_of_sequence() {
    let log = Log::default();
    let tree = Tree::new(
        "sel",
        boxed(Selector::new(vec![
            script(&log, "a", &[Status::Failure]),
            script(&log, "b", &[Status::Running, Status::Failure]),
            script(&log, "c", &[Status::Success]),
            script(&log, "d", &[Status::Success]),
        ])),
    );
    let mut board = Blackboard::new();

    assert_eq!(tree.tick(1.0, &mut board), Status::Running);
    assert_eq!(tree.tick(1.0, &mut board), Status::Success);
    assert_eq!(*log.borrow(), vec!["a", "b", "b", "c"]);
}

#[test]
fn empty_composites() {
    let mut board = Blackboard::new();
    let seq = Tree::new("seq", boxed(Sequence::new(Vec::new())));
    let sel = Tree::new("sel", boxed(Selector::new(Vec::new())));
    let race = Tree::new("race", boxed(Race::new(Vec::new())));

    assert_eq!(seq.tick(1.0, &mut board), Status::Success);
    assert_eq!(sel.tick(1.0, &mut board), Status::Failure);
    assert_eq!(race.tick(1.0, &mut board), Status::Failure);
}

#[test]
fn reactive_sequence_preempts_running_child_when_condition_fails() {
    let exits = Rc::new(RefCell::new(Vec::new()));
    let tree = Tree::new(
        "reactive",
        boxed(ReactiveSequence::new(vec![
            boxed(Condition::new(|ctx: &Context<'_>| {
                ctx.get(GO).unwrap_or(false)
            })),
            cancellable(&exits),
        ])),
    );
    let mut board = Blackboard::new();
    board.set(GO, true);

    assert_eq!(tree.tick(1.0, &mut board), Status::Running);
    assert_eq!(tree.tick(1.0, &mut board), Status::Running);
    assert!(exits.borrow().is_empty());

    board.set(GO, false);
    assert_eq!(tree.tick(1.0, &mut board), Status::Failure);
    assert_eq!(*exits.borrow(), vec![Status::Running]);
}

#[test]
fn reactive_selector_switches_to_higher_priority_child() {
    let exits = Rc::new(RefCell::new(Vec::new()));
    let tree = Tree::new(
        "reactive",
        boxed(ReactiveSelector::new(vec![
            boxed(Condition::new(|ctx: &Context<'_>| {
                ctx.get(GO).unwrap_or(false)
            })),
            cancellable(&exits),
        ])),
    );
    let mut board = Blackboard::new();

    assert_eq!(tree.tick(1.0, &mut board), Status::Running);
    board.set(GO, true);
    assert_eq!(tree.tick(1.0, &mut board), Status::Success);
    assert_eq!(*exits.borrow(), vec![Status::Running]);
}

#[test]
fn parallel_require_all_skips_finished_children() {
    let log = Log::default();
    let tree = Tree::new(
        "par",
        boxed(Parallel::new(
            ParallelPolicy::RequireAll,
            vec![
                script(&log, "a", &[Status::Success]),
                script(&log, "b", &[Status::Running, Status::Success]),
            ],
        )),
    );
    let mut board = Blackboard::new();

    assert_eq!(tree.tick(1.0, &mut board), Status::Running);
    assert_eq!(tree.tick(1.0, &mut board), Status::Success);
    assert_eq!(*log.borrow(), vec!["a", "b", "b"]);
}

#[test]
fn parallel_require_all_fails_fast_and_cancels_others() {
    let log = Log::default();
    let exits = Rc::new(RefCell::new(Vec::new()));
    let tree = Tree::new(
        "par",
        boxed(Parallel::new(
            ParallelPolicy::RequireAll,
            vec![
                cancellable(&exits),
                script(&log, "b", &[Status::Running, Status::Failure]),
            ],
        )),
    );
    let mut board = Blackboard::new();

    assert_eq!(tree.tick(1.0, &mut board), Status::Running);
    assert_eq!(tree.tick(1.0, &mut board), Status::Failure);
    assert_eq!(*exits.borrow(), vec![Status::Running]);
}

#[test]
fn parallel_require_one() {
    let log = Log::default();
    let mut board = Blackboard::new();

    let any = Tree::new(
        "par",
        boxed(Parallel::new(
            ParallelPolicy::RequireOne,
            vec![
                script(&log, "a", &[Status::Failure]),
                script(&log, "b", &[Status::Running, Status::Success]),
            ],
        )),
    );
    assert_eq!(any.tick(1.0, &mut board), Status::Running);
    assert_eq!(any.tick(1.0, &mut board), Status::Success);

    let none = Tree::new(
        "par",
        boxed(Parallel::new(
            ParallelPolicy::RequireOne,
            vec![
                script(&log, "c", &[Status::Failure]),
                script(&log, "d", &[Status::Failure]),
            ],
        )),
    );
    assert_eq!(none.tick(1.0, &mut board), Status::Failure);
}

#[test]
fn race_returns_first_finisher_and_cancels_the_rest() {
    let log = Log::default();
    let exits = Rc::new(RefCell::new(Vec::new()));
    let tree = Tree::new(
        "race",
        boxed(Race::new(vec![
            cancellable(&exits),
            script(&log, "b", &[Status::Running, Status::Failure]),
        ])),
    );
    let mut board = Blackboard::new();

    assert_eq!(tree.tick(1.0, &mut board), Status::Running);
    assert!(exits.borrow().is_empty());
    assert_eq!(tree.tick(1.0, &mut board), Status::Failure);
    assert_eq!(*exits.borrow(), vec![Status::Running]);
}

#[test]
fn join_waits_for_every_child() {
    let log = Log::default();
    let mut board = Blackboard::new();

    let all = Tree::new(
        "join",
        boxed(Join::new(
            JoinPolicy::RequireAll,
            vec![
                script(&log, "a", &[Status::Success]),
                script(&log, "b", &[Status::Running, Status::Running, Status::Failure]),
            ],
        )),
    );
    assert_eq!(all.tick(1.0, &mut board), Status::Running);
    assert_eq!(all.tick(1.0, &mut board), Status::Running);
    assert_eq!(all.tick(1.0, &mut board), Status::Failure);
    assert_eq!(*log.borrow(), vec!["a", "b", "b", "b"]);

    let any = Tree::new(
        "join",
        boxed(Join::new(
            JoinPolicy::RequireAny,
            vec![
                script(&log, "c", &[Status::Success]),
                script(&log, "d", &[Status::Running, Status::Failure]),
            ],
        )),
    );
    assert_eq!(any.tick(1.0, &mut board), Status::Running);
    assert_eq!(any.tick(1.0, &mut board), Status::Success);
}
