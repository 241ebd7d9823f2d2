use flow_core::DepthSlots;

use crate::context::Context;
use crate::node::{Node, Status};

/// Sequence with memory: resumes at the running child instead of restarting.
///
/// Ticks children left to right; the first `Failure` fails the node, a `Running` child is
/// remembered and resumed next tick, all `Success` succeeds.
pub struct Sequence<S: 'static = ()> {
    children: Vec<Box<dyn Node<S>>>,
    running: DepthSlots<Option<usize>>,
}

impl<S: 'static> Sequence<S> {
    pub fn new(children: Vec<Box<dyn Node<S>>>) -> Self {
        Self {
            children,
            running: DepthSlots::new(),
        }
    }
}

impl<S: 'static> Node<S> for Sequence<S> {
    fn tick(&self, ctx: &mut Context<'_, S>) -> Status {
        let depth = ctx.call_depth();
        let mut index = self.running.get(depth).unwrap_or(0);
        while index < self.children.len() {
            let status = self.children[index].tick(ctx);
            if ctx.return_requested().is_some() {
                self.running.reset(depth);
                return status;
            }
            match status {
                Status::Running => {
                    self.running.set(depth, Some(index));
                    return Status::Running;
                }
                Status::Failure => {
                    self.running.reset(depth);
                    return Status::Failure;
                }
                Status::Success => index += 1,
            }
        }

        self.running.reset(depth);
        Status::Success
    }

    fn reset(&self, depth: usize, fire_exit_events: bool) {
        if let Some(index) = self.running.take(depth) {
            self.children[index].reset(depth, fire_exit_events);
        }
    }
}

/// Selector with memory: the Boolean dual of [`Sequence`].
pub struct Selector<S: 'static = ()> {
    children: Vec<Box<dyn Node<S>>>,
    running: DepthSlots<Option<usize>>,
}

impl<S: 'static> Selector<S> {
    pub fn new(children: Vec<Box<dyn Node<S>>>) -> Self {
        Self {
            children,
            running: DepthSlots::new(),
        }
    }
}

impl<S: 'static> Node<S> for Selector<S> {
    fn tick(&self, ctx: &mut Context<'_, S>) -> Status {
        let depth = ctx.call_depth();
        let mut index = self.running.get(depth).unwrap_or(0);
        while index < self.children.len() {
            let status = self.children[index].tick(ctx);
            if ctx.return_requested().is_some() {
                self.running.reset(depth);
                return status;
            }
            match status {
                Status::Running => {
                    self.running.set(depth, Some(index));
                    return Status::Running;
                }
                Status::Success => {
                    self.running.reset(depth);
                    return Status::Success;
                }
                Status::Failure => index += 1,
            }
        }

        self.running.reset(depth);
        Status::Failure
    }

    fn reset(&self, depth: usize, fire_exit_events: bool) {
        if let Some(index) = self.running.take(depth) {
            self.children[index].reset(depth, fire_exit_events);
        }
    }
}

/// Reactive sequence: re-checks every child from the start each tick.
///
/// When an earlier child fails (or starts running) the previously running child is reset,
/// which makes it suitable for guarding long actions with conditions.
pub struct ReactiveSequence<S: 'static = ()> {
    children: Vec<Box<dyn Node<S>>>,
    running: DepthSlots<Option<usize>>,
}

impl<S: 'static> ReactiveSequence<S> {
    pub fn new(children: Vec<Box<dyn Node<S>>>) -> Self {
        Self {
            children,
            running: DepthSlots::new(),
        }
    }
}

impl<S: 'static> Node<S> for ReactiveSequence<S> {
    fn tick(&self, ctx: &mut Context<'_, S>) -> Status {
        let depth = ctx.call_depth();
        for (i, child) in self.children.iter().enumerate() {
            let status = child.tick(ctx);
            if ctx.return_requested().is_some() {
                preempt_later(&self.children, &self.running, depth, i);
                return status;
            }
            match status {
                Status::Success => continue,
                Status::Failure => {
                    preempt_later(&self.children, &self.running, depth, i);
                    return Status::Failure;
                }
                Status::Running => {
                    preempt_later(&self.children, &self.running, depth, i);
                    self.running.set(depth, Some(i));
                    return Status::Running;
                }
            }
        }

        self.running.reset(depth);
        Status::Success
    }

    fn reset(&self, depth: usize, fire_exit_events: bool) {
        if let Some(index) = self.running.take(depth) {
            self.children[index].reset(depth, fire_exit_events);
        }
    }
}

/// Reactive selector: re-checks higher-priority children every tick and preempts a running
/// lower-priority child as soon as an earlier one succeeds or starts running.
pub struct ReactiveSelector<S: 'static = ()> {
    children: Vec<Box<dyn Node<S>>>,
    running: DepthSlots<Option<usize>>,
}

impl<S: 'static> ReactiveSelector<S> {
    pub fn new(children: Vec<Box<dyn Node<S>>>) -> Self {
        Self {
            children,
            running: DepthSlots::new(),
        }
    }
}

impl<S: 'static> Node<S> for ReactiveSelector<S> {
    fn tick(&self, ctx: &mut Context<'_, S>) -> Status {
        let depth = ctx.call_depth();
        for (i, child) in self.children.iter().enumerate() {
            let status = child.tick(ctx);
            if ctx.return_requested().is_some() {
                preempt_later(&self.children, &self.running, depth, i);
                return status;
            }
            match status {
                Status::Failure => continue,
                Status::Success => {
                    preempt_later(&self.children, &self.running, depth, i);
                    return Status::Success;
                }
                Status::Running => {
                    preempt_later(&self.children, &self.running, depth, i);
                    self.running.set(depth, Some(i));
                    return Status::Running;
                }
            }
        }

        self.running.reset(depth);
        Status::Failure
    }

    fn reset(&self, depth: usize, fire_exit_events: bool) {
        if let Some(index) = self.running.take(depth) {
            self.children[index].reset(depth, fire_exit_events);
        }
    }
}

/// Clear the remembered running child and reset it if it sits after `current` (it was not
/// ticked this pass, so it is still mid-run).
fn preempt_later<S: 'static>(
    children: &[Box<dyn Node<S>>],
    running: &DepthSlots<Option<usize>>,
    depth: usize,
    current: usize,
) {
    if let Some(prev) = running.take(depth) {
        if prev > current {
            children[prev].reset(depth, true);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum ChildState {
    #[default]
    Idle,
    Running,
    Done(Status),
}

fn load_states(slots: &DepthSlots<Vec<ChildState>>, depth: usize, len: usize) -> Vec<ChildState> {
    let mut states = slots.take(depth);
    if states.len() != len {
        states = vec![ChildState::Idle; len];
    }
    states
}

/// Reset every child still mid-run.
fn abort_running<S: 'static>(
    children: &[Box<dyn Node<S>>],
    states: &[ChildState],
    depth: usize,
    fire_exit_events: bool,
) {
    for (child, state) in children.iter().zip(states) {
        if *state == ChildState::Running {
            child.reset(depth, fire_exit_events);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParallelPolicy {
    /// Succeed once every child has succeeded; any failure fails the node.
    RequireAll,
    /// Succeed as soon as one child succeeds; fail once all have failed.
    RequireOne,
}

/// Ticks every not-yet-finished child each tick and combines results by policy.
///
/// Finished children are skipped on later ticks. Once the outcome is decided, children still
/// running are reset.
pub struct Parallel<S: 'static = ()> {
    children: Vec<Box<dyn Node<S>>>,
    policy: ParallelPolicy,
    states: DepthSlots<Vec<ChildState>>,
}

impl<S: 'static> Parallel<S> {
    pub fn new(policy: ParallelPolicy, children: Vec<Box<dyn Node<S>>>) -> Self {
        Self {
            children,
            policy,
            states: DepthSlots::new(),
        }
    }
}

impl<S: 'static> Node<S> for Parallel<S> {
    fn tick(&self, ctx: &mut Context<'_, S>) -> Status {
        let depth = ctx.call_depth();
        let mut states = load_states(&self.states, depth, self.children.len());

        for (i, child) in self.children.iter().enumerate() {
            if matches!(states[i], ChildState::Done(_)) {
                continue;
            }
            let status = child.tick(ctx);
            states[i] = match status {
                Status::Running => ChildState::Running,
                done => ChildState::Done(done),
            };

            let decided = ctx.return_requested().is_some()
                || matches!(
                    (self.policy, status),
                    (ParallelPolicy::RequireAll, Status::Failure)
                        | (ParallelPolicy::RequireOne, Status::Success)
                );
            if decided {
                abort_running(&self.children, &states, depth, true);
                return status;
            }
        }

        if states.iter().any(|s| *s == ChildState::Running) {
            self.states.set(depth, states);
            return Status::Running;
        }
        match self.policy {
            ParallelPolicy::RequireAll => Status::Success,
            ParallelPolicy::RequireOne => Status::Failure,
        }
    }

    fn reset(&self, depth: usize, fire_exit_events: bool) {
        let states = self.states.take(depth);
        abort_running(&self.children, &states, depth, fire_exit_events);
    }
}

/// Ticks all children until one of them finishes; that child's status is the result.
///
/// The remaining children are reset. With no children the node fails.
pub struct Race<S: 'static = ()> {
    children: Vec<Box<dyn Node<S>>>,
    states: DepthSlots<Vec<ChildState>>,
}

impl<S: 'static> Race<S> {
    pub fn new(children: Vec<Box<dyn Node<S>>>) -> Self {
        Self {
            children,
            states: DepthSlots::new(),
        }
    }
}

impl<S: 'static> Node<S> for Race<S> {
    fn tick(&self, ctx: &mut Context<'_, S>) -> Status {
        if self.children.is_empty() {
            return Status::Failure;
        }

        let depth = ctx.call_depth();
        let mut states = load_states(&self.states, depth, self.children.len());
        for (i, child) in self.children.iter().enumerate() {
            let status = child.tick(ctx);
            if status.is_terminal() || ctx.return_requested().is_some() {
                states[i] = ChildState::Done(status);
                abort_running(&self.children, &states, depth, true);
                return status;
            }
            states[i] = ChildState::Running;
        }

        self.states.set(depth, states);
        Status::Running
    }

    fn reset(&self, depth: usize, fire_exit_events: bool) {
        let states = self.states.take(depth);
        abort_running(&self.children, &states, depth, fire_exit_events);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinPolicy {
    /// Succeed only if every child succeeded.
    RequireAll,
    /// Succeed if at least one child succeeded.
    RequireAny,
}

/// Ticks every unfinished child until all of them have finished, then combines by policy.
///
/// Unlike [`Race`] and [`Parallel`], no result is decided before every child is done.
pub struct Join<S: 'static = ()> {
    children: Vec<Box<dyn Node<S>>>,
    policy: JoinPolicy,
    states: DepthSlots<Vec<ChildState>>,
}

impl<S: 'static> Join<S> {
    pub fn new(policy: JoinPolicy, children: Vec<Box<dyn Node<S>>>) -> Self {
        Self {
            children,
            policy,
            states: DepthSlots::new(),
        }
    }
}

impl<S: 'static> Node<S> for Join<S> {
    fn tick(&self, ctx: &mut Context<'_, S>) -> Status {
        let depth = ctx.call_depth();
        let mut states = load_states(&self.states, depth, self.children.len());

        for (i, child) in self.children.iter().enumerate() {
            if matches!(states[i], ChildState::Done(_)) {
                continue;
            }
            let status = child.tick(ctx);
            states[i] = match status {
                Status::Running => ChildState::Running,
                done => ChildState::Done(done),
            };
            if ctx.return_requested().is_some() {
                abort_running(&self.children, &states, depth, true);
                return status;
            }
        }

        if states.iter().any(|s| *s == ChildState::Running) {
            self.states.set(depth, states);
            return Status::Running;
        }

        let succeeded = states
            .iter()
            .filter(|s| **s == ChildState::Done(Status::Success))
            .count();
        let ok = match self.policy {
            JoinPolicy::RequireAll => succeeded == states.len(),
            JoinPolicy::RequireAny => succeeded > 0,
        };
        if ok {
            Status::Success
        } else {
            Status::Failure
        }
    }

    fn reset(&self, depth: usize, fire_exit_events: bool) {
        let states = self.states.take(depth);
        abort_running(&self.children, &states, depth, fire_exit_events);
    }
}
