use flow_core::{Blackboard, DepthSlots};
use flow_tools::tags;

use crate::context::Context;
use crate::node::{Node, Status};
use crate::nodes::leaf::assert_duration;

/// Remembers, per depth, whether a single child was left `Running`.
#[derive(Default)]
struct ActiveChild {
    slots: DepthSlots<bool>,
}

impl ActiveChild {
    fn note(&self, depth: usize, status: Status) {
        self.slots.set(depth, status.is_running());
    }

    fn reset<S: 'static>(&self, child: &dyn Node<S>, depth: usize, fire_exit_events: bool) {
        if self.slots.get(depth) {
            self.slots.reset(depth);
            child.reset(depth, fire_exit_events);
        }
    }
}

/// Swaps `Success` and `Failure`; `Running` passes through.
pub struct Invert<S: 'static = ()> {
    child: Box<dyn Node<S>>,
    active: ActiveChild,
}

impl<S: 'static> Invert<S> {
    pub fn new(child: Box<dyn Node<S>>) -> Self {
        Self {
            child,
            active: ActiveChild::default(),
        }
    }
}

impl<S: 'static> Node<S> for Invert<S> {
    fn tick(&self, ctx: &mut Context<'_, S>) -> Status {
        let status = self.child.tick(ctx);
        self.active.note(ctx.call_depth(), status);
        status.invert()
    }

    fn reset(&self, depth: usize, fire_exit_events: bool) {
        self.active.reset(&*self.child, depth, fire_exit_events);
    }
}

/// Coerces any terminal result of its child to a fixed status (succeeder / failer).
pub struct Force<S: 'static = ()> {
    child: Box<dyn Node<S>>,
    status: Status,
    active: ActiveChild,
}

impl<S: 'static> Force<S> {
    /// # Panics
    ///
    /// If `status` is `Running`.
    pub fn new(child: Box<dyn Node<S>>, status: Status) -> Self {
        assert!(status.is_terminal(), "forced status must be terminal");
        Self {
            child,
            status,
            active: ActiveChild::default(),
        }
    }

    /// Any terminal result becomes `Success`.
    pub fn success(child: Box<dyn Node<S>>) -> Self {
        Self::new(child, Status::Success)
    }

    /// Any terminal result becomes `Failure`.
    pub fn failure(child: Box<dyn Node<S>>) -> Self {
        Self::new(child, Status::Failure)
    }
}

impl<S: 'static> Node<S> for Force<S> {
    fn tick(&self, ctx: &mut Context<'_, S>) -> Status {
        let status = self.child.tick(ctx);
        self.active.note(ctx.call_depth(), status);
        if status.is_running() {
            Status::Running
        } else {
            self.status
        }
    }

    fn reset(&self, depth: usize, fire_exit_events: bool) {
        self.active.reset(&*self.child, depth, fire_exit_events);
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct LoopSlot {
    count: u32,
    child_running: bool,
}

/// Runs its child up to `count` times, one iteration per tick, stopping early on `Failure`.
///
/// Returns `Running` between iterations and the child's final status at the end.
pub struct Repeat<S: 'static = ()> {
    child: Box<dyn Node<S>>,
    count: u32,
    slots: DepthSlots<LoopSlot>,
}

impl<S: 'static> Repeat<S> {
    /// # Panics
    ///
    /// If `count` is zero.
    pub fn new(child: Box<dyn Node<S>>, count: u32) -> Self {
        assert!(count > 0, "Repeat count must be at least 1");
        Self {
            child,
            count,
            slots: DepthSlots::new(),
        }
    }
}

impl<S: 'static> Node<S> for Repeat<S> {
    fn tick(&self, ctx: &mut Context<'_, S>) -> Status {
        let depth = ctx.call_depth();
        let status = self.child.tick(ctx);
        if ctx.return_requested().is_some() {
            self.slots.reset(depth);
            return status;
        }

        match status {
            Status::Running => {
                self.slots.with(depth, |s| s.child_running = true);
                Status::Running
            }
            Status::Failure => {
                self.slots.reset(depth);
                Status::Failure
            }
            Status::Success => {
                let done = self.slots.with(depth, |s| {
                    s.count += 1;
                    s.child_running = false;
                    s.count >= self.count
                });
                if done {
                    self.slots.reset(depth);
                    Status::Success
                } else {
                    Status::Running
                }
            }
        }
    }

    fn reset(&self, depth: usize, fire_exit_events: bool) {
        if self.slots.take(depth).child_running {
            self.child.reset(depth, fire_exit_events);
        }
    }
}

/// Re-runs its child (one run per tick) until it reports `until`, then succeeds.
pub struct RepeatUntil<S: 'static = ()> {
    child: Box<dyn Node<S>>,
    until: Status,
    active: ActiveChild,
}

impl<S: 'static> RepeatUntil<S> {
    /// # Panics
    ///
    /// If `until` is `Running`.
    pub fn new(child: Box<dyn Node<S>>, until: Status) -> Self {
        assert!(until.is_terminal(), "RepeatUntil target must be terminal");
        Self {
            child,
            until,
            active: ActiveChild::default(),
        }
    }

    pub fn failure(child: Box<dyn Node<S>>) -> Self {
        Self::new(child, Status::Failure)
    }

    pub fn success(child: Box<dyn Node<S>>) -> Self {
        Self::new(child, Status::Success)
    }
}

impl<S: 'static> Node<S> for RepeatUntil<S> {
    fn tick(&self, ctx: &mut Context<'_, S>) -> Status {
        let depth = ctx.call_depth();
        let status = self.child.tick(ctx);
        self.active.note(depth, status);
        if ctx.return_requested().is_some() {
            return status;
        }

        if status == self.until {
            Status::Success
        } else {
            Status::Running
        }
    }

    fn reset(&self, depth: usize, fire_exit_events: bool) {
        self.active.reset(&*self.child, depth, fire_exit_events);
    }
}

/// Re-runs a failing child, one attempt per tick, up to `max_retries` extra attempts.
///
/// Returns `Running` between attempts and `Failure` once the budget is spent.
pub struct Retry<S: 'static = ()> {
    child: Box<dyn Node<S>>,
    max_retries: u32,
    slots: DepthSlots<LoopSlot>,
}

impl<S: 'static> Retry<S> {
    pub fn new(child: Box<dyn Node<S>>, max_retries: u32) -> Self {
        Self {
            child,
            max_retries,
            slots: DepthSlots::new(),
        }
    }
}

impl<S: 'static> Node<S> for Retry<S> {
    fn tick(&self, ctx: &mut Context<'_, S>) -> Status {
        let depth = ctx.call_depth();
        let status = self.child.tick(ctx);
        if ctx.return_requested().is_some() {
            self.slots.reset(depth);
            return status;
        }

        match status {
            Status::Running => {
                self.slots.with(depth, |s| s.child_running = true);
                Status::Running
            }
            Status::Success => {
                self.slots.reset(depth);
                Status::Success
            }
            Status::Failure => {
                let exhausted = self.slots.with(depth, |s| {
                    s.count += 1;
                    s.child_running = false;
                    s.count > self.max_retries
                });
                if exhausted {
                    self.slots.reset(depth);
                    Status::Failure
                } else {
                    Status::Running
                }
            }
        }
    }

    fn reset(&self, depth: usize, fire_exit_events: bool) {
        if self.slots.take(depth).child_running {
            self.child.reset(depth, fire_exit_events);
        }
    }
}

/// Fails once `duration` has accumulated while the child is still `Running`.
///
/// The child is ticked first; if it is still running once the budget is spent it is reset
/// (firing exit events) and the node fails.
pub struct Timeout<S: 'static = ()> {
    child: Box<dyn Node<S>>,
    duration: f32,
    slots: DepthSlots<Option<f32>>,
}

impl<S: 'static> Timeout<S> {
    /// # Panics
    ///
    /// If `duration` is negative or not finite.
    pub fn new(child: Box<dyn Node<S>>, duration: f32) -> Self {
        assert_duration("Timeout", duration);
        Self {
            child,
            duration,
            slots: DepthSlots::new(),
        }
    }
}

impl<S: 'static> Node<S> for Timeout<S> {
    fn tick(&self, ctx: &mut Context<'_, S>) -> Status {
        let depth = ctx.call_depth();
        let elapsed = self.slots.get(depth).unwrap_or(0.0) + ctx.delta();
        let status = self.child.tick(ctx);
        if status.is_terminal() {
            self.slots.reset(depth);
            return status;
        }

        if elapsed >= self.duration {
            self.slots.reset(depth);
            self.child.reset(depth, true);
            return Status::Failure;
        }
        self.slots.set(depth, Some(elapsed));
        Status::Running
    }

    fn reset(&self, depth: usize, fire_exit_events: bool) {
        if self.slots.take(depth).is_some() {
            self.child.reset(depth, fire_exit_events);
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct DelaySlot {
    elapsed: f32,
    released: bool,
}

/// Withholds ticking its child until `duration` has accumulated, returning `Running` meanwhile.
pub struct Delay<S: 'static = ()> {
    child: Box<dyn Node<S>>,
    duration: f32,
    slots: DepthSlots<DelaySlot>,
}

impl<S: 'static> Delay<S> {
    /// # Panics
    ///
    /// If `duration` is negative or not finite.
    pub fn new(child: Box<dyn Node<S>>, duration: f32) -> Self {
        assert_duration("Delay", duration);
        Self {
            child,
            duration,
            slots: DepthSlots::new(),
        }
    }
}

impl<S: 'static> Node<S> for Delay<S> {
    fn tick(&self, ctx: &mut Context<'_, S>) -> Status {
        let depth = ctx.call_depth();
        let (delta, duration) = (ctx.delta(), self.duration);
        let released = self.slots.with(depth, |s| {
            if !s.released {
                s.elapsed += delta;
                s.released = s.elapsed >= duration;
            }
            s.released
        });
        if !released {
            return Status::Running;
        }

        let status = self.child.tick(ctx);
        if status.is_terminal() {
            self.slots.reset(depth);
        }
        status
    }

    fn reset(&self, depth: usize, fire_exit_events: bool) {
        if self.slots.take(depth).released {
            self.child.reset(depth, fire_exit_events);
        }
    }
}

type GuardFn<S> = dyn Fn(&Context<'_, S>) -> bool;

/// Checks a predicate at the start of each fresh run; `false` fails without ticking the child.
///
/// While the child is `Running` the predicate is not re-checked.
pub struct Guard<S: 'static = ()> {
    predicate: Box<GuardFn<S>>,
    child: Box<dyn Node<S>>,
    active: ActiveChild,
}

impl<S: 'static> Guard<S> {
    pub fn new(
        predicate: impl Fn(&Context<'_, S>) -> bool + 'static,
        child: Box<dyn Node<S>>,
    ) -> Self {
        Self {
            predicate: Box::new(predicate),
            child,
            active: ActiveChild::default(),
        }
    }
}

impl<S: 'static> Node<S> for Guard<S> {
    fn tick(&self, ctx: &mut Context<'_, S>) -> Status {
        let depth = ctx.call_depth();
        if !self.active.slots.get(depth) && !(self.predicate)(&*ctx) {
            return Status::Failure;
        }
        let status = self.child.tick(ctx);
        self.active.note(depth, status);
        status
    }

    fn reset(&self, depth: usize, fire_exit_events: bool) {
        self.active.reset(&*self.child, depth, fire_exit_events);
    }
}

type EnterFn<S> = dyn Fn(&mut Context<'_, S>);
type ExitFn = dyn Fn(Status);

/// Brackets its child's run with enter/exit callbacks.
///
/// `on_enter` fires once at the start of each fresh run. `on_exit` fires once with the final
/// status when the child finishes, including when a [`Return`](crate::nodes::Return) below
/// requested the finish; this scope consumes that request. A forced reset with
/// `fire_exit_events` fires `on_exit(Status::Running)`: the run ended without a result.
pub struct Scope<S: 'static = ()> {
    child: Box<dyn Node<S>>,
    on_enter: Option<Box<EnterFn<S>>>,
    on_exit: Option<Box<ExitFn>>,
    active: DepthSlots<bool>,
}

impl<S: 'static> Scope<S> {
    pub fn new(child: Box<dyn Node<S>>) -> Self {
        Self {
            child,
            on_enter: None,
            on_exit: None,
            active: DepthSlots::new(),
        }
    }

    pub fn on_enter(mut self, on_enter: impl Fn(&mut Context<'_, S>) + 'static) -> Self {
        self.on_enter = Some(Box::new(on_enter));
        self
    }

    pub fn on_exit(mut self, on_exit: impl Fn(Status) + 'static) -> Self {
        self.on_exit = Some(Box::new(on_exit));
        self
    }

    fn fire_exit(&self, status: Status) {
        if let Some(on_exit) = &self.on_exit {
            on_exit(status);
        }
    }
}

impl<S: 'static> Node<S> for Scope<S> {
    fn tick(&self, ctx: &mut Context<'_, S>) -> Status {
        let depth = ctx.call_depth();
        if !self.active.get(depth) {
            self.active.set(depth, true);
            ctx.trace(tags::SCOPE_ENTER, depth as u64, 0);
            if let Some(on_enter) = &self.on_enter {
                on_enter(&mut *ctx);
            }
        }

        let mut status = self.child.tick(ctx);
        if let Some(requested) = ctx.take_return() {
            tracing::trace!(depth, ?requested, "scope consumed early return");
            if status.is_running() {
                self.child.reset(depth, true);
            }
            status = requested;
        }

        if status.is_terminal() {
            self.active.reset(depth);
            ctx.trace(tags::SCOPE_EXIT, depth as u64, status.code());
            self.fire_exit(status);
        }
        status
    }

    fn reset(&self, depth: usize, fire_exit_events: bool) {
        if !self.active.get(depth) {
            return;
        }
        self.active.reset(depth);
        self.child.reset(depth, fire_exit_events);
        if fire_exit_events {
            self.fire_exit(Status::Running);
        }
    }
}

#[derive(Default)]
struct LocalSlot {
    board: Blackboard,
    child_running: bool,
}

/// Runs its child against a local blackboard overlay.
///
/// Plain writes from the child land in the overlay and shadow the outer blackboard; global
/// writes go through to the root. The overlay lives while the child is `Running` and is
/// discarded when it finishes or is reset.
pub struct LocalScope<S: 'static = ()> {
    child: Box<dyn Node<S>>,
    slots: DepthSlots<LocalSlot>,
}

impl<S: 'static> LocalScope<S> {
    pub fn new(child: Box<dyn Node<S>>) -> Self {
        Self {
            child,
            slots: DepthSlots::new(),
        }
    }
}

impl<S: 'static> Node<S> for LocalScope<S> {
    fn tick(&self, ctx: &mut Context<'_, S>) -> Status {
        let depth = ctx.call_depth();
        let local = self.slots.take(depth).board;
        let (status, board) = ctx.with_overlay(local, |inner| self.child.tick(inner));
        if status.is_running() {
            self.slots.set(
                depth,
                LocalSlot {
                    board,
                    child_running: true,
                },
            );
        }
        status
    }

    fn reset(&self, depth: usize, fire_exit_events: bool) {
        if self.slots.take(depth).child_running {
            self.child.reset(depth, fire_exit_events);
        }
    }
}
