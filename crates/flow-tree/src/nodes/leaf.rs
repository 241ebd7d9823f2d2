use flow_core::DepthSlots;
use flow_tools::tags;

use crate::context::Context;
use crate::node::{Node, Status};

pub(crate) fn assert_duration(kind: &str, duration: f32) {
    assert!(
        duration.is_finite() && duration >= 0.0,
        "{kind} duration must be finite and non-negative, got {duration}"
    );
}

type ActionFn<S> = dyn Fn(&mut Context<'_, S>) -> Status;
type PredicateFn<S> = dyn Fn(&Context<'_, S>) -> bool;

/// Runs a callback every tick and returns whatever it reports.
pub struct Action<S: 'static = ()> {
    action: Box<ActionFn<S>>,
}

impl<S: 'static> Action<S> {
    pub fn new(action: impl Fn(&mut Context<'_, S>) -> Status + 'static) -> Self {
        Self {
            action: Box::new(action),
        }
    }
}

impl<S: 'static> Node<S> for Action<S> {
    fn tick(&self, ctx: &mut Context<'_, S>) -> Status {
        (self.action)(ctx)
    }

    fn reset(&self, _depth: usize, _fire_exit_events: bool) {}
}

#[derive(Debug, Clone, Copy, Default)]
struct Throttle {
    elapsed: f32,
    cached: Option<bool>,
}

impl Throttle {
    /// Returns the cached result while the interval has not elapsed, `None` when due.
    fn poll(&mut self, delta: f32, interval: f32) -> Option<bool> {
        let cached = self.cached?;
        self.elapsed += delta;
        if self.elapsed >= interval {
            None
        } else {
            Some(cached)
        }
    }

    fn store(&mut self, value: bool) {
        self.cached = Some(value);
        self.elapsed = 0.0;
    }
}

/// `true` -> `Success`, `false` -> `Failure`.
///
/// With [`Condition::with_interval`] the predicate is re-evaluated only once `interval` has
/// accumulated; ticks in between return the cached result. The first evaluation always runs.
pub struct Condition<S: 'static = ()> {
    predicate: Box<PredicateFn<S>>,
    interval: f32,
    slots: DepthSlots<Throttle>,
}

impl<S: 'static> Condition<S> {
    pub fn new(predicate: impl Fn(&Context<'_, S>) -> bool + 'static) -> Self {
        Self {
            predicate: Box::new(predicate),
            interval: 0.0,
            slots: DepthSlots::new(),
        }
    }

    /// # Panics
    ///
    /// If `interval` is negative or not finite.
    pub fn with_interval(mut self, interval: f32) -> Self {
        assert_duration("Condition interval", interval);
        self.interval = interval;
        self
    }
}

impl<S: 'static> Node<S> for Condition<S> {
    fn tick(&self, ctx: &mut Context<'_, S>) -> Status {
        let depth = ctx.call_depth();
        let result = if self.interval > 0.0 {
            let (delta, interval) = (ctx.delta(), self.interval);
            match self.slots.with(depth, |t| t.poll(delta, interval)) {
                Some(cached) => cached,
                None => {
                    let value = (self.predicate)(&*ctx);
                    self.slots.with(depth, |t| t.store(value));
                    value
                }
            }
        } else {
            (self.predicate)(&*ctx)
        };

        if result {
            Status::Success
        } else {
            Status::Failure
        }
    }

    fn reset(&self, depth: usize, _fire_exit_events: bool) {
        self.slots.reset(depth);
    }
}

/// `Running` until `duration` worth of deltas has accumulated, then `Success`.
pub struct Wait {
    duration: f32,
    slots: DepthSlots<f32>,
}

impl Wait {
    /// # Panics
    ///
    /// If `duration` is negative or not finite.
    pub fn new(duration: f32) -> Self {
        assert_duration("Wait", duration);
        Self {
            duration,
            slots: DepthSlots::new(),
        }
    }
}

impl<S: 'static> Node<S> for Wait {
    fn tick(&self, ctx: &mut Context<'_, S>) -> Status {
        let depth = ctx.call_depth();
        let elapsed = self.slots.get(depth) + ctx.delta();
        if elapsed >= self.duration {
            self.slots.reset(depth);
            Status::Success
        } else {
            self.slots.set(depth, elapsed);
            Status::Running
        }
    }

    fn reset(&self, depth: usize, _fire_exit_events: bool) {
        self.slots.reset(depth);
    }
}

/// `Running` until the predicate holds, then `Success`.
///
/// Supports the same throttling as [`Condition`].
pub struct WaitUntil<S: 'static = ()> {
    predicate: Box<PredicateFn<S>>,
    interval: f32,
    slots: DepthSlots<Throttle>,
}

impl<S: 'static> WaitUntil<S> {
    pub fn new(predicate: impl Fn(&Context<'_, S>) -> bool + 'static) -> Self {
        Self {
            predicate: Box::new(predicate),
            interval: 0.0,
            slots: DepthSlots::new(),
        }
    }

    /// # Panics
    ///
    /// If `interval` is negative or not finite.
    pub fn with_interval(mut self, interval: f32) -> Self {
        assert_duration("WaitUntil interval", interval);
        self.interval = interval;
        self
    }
}

impl<S: 'static> Node<S> for WaitUntil<S> {
    fn tick(&self, ctx: &mut Context<'_, S>) -> Status {
        let depth = ctx.call_depth();
        let (delta, interval) = (ctx.delta(), self.interval);
        if self.slots.with(depth, |t| t.poll(delta, interval)).is_some() {
            // Cached result is always `false` here: a `true` ends the run.
            return Status::Running;
        }

        if (self.predicate)(&*ctx) {
            self.slots.reset(depth);
            Status::Success
        } else {
            self.slots.with(depth, |t| t.store(false));
            Status::Running
        }
    }

    fn reset(&self, depth: usize, _fire_exit_events: bool) {
        self.slots.reset(depth);
    }
}

/// `Running` once, then `Success` on the following tick.
///
/// A one-frame pause, used to break busy loops in self-recursive trees.
#[derive(Default)]
pub struct Yield {
    slots: DepthSlots<bool>,
}

impl Yield {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: 'static> Node<S> for Yield {
    fn tick(&self, ctx: &mut Context<'_, S>) -> Status {
        let depth = ctx.call_depth();
        if self.slots.get(depth) {
            self.slots.reset(depth);
            Status::Success
        } else {
            self.slots.set(depth, true);
            Status::Running
        }
    }

    fn reset(&self, depth: usize, _fire_exit_events: bool) {
        self.slots.reset(depth);
    }
}

/// Returns `status` immediately and asks the nearest enclosing scope to finish with it.
///
/// Composites stop as soon as they observe the request, so this short-circuits deep
/// sequences. The request crosses subtree boundaries; one no scope consumes ends with the top-level tick.
pub struct Return {
    status: Status,
}

impl Return {
    /// # Panics
    ///
    /// If `status` is `Running`.
    pub fn new(status: Status) -> Self {
        assert!(status.is_terminal(), "Return status must be terminal");
        Self { status }
    }

    pub fn success() -> Self {
        Self::new(Status::Success)
    }

    pub fn failure() -> Self {
        Self::new(Status::Failure)
    }
}

impl<S: 'static> Node<S> for Return {
    fn tick(&self, ctx: &mut Context<'_, S>) -> Status {
        ctx.request_return(self.status);
        ctx.trace(tags::RETURN, ctx.call_depth() as u64, self.status.code());
        self.status
    }

    fn reset(&self, _depth: usize, _fire_exit_events: bool) {}
}
