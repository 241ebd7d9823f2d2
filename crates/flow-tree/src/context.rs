use std::rc::Rc;

use flow_core::{
    BbKey, BbValue, Blackboard, BlackboardAccess, CallFrame, CallStack, CallStackOverflow,
    OverflowKind, ScopedBlackboard,
};
use flow_tools::{emit as trace_emit, TraceEvent};

use crate::node::Status;

/// Per-tick carrier passed by mutable reference through the whole tick call chain.
///
/// Children read timing, shared data and the caller's state from it, and write back the
/// early-return request. `call_depth` counts subtree nesting, not node nesting.
pub struct Context<'a, S = ()> {
    tick: u64,
    delta: f32,
    board: &'a mut dyn BlackboardAccess,
    state: Option<Rc<S>>,
    call_stack: Option<&'a mut CallStack>,
    max_call_depth: usize,
    call_depth: usize,
    return_request: Option<Status>,
    overflow: Option<CallStackOverflow>,
}

impl<'a, S> Context<'a, S> {
    /// `delta` is the elapsed time (or tick count) since the previous tick.
    pub fn new(delta: f32, board: &'a mut dyn BlackboardAccess) -> Self {
        Self {
            tick: 0,
            delta,
            board,
            state: None,
            call_stack: None,
            max_call_depth: usize::MAX,
            call_depth: 0,
            return_request: None,
            overflow: None,
        }
    }

    pub fn with_tick(mut self, tick: u64) -> Self {
        self.tick = tick;
        self
    }

    pub fn with_state(mut self, state: Option<Rc<S>>) -> Self {
        self.state = state;
        self
    }

    pub fn with_call_stack(mut self, call_stack: &'a mut CallStack) -> Self {
        self.call_stack = Some(call_stack);
        self
    }

    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn delta(&self) -> f32 {
        self.delta
    }

    pub fn board(&self) -> &dyn BlackboardAccess {
        &*self.board
    }

    pub fn board_mut(&mut self) -> &mut dyn BlackboardAccess {
        &mut *self.board
    }

    pub fn get<T: BbValue>(&self, key: BbKey<T>) -> Option<T> {
        self.board.get(key)
    }

    pub fn set<T: BbValue>(&mut self, key: BbKey<T>, value: T) {
        self.board.set(key, value);
    }

    pub fn set_global<T: BbValue>(&mut self, key: BbKey<T>, value: T) {
        self.board.set_global(key, value);
    }

    pub fn state(&self) -> Option<&S> {
        self.state.as_deref()
    }

    pub fn state_rc(&self) -> Option<&Rc<S>> {
        self.state.as_ref()
    }

    pub fn call_stack(&self) -> Option<&CallStack> {
        self.call_stack.as_deref()
    }

    pub fn call_depth(&self) -> usize {
        self.call_depth
    }

    pub fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }

    /// Ask the nearest enclosing scope to finish with `status`.
    pub fn request_return(&mut self, status: Status) {
        self.return_request = Some(status);
    }

    pub fn return_requested(&self) -> Option<Status> {
        self.return_request
    }

    pub fn take_return(&mut self) -> Option<Status> {
        self.return_request.take()
    }

    /// First recursion-guard failure recorded during this tick.
    pub fn overflow(&self) -> Option<&CallStackOverflow> {
        self.overflow.as_ref()
    }

    pub fn take_overflow(&mut self) -> Option<CallStackOverflow> {
        self.overflow.take()
    }

    pub fn trace(&mut self, tag: &'static str, a: u64, b: u64) {
        let event = TraceEvent::new(self.tick, tag).with_a(a).with_b(b);
        trace_emit(self.board.root_mut(), event);
    }

    pub fn root_board_mut(&mut self) -> &mut Blackboard {
        self.board.root_mut()
    }

    /// Push a frame for `tree` and step one level deeper.
    pub(crate) fn enter_subtree(&mut self, tree: &Rc<str>) -> Result<(), CallStackOverflow> {
        let depth = self.call_depth + 1;
        if depth > self.max_call_depth {
            return Err(CallStackOverflow {
                tree: Rc::clone(tree),
                depth,
                limit: self.max_call_depth,
                kind: OverflowKind::MaxDepth,
            });
        }
        if let Some(stack) = self.call_stack.as_deref_mut() {
            stack.push(CallFrame {
                tree: Rc::clone(tree),
                depth,
            })?;
        }
        self.call_depth = depth;
        Ok(())
    }

    pub(crate) fn exit_subtree(&mut self) {
        if let Some(stack) = self.call_stack.as_deref_mut() {
            stack.pop();
        }
        self.call_depth = self.call_depth.saturating_sub(1);
    }

    pub(crate) fn record_overflow(&mut self, overflow: CallStackOverflow) {
        if self.overflow.is_none() {
            self.overflow = Some(overflow);
        }
    }

    pub(crate) fn replace_state(&mut self, state: Option<Rc<S>>) -> Option<Rc<S>> {
        std::mem::replace(&mut self.state, state)
    }

    /// Run `f` against a view of this context whose blackboard is `local` layered over the
    /// current one. Returns `f`'s result and the overlay, detached again.
    pub(crate) fn with_overlay<R>(
        &mut self,
        local: Blackboard,
        f: impl FnOnce(&mut Context<'_, S>) -> R,
    ) -> (R, Blackboard) {
        let mut scoped = ScopedBlackboard::with_local(&mut *self.board, local);
        let mut inner = Context {
            tick: self.tick,
            delta: self.delta,
            board: &mut scoped,
            state: self.state.clone(),
            call_stack: self.call_stack.as_deref_mut(),
            max_call_depth: self.max_call_depth,
            call_depth: self.call_depth,
            return_request: self.return_request.take(),
            overflow: self.overflow.take(),
        };
        let out = f(&mut inner);
        self.return_request = inner.return_request;
        self.overflow = inner.overflow;
        (out, scoped.into_local())
    }
}
