use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use flow_core::{BlackboardAccess, CallStack, CallStackOverflow, Result, TreeConfig};

use crate::context::Context;
use crate::node::{Node, Status};

/// A named root node plus the recursion limits its subtree invocations run under.
///
/// Trees are shared by `Rc`: a tree does not own the trees it invokes, so the same tree can be
/// referenced from several call sites or from inside itself (see [`Tree::recursive`]).
pub struct Tree<S = ()>
where
    S: 'static,
{
    name: Rc<str>,
    root: Box<dyn Node<S>>,
    config: TreeConfig,
    stack: Option<RefCell<CallStack>>,
    ticks: Cell<u64>,
    last_overflow: RefCell<Option<CallStackOverflow>>,
}

impl<S: 'static> Tree<S> {
    pub fn new(name: impl Into<Rc<str>>, root: Box<dyn Node<S>>) -> Self {
        Self::from_parts(name.into(), root, TreeConfig::default())
    }

    pub fn with_config(mut self, config: TreeConfig) -> Result<Self> {
        config.validate()?;
        self.stack = config
            .call_stack_capacity
            .map(|capacity| RefCell::new(CallStack::with_capacity(capacity)));
        self.config = config;
        Ok(self)
    }

    /// Build a tree whose nodes may invoke the tree itself through the given handle.
    pub fn recursive(
        name: impl Into<Rc<str>>,
        build: impl FnOnce(TreeRef<S>) -> Box<dyn Node<S>>,
    ) -> Rc<Self> {
        let name = name.into();
        Rc::new_cyclic(|this| {
            Self::from_parts(name, build(TreeRef::Weak(this.clone())), TreeConfig::default())
        })
    }

    pub fn recursive_with_config(
        name: impl Into<Rc<str>>,
        config: TreeConfig,
        build: impl FnOnce(TreeRef<S>) -> Box<dyn Node<S>>,
    ) -> Result<Rc<Self>> {
        config.validate()?;
        let name = name.into();
        Ok(Rc::new_cyclic(|this| {
            Self::from_parts(name, build(TreeRef::Weak(this.clone())), config)
        }))
    }

    fn from_parts(name: Rc<str>, root: Box<dyn Node<S>>, config: TreeConfig) -> Self {
        Self {
            name,
            root,
            stack: config
                .call_stack_capacity
                .map(|capacity| RefCell::new(CallStack::with_capacity(capacity))),
            config,
            ticks: Cell::new(0),
            last_overflow: RefCell::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_rc(&self) -> &Rc<str> {
        &self.name
    }

    pub fn root(&self) -> &dyn Node<S> {
        &*self.root
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Number of top-level ticks run so far.
    pub fn tick_count(&self) -> u64 {
        self.ticks.get()
    }

    /// Recursion-guard failure from the most recent top-level tick, if any.
    pub fn last_overflow(&self) -> Option<CallStackOverflow> {
        self.last_overflow.borrow().clone()
    }

    pub fn tick(&self, delta: f32, board: &mut dyn BlackboardAccess) -> Status {
        self.tick_with_state(delta, board, None)
    }

    /// Tick the root once with a fresh context. The call stack is reused and cleared first.
    pub fn tick_with_state(
        &self,
        delta: f32,
        board: &mut dyn BlackboardAccess,
        state: Option<Rc<S>>,
    ) -> Status {
        let tick = self.ticks.get();
        self.ticks.set(tick.wrapping_add(1));

        let mut stack = match self.stack.as_ref().map(RefCell::try_borrow_mut) {
            Some(Ok(stack)) => Some(stack),
            Some(Err(_)) => {
                tracing::warn!(tree = %self.name, "tree ticked re-entrantly; failing this tick");
                return Status::Failure;
            }
            None => None,
        };

        let mut ctx = Context::new(delta, board)
            .with_tick(tick)
            .with_state(state)
            .with_max_call_depth(self.config.max_call_depth);
        if let Some(stack) = stack.as_deref_mut() {
            stack.clear();
            ctx = ctx.with_call_stack(stack);
        }

        let status = self.root.tick(&mut ctx);
        // A return no scope consumed ends with the top-level tick.
        ctx.take_return();
        *self.last_overflow.borrow_mut() = ctx.take_overflow();
        status
    }

    /// Tick this tree's root inside an existing context (a subtree invocation).
    pub(crate) fn tick_nested(&self, ctx: &mut Context<'_, S>) -> Status {
        self.root.tick(ctx)
    }

    /// Cancel a run left in progress by top-level ticks.
    pub fn reset(&self, fire_exit_events: bool) {
        self.root.reset(0, fire_exit_events);
    }
}

/// Handle to a tree invoked as a subtree.
///
/// `Weak` handles break the ownership cycle of self-referencing trees.
pub enum TreeRef<S: 'static = ()> {
    Strong(Rc<Tree<S>>),
    Weak(Weak<Tree<S>>),
}

impl<S: 'static> TreeRef<S> {
    pub fn upgrade(&self) -> Option<Rc<Tree<S>>> {
        match self {
            TreeRef::Strong(tree) => Some(Rc::clone(tree)),
            TreeRef::Weak(tree) => tree.upgrade(),
        }
    }
}

impl<S: 'static> Clone for TreeRef<S> {
    fn clone(&self) -> Self {
        match self {
            TreeRef::Strong(tree) => TreeRef::Strong(Rc::clone(tree)),
            TreeRef::Weak(tree) => TreeRef::Weak(Weak::clone(tree)),
        }
    }
}

impl<S: 'static> From<Rc<Tree<S>>> for TreeRef<S> {
    fn from(tree: Rc<Tree<S>>) -> Self {
        TreeRef::Strong(tree)
    }
}
