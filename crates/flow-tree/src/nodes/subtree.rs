use std::rc::Rc;

use flow_core::DepthSlots;
use flow_tools::tags;

use crate::context::Context;
use crate::node::{Node, Status};
use crate::tree::{Tree, TreeRef};

type Provider<S> = dyn Fn() -> Option<Rc<Tree<S>>>;
type StateFactory<S> = dyn Fn(Option<&Rc<S>>) -> S;

enum Source<S: 'static> {
    Static(TreeRef<S>),
    Dynamic(Box<Provider<S>>),
}

/// The tree (and child state) chosen for the invocation at one call depth.
struct Invocation<S: 'static> {
    tree: Option<Rc<Tree<S>>>,
    state: Option<Rc<S>>,
}

impl<S: 'static> Default for Invocation<S> {
    fn default() -> Self {
        Self {
            tree: None,
            state: None,
        }
    }
}

/// Delegates execution to another tree.
///
/// The tree is resolved once per fresh invocation (a dynamic provider is not re-evaluated
/// while the subtree is `Running`) and forgotten when the subtree finishes. Each tick pushes
/// a call frame and steps one call depth deeper; if the recursion guard rejects the frame
/// the invocation fails and the overflow is recorded on the context.
///
/// A return request the child tree does not consume stays on the context and reaches the
/// nearest scope in the calling tree.
pub struct SubTree<S: 'static = ()> {
    source: Source<S>,
    make_state: Option<Box<StateFactory<S>>>,
    slots: DepthSlots<Invocation<S>>,
}

impl<S: 'static> SubTree<S> {
    pub fn new(tree: impl Into<TreeRef<S>>) -> Self {
        Self::from_source(Source::Static(tree.into()))
    }

    /// Pick the tree to run at the start of each fresh invocation. `None` fails the invocation.
    pub fn dynamic(provider: impl Fn() -> Option<Rc<Tree<S>>> + 'static) -> Self {
        Self::from_source(Source::Dynamic(Box::new(provider)))
    }

    /// Give the child tree its own state, built from the caller's state at the start of each
    /// fresh invocation. The factory receives the parent state so the child can keep a
    /// back-reference to it.
    pub fn with_state(mut self, make_state: impl Fn(Option<&Rc<S>>) -> S + 'static) -> Self {
        self.make_state = Some(Box::new(make_state));
        self
    }

    fn from_source(source: Source<S>) -> Self {
        Self {
            source,
            make_state: None,
            slots: DepthSlots::new(),
        }
    }

    fn resolve(&self) -> Option<Rc<Tree<S>>> {
        match &self.source {
            Source::Static(tree) => tree.upgrade(),
            Source::Dynamic(provider) => provider(),
        }
    }
}

impl<S: 'static> Node<S> for SubTree<S> {
    fn tick(&self, ctx: &mut Context<'_, S>) -> Status {
        let depth = ctx.call_depth();
        let active = self
            .slots
            .with(depth, |inv| inv.tree.clone().map(|tree| (tree, inv.state.clone())));

        let fresh = active.is_none();
        let (tree, child_state) = match active {
            Some(active) => active,
            None => {
                let Some(tree) = self.resolve() else {
                    tracing::debug!(depth, "subtree source produced no tree");
                    return Status::Failure;
                };
                let state = self
                    .make_state
                    .as_ref()
                    .map(|make| Rc::new(make(ctx.state_rc())));
                self.slots.with(depth, |inv| {
                    inv.tree = Some(Rc::clone(&tree));
                    inv.state = state.clone();
                });
                (tree, state)
            }
        };

        if let Err(overflow) = ctx.enter_subtree(tree.name_rc()) {
            tracing::warn!(
                tree = %overflow.tree,
                depth = overflow.depth,
                limit = overflow.limit,
                kind = ?overflow.kind,
                "subtree invocation exceeded recursion limit"
            );
            ctx.trace(
                tags::SUBTREE_OVERFLOW,
                overflow.depth as u64,
                overflow.limit as u64,
            );
            ctx.record_overflow(overflow);
            self.slots.reset(depth);
            return Status::Failure;
        }
        if fresh {
            tracing::debug!(tree = %tree.name(), depth = depth + 1, "entering subtree");
            ctx.trace(tags::SUBTREE_ENTER, (depth + 1) as u64, 0);
        }

        let parent_state = self
            .make_state
            .is_some()
            .then(|| ctx.replace_state(child_state));
        let status = tree.tick_nested(ctx);
        if let Some(parent_state) = parent_state {
            ctx.replace_state(parent_state);
        }
        ctx.exit_subtree();

        if status.is_terminal() {
            tracing::debug!(tree = %tree.name(), depth = depth + 1, ?status, "subtree finished");
            ctx.trace(tags::SUBTREE_EXIT, (depth + 1) as u64, status.code());
            self.slots.reset(depth);
        }
        status
    }

    fn reset(&self, depth: usize, fire_exit_events: bool) {
        let invocation = self.slots.take(depth);
        if let Some(tree) = invocation.tree {
            tree.root().reset(depth + 1, fire_exit_events);
        }
    }
}
