use crate::context::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Running,
    Success,
    Failure,
}

impl Status {
    pub fn is_running(self) -> bool {
        matches!(self, Status::Running)
    }

    pub fn is_success(self) -> bool {
        matches!(self, Status::Success)
    }

    pub fn is_failure(self) -> bool {
        matches!(self, Status::Failure)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_running()
    }

    /// Swap `Success` and `Failure`; `Running` passes through.
    pub fn invert(self) -> Self {
        match self {
            Status::Running => Status::Running,
            Status::Success => Status::Failure,
            Status::Failure => Status::Success,
        }
    }

    /// Stable numeric code used in trace events.
    pub fn code(self) -> u64 {
        match self {
            Status::Running => 0,
            Status::Success => 1,
            Status::Failure => 2,
        }
    }
}

/// The two-method protocol every node implements.
///
/// Nodes take `&self` because one instance can be active at several call depths at once
/// (a tree that invokes itself, or one subtree shared by two call sites). Run state is kept
/// per depth in [`flow_core::DepthSlots`], indexed by [`Context::call_depth`].
///
/// A node that returns a terminal status has already cleared its slot for that depth.
pub trait Node<S = ()>: 'static
where
    S: 'static,
{
    fn tick(&self, ctx: &mut Context<'_, S>) -> Status;

    /// Abandon the run at `depth`, resetting this node and whichever children are still
    /// active there. With `fire_exit_events`, scopes left running fire their exit callback.
    fn reset(&self, depth: usize, fire_exit_events: bool);
}

impl<S: 'static> Node<S> for Box<dyn Node<S>> {
    fn tick(&self, ctx: &mut Context<'_, S>) -> Status {
        (**self).tick(ctx)
    }

    fn reset(&self, depth: usize, fire_exit_events: bool) {
        (**self).reset(depth, fire_exit_events)
    }
}
