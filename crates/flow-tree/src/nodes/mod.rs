//! The node algebra: leaves, single-child decorators, multi-child composites and one-of selectors.

pub mod composite;
pub mod decorator;
pub mod leaf;
pub mod select;
pub mod subtree;

pub use composite::{
    Join, JoinPolicy, Parallel, ParallelPolicy, Race, ReactiveSelector, ReactiveSequence,
    Selector, Sequence,
};
pub use decorator::{
    Delay, Force, Guard, Invert, LocalScope, Repeat, RepeatUntil, Retry, Scope, Timeout,
};
pub use leaf::{Action, Condition, Return, Wait, WaitUntil, Yield};
pub use select::{
    PickPolicy, RoundRobin, RoundRobinSelector, SelectOne, ShuffleBag, ShuffleSelector,
    WeightedRandom, WeightedSelector,
};
pub use subtree::SubTree;
