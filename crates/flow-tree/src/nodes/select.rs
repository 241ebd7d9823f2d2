use std::cell::RefCell;

use flow_core::{shuffle, DepthSlots, DeterministicRng, SplitMix64};

use crate::context::Context;
use crate::node::{Node, Status};

/// Chooses which single child a [`SelectOne`] runs.
///
/// Policies hold session state (bags, cursors, RNG streams) that outlives individual runs and
/// survives `reset`.
pub trait PickPolicy: 'static {
    /// Child to run for a fresh invocation over `len` children; `None` fails the invocation.
    fn pick(&mut self, len: usize) -> Option<usize>;

    /// The picked child reached a terminal status.
    fn complete(&mut self, index: usize);
}

/// Runs every child once, in a seeded random order, before any child repeats.
///
/// The bag is a Fisher-Yates permutation of all child indices drawn front to back. A draw is
/// consumed only when its child completes; a cancelled run draws the same child again. The
/// next permutation is shuffled once the whole bag has been consumed.
#[derive(Debug, Clone)]
pub struct ShuffleBag {
    rng: SplitMix64,
    order: Vec<usize>,
    next: usize,
}

impl ShuffleBag {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SplitMix64::new(seed),
            order: Vec::new(),
            next: 0,
        }
    }

    fn refill(&mut self, len: usize) {
        self.order.clear();
        self.order.extend(0..len);
        shuffle(&mut self.order, &mut self.rng);
        self.next = 0;
    }
}

impl PickPolicy for ShuffleBag {
    fn pick(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        if self.order.len() != len || self.next >= len {
            self.refill(len);
        }
        Some(self.order[self.next])
    }

    fn complete(&mut self, index: usize) {
        if self.order.get(self.next) == Some(&index) {
            self.next += 1;
        }
    }
}

/// Independent weighted draw per fresh invocation.
///
/// A child is chosen with probability `weight / total`. Zero-weight children are never
/// chosen; when every weight is zero the node fails.
#[derive(Debug, Clone)]
pub struct WeightedRandom {
    rng: SplitMix64,
    weights: Vec<f32>,
}

impl WeightedRandom {
    /// # Panics
    ///
    /// If any weight is negative or not finite.
    pub fn new(seed: u64, weights: Vec<f32>) -> Self {
        assert!(
            weights.iter().all(|w| w.is_finite() && *w >= 0.0),
            "weights must be finite and non-negative"
        );
        Self {
            rng: SplitMix64::new(seed),
            weights,
        }
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }
}

impl PickPolicy for WeightedRandom {
    fn pick(&mut self, len: usize) -> Option<usize> {
        let weights = &self.weights[..len.min(self.weights.len())];
        let total: f64 = weights.iter().map(|w| f64::from(*w)).sum();
        if total <= 0.0 {
            return None;
        }

        let mut roll = self.rng.next_f64_unit() * total;
        let mut last = None;
        for (i, w) in weights.iter().enumerate() {
            if *w <= 0.0 {
                continue;
            }
            let w = f64::from(*w);
            if roll < w {
                return Some(i);
            }
            roll -= w;
            last = Some(i);
        }
        // Rounding can leave `roll` just past the final bucket.
        last
    }

    fn complete(&mut self, _index: usize) {}
}

/// Rotates through the children in order, advancing the cursor when the current child
/// completes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundRobin {
    cursor: usize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl PickPolicy for RoundRobin {
    fn pick(&mut self, len: usize) -> Option<usize> {
        (len > 0).then(|| self.cursor % len)
    }

    fn complete(&mut self, index: usize) {
        self.cursor = index.wrapping_add(1);
    }
}

/// Runs one child per invocation, chosen by a [`PickPolicy`].
///
/// The choice is made at the start of a fresh invocation; a `Running` child keeps being ticked
/// on later calls without re-selecting. The result is the chosen child's status.
pub struct SelectOne<S: 'static, P: PickPolicy> {
    children: Vec<Box<dyn Node<S>>>,
    policy: RefCell<P>,
    active: DepthSlots<Option<usize>>,
}

pub type ShuffleSelector<S = ()> = SelectOne<S, ShuffleBag>;
pub type WeightedSelector<S = ()> = SelectOne<S, WeightedRandom>;
pub type RoundRobinSelector<S = ()> = SelectOne<S, RoundRobin>;

impl<S: 'static, P: PickPolicy> SelectOne<S, P> {
    pub fn new(policy: P, children: Vec<Box<dyn Node<S>>>) -> Self {
        Self {
            children,
            policy: RefCell::new(policy),
            active: DepthSlots::new(),
        }
    }

    /// Snapshot of the session state.
    pub fn policy(&self) -> P
    where
        P: Clone,
    {
        self.policy.borrow().clone()
    }
}

impl<S: 'static> SelectOne<S, ShuffleBag> {
    pub fn shuffled(seed: u64, children: Vec<Box<dyn Node<S>>>) -> Self {
        Self::new(ShuffleBag::new(seed), children)
    }
}

impl<S: 'static> SelectOne<S, WeightedRandom> {
    /// # Panics
    ///
    /// If `weights` and `children` differ in length, or a weight is negative or not finite.
    pub fn weighted(seed: u64, weights: Vec<f32>, children: Vec<Box<dyn Node<S>>>) -> Self {
        assert_eq!(
            weights.len(),
            children.len(),
            "one weight is required per child"
        );
        Self::new(WeightedRandom::new(seed, weights), children)
    }
}

impl<S: 'static> SelectOne<S, RoundRobin> {
    pub fn round_robin(children: Vec<Box<dyn Node<S>>>) -> Self {
        Self::new(RoundRobin::new(), children)
    }
}

impl<S: 'static, P: PickPolicy> Node<S> for SelectOne<S, P> {
    fn tick(&self, ctx: &mut Context<'_, S>) -> Status {
        let depth = ctx.call_depth();
        let index = match self.active.get(depth) {
            Some(index) => index,
            None => match self.policy.borrow_mut().pick(self.children.len()) {
                Some(index) => index,
                None => return Status::Failure,
            },
        };

        let status = self.children[index].tick(ctx);
        if status.is_running() {
            self.active.set(depth, Some(index));
        } else {
            self.active.reset(depth);
            self.policy.borrow_mut().complete(index);
        }
        status
    }

    fn reset(&self, depth: usize, fire_exit_events: bool) {
        if let Some(index) = self.active.take(depth) {
            self.children[index].reset(depth, fire_exit_events);
        }
    }
}
