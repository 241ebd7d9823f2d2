use std::cell::RefCell;

/// Per-call-depth storage for node run state.
///
/// A node instance can be active at several call depths at once (self- or mutual recursion
/// through subtrees), so run state is kept in one slot per depth instead of a single field.
/// Slots are created on demand and only the slot for the depth being torn down is reset.
///
/// Borrows are scoped to each accessor call; never tick a child from inside [`DepthSlots::with`].
#[derive(Debug, Default)]
pub struct DepthSlots<T> {
    slots: RefCell<Vec<T>>,
}

impl<T: Default> DepthSlots<T> {
    pub fn new() -> Self {
        Self {
            slots: RefCell::new(Vec::new()),
        }
    }

    pub fn with<R>(&self, depth: usize, f: impl FnOnce(&mut T) -> R) -> R {
        let mut slots = self.slots.borrow_mut();
        if slots.len() <= depth {
            slots.resize_with(depth + 1, T::default);
        }
        f(&mut slots[depth])
    }

    pub fn get(&self, depth: usize) -> T
    where
        T: Clone,
    {
        self.slots
            .borrow()
            .get(depth)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set(&self, depth: usize, value: T) {
        self.with(depth, |slot| *slot = value);
    }

    /// Move the slot out, leaving the default in its place.
    pub fn take(&self, depth: usize) -> T {
        let mut slots = self.slots.borrow_mut();
        match slots.get_mut(depth) {
            Some(slot) => std::mem::take(slot),
            None => T::default(),
        }
    }

    pub fn reset(&self, depth: usize) {
        if let Some(slot) = self.slots.borrow_mut().get_mut(depth) {
            *slot = T::default();
        }
    }

    /// Number of depths that have been touched so far.
    pub fn depth_count(&self) -> usize {
        self.slots.borrow().len()
    }
}
