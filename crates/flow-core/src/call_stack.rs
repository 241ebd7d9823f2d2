use std::rc::Rc;

use crate::error::{CallStackOverflow, OverflowKind};

/// One active subtree invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    pub tree: Rc<str>,
    pub depth: usize,
}

/// Fixed-capacity stack of active subtree invocations.
///
/// Frames are pushed when a subtree is entered and popped when its tick returns. The stack only
/// guards against runaway recursion; resumption state lives in the nodes themselves.
#[derive(Debug, Clone)]
pub struct CallStack {
    frames: Vec<CallFrame>,
    capacity: usize,
}

impl CallStack {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            frames: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.frames.len() >= self.capacity
    }

    pub fn push(&mut self, frame: CallFrame) -> Result<(), CallStackOverflow> {
        if self.is_full() {
            return Err(CallStackOverflow {
                tree: frame.tree,
                depth: frame.depth,
                limit: self.capacity,
                kind: OverflowKind::Capacity,
            });
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<CallFrame> {
        self.frames.pop()
    }

    pub fn top(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    pub fn frames(&self) -> &[CallFrame] {
        &self.frames
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(depth: usize) -> CallFrame {
        CallFrame {
            tree: Rc::from("t"),
            depth,
        }
    }

    #[test]
    fn push_fails_once_capacity_is_reached() {
        let mut stack = CallStack::with_capacity(2);
        assert!(stack.push(frame(1)).is_ok());
        assert!(stack.push(frame(2)).is_ok());

        let err = stack.push(frame(3)).unwrap_err();
        assert_eq!(err.kind, OverflowKind::Capacity);
        assert_eq!(err.depth, 3);
        assert_eq!(err.limit, 2);
        assert_eq!(stack.len(), 2);

        assert_eq!(stack.pop().map(|f| f.depth), Some(2));
        assert!(stack.push(frame(2)).is_ok());
    }
}
