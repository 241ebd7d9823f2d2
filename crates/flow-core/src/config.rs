#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{FlowError, Result};

/// Recursion limits for a tree's subtree invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TreeConfig {
    /// Deepest subtree nesting allowed; entering a subtree beyond it fails the invocation.
    pub max_call_depth: usize,

    /// Frames in the fixed-capacity call stack. `None` runs without a call stack, relying on
    /// `max_call_depth` alone.
    pub call_stack_capacity: Option<usize>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 64,
            call_stack_capacity: Some(64),
        }
    }
}

impl TreeConfig {
    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }

    pub fn with_call_stack_capacity(mut self, capacity: Option<usize>) -> Self {
        self.call_stack_capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_call_depth == 0 {
            return Err(FlowError::InvalidConfig {
                field: "max_call_depth",
                reason: "must be at least 1",
            });
        }
        if self.call_stack_capacity == Some(0) {
            return Err(FlowError::InvalidConfig {
                field: "call_stack_capacity",
                reason: "must be at least 1 when set",
            });
        }
        Ok(())
    }
}
