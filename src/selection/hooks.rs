//! Sent-selection hooks: observers notified after each answer attempt.
//!
//! Hooks are called with the slot, the format the answer was given in,
//! and whether it succeeded. They cannot change the answer. Hooks run in
//! insertion order and the list only ever grows.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use super::{SelectionSlot, TargetType};

type Hook = Arc<dyn Fn(SelectionSlot, &TargetType, bool) + Send + Sync>;

/// Ordered, append-only list of sent-selection observers.
#[derive(Default)]
pub struct SentSelectionHooks {
    hooks: Mutex<Vec<Hook>>,
}

impl SentSelectionHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook to the end of the list.
    pub fn add<F>(&self, hook: F)
    where
        F: Fn(SelectionSlot, &TargetType, bool) + Send + Sync + 'static,
    {
        self.hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(hook));
    }

    pub fn len(&self) -> usize {
        self.hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Invoke every hook in insertion order.
    ///
    /// The list is snapshotted first, so a hook may add further hooks;
    /// those run from the next call on.
    pub fn run(&self, slot: SelectionSlot, target: &TargetType, success: bool) {
        let snapshot: Vec<Hook> = self
            .hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for hook in snapshot {
            hook(slot, target, success);
        }
    }
}

impl fmt::Debug for SentSelectionHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SentSelectionHooks")
            .field("len", &self.len())
            .finish()
    }
}
