//! Pending-action queue for externally submitted commands.
//!
//! Actions are admitted between ticks and drained in full by the next
//! `advance()`. Submission order is preserved; the resolver re-sorts by
//! priority class with a stable sort, so FIFO order breaks ties.

use crate::action::QueuedAction;

/// Where an admitted action will be evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// The turn whose apply phase will evaluate the action.
    pub applies_at_turn: u64,
    /// Position in the pending queue at admission time.
    pub position: usize,
}

/// A queue of actions waiting for the next tick boundary.
///
/// Supports optional history tracking for debugging.
#[derive(Debug, Default)]
pub struct ActionQueue {
    /// Admitted actions in submission order.
    pending: Vec<QueuedAction>,
    /// History of drained actions: (turn, action).
    history: Vec<(u64, QueuedAction)>,
    /// Maximum history entries to retain. 0 = no history.
    max_history: usize,
}

impl ActionQueue {
    /// Create a new empty queue with no history tracking.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new queue that retains up to `max_history` drained actions.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            max_history,
            ..Self::default()
        }
    }

    /// Append an action. Returns its position in the queue.
    pub fn push(&mut self, action: QueuedAction) -> usize {
        self.pending.push(action);
        self.pending.len() - 1
    }

    /// Drain all pending actions, recording them in history under `turn`.
    /// Returns the drained actions in submission order.
    pub fn drain(&mut self, turn: u64) -> Vec<QueuedAction> {
        let actions: Vec<QueuedAction> = self.pending.drain(..).collect();

        if self.max_history > 0 {
            self.history.extend(actions.iter().map(|a| (turn, a.clone())));
            let excess = self.history.len().saturating_sub(self.max_history);
            if excess > 0 {
                self.history.drain(..excess);
            }
        }

        actions
    }

    /// Pending actions in submission order.
    pub fn pending(&self) -> &[QueuedAction] {
        &self.pending
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drained (turn, action) pairs, oldest first.
    pub fn history(&self) -> &[(u64, QueuedAction)] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

// ===========================================================================
// Tests
// ===========================================================================
