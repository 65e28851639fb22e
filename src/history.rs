//! Undo/redo history for reversible edits.
//!
//! Every mutation is an [`Action`] that knows how to apply and reverse itself
//! against some external state `S`. The log is linear: executing a new action
//! after one or more undos discards everything ahead of the cursor.
//!
//! Actions must not mutate the history from inside `execute`/`undo`/`redo`.
//! The log takes `&mut self` for every mutation, so the borrow checker rejects
//! the obvious forms of that.

use std::collections::VecDeque;
use std::rc::Rc;

use serde::Serialize;

use crate::constants::DEFAULT_MAX_HISTORY_SIZE;
use crate::error::{ActionError, HandlerFault};

// ============================================================================
// Actions
// ============================================================================

/// A reversible mutation of `S`.
pub trait Action<S> {
    /// Value handed back to the caller of [`HistoryLog::execute`].
    type Output;

    /// Human-readable label, e.g. for an "Undo ..." menu entry.
    fn name(&self) -> String;

    /// Perform the mutation. On error the state must be left unchanged.
    fn execute(&mut self, state: &mut S) -> Result<Self::Output, ActionError>;

    /// Reverse the most recent `execute` or `redo`.
    fn undo(&mut self, state: &mut S);

    /// Re-apply after an undo. Defaults to running `execute` again.
    fn redo(&mut self, state: &mut S) -> Result<(), ActionError> {
        self.execute(state).map(drop)
    }
}

/// Object-safe view of an action once it has been recorded.
trait Recorded<S> {
    fn label(&self) -> String;
    fn revert(&mut self, state: &mut S);
    fn reapply(&mut self, state: &mut S) -> Result<(), ActionError>;
}

impl<S, A: Action<S>> Recorded<S> for A {
    fn label(&self) -> String {
        <A as Action<S>>::name(self)
    }

    fn revert(&mut self, state: &mut S) {
        <A as Action<S>>::undo(self, state);
    }

    fn reapply(&mut self, state: &mut S) -> Result<(), ActionError> {
        <A as Action<S>>::redo(self, state)
    }
}

// ============================================================================
// History Log
// ============================================================================

/// Configuration for the history log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Maximum number of actions to keep
    pub max_size: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_HISTORY_SIZE,
        }
    }
}

/// Snapshot of the log's position, published after every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryInfo {
    /// Whether `undo` would do something
    pub can_undo: bool,
    /// Whether `redo` would do something
    pub can_redo: bool,
    /// Number of recorded actions
    pub history_size: usize,
    /// Index of the last applied action, -1 when none is applied
    pub current_index: isize,
}

/// Callback notified after each history mutation.
pub type HistoryListener = Rc<dyn Fn(&HistoryInfo) -> Result<(), HandlerFault>>;

/// Linear, branch-clearing undo/redo journal.
///
/// The first `applied` entries have been executed; the rest form the redo
/// branch.
pub struct HistoryLog<S> {
    /// Recorded actions, oldest first
    history: VecDeque<Box<dyn Recorded<S>>>,
    /// Number of entries currently applied (cursor + 1)
    applied: usize,
    /// Configuration
    config: HistoryConfig,
    /// Post-mutation subscribers
    listeners: Vec<HistoryListener>,
}

impl<S> Default for HistoryLog<S> {
    fn default() -> Self {
        Self::with_config(HistoryConfig::default())
    }
}

impl<S> HistoryLog<S> {
    /// Create an empty log with the default size cap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom configuration
    pub fn with_config(config: HistoryConfig) -> Self {
        Self {
            history: VecDeque::new(),
            applied: 0,
            config,
            listeners: Vec::new(),
        }
    }

    /// Current configuration.
    pub fn config(&self) -> HistoryConfig {
        self.config
    }

    /// Execute an action and record it.
    ///
    /// Drops the redo branch, then the oldest entry if the cap is exceeded.
    /// A failing action is not recorded and listeners are not notified.
    pub fn execute<A>(&mut self, mut action: A, state: &mut S) -> Result<A::Output, ActionError>
    where
        A: Action<S> + 'static,
    {
        let output = match action.execute(state) {
            Ok(output) => output,
            Err(e) => {
                log::warn!("History: '{}' failed: {}", action.name(), e);
                return Err(e);
            }
        };

        let discarded = self.history.len() - self.applied;
        self.history.truncate(self.applied);
        if discarded > 0 {
            log::debug!("History: discarded {} redo entries", discarded);
        }

        log::debug!("📝 History: executed '{}'", action.name());
        self.history.push_back(Box::new(action));
        self.applied += 1;

        while self.history.len() > self.config.max_size {
            if let Some(dropped) = self.history.pop_front() {
                log::debug!("History: dropped oldest '{}'", dropped.label());
            }
            self.applied = self.applied.saturating_sub(1);
        }

        self.notify();
        Ok(output)
    }

    /// Reverse the action at the cursor. Returns false if there is nothing
    /// to undo.
    pub fn undo(&mut self, state: &mut S) -> bool {
        if !self.can_undo() {
            return false;
        }
        let index = self.applied - 1;
        let action = &mut self.history[index];
        action.revert(state);
        log::debug!("⏪ History: undid '{}'", action.label());
        self.applied = index;
        self.notify();
        true
    }

    /// Re-apply the action after the cursor. Returns false if there is
    /// nothing to redo or the action could not be re-applied; in the latter
    /// case the cursor does not move.
    pub fn redo(&mut self, state: &mut S) -> bool {
        if !self.can_redo() {
            return false;
        }
        let action = &mut self.history[self.applied];
        if let Err(e) = action.reapply(state) {
            log::warn!("History: redo of '{}' failed: {}", action.label(), e);
            return false;
        }
        log::debug!("⏩ History: redid '{}'", action.label());
        self.applied += 1;
        self.notify();
        true
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.applied < self.history.len()
    }

    /// Label of the action `undo` would reverse.
    pub fn undo_name(&self) -> Option<String> {
        self.applied
            .checked_sub(1)
            .and_then(|i| self.history.get(i))
            .map(|a| a.label())
    }

    /// Label of the action `redo` would re-apply.
    pub fn redo_name(&self) -> Option<String> {
        self.history.get(self.applied).map(|a| a.label())
    }

    /// Number of recorded actions.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Check if nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Drop all history and notify listeners.
    pub fn clear(&mut self) {
        self.history.clear();
        self.applied = 0;
        log::debug!("🗑️ History cleared");
        self.notify();
    }

    /// Snapshot of the current position.
    pub fn get_info(&self) -> HistoryInfo {
        HistoryInfo {
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            history_size: self.history.len(),
            current_index: self.applied as isize - 1,
        }
    }

    /// Subscribe to post-mutation notifications.
    pub fn add_listener<F>(&mut self, listener: F) -> HistoryListener
    where
        F: Fn(&HistoryInfo) -> Result<(), HandlerFault> + 'static,
    {
        let listener: HistoryListener = Rc::new(listener);
        self.listeners.push(Rc::clone(&listener));
        listener
    }

    /// Unsubscribe a listener returned by [`add_listener`](Self::add_listener).
    pub fn remove_listener(&mut self, listener: &HistoryListener) {
        if let Some(index) = self.listeners.iter().position(|l| Rc::ptr_eq(l, listener)) {
            self.listeners.remove(index);
        }
    }

    fn notify(&self) {
        let info = self.get_info();
        for listener in &self.listeners {
            if let Err(fault) = listener(&info) {
                log::error!("History: error in listener: {}", fault);
            }
        }
    }
}
