// src/handle/cell.rs

//! The shared settle-once cell behind every handle kind.

use std::sync::{Arc, Condvar, Mutex};

use tracing::warn;

use crate::errors::TaskError;
use crate::types::Value;

/// A settled result: the task's value, or the error it settled with.
///
/// Errors are reference-counted because one upstream failure is observed by
/// every downstream handle that depended on it.
pub type Outcome = std::result::Result<Value, Arc<TaskError>>;

/// Completion callback. Callbacks registered before settlement run in
/// registration order on the settling thread; a callback registered after
/// settlement runs immediately on the registering thread.
pub(crate) type Callback = Box<dyn FnOnce(&Outcome) + Send>;

#[derive(Default)]
struct CellState {
    outcome: Option<Outcome>,
    callbacks: Vec<Callback>,
}

/// One-shot cell: at most one transition out of unset, append-only callback
/// list, blocking waits via a condvar.
#[derive(Default)]
pub(crate) struct SettleCell {
    state: Mutex<CellState>,
    settled: Condvar,
}

impl SettleCell {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Transition out of unset. Returns `false` (and changes nothing) if the
    /// cell was already settled; the cell keeps its first outcome.
    pub(crate) fn settle(&self, outcome: Outcome) -> bool {
        let drained = {
            let mut state = self.state.lock().unwrap();
            if state.outcome.is_some() {
                return false;
            }
            state.outcome = Some(outcome.clone());
            self.settled.notify_all();
            std::mem::take(&mut state.callbacks)
        };

        // Callbacks run outside the cell lock so they may freely inspect
        // this handle or submit further work.
        for callback in drained {
            callback(&outcome);
        }
        true
    }

    pub(crate) fn done(&self) -> bool {
        self.state.lock().unwrap().outcome.is_some()
    }

    pub(crate) fn peek(&self) -> Option<Outcome> {
        self.state.lock().unwrap().outcome.clone()
    }

    /// Block until the cell settles. Must never be called while holding the
    /// kernel lock.
    pub(crate) fn wait(&self) -> Outcome {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(outcome) = &state.outcome {
                return outcome.clone();
            }
            state = self.settled.wait(state).unwrap();
        }
    }

    /// Register a completion callback, or invoke it immediately if the cell
    /// has already settled.
    pub(crate) fn add_callback(&self, callback: Callback) {
        let outcome = {
            let mut state = self.state.lock().unwrap();
            match &state.outcome {
                Some(outcome) => outcome.clone(),
                None => {
                    state.callbacks.push(callback);
                    return;
                }
            }
        };
        callback(&outcome);
    }
}

impl std::fmt::Debug for SettleCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().unwrap();
        f.debug_struct("SettleCell")
            .field("settled", &state.outcome.is_some())
            .field("callbacks", &state.callbacks.len())
            .finish()
    }
}

/// Log helper for the double-settle branch shared by the public handles.
pub(crate) fn warn_double_settle(kind: &str) {
    warn!("{kind} handle settled more than once; keeping the first outcome");
}
