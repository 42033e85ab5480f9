// src/handle/exec.rs

//! The handle an executor returns from `submit`.
//!
//! Executors create one of these per launched task, hand it back to the
//! scheduler immediately, and settle it from their own worker context once
//! the task function has run. The scheduler's completion callback records
//! the outcome on the task record and drives the retry loop; only outcomes
//! the scheduler records as final reach the task's app handle.

use std::sync::Arc;

use crate::errors::TaskError;
use crate::handle::cell::{self, Outcome, SettleCell};
use crate::types::Value;

#[derive(Clone, Debug, Default)]
pub struct ExecHandle {
    cell: Arc<SettleCell>,
}

impl ExecHandle {
    pub fn new() -> Self {
        Self {
            cell: Arc::new(SettleCell::new()),
        }
    }

    /// Settle with the task function's value. Ignored (with a warning) if
    /// the handle is already settled.
    pub fn settle_value(&self, value: Value) -> bool {
        let fresh = self.cell.settle(Ok(value));
        if !fresh {
            cell::warn_double_settle("exec");
        }
        fresh
    }

    /// Settle with an execution failure.
    pub fn settle_error(&self, error: TaskError) -> bool {
        let fresh = self.cell.settle(Err(Arc::new(error)));
        if !fresh {
            cell::warn_double_settle("exec");
        }
        fresh
    }

    pub fn done(&self) -> bool {
        self.cell.done()
    }

    pub fn peek(&self) -> Option<Outcome> {
        self.cell.peek()
    }

    /// Block until settled.
    pub fn wait(&self) -> Outcome {
        self.cell.wait()
    }

    /// Register a completion callback; invoked immediately if already
    /// settled.
    pub fn add_done_callback<F>(&self, callback: F)
    where
        F: FnOnce(&Outcome) + Send + 'static,
    {
        self.cell.add_callback(Box::new(callback));
    }

    /// Whether two handles refer to the same underlying cell. The scheduler
    /// uses this to drop completion callbacks from superseded retry
    /// attempts.
    pub(crate) fn same(&self, other: &ExecHandle) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}
