// src/handle/app.rs

//! The externally visible handle for a submitted task.
//!
//! An app handle for a pending task starts parent-less and unsettled. When
//! the task launches, the scheduler reserves the handle's next rebinding
//! while it holds the kernel lock ([`AppHandle::reserve_rebind`]) and later
//! attaches the executor-returned [`ExecHandle`] under that reservation
//! ([`AppHandle::rebind_parent`]). A retry reserves again, which atomically
//! supersedes the earlier attempt: a rebind presenting a stale reservation
//! is dropped.
//!
//! Settlement is performed by the scheduler once it has recorded the final
//! outcome: success, permanent failure after the retry loop, dependency
//! failure, or routing failure. The parent pointer is a read-only fast
//! path on top of that: a successful attempt's value shows through
//! `done()`/`peek()` as soon as the executor settles (successes are never
//! retried, so the value is final), while errors become visible only via
//! the scheduler's settlement. Once settled, every read returns the same
//! outcome.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::errors::TaskError;
use crate::handle::cell::{Outcome, SettleCell};
use crate::handle::data::DataHandle;
use crate::handle::exec::ExecHandle;
use crate::types::TaskId;

#[derive(Default)]
struct ParentSlot {
    handle: Option<ExecHandle>,
    generation: u64,
}

struct AppInner {
    tid: TaskId,
    cell: SettleCell,
    parent: Mutex<ParentSlot>,
    stdout: Option<PathBuf>,
    stderr: Option<PathBuf>,
    outputs: Mutex<Vec<DataHandle>>,
}

/// Handle to a submitted task's eventual outcome. Cheap to clone; all clones
/// observe the same cell.
#[derive(Clone)]
pub struct AppHandle {
    inner: Arc<AppInner>,
}

impl AppHandle {
    pub(crate) fn new(tid: TaskId, stdout: Option<PathBuf>, stderr: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(AppInner {
                tid,
                cell: SettleCell::new(),
                parent: Mutex::new(ParentSlot::default()),
                stdout,
                stderr,
                outputs: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Id of the task this handle tracks.
    pub fn tid(&self) -> TaskId {
        self.inner.tid
    }

    /// True once the task's outcome is visible: this handle settled, or the
    /// current attempt produced a value.
    pub fn done(&self) -> bool {
        self.peek().is_some()
    }

    /// The visible outcome, without blocking. A successful attempt shows
    /// through the current parent before the scheduler's settlement lands;
    /// errors appear only once the scheduler has recorded them as final.
    pub fn peek(&self) -> Option<Outcome> {
        if let Some(outcome) = self.inner.cell.peek() {
            return Some(outcome);
        }
        let parent = self.inner.parent.lock().unwrap().handle.clone();
        match parent.and_then(|p| p.peek()) {
            Some(Ok(value)) => Some(Ok(value)),
            // A failed attempt may still be retried.
            _ => None,
        }
    }

    /// Block until the task settles; returns its value or re-raises its
    /// error. Never called with the kernel lock held.
    pub fn result(&self) -> Outcome {
        self.inner.cell.wait()
    }

    /// The task's error if it settled with one, `None` otherwise.
    pub fn exception(&self) -> Option<Arc<TaskError>> {
        match self.peek() {
            Some(Err(error)) => Some(error),
            _ => None,
        }
    }

    /// Register a completion callback; fires exactly once, in registration
    /// order, at settlement (or immediately if already settled).
    pub fn add_done_callback<F>(&self, callback: F)
    where
        F: FnOnce(&Outcome) + Send + 'static,
    {
        self.inner.cell.add_callback(Box::new(callback));
    }

    /// Data handles minted for this task's declared outputs.
    pub fn outputs(&self) -> Vec<DataHandle> {
        self.inner.outputs.lock().unwrap().clone()
    }

    /// Captured stdout path, if the submission declared one.
    pub fn stdout(&self) -> Option<&Path> {
        self.inner.stdout.as_deref()
    }

    /// Captured stderr path, if the submission declared one.
    pub fn stderr(&self) -> Option<&Path> {
        self.inner.stderr.as_deref()
    }

    pub(crate) fn set_outputs(&self, outputs: Vec<DataHandle>) {
        *self.inner.outputs.lock().unwrap() = outputs;
    }

    /// Reserve the handle's next rebinding. Called with the kernel lock
    /// held, in the same critical section that launches the attempt, so the
    /// reservation is atomic with the scheduler's launch/retry decision.
    /// Detaches any previous parent; the returned token must be presented
    /// by the matching [`rebind_parent`](Self::rebind_parent).
    pub(crate) fn reserve_rebind(&self) -> u64 {
        let mut slot = self.inner.parent.lock().unwrap();
        slot.generation += 1;
        slot.handle = None;
        slot.generation
    }

    /// Attach the launched attempt's exec handle under a reservation taken
    /// by [`reserve_rebind`](Self::reserve_rebind). Runs outside the kernel
    /// lock; if a retry has reserved again in the meantime, the stale
    /// rebind is dropped.
    pub(crate) fn rebind_parent(&self, parent: &ExecHandle, generation: u64) {
        let mut slot = self.inner.parent.lock().unwrap();
        if slot.generation != generation {
            debug!(
                task = self.inner.tid,
                generation, "rebind superseded by a newer attempt"
            );
            return;
        }
        slot.handle = Some(parent.clone());
        debug!(task = self.inner.tid, generation, "app handle parent rebound");
    }

    /// Settle with the outcome the scheduler recorded as final. First
    /// outcome wins; the cell ignores anything later.
    pub(crate) fn settle_outcome(&self, outcome: Outcome) {
        self.inner.cell.settle(outcome);
    }
}

impl std::fmt::Debug for AppHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppHandle")
            .field("tid", &self.inner.tid)
            .field("done", &self.done())
            .finish()
    }
}
