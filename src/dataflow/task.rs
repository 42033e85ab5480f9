// src/dataflow/task.rs

//! Task records and the task status state machine.

use crate::handle::{AppHandle, DepRef, ExecHandle, Outcome};
use crate::types::{Call, ResolvedCall, TaskFn, TaskId};

/// Lifecycle state of a task.
///
/// ```text
/// Unscheduled ──submit, deps=0, ok───► Running ──exec ok──► Done
///             ──submit, deps=0, err──► DepFailed            │
///             ──submit, deps>0───────► Pending              └─exec err─► Failed
/// Pending     ──sweep, resolved, ok──► Runnable ──► Running
///             ──sweep, resolved, err─► DepFailed
/// ```
///
/// `Runnable` is momentary: a promoted task is resolved and launched inside
/// the same locked section. `Done`, `Failed`, and `DepFailed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Unscheduled,
    Pending,
    Runnable,
    Running,
    Done,
    Failed,
    DepFailed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Done | TaskStatus::Failed | TaskStatus::DepFailed
        )
    }
}

/// Everything the kernel tracks for one submission. Records live from submit
/// until kernel teardown; completed tasks stay observable.
pub struct TaskRecord {
    pub id: TaskId,
    pub func: TaskFn,
    /// The original submission, handles not yet substituted.
    pub call: Call,
    /// Handles extracted from args, kwargs, and `inputs`.
    pub depends: Vec<DepRef>,
    /// Unsettled-dependency count cached at submit time; the sweep
    /// recomputes settledness on demand.
    pub dep_count: usize,
    pub status: TaskStatus,
    /// The executor's handle for the current attempt; `None` until launch.
    pub exec_handle: Option<ExecHandle>,
    pub app_handle: AppHandle,
    /// Resolved arguments, kept after launch so a retry can re-submit them
    /// to a freshly selected executor.
    pub resolved: Option<ResolvedCall>,
    pub retries_remaining: u32,
    /// Final outcome, recorded under the kernel lock when the task reaches
    /// a terminal status. The sweep and the resolver read this, never the
    /// handle: handle settlement happens outside the lock and may lag.
    pub outcome: Option<Outcome>,
}

impl TaskRecord {
    pub fn new(
        id: TaskId,
        func: TaskFn,
        call: Call,
        depends: Vec<DepRef>,
        dep_count: usize,
        app_handle: AppHandle,
        retries_remaining: u32,
    ) -> Self {
        Self {
            id,
            func,
            call,
            depends,
            dep_count,
            status: TaskStatus::Unscheduled,
            exec_handle: None,
            app_handle,
            resolved: None,
            retries_remaining,
            outcome: None,
        }
    }
}

/// Snapshot of how many tasks sit in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub unscheduled: usize,
    pub pending: usize,
    pub runnable: usize,
    pub running: usize,
    pub done: usize,
    pub failed: usize,
    pub dep_failed: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: TaskStatus) {
        match status {
            TaskStatus::Unscheduled => self.unscheduled += 1,
            TaskStatus::Pending => self.pending += 1,
            TaskStatus::Runnable => self.runnable += 1,
            TaskStatus::Running => self.running += 1,
            TaskStatus::Done => self.done += 1,
            TaskStatus::Failed => self.failed += 1,
            TaskStatus::DepFailed => self.dep_failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.unscheduled
            + self.pending
            + self.runnable
            + self.running
            + self.done
            + self.failed
            + self.dep_failed
    }
}
