//! Executor doubles for kernel tests.
//!
//! - [`FakeExecutor`] runs each task function synchronously inside `submit`
//!   and records every submission, so zero-dependency tasks complete before
//!   `submit` returns and launch counts can be asserted exactly.
//! - [`ManualExecutor`] parks submissions until the test drives them,
//!   letting tests observe pending/running states in between.
//! - [`FlakyExecutor`] fails its first N submissions with an execution
//!   error, for exercising the retry loop.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::anyhow;
use dagflow::{ExecHandle, ExecutionProvider, Executor, ResolvedCall, TaskError, TaskFn};

/// Provider double: a fixed list of resource names plus bookkeeping of
/// scale-in requests.
#[derive(Default)]
pub struct FakeProvider {
    resources: Vec<String>,
}

impl FakeProvider {
    pub fn new(resources: Vec<String>) -> Self {
        Self { resources }
    }
}

impl ExecutionProvider for FakeProvider {
    fn resources(&self) -> Vec<String> {
        self.resources.clone()
    }
}

/// Synchronous in-process executor that records its submissions.
pub struct FakeExecutor {
    calls: Mutex<Vec<ResolvedCall>>,
    submit_count: AtomicUsize,
    scale_in_calls: Mutex<Vec<usize>>,
    shutdown_count: AtomicUsize,
    scaling: bool,
    provider: Option<FakeProvider>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            submit_count: AtomicUsize::new(0),
            scale_in_calls: Mutex::new(Vec::new()),
            shutdown_count: AtomicUsize::new(0),
            scaling: false,
            provider: None,
        }
    }

    /// A scaling-enabled variant whose provider reports the given resources.
    pub fn scaling(resources: Vec<String>) -> Self {
        Self {
            scaling: true,
            provider: Some(FakeProvider::new(resources)),
            ..Self::new()
        }
    }

    /// Every resolved call submitted so far.
    pub fn calls(&self) -> Vec<ResolvedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn submit_count(&self) -> usize {
        self.submit_count.load(Ordering::SeqCst)
    }

    pub fn scale_in_calls(&self) -> Vec<usize> {
        self.scale_in_calls.lock().unwrap().clone()
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdown_count.load(Ordering::SeqCst)
    }
}

impl Default for FakeExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for FakeExecutor {
    fn submit(&self, func: TaskFn, call: ResolvedCall) -> ExecHandle {
        self.submit_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(call.clone());

        let handle = ExecHandle::new();
        match func(call) {
            Ok(value) => handle.settle_value(value),
            Err(error) => handle.settle_error(TaskError::Execution { source: error }),
        };
        handle
    }

    fn scaling_enabled(&self) -> bool {
        self.scaling
    }

    fn execution_provider(&self) -> Option<&dyn ExecutionProvider> {
        self.provider.as_ref().map(|p| p as &dyn ExecutionProvider)
    }

    fn scale_in(&self, n: usize) {
        self.scale_in_calls.lock().unwrap().push(n);
    }

    fn shutdown(&self) {
        self.shutdown_count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Executor that parks submissions until the test completes them.
#[derive(Default)]
pub struct ManualExecutor {
    queue: Mutex<VecDeque<(TaskFn, ResolvedCall, ExecHandle)>>,
}

impl ManualExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submissions waiting to be driven.
    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    /// Run the oldest parked submission to completion. Returns `false` if
    /// nothing was parked.
    pub fn run_next(&self) -> bool {
        let Some((func, call, handle)) = self.queue.lock().unwrap().pop_front() else {
            return false;
        };
        match func(call) {
            Ok(value) => handle.settle_value(value),
            Err(error) => handle.settle_error(TaskError::Execution { source: error }),
        };
        true
    }

    /// Fail the oldest parked submission without running its function.
    pub fn fail_next(&self, message: &str) -> bool {
        let Some((_func, _call, handle)) = self.queue.lock().unwrap().pop_front() else {
            return false;
        };
        handle.settle_error(TaskError::execution(anyhow!("{message}")));
        true
    }

    /// Drive everything to completion, including submissions that completing
    /// tasks cause to be launched.
    pub fn run_all(&self) {
        while self.run_next() {}
    }
}

impl Executor for ManualExecutor {
    fn submit(&self, func: TaskFn, call: ResolvedCall) -> ExecHandle {
        let handle = ExecHandle::new();
        self.queue
            .lock()
            .unwrap()
            .push_back((func, call, handle.clone()));
        handle
    }

    fn shutdown(&self) {}
}

/// Synchronous executor that fails its first `fail_first` submissions.
pub struct FlakyExecutor {
    fail_first: usize,
    submit_count: AtomicUsize,
}

impl FlakyExecutor {
    pub fn new(fail_first: usize) -> Self {
        Self {
            fail_first,
            submit_count: AtomicUsize::new(0),
        }
    }

    pub fn submit_count(&self) -> usize {
        self.submit_count.load(Ordering::SeqCst)
    }
}

impl Executor for FlakyExecutor {
    fn submit(&self, func: TaskFn, call: ResolvedCall) -> ExecHandle {
        let attempt = self.submit_count.fetch_add(1, Ordering::SeqCst);

        let handle = ExecHandle::new();
        if attempt < self.fail_first {
            handle.settle_error(TaskError::execution(anyhow!(
                "injected failure on attempt {attempt}"
            )));
            return handle;
        }

        match func(call) {
            Ok(value) => handle.settle_value(value),
            Err(error) => handle.settle_error(TaskError::Execution { source: error }),
        };
        handle
    }

    fn shutdown(&self) {}
}
