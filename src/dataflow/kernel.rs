// src/dataflow/kernel.rs

//! The dataflow kernel: submit, launch, completion sweep, retries, cleanup.
//!
//! One kernel-wide mutex guards the mutable scheduler state (task table,
//! task-id counter, dependency graph). Everything that reads or mutates task
//! records runs under it; everything that can call back into user code
//! (handle settlement, parent rebinding, executor completion callbacks) runs
//! strictly outside it. Locked sections therefore *collect* post actions and
//! apply them after release, which also makes synchronously completing
//! executors (the in-process kind used in tests) safe against re-entry.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, error, info, warn};

use crate::config::{model::ConfigFile, validate::validate_config};
use crate::dataflow::analyzer::count_all_deps;
use crate::dataflow::graph::TaskGraph;
use crate::dataflow::registry::ExecutorRegistry;
use crate::dataflow::resolver::sanitize_and_wrap;
use crate::dataflow::task::{StatusCounts, TaskRecord, TaskStatus};
use crate::errors::{KernelError, Result, TaskError};
use crate::exec::{factory::executors_from_config, Executor};
use crate::handle::{AppHandle, DepRef, ExecHandle, Outcome};
use crate::rundir::make_rundir;
use crate::types::{Call, ResolvedCall, TaskFn, TaskId};
use crate::usage::UsageTracker;

const DEFAULT_FAIL_RETRIES: u32 = 2;
const DEFAULT_RUNDIR_BASE: &str = "runinfo";

#[derive(Default)]
struct KernelState {
    task_count: u64,
    tasks: HashMap<TaskId, TaskRecord>,
    graph: TaskGraph,
}

impl KernelState {
    fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for record in self.tasks.values() {
            counts.record(record.status);
        }
        counts
    }

    /// Final outcome of a dependency, as the scheduler sees it: the
    /// lock-protected record outcome for tasks in this kernel's table, the
    /// handle's own view for anything else. `None` while unresolved.
    fn dep_outcome(&self, dep: &DepRef) -> Option<Outcome> {
        let outcome = match self.tasks.get(&dep.tid()) {
            Some(record) => record.outcome.clone(),
            None => dep.peek(),
        }?;
        Some(dep.adapt_outcome(outcome))
    }
}

/// Work that a locked section has decided on but that must run outside the
/// kernel lock, because it reaches user code.
enum Post {
    /// Register the kernel's completion callback on a freshly launched exec
    /// handle, then rebind the task's app handle to it under the
    /// reservation taken at launch.
    Wire {
        tid: TaskId,
        app: AppHandle,
        exec: ExecHandle,
        generation: u64,
    },
    /// Settle an app handle with the outcome the scheduler recorded as
    /// final.
    Settle { app: AppHandle, outcome: Outcome },
    /// Surface a failure in the completion path (lazy-fail disabled).
    FailFast(Arc<TaskError>),
}

/// What `on_complete` decided to do after updating the completing task's
/// record, executed once the record borrow has ended.
enum Followup {
    Sweep,
    Retry(ResolvedCall),
}

struct KernelInner {
    registry: ExecutorRegistry,
    lazy_fail: bool,
    fail_retries: u32,
    rundir: PathBuf,
    /// True when the kernel constructed its executors from config and so
    /// owns their lifecycle.
    managed: bool,
    usage: UsageTracker,
    state: Mutex<KernelState>,
    cleaned: AtomicBool,
}

/// The dependency-aware scheduling kernel. Cheap to clone; all clones share
/// one scheduler.
#[derive(Clone)]
pub struct DataFlowKernel {
    inner: Arc<KernelInner>,
}

/// Builder for [`DataFlowKernel`]. Provide either a config (the kernel then
/// constructs and manages its executors) or a pre-built executor map (the
/// kernel leaves their lifecycle to the caller). Explicit builder options
/// always override what the config says.
#[derive(Default)]
pub struct DataFlowKernelBuilder {
    config: Option<ConfigFile>,
    executors: Option<BTreeMap<String, Arc<dyn Executor>>>,
    lazy_fail: Option<bool>,
    fail_retries: Option<u32>,
    rundir: Option<PathBuf>,
    manage_executors: Option<bool>,
}

impl DataFlowKernelBuilder {
    pub fn config(mut self, config: ConfigFile) -> Self {
        self.config = Some(config);
        self
    }

    pub fn executors(mut self, executors: BTreeMap<String, Arc<dyn Executor>>) -> Self {
        self.executors = Some(executors);
        self
    }

    /// Single-executor convenience for the common local setup.
    pub fn executor(mut self, site: impl Into<String>, executor: Arc<dyn Executor>) -> Self {
        self.executors
            .get_or_insert_with(BTreeMap::new)
            .insert(site.into(), executor);
        self
    }

    pub fn lazy_fail(mut self, lazy_fail: bool) -> Self {
        self.lazy_fail = Some(lazy_fail);
        self
    }

    pub fn fail_retries(mut self, fail_retries: u32) -> Self {
        self.fail_retries = Some(fail_retries);
        self
    }

    pub fn rundir(mut self, base: impl Into<PathBuf>) -> Self {
        self.rundir = Some(base.into());
        self
    }

    /// Whether the kernel owns executor lifecycle (scale-in and shutdown at
    /// cleanup). Defaults to true for config-built executors and false for a
    /// pre-built map; set this to have the kernel adopt a pre-built map.
    pub fn manage_executors(mut self, manage: bool) -> Self {
        self.manage_executors = Some(manage);
        self
    }

    pub fn build(self) -> Result<DataFlowKernel> {
        let manage_override = self.manage_executors;
        let (executors, managed, lazy_fail, fail_retries, rundir_base) =
            match (self.config, self.executors) {
                (Some(config), None) => {
                    validate_config(&config)?;
                    let executors = executors_from_config(&config)?;
                    let lazy_fail = self.lazy_fail.unwrap_or(config.globals.lazy_fail);
                    let fail_retries = self.fail_retries.unwrap_or(config.globals.fail_retries);
                    let base = self
                        .rundir
                        .or(config.globals.rundir)
                        .unwrap_or_else(|| PathBuf::from(DEFAULT_RUNDIR_BASE));
                    (executors, true, lazy_fail, fail_retries, base)
                }
                (None, Some(executors)) => {
                    if executors.is_empty() {
                        return Err(KernelError::Config(
                            "executor map must not be empty".to_string(),
                        ));
                    }
                    let base = self
                        .rundir
                        .unwrap_or_else(|| PathBuf::from(DEFAULT_RUNDIR_BASE));
                    (
                        executors,
                        false,
                        self.lazy_fail.unwrap_or(true),
                        self.fail_retries.unwrap_or(DEFAULT_FAIL_RETRIES),
                        base,
                    )
                }
                (Some(_), Some(_)) => {
                    return Err(KernelError::Config(
                        "provide either a config or a pre-built executor map, not both"
                            .to_string(),
                    ));
                }
                (None, None) => {
                    return Err(KernelError::Config(
                        "either a config or a pre-built executor map is required".to_string(),
                    ));
                }
            };

        let managed = manage_override.unwrap_or(managed);
        let rundir = make_rundir(&rundir_base)?;
        let usage = UsageTracker::new(&rundir);

        let registry = ExecutorRegistry::from_map(executors);
        info!(
            rundir = %rundir.display(),
            lazy_fail,
            fail_retries,
            managed,
            sites = ?registry.sites().collect::<Vec<_>>(),
            "dataflow kernel started"
        );

        Ok(DataFlowKernel {
            inner: Arc::new(KernelInner {
                registry,
                lazy_fail,
                fail_retries,
                rundir,
                managed,
                usage,
                state: Mutex::new(KernelState::default()),
                cleaned: AtomicBool::new(false),
            }),
        })
    }
}

impl DataFlowKernel {
    pub fn builder() -> DataFlowKernelBuilder {
        DataFlowKernelBuilder::default()
    }

    /// Add a task to the dataflow system.
    ///
    /// If every dependency is already settled, the task is resolved and
    /// launched (or marked dependency-failed) before this returns; otherwise
    /// it parks as pending and the completion sweep will promote it. The
    /// returned handle settles with the task's eventual outcome either way.
    pub fn submit(&self, func: TaskFn, call: Call) -> AppHandle {
        let mut post = Vec::new();

        let app_handle = {
            let mut state = self.inner.state.lock().unwrap();
            let task_id = state.task_count;
            state.task_count += 1;

            let (dep_count, depends) = count_all_deps(task_id, &call);
            let app_handle = AppHandle::new(task_id, call.stdout.clone(), call.stderr.clone());

            state.graph.add_task(task_id);
            for dep in &depends {
                state.graph.add_dependency(dep.tid(), task_id);
            }

            // Readiness comes from the lock-protected task table, matching
            // what the completion sweep will later check.
            let ready = depends
                .iter()
                .all(|dep| state.dep_outcome(dep).is_some());

            let record = TaskRecord::new(
                task_id,
                func,
                call,
                depends,
                dep_count,
                app_handle.clone(),
                self.inner.fail_retries,
            );
            if state.tasks.insert(task_id, record).is_some() {
                // Unreachable with a monotonic counter; fail loudly if the
                // table is ever corrupted.
                panic!("{}", KernelError::DuplicateTask(task_id));
            }
            debug!(task = task_id, dep_count, "task submitted");

            if ready {
                self.promote_locked(&mut state, task_id, &mut post);
            } else if let Some(record) = state.tasks.get_mut(&task_id) {
                record.status = TaskStatus::Pending;
                debug!(task = task_id, "task pending on unresolved dependencies");
            }

            app_handle
        };

        self.run_post_actions(post);
        app_handle
    }

    /// Completion callback installed on every launched attempt's exec
    /// handle. Marks the completing task, drives the retry loop, and sweeps
    /// for newly eligible dependents.
    fn on_complete(&self, task_id: TaskId, exec: &ExecHandle, outcome: &Outcome) {
        let mut post = Vec::new();

        {
            let mut state = self.inner.state.lock().unwrap();
            let mut fail_fast = None;

            let followup = {
                let Some(record) = state.tasks.get_mut(&task_id) else {
                    warn!(task = task_id, "completion for unknown task; ignoring");
                    return;
                };
                if record.status.is_terminal() {
                    debug!(task = task_id, "completion for terminal task; ignoring");
                    return;
                }
                if !record
                    .exec_handle
                    .as_ref()
                    .is_some_and(|current| current.same(exec))
                {
                    debug!(task = task_id, "completion from superseded attempt; ignoring");
                    return;
                }

                // Records the outcome and queues the handle settlement in
                // one place, so the sweep (which reads record outcomes
                // under this lock) and users (who read handles) agree.
                let finish = |record: &mut TaskRecord,
                              status: TaskStatus,
                              final_outcome: Outcome,
                              post: &mut Vec<Post>| {
                    record.status = status;
                    record.outcome = Some(final_outcome.clone());
                    post.push(Post::Settle {
                        app: record.app_handle.clone(),
                        outcome: final_outcome,
                    });
                };

                match outcome {
                    Ok(_) => {
                        debug!(task = task_id, "task completed");
                        finish(record, TaskStatus::Done, outcome.clone(), &mut post);
                        Followup::Sweep
                    }
                    Err(task_error) => {
                        if !self.inner.lazy_fail {
                            error!(
                                task = task_id,
                                error = %task_error,
                                "task failed with lazy-fail disabled"
                            );
                            finish(
                                record,
                                TaskStatus::Failed,
                                Err(task_error.clone()),
                                &mut post,
                            );
                            // Dependents still settle as dependency-failed;
                            // the re-raise happens after the sweep's
                            // settlements.
                            fail_fast = Some(task_error.clone());
                            Followup::Sweep
                        } else if record.retries_remaining > 0 {
                            record.retries_remaining -= 1;
                            warn!(
                                task = task_id,
                                remaining = record.retries_remaining,
                                error = %task_error,
                                "task failed; retrying on a freshly selected executor"
                            );
                            match record.resolved.clone() {
                                Some(resolved) => Followup::Retry(resolved),
                                None => {
                                    // Launched tasks always carry their
                                    // resolved arguments.
                                    warn!(task = task_id, "no resolved arguments for retry");
                                    finish(
                                        record,
                                        TaskStatus::Failed,
                                        Err(task_error.clone()),
                                        &mut post,
                                    );
                                    Followup::Sweep
                                }
                            }
                        } else {
                            warn!(task = task_id, error = %task_error, "task failed permanently");
                            finish(
                                record,
                                TaskStatus::Failed,
                                Err(task_error.clone()),
                                &mut post,
                            );
                            Followup::Sweep
                        }
                    }
                }
            };

            match followup {
                Followup::Sweep => self.sweep_locked(&mut state, task_id, &mut post),
                Followup::Retry(resolved) => {
                    self.launch_locked(&mut state, task_id, resolved, &mut post)
                }
            }

            if let Some(task_error) = fail_fast {
                post.push(Post::FailFast(task_error));
            }
        }

        self.run_post_actions(post);
    }

    /// Promote a task whose dependencies have all settled: resolve its
    /// arguments, then launch it or mark it dependency-failed.
    fn promote_locked(&self, state: &mut KernelState, task_id: TaskId, post: &mut Vec<Post>) {
        let (resolved, failures) = match state.tasks.get(&task_id) {
            Some(record) => {
                sanitize_and_wrap(task_id, &record.call, |dep| state.dep_outcome(dep))
            }
            None => return,
        };

        if failures.is_empty() {
            if let Some(record) = state.tasks.get_mut(&task_id) {
                record.status = TaskStatus::Runnable;
                debug!(task = task_id, "dependencies resolved; task runnable");
            }
            self.launch_locked(state, task_id, resolved, post);
        } else if let Some(record) = state.tasks.get_mut(&task_id) {
            record.status = TaskStatus::DepFailed;
            warn!(
                task = task_id,
                upstream = failures.len(),
                "dependency failure; task will not launch"
            );
            let dep_error = Arc::new(TaskError::Dependency {
                tid: task_id,
                errors: failures,
            });
            record.outcome = Some(Err(dep_error.clone()));
            post.push(Post::Settle {
                app: record.app_handle.clone(),
                outcome: Err(dep_error),
            });
        }
    }

    /// Select an executor and hand the task over. On a routing failure the
    /// task fails permanently without ever reaching an executor.
    fn launch_locked(
        &self,
        state: &mut KernelState,
        task_id: TaskId,
        resolved: ResolvedCall,
        post: &mut Vec<Post>,
    ) {
        let Some(record) = state.tasks.get_mut(&task_id) else {
            return;
        };

        match self.inner.registry.select(task_id, &record.call.sites) {
            Ok((site, executor)) => {
                let exec_handle = executor.submit(record.func.clone(), resolved.clone());
                record.resolved = Some(resolved);
                record.exec_handle = Some(exec_handle.clone());
                record.status = TaskStatus::Running;
                // Reserving here, still under the kernel lock, makes the
                // rebind reservation atomic with the launch/retry decision:
                // a retry's fresh reservation supersedes this attempt before
                // any of its callbacks can touch the handle.
                let generation = record.app_handle.reserve_rebind();
                debug!(task = task_id, site = %site, generation, "task launched");
                post.push(Post::Wire {
                    tid: task_id,
                    app: record.app_handle.clone(),
                    exec: exec_handle,
                    generation,
                });
            }
            Err(routing) => {
                record.status = TaskStatus::Failed;
                let routing = Arc::new(routing);
                record.outcome = Some(Err(routing.clone()));
                post.push(Post::Settle {
                    app: record.app_handle.clone(),
                    outcome: Err(routing),
                });
            }
        }
    }

    /// Promote every pending dependent of a completing task whose
    /// dependencies have now all resolved. The dependency graph serves as
    /// the reverse index, so the sweep is bounded by the completing task's
    /// dependents rather than the whole table. A promotion that itself ends
    /// terminal (dependency or routing failure) settles that task without a
    /// completion event, so its own dependents join the same sweep.
    fn sweep_locked(&self, state: &mut KernelState, completed: TaskId, post: &mut Vec<Post>) {
        let mut initial = state.graph.dependents_of(completed);
        initial.sort_unstable();
        let mut queue: VecDeque<TaskId> = initial.into();
        let mut visited: HashSet<TaskId> = HashSet::new();

        while let Some(task_id) = queue.pop_front() {
            if !visited.insert(task_id) {
                continue;
            }

            let eligible = state.tasks.get(&task_id).is_some_and(|record| {
                record.status == TaskStatus::Pending
                    && record
                        .depends
                        .iter()
                        .all(|dep| state.dep_outcome(dep).is_some())
            });
            if !eligible {
                continue;
            }

            self.promote_locked(state, task_id, post);

            let terminal = state
                .tasks
                .get(&task_id)
                .is_some_and(|record| record.status.is_terminal());
            if terminal {
                let mut next = state.graph.dependents_of(task_id);
                next.sort_unstable();
                queue.extend(next);
            }
        }
    }

    fn run_post_actions(&self, post: Vec<Post>) {
        for action in post {
            match action {
                Post::Wire {
                    tid,
                    app,
                    exec,
                    generation,
                } => {
                    // Completion callback first, rebinding second: the
                    // kernel must observe an outcome (and get its chance to
                    // retry) before the attempt becomes visible through the
                    // handle. The rebind presents the reservation taken at
                    // launch; if a retry has reserved again since, it is
                    // dropped.
                    let kernel = self.clone();
                    let callback_exec = exec.clone();
                    exec.add_done_callback(move |outcome| {
                        kernel.on_complete(tid, &callback_exec, outcome)
                    });
                    app.rebind_parent(&exec, generation);
                }
                Post::Settle { app, outcome } => app.settle_outcome(outcome),
                Post::FailFast(task_error) => {
                    panic!("task failure with lazy-fail disabled: {task_error}");
                }
            }
        }
    }

    /// Status of a task, if it exists.
    pub fn task_status(&self, task_id: TaskId) -> Option<TaskStatus> {
        let state = self.inner.state.lock().unwrap();
        state.tasks.get(&task_id).map(|record| record.status)
    }

    /// Number of tasks submitted so far.
    pub fn task_count(&self) -> u64 {
        self.inner.state.lock().unwrap().task_count
    }

    /// Snapshot of how many tasks sit in each status.
    pub fn status_counts(&self) -> StatusCounts {
        self.inner.state.lock().unwrap().counts()
    }

    /// Log the pending/running/done breakdown at debug level.
    pub fn log_status(&self) {
        let counts = self.status_counts();
        debug!(
            pending = counts.pending,
            running = counts.running,
            done = counts.done,
            failed = counts.failed,
            dep_failed = counts.dep_failed,
            "task status"
        );
    }

    /// Ids of the tasks whose handles the given task consumes.
    pub fn dependencies_of(&self, task_id: TaskId) -> Vec<TaskId> {
        self.inner.state.lock().unwrap().graph.dependencies_of(task_id)
    }

    /// Ids of the tasks consuming the given task's handle.
    pub fn dependents_of(&self, task_id: TaskId) -> Vec<TaskId> {
        self.inner.state.lock().unwrap().graph.dependents_of(task_id)
    }

    /// This kernel session's run directory.
    pub fn rundir(&self) -> &Path {
        &self.inner.rundir
    }

    /// Tear the kernel down: send the final usage event, then (for
    /// kernel-managed executors only) scale in every scaling-enabled
    /// executor by its provider's resource count and shut all of them down.
    /// Idempotent; also runs on drop of the last kernel clone.
    pub fn cleanup(&self) {
        self.inner.cleanup_inner();
    }
}

impl KernelInner {
    fn cleanup_inner(&self) {
        if self.cleaned.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("kernel cleanup initiated");

        let counts = self.state.lock().unwrap().counts();
        self.usage.send_final(&counts);

        if !self.managed {
            debug!("executors are externally managed; leaving them to the caller");
            return;
        }

        for (site, executor) in self.registry.iter() {
            if executor.scaling_enabled() {
                let resources = executor
                    .execution_provider()
                    .map(|provider| provider.resources().len())
                    .unwrap_or(0);
                info!(site, resources, "scaling in executor");
                executor.scale_in(resources);
            }
            executor.shutdown();
        }

        debug!("kernel cleanup complete");
    }
}

impl Drop for KernelInner {
    fn drop(&mut self) {
        self.cleanup_inner();
    }
}

impl std::fmt::Debug for DataFlowKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataFlowKernel")
            .field("rundir", &self.inner.rundir)
            .field("lazy_fail", &self.inner.lazy_fail)
            .field("fail_retries", &self.inner.fail_retries)
            .field("managed", &self.inner.managed)
            .field("tasks", &self.task_count())
            .finish()
    }
}
