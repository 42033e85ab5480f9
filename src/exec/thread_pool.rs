// src/exec/thread_pool.rs

//! Local thread-pool executor on a dedicated tokio runtime.
//!
//! Task functions are ordinary blocking closures, so each submission runs
//! under `spawn_blocking`. The advisory walltime from the submission is
//! honored here with `tokio::time::timeout`; the kernel itself never
//! enforces deadlines.

use std::sync::Mutex;

use anyhow::anyhow;
use tokio::runtime;
use tracing::{debug, info, warn};

use crate::errors::TaskError;
use crate::exec::backend::Executor;
use crate::handle::ExecHandle;
use crate::types::{ResolvedCall, TaskFn};

pub struct ThreadPoolExecutor {
    site: String,
    /// Taken at shutdown; `None` afterwards.
    runtime: Mutex<Option<runtime::Runtime>>,
}

impl ThreadPoolExecutor {
    /// Build a pool with the given number of worker threads.
    pub fn new(site: impl Into<String>, max_workers: usize) -> crate::errors::Result<Self> {
        let site = site.into();
        let runtime = runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(max_workers.max(1))
            .thread_name(format!("dagflow-{site}"))
            .enable_time()
            .build()
            .map_err(crate::errors::KernelError::Io)?;

        info!(site = %site, max_workers, "thread-pool executor started");
        Ok(Self {
            site,
            runtime: Mutex::new(Some(runtime)),
        })
    }

    pub fn site(&self) -> &str {
        &self.site
    }
}

impl Executor for ThreadPoolExecutor {
    fn submit(&self, func: TaskFn, call: ResolvedCall) -> ExecHandle {
        let handle = ExecHandle::new();

        let guard = self.runtime.lock().unwrap();
        let Some(rt) = guard.as_ref() else {
            warn!(site = %self.site, "submit after shutdown");
            handle.settle_error(TaskError::execution(anyhow!(
                "executor '{}' is shut down",
                self.site
            )));
            return handle;
        };

        let walltime = call.walltime;
        let settled = handle.clone();
        rt.spawn(async move {
            let work = tokio::task::spawn_blocking(move || func(call));

            let joined = match walltime {
                Some(limit) => match tokio::time::timeout(limit, work).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        settled.settle_error(TaskError::execution(anyhow!(
                            "walltime of {limit:?} exceeded"
                        )));
                        return;
                    }
                },
                None => work.await,
            };

            match joined {
                Ok(Ok(value)) => {
                    settled.settle_value(value);
                }
                Ok(Err(error)) => {
                    settled.settle_error(TaskError::Execution { source: error });
                }
                Err(join_error) => {
                    settled.settle_error(TaskError::execution(anyhow!(
                        "task panicked: {join_error}"
                    )));
                }
            }
        });

        handle
    }

    fn shutdown(&self) {
        if let Some(rt) = self.runtime.lock().unwrap().take() {
            debug!(site = %self.site, "shutting down thread-pool executor");
            // Workers holding unfinished tasks are detached rather than
            // joined; a blocking join here could wait on arbitrary user
            // code.
            rt.shutdown_background();
        }
    }
}

impl Drop for ThreadPoolExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
