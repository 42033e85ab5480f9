// src/app.rs

//! The app surface: a callable bound to a kernel.
//!
//! An [`App`] packages a task function with default routing and walltime.
//! Invoking it forwards the submission into the kernel, mints one
//! [`DataHandle`] per declared output, attaches them to the returned app
//! handle, and hands the handle back.

use std::time::Duration;

use tracing::debug;

use crate::dataflow::kernel::DataFlowKernel;
use crate::handle::{AppHandle, DataHandle};
use crate::types::{Call, ResolvedCall, SiteSpec, TaskFn, Value};

pub struct App {
    kernel: DataFlowKernel,
    func: TaskFn,
    sites: SiteSpec,
    walltime: Option<Duration>,
}

impl App {
    pub fn new(kernel: &DataFlowKernel, func: TaskFn) -> Self {
        Self {
            kernel: kernel.clone(),
            func,
            sites: SiteSpec::Any,
            walltime: None,
        }
    }

    /// Default sites for invocations that do not pick their own.
    pub fn sites<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sites = SiteSpec::Named(names.into_iter().map(Into::into).collect());
        self
    }

    /// Default advisory walltime for invocations that do not set their own.
    pub fn walltime(mut self, limit: Duration) -> Self {
        self.walltime = Some(limit);
        self
    }

    /// Forward an invocation into the kernel and package the result.
    pub fn invoke(&self, mut call: Call) -> AppHandle {
        if call.sites == SiteSpec::Any {
            call.sites = self.sites.clone();
        }
        if call.walltime.is_none() {
            call.walltime = self.walltime;
        }

        let output_paths = call.outputs.clone();
        let handle = self.kernel.submit(self.func.clone(), call);
        debug!(task = handle.tid(), outputs = output_paths.len(), "app invoked");

        let outputs: Vec<DataHandle> = output_paths
            .into_iter()
            .map(|path| DataHandle::new(handle.clone(), path))
            .collect();
        handle.set_outputs(outputs);

        handle
    }
}

impl DataFlowKernel {
    /// Wrap a closure as an [`App`] bound to this kernel.
    pub fn app<F>(&self, func: F) -> App
    where
        F: Fn(ResolvedCall) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        App::new(self, crate::types::task_fn(func))
    }
}
